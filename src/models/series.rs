//! Wire types for the origin server's paginated series listing
//!
//! These mirror the Audiobookshelf response shape. Every field the server
//! may omit is optional or defaulted; unknown fields are ignored. Page data
//! is transient: constructed per fetched page, mutated during resolution,
//! discarded after aggregation.

use serde::{Deserialize, Serialize};

/// Reference to one remote library in the enrichment request
///
/// Entries with a missing or empty id are skipped, not rejected.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LibraryRef {
    #[serde(default)]
    pub id: Option<String>,
}

/// One page of a library's series listing
///
/// `total` is authoritative only from the first page that carries it.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SeriesPage {
    #[serde(default)]
    pub results: Vec<Series>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// A named grouping of books
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Series {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub books: Vec<Book>,
}

/// A single library item within a series
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Book {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub media: Media,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Media {
    #[serde(default)]
    pub metadata: BookMetadata,
}

/// Book metadata as reported by the origin server
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BookMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "authorName")]
    pub author_name: Option<String>,
    #[serde(default)]
    pub asin: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default, rename = "seriesName")]
    pub series_name: Option<String>,
}

impl BookMetadata {
    /// True when the book still needs an identifier resolved
    pub fn asin_missing(&self) -> bool {
        self.asin.as_deref().map_or(true, |a| a.is_empty())
    }
}
