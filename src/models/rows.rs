//! Aggregated output rows
//!
//! Two views over the enriched series data: one representative row per
//! series (derived from the series' first book) and one row per book.
//! Row order mirrors the server's response order; no deduplication.

use serde::{Deserialize, Serialize};

pub const UNKNOWN_SERIES: &str = "Unknown Series";
pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ASIN: &str = "Unknown ASIN";
pub const NO_SUBTITLE: &str = "No Subtitle";
pub const NO_POSITION: &str = "N/A";

/// One row per series, from that series' first book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FirstAsinRow {
    pub series: String,
    pub title: String,
    pub asin: String,
}

/// One row per book across all series
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllAsinRow {
    pub series: String,
    pub title: String,
    pub asin: String,
    pub subtitle: String,
    #[serde(rename = "seriesPosition")]
    pub series_position: String,
}
