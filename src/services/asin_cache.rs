//! Persistent ASIN resolution cache
//!
//! A single JSON document mapping `title|author` keys to either a resolved
//! ASIN or an explicit null marking a permanent "no match". Both forms count
//! as resolved; absence of a key means the pair was never attempted, so a
//! future run may still query the catalog for it.
//!
//! Loaded once at startup and flushed after every mutation. Persistence is
//! fire-and-forget: a write failure leaves the in-memory map authoritative
//! for the rest of the run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum CacheHit {
    /// A previously resolved identifier
    Found(String),
    /// A previously confirmed "no match"; never re-queried
    NoMatch,
}

pub struct AsinCache {
    path: PathBuf,
    entries: HashMap<String, Option<String>>,
}

impl AsinCache {
    /// Load persisted entries, degrading to an empty cache when the file is
    /// missing or malformed
    pub fn load(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Malformed ASIN cache, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "No ASIN cache file, starting empty");
                HashMap::new()
            }
        };

        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(title: &str, author: &str) -> String {
        format!("{}|{}", title, author)
    }

    /// Look up a prior resolution attempt; `None` means never attempted
    pub fn lookup(&self, title: &str, author: &str) -> Option<CacheHit> {
        self.entries
            .get(&Self::key(title, author))
            .map(|entry| match entry {
                Some(asin) => CacheHit::Found(asin.clone()),
                None => CacheHit::NoMatch,
            })
    }

    /// Record a resolution outcome and flush to storage
    ///
    /// `asin = None` records a permanent no-match.
    pub fn insert(&mut self, title: &str, author: &str, asin: Option<String>) {
        self.entries.insert(Self::key(title, author), asin);
        self.persist();
    }

    /// Flush the cache to its file; failure is logged and ignored
    fn persist(&self) {
        let json = match serde_json::to_string(&self.entries) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize ASIN cache");
                return;
            }
        };

        if let Err(e) = std::fs::write(&self.path, json) {
            warn!(path = %self.path.display(), error = %e, "Failed to persist ASIN cache");
        }
    }
}
