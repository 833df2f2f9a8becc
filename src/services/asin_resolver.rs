//! ASIN resolution against an external catalog search service
//!
//! Resolution is best-effort and cache-first: the persistent cache is
//! consulted before any network traffic, and every uncached lookup pays a
//! fixed politeness delay. A transport failure leaves no cache trace (the
//! pair may be retried on a future run); a response that simply contains no
//! identifier is cached as a permanent no-match.

use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;

use crate::services::asin_cache::{AsinCache, CacheHit};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Catalog lookup errors
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Network error: {0}")]
    Network(String),
}

/// Transport seam for the catalog keyword search
///
/// Returns the raw response body for a keyword query; the body is scanned
/// for the identifier pattern by the resolver, not parsed.
#[async_trait]
pub trait AsinLookup: Send + Sync {
    async fn search(&self, query: &str) -> Result<String, LookupError>;
}

/// Audible keyword-search client
pub struct AudibleClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl AudibleClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, LookupError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AsinLookup for AudibleClient {
    async fn search(&self, query: &str) -> Result<String, LookupError> {
        let url = format!("{}/search", self.base_url);

        tracing::debug!(query = %query, "Querying catalog search");

        let response = self
            .http_client
            .get(&url)
            .query(&[("keywords", query)])
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        // Any HTTP response is a scannable body; only transport failure is
        // a lookup error.
        response
            .text()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))
    }
}

/// Cache-aware ASIN resolution
pub struct AsinResolver {
    delay: Duration,
    asin_pattern: Regex,
}

impl AsinResolver {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            // ASIN format: "B0" followed by exactly 8 uppercase
            // alphanumerics, as embedded in search result markup.
            asin_pattern: Regex::new(r#"data-asin="(B0[A-Z0-9]{8})""#)
                .expect("invalid ASIN pattern"),
        }
    }

    /// Resolve an ASIN for a title/author pair
    ///
    /// Returns `None` both for a confirmed no-match and for a failed lookup;
    /// the two differ only in whether the cache records the outcome.
    pub async fn resolve(
        &self,
        cache: &mut AsinCache,
        lookup: &dyn AsinLookup,
        title: &str,
        author: &str,
    ) -> Option<String> {
        if title.is_empty() {
            return None;
        }

        match cache.lookup(title, author) {
            Some(CacheHit::Found(asin)) => return Some(asin),
            Some(CacheHit::NoMatch) => return None,
            None => {}
        }

        // Politeness delay before every uncached lookup
        tokio::time::sleep(self.delay).await;

        let query = format!("{} {}", title, author);
        let body = match lookup.search(&query).await {
            Ok(body) => body,
            Err(e) => {
                // Retryable on a future run, so no cache write
                tracing::warn!(title = %title, author = %author, error = %e, "Catalog lookup failed");
                return None;
            }
        };

        match self.extract_asin(&body) {
            Some(asin) => {
                tracing::info!(title = %title, author = %author, asin = %asin, "Resolved ASIN");
                cache.insert(title, author, Some(asin.clone()));
                Some(asin)
            }
            None => {
                tracing::debug!(title = %title, author = %author, "No ASIN match, caching negative result");
                cache.insert(title, author, None);
                None
            }
        }
    }

    /// First identifier occurrence in a search response body, if any
    fn extract_asin(&self, body: &str) -> Option<String> {
        self.asin_pattern
            .captures(body)
            .map(|captures| captures[1].to_string())
    }
}
