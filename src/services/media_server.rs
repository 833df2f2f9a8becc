//! Origin media-server transport
//!
//! Two operations against an Audiobookshelf-compatible server: fetching one
//! page of a library's series listing, and patching a resolved ASIN back
//! into an item's metadata. A failed page fetch is fatal to the whole run;
//! a failed write-back never is.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::models::SeriesPage;

/// Fatal series-page fetch errors
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Non-success status from the series endpoint; status and raw body are
    /// propagated verbatim to the caller, along with which page failed
    #[error("Series fetch for library {library_id} (page {page}) returned status {status}")]
    Status {
        status: u16,
        body: String,
        library_id: String,
        page: u64,
    },

    /// Transport failure before any HTTP status was received
    #[error("Network error: {0}")]
    Network(String),
}

/// Transport seam for the origin server
#[async_trait]
pub trait MediaServer: Send + Sync {
    /// Fetch one page of a library's series listing (fixed page size 20)
    async fn fetch_series_page(
        &self,
        server_url: &str,
        token: &str,
        library_id: &str,
        page: u64,
    ) -> Result<SeriesPage, UpstreamError>;

    /// Patch a resolved ASIN into an item's metadata
    ///
    /// Returns whether the server accepted the update. Failure here is
    /// non-fatal: the enriched output keeps the locally resolved value.
    async fn write_back_asin(
        &self,
        server_url: &str,
        token: &str,
        item_id: &str,
        asin: &str,
    ) -> bool;
}

/// Page size for the series listing
pub const SERIES_PAGE_LIMIT: u64 = 20;

/// Audiobookshelf HTTP client
pub struct AbsClient {
    http_client: reqwest::Client,
}

impl AbsClient {
    pub fn new(timeout_secs: u64) -> Result<Self, UpstreamError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl MediaServer for AbsClient {
    async fn fetch_series_page(
        &self,
        server_url: &str,
        token: &str,
        library_id: &str,
        page: u64,
    ) -> Result<SeriesPage, UpstreamError> {
        let url = format!(
            "{}/api/libraries/{}/series?limit={}&page={}",
            server_url, library_id, SERIES_PAGE_LIMIT, page
        );

        tracing::debug!(library_id = %library_id, page = page, "Fetching series page");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
                library_id: library_id.to_string(),
                page,
            });
        }

        // The server occasionally omits fields; an undecodable body behaves
        // like an empty page rather than aborting the run.
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    async fn write_back_asin(
        &self,
        server_url: &str,
        token: &str,
        item_id: &str,
        asin: &str,
    ) -> bool {
        let url = format!("{}/api/items/{}/media", server_url, item_id);
        let body = json!({ "metadata": { "asin": asin } });

        let result = self
            .http_client
            .patch(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) => {
                let ok = response.status().is_success();
                if !ok {
                    tracing::warn!(
                        item_id = %item_id,
                        status = response.status().as_u16(),
                        "ASIN write-back rejected by server"
                    );
                }
                ok
            }
            Err(e) => {
                tracing::warn!(item_id = %item_id, error = %e, "ASIN write-back failed");
                false
            }
        }
    }
}
