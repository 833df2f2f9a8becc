//! Series enrichment API handler
//!
//! POST /series/fetch

use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::models::{AllAsinRow, FirstAsinRow, LibraryRef};
use crate::services::enricher::Enricher;
use crate::services::media_server::UpstreamError;
use crate::AppState;

/// POST /series/fetch request
#[derive(Debug, Deserialize)]
pub struct FetchSeriesRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "authToken")]
    pub auth_token: String,
    #[serde(default)]
    pub libraries: Vec<LibraryRef>,
}

/// POST /series/fetch response
#[derive(Debug, Serialize)]
pub struct FetchSeriesResponse {
    pub status: String,
    #[serde(rename = "seriesFirstASIN")]
    pub series_first_asin: Vec<FirstAsinRow>,
    #[serde(rename = "seriesAllASIN")]
    pub series_all_asin: Vec<AllAsinRow>,
}

/// POST /series/fetch
///
/// Run the full enrichment: paginate every requested library's series
/// listing, resolve and write back missing ASINs, and return the two
/// aggregated views.
pub async fn fetch_series(
    State(state): State<AppState>,
    Json(request): Json<FetchSeriesRequest>,
) -> ApiResult<Json<FetchSeriesResponse>> {
    let server_url = request.url.trim_end_matches('/').to_string();

    if server_url.is_empty() || request.auth_token.is_empty() || request.libraries.is_empty() {
        return Err(ApiError::BadRequest(
            "Missing required fields: url, authentication token, or libraries list".to_string(),
        ));
    }

    tracing::info!(
        server = %server_url,
        libraries = request.libraries.len(),
        "Starting series enrichment run"
    );

    // The cache lock is held across the whole run; concurrent requests are
    // serialized rather than interleaving cache mutation.
    let mut cache = state.cache.lock().await;
    let enricher = Enricher::new(
        state.media.as_ref(),
        state.lookup.as_ref(),
        state.resolver.as_ref(),
    );
    let output = enricher
        .run(&mut cache, &server_url, &request.auth_token, &request.libraries)
        .await
        .map_err(|e| match e {
            UpstreamError::Status {
                status,
                body,
                library_id,
                page,
            } => ApiError::Upstream {
                status,
                message: format!(
                    "Failed to fetch series (page {}) from library {}",
                    page, library_id
                ),
                details: body,
            },
            UpstreamError::Network(msg) => ApiError::Upstream {
                status: 502,
                message: "Failed to reach library server".to_string(),
                details: msg,
            },
        })?;

    tracing::info!(
        series = output.series_first_asin.len(),
        books = output.series_all_asin.len(),
        "Series enrichment run complete"
    );

    Ok(Json(FetchSeriesResponse {
        status: "success".to_string(),
        series_first_asin: output.series_first_asin,
        series_all_asin: output.series_all_asin,
    }))
}

/// Build series enrichment routes
pub fn series_routes() -> Router<AppState> {
    Router::new().route("/series/fetch", post(fetch_series))
}
