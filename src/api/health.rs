//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// Module name ("series-fetcher")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Number of entries currently held in the ASIN cache; `None` while an
    /// enrichment run holds the cache
    pub cache_entries: Option<usize>,
}

/// GET /health
///
/// Health check endpoint for monitoring. Must stay responsive during an
/// enrichment run, so the cache count is a non-blocking snapshot.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;
    let cache_entries = state.cache.try_lock().map(|cache| cache.len()).ok();

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "series-fetcher".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        cache_entries,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
