//! series-fetcher library interface
//!
//! Enriches book series listings from an Audiobookshelf-compatible media
//! server with ASINs resolved against an external catalog, writing resolved
//! identifiers back to the origin server and emitting two aggregated views.
//!
//! Exposes public APIs for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::services::asin_cache::AsinCache;
use crate::services::asin_resolver::{AsinLookup, AsinResolver};
use crate::services::media_server::MediaServer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Origin media-server transport (series listing + write-back)
    pub media: Arc<dyn MediaServer>,
    /// External catalog search transport
    pub lookup: Arc<dyn AsinLookup>,
    /// Cache-aware ASIN resolution logic
    pub resolver: Arc<AsinResolver>,
    /// Persistent resolution cache; the mutex serializes cache mutation
    /// across concurrent requests
    pub cache: Arc<Mutex<AsinCache>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        media: Arc<dyn MediaServer>,
        lookup: Arc<dyn AsinLookup>,
        resolver: AsinResolver,
        cache: AsinCache,
    ) -> Self {
        Self {
            media,
            lookup,
            resolver: Arc::new(resolver),
            cache: Arc::new(Mutex::new(cache)),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::series_routes())
        .merge(api::health_routes())
        .with_state(state)
}
