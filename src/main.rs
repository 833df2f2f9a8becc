//! series-fetcher - Series ASIN Enrichment Microservice
//!
//! Walks the series listings of an Audiobookshelf-compatible media server,
//! resolves missing ASINs against an external catalog search service with a
//! persistent lookup cache, writes resolved identifiers back to the origin
//! server, and serves two aggregated views of the enriched data.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use series_fetcher::config::Config;
use series_fetcher::services::asin_cache::AsinCache;
use series_fetcher::services::asin_resolver::{AsinResolver, AudibleClient};
use series_fetcher::services::media_server::AbsClient;
use series_fetcher::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting series-fetcher (Series ASIN Enrichment) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::resolve();
    info!("Cache file: {}", config.cache_path.display());
    info!("Catalog: {}", config.catalog_base_url);

    // Cache loads once at startup; missing or malformed storage degrades to
    // an empty cache rather than failing the service.
    let cache = AsinCache::load(&config.cache_path);
    info!("ASIN cache loaded ({} entries)", cache.len());

    let media = Arc::new(AbsClient::new(config.http_timeout_secs)?);
    let lookup = Arc::new(AudibleClient::new(
        &config.catalog_base_url,
        config.http_timeout_secs,
    )?);
    let resolver = AsinResolver::new(config.lookup_delay_ms);

    let state = AppState::new(media, lookup, resolver, cache);
    let app = series_fetcher::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
