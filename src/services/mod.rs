//! Core services for series-fetcher

pub mod asin_cache;
pub mod asin_resolver;
pub mod enricher;
pub mod media_server;
