//! HTTP API handlers for series-fetcher

pub mod health;
pub mod series;

pub use health::health_routes;
pub use series::series_routes;
