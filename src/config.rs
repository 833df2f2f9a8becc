//! Configuration resolution for series-fetcher
//!
//! Per-field priority order:
//! 1. Environment variable (highest priority)
//! 2. TOML config file
//! 3. Compiled default (fallback)
//!
//! The config file path itself comes from `SERIES_FETCHER_CONFIG`, falling
//! back to `./series-fetcher.toml`.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5740";
const DEFAULT_CACHE_PATH: &str = "asin_cache.json";
const DEFAULT_CATALOG_BASE_URL: &str = "https://www.audible.de";
const DEFAULT_LOOKUP_DELAY_MS: u64 = 500;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address for the HTTP server
    pub bind_address: String,
    /// Location of the persistent ASIN resolution cache
    pub cache_path: PathBuf,
    /// Base URL of the external catalog search service
    pub catalog_base_url: String,
    /// Politeness delay applied before every uncached catalog lookup
    pub lookup_delay_ms: u64,
    /// Fixed timeout for catalog and write-back requests
    pub http_timeout_secs: u64,
}

/// Optional overrides as they appear in the TOML file
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    bind_address: Option<String>,
    cache_path: Option<PathBuf>,
    catalog_base_url: Option<String>,
    lookup_delay_ms: Option<u64>,
    http_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            catalog_base_url: DEFAULT_CATALOG_BASE_URL.to_string(),
            lookup_delay_ms: DEFAULT_LOOKUP_DELAY_MS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Resolve configuration from environment and TOML file
    pub fn resolve() -> Self {
        let file = load_config_file();
        let defaults = Config::default();

        Self {
            bind_address: env_var("SERIES_FETCHER_BIND")
                .or(file.bind_address)
                .unwrap_or(defaults.bind_address),
            cache_path: env_var("SERIES_FETCHER_CACHE_PATH")
                .map(PathBuf::from)
                .or(file.cache_path)
                .unwrap_or(defaults.cache_path),
            catalog_base_url: env_var("SERIES_FETCHER_CATALOG_URL")
                .or(file.catalog_base_url)
                .unwrap_or(defaults.catalog_base_url),
            lookup_delay_ms: env_var("SERIES_FETCHER_LOOKUP_DELAY_MS")
                .and_then(|v| v.parse().ok())
                .or(file.lookup_delay_ms)
                .unwrap_or(defaults.lookup_delay_ms),
            http_timeout_secs: env_var("SERIES_FETCHER_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .or(file.http_timeout_secs)
                .unwrap_or(defaults.http_timeout_secs),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn load_config_file() -> ConfigFile {
    let path = env_var("SERIES_FETCHER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("series-fetcher.toml"));

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => {
            debug!(path = %path.display(), "No config file found, using defaults");
            return ConfigFile::default();
        }
    };

    match toml::from_str(&content) {
        Ok(file) => file,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed config file");
            ConfigFile::default()
        }
    }
}
