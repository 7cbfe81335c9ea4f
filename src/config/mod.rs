//! Client configuration (layered: code > env > defaults).

use std::time::Duration;

use crate::reporting::DEFAULT_LOG_ENDPOINT;
use crate::util::cache::{DEFAULT_CAPACITY, DEFAULT_CLEANUP_INTERVAL};

/// Backend address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Per-attempt timeout used when a request does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

const ENV_BASE_URL: &str = "CLAIMWISE_API_URL";
const ENV_TIMEOUT_MS: &str = "CLAIMWISE_TIMEOUT_MS";
const ENV_DEV_MODE: &str = "CLAIMWISE_DEV_MODE";
const ENV_LOG_ENDPOINT: &str = "CLAIMWISE_LOG_ENDPOINT";

/// Settings shared by every request an [`ApiClient`](crate::client::ApiClient) issues.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Prefix for relative request URLs.
    pub base_url: String,
    pub default_timeout: Duration,
    /// Dump every logged error to the tracing output.
    pub development: bool,
    pub cache_capacity: usize,
    pub cleanup_interval: Duration,
    /// Path (or absolute URL) of the remote error sink.
    pub log_endpoint: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_timeout: DEFAULT_TIMEOUT,
            development: false,
            cache_capacity: DEFAULT_CAPACITY,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            log_endpoint: DEFAULT_LOG_ENDPOINT.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Load from environment variables (`CLAIMWISE_API_URL`, etc.).
    ///
    /// A `.env` file is read first when present. Values that fail to
    /// parse keep their defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();

        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
            }
        }
        if let Some(ms) = std::env::var(ENV_TIMEOUT_MS)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            config.default_timeout = Duration::from_millis(ms);
        }
        if let Ok(flag) = std::env::var(ENV_DEV_MODE) {
            config.development = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Ok(endpoint) = std::env::var(ENV_LOG_ENDPOINT) {
            if !endpoint.trim().is_empty() {
                config.log_endpoint = endpoint.trim().to_string();
            }
        }

        config
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_development(mut self, development: bool) -> Self {
        self.development = development;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Resolve a request URL: absolute URLs pass through, anything else
    /// is joined onto `base_url`.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if url.starts_with('/') {
            format!("{base}{url}")
        } else {
            format!("{base}/{url}")
        }
    }

    /// Absolute URL of the error sink.
    pub fn log_url(&self) -> String {
        self.resolve_url(&self.log_endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_url_joins_relative_paths() {
        let config = ClientConfig::new("http://api.test/");
        assert_eq!(config.resolve_url("/policies"), "http://api.test/policies");
        assert_eq!(config.resolve_url("policies"), "http://api.test/policies");
        assert_eq!(
            config.resolve_url("https://other.test/x"),
            "https://other.test/x"
        );
    }

    #[test]
    fn log_url_uses_base() {
        let config = ClientConfig::new("http://api.test");
        assert_eq!(config.log_url(), "http://api.test/api/logs/errors");
    }
}
