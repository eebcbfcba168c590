//! Configuration Module
//!
//! Handles loading and managing client configuration from environment variables.

use std::env;

/// Client configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults. A missing or unparsable variable falls back to its default,
/// never to an error.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL prepended to every request path
    pub api_url: String,
    /// Whether GET responses are cached at all
    pub cache_enabled: bool,
    /// Whether failed mutating requests are queued for offline replay
    pub offline_enabled: bool,
    /// Default TTL in seconds applied by the client when a cached request
    /// does not specify one
    pub default_cache_ttl: u64,
    /// Background cache sweep interval in seconds
    pub sweep_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `API_URL` - Base API URL (default: `http://localhost:5000/api`)
    /// - `CACHE_ENABLED` - Enable response caching (default: true)
    /// - `OFFLINE_ENABLED` - Enable offline request queueing (default: true)
    /// - `DEFAULT_CACHE_TTL` - Default cache TTL in seconds (default: 300)
    /// - `CACHE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 300)
    pub fn from_env() -> Self {
        Self {
            api_url: env::var("API_URL")
                .ok()
                .unwrap_or_else(|| "http://localhost:5000/api".to_string()),
            cache_enabled: env::var("CACHE_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            offline_enabled: env::var("OFFLINE_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            default_cache_ttl: env::var("DEFAULT_CACHE_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            sweep_interval: env::var("CACHE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000/api".to_string(),
            cache_enabled: true,
            offline_enabled: true,
            default_cache_ttl: 300,
            sweep_interval: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.api_url, "http://localhost:5000/api");
        assert!(config.cache_enabled);
        assert!(config.offline_enabled);
        assert_eq!(config.default_cache_ttl, 300);
        assert_eq!(config.sweep_interval, 300);
    }

    // Env manipulation lives in one test: parallel tests share the process
    // environment.
    #[test]
    fn test_config_from_env() {
        env::remove_var("API_URL");
        env::remove_var("CACHE_ENABLED");
        env::remove_var("OFFLINE_ENABLED");
        env::remove_var("DEFAULT_CACHE_TTL");
        env::remove_var("CACHE_SWEEP_INTERVAL");

        let config = Config::from_env();
        assert_eq!(config.api_url, "http://localhost:5000/api");
        assert!(config.cache_enabled);
        assert!(config.offline_enabled);
        assert_eq!(config.default_cache_ttl, 300);
        assert_eq!(config.sweep_interval, 300);

        // Set values are picked up
        env::set_var("API_URL", "http://example.test/api");
        env::set_var("CACHE_ENABLED", "false");
        let config = Config::from_env();
        assert_eq!(config.api_url, "http://example.test/api");
        assert!(!config.cache_enabled);

        // Garbage falls back to the default rather than erroring
        env::set_var("DEFAULT_CACHE_TTL", "not-a-number");
        let config = Config::from_env();
        assert_eq!(config.default_cache_ttl, 300);

        env::remove_var("API_URL");
        env::remove_var("CACHE_ENABLED");
        env::remove_var("DEFAULT_CACHE_TTL");
    }
}
