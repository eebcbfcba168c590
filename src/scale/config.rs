//! Scalability Configuration
//!
//! Static simulation parameters with serde defaults, optionally refreshed
//! once from a remote endpoint at startup. A failed refresh silently keeps
//! the defaults.

use serde::Deserialize;
use tracing::{debug, info};

use crate::http::{Method, Transport, TransportRequest};

// == Load Balancing Strategy ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LoadBalancingStrategy {
    #[default]
    RoundRobin,
    LeastConnections,
    IpHash,
    Random,
}

// == Scale Config ==
/// Configuration for the scalability simulation harness.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScaleConfig {
    pub strategy: LoadBalancingStrategy,
    /// Backend URLs the balancer selects among
    pub servers: Vec<String>,
    /// Seconds between health-check sweeps
    pub health_check_interval: u64,
    /// When disabled, unhealthy servers stay eligible and request failures
    /// are not retried elsewhere
    pub failover_enabled: bool,
    pub cache_enabled: bool,
    /// TTL in seconds for responses cached by the simulator
    pub cache_ttl: u64,
    pub default_page_size: u64,
    pub max_page_size: u64,
    /// Resource-usage thresholds feeding `needs_optimization`
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
    pub response_time_threshold_ms: u64,
    /// When disabled, tasks run inline on the caller instead of the
    /// background worker
    pub async_processing_enabled: bool,
    pub sharding_enabled: bool,
    /// Fixed modulo shard fan-out. Not consistent hashing; a documented
    /// limitation of the simulation.
    pub shard_count: u64,
    pub cdn_enabled: bool,
    /// Prefix `asset_url` applies while the CDN is enabled
    pub cdn_url: Option<String>,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            strategy: LoadBalancingStrategy::RoundRobin,
            servers: Vec::new(),
            health_check_interval: 30,
            failover_enabled: true,
            cache_enabled: true,
            cache_ttl: 300,
            default_page_size: 20,
            max_page_size: 100,
            cpu_threshold: 80.0,
            memory_threshold: 85.0,
            response_time_threshold_ms: 1000,
            async_processing_enabled: true,
            sharding_enabled: false,
            shard_count: 4,
            cdn_enabled: false,
            cdn_url: None,
        }
    }
}

impl ScaleConfig {
    // == Remote Refresh ==
    /// Fetches configuration from a remote endpoint once, at startup.
    ///
    /// Any failure (transport, status, malformed body) keeps the current
    /// values; the simulation never blocks on its config source.
    pub async fn refreshed_from(self, transport: &dyn Transport, url: &str) -> Self {
        let request = TransportRequest::new(Method::Get, url);
        match transport.send(&request).await {
            Ok(response) if response.is_success() => {
                match serde_json::from_value::<ScaleConfig>(response.body) {
                    Ok(remote) => {
                        info!(url, "loaded scalability config from remote endpoint");
                        remote
                    }
                    Err(err) => {
                        debug!(url, error = %err, "remote config malformed; keeping defaults");
                        self
                    }
                }
            }
            Ok(response) => {
                debug!(url, status = response.status, "remote config unavailable; keeping defaults");
                self
            }
            Err(err) => {
                debug!(url, error = %err, "remote config fetch failed; keeping defaults");
                self
            }
        }
    }
}
