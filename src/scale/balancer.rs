//! Load Balancer Module
//!
//! Server selection across the configured backend list, plus the periodic
//! health-check sweep that keeps the per-server health map current.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::http::{Method, Transport, TransportRequest};
use crate::scale::{LoadBalancingStrategy, ScaleConfig};

/// Health probes are the one operation with an explicit timeout.
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

// == Server Health ==
/// Last observed state of one configured backend.
#[derive(Debug, Clone)]
pub struct ServerHealth {
    pub url: String,
    pub healthy: bool,
    pub response_time_ms: u64,
    pub last_checked: DateTime<Utc>,
}

// == Load Balancer ==
/// Picks a backend per the configured strategy among servers currently
/// marked healthy. One health entry per configured URL, created at
/// initialization and continuously overwritten.
pub struct LoadBalancer {
    strategy: LoadBalancingStrategy,
    servers: Vec<String>,
    failover_enabled: bool,
    /// Used when no configured server is healthy
    fallback_url: String,
    health: RwLock<HashMap<String, ServerHealth>>,
    cursor: AtomicUsize,
}

impl LoadBalancer {
    // == Constructor ==
    pub fn new(config: &ScaleConfig, fallback_url: impl Into<String>) -> Self {
        let now = Utc::now();
        let health = config
            .servers
            .iter()
            .map(|url| {
                (
                    url.clone(),
                    ServerHealth {
                        url: url.clone(),
                        healthy: true,
                        response_time_ms: 0,
                        last_checked: now,
                    },
                )
            })
            .collect();

        Self {
            strategy: config.strategy,
            servers: config.servers.clone(),
            failover_enabled: config.failover_enabled,
            fallback_url: fallback_url.into(),
            health: RwLock::new(health),
            cursor: AtomicUsize::new(0),
        }
    }

    // == Next Server ==
    /// Selects a backend per the configured strategy.
    ///
    /// Only healthy servers are eligible, unless failover is disabled, in
    /// which case health is ignored. Falls back to the default API URL
    /// when nothing is eligible.
    pub async fn next_server(&self) -> String {
        let candidates = self.eligible_servers().await;
        if candidates.is_empty() {
            debug!("no eligible backend; using fallback url");
            return self.fallback_url.clone();
        }

        match self.strategy {
            LoadBalancingStrategy::RoundRobin => {
                let index = self.cursor.fetch_add(1, Ordering::SeqCst) % candidates.len();
                candidates[index].url.clone()
            }
            LoadBalancingStrategy::LeastConnections => {
                // Last observed response time stands in for load
                candidates
                    .iter()
                    .min_by_key(|server| server.response_time_ms)
                    .map(|server| server.url.clone())
                    .unwrap_or_else(|| self.fallback_url.clone())
            }
            // No real client IP exists on this side of the wire, so both
            // ip-hash and random are approximate by design.
            LoadBalancingStrategy::IpHash | LoadBalancingStrategy::Random => {
                let index = rand::thread_rng().gen_range(0..candidates.len());
                candidates[index].url.clone()
            }
        }
    }

    async fn eligible_servers(&self) -> Vec<ServerHealth> {
        let health = self.health.read().await;
        self.servers
            .iter()
            .filter_map(|url| health.get(url))
            .filter(|server| server.healthy || !self.failover_enabled)
            .cloned()
            .collect()
    }

    // == Health Mutations ==
    /// Marks a server unhealthy immediately (called on request failure).
    pub async fn mark_unhealthy(&self, url: &str) {
        let mut health = self.health.write().await;
        if let Some(server) = health.get_mut(url) {
            server.healthy = false;
            server.response_time_ms = 0;
            server.last_checked = Utc::now();
            warn!(url, "backend marked unhealthy");
        }
    }

    async fn record_probe(&self, url: &str, healthy: bool, response_time_ms: u64) {
        let mut health = self.health.write().await;
        if let Some(server) = health.get_mut(url) {
            server.healthy = healthy;
            server.response_time_ms = response_time_ms;
            server.last_checked = Utc::now();
        }
    }

    /// Snapshot of every server's health entry.
    pub async fn health_snapshot(&self) -> Vec<ServerHealth> {
        let health = self.health.read().await;
        self.servers
            .iter()
            .filter_map(|url| health.get(url))
            .cloned()
            .collect()
    }

    pub async fn has_healthy_server(&self) -> bool {
        let health = self.health.read().await;
        health.values().any(|server| server.healthy)
    }

    // == Health Check Task ==
    /// Spawns the periodic health-check sweep.
    ///
    /// Each sweep probes every configured server with a bounded timeout and
    /// records healthy/response-time/timestamp, or unhealthy with response
    /// time 0 on any error.
    pub fn spawn_health_checks(
        self: &Arc<Self>,
        transport: Arc<dyn Transport>,
        interval_secs: u64,
    ) -> JoinHandle<()> {
        let balancer = Arc::clone(self);
        let interval = Duration::from_secs(interval_secs);

        tokio::spawn(async move {
            info!(
                interval_secs,
                servers = balancer.servers.len(),
                "starting backend health checks"
            );

            loop {
                tokio::time::sleep(interval).await;

                for url in &balancer.servers {
                    let probe = TransportRequest::new(Method::Get, format!("{}/health", url));
                    let started = Instant::now();
                    let result =
                        tokio::time::timeout(HEALTH_PROBE_TIMEOUT, transport.send(&probe)).await;

                    match result {
                        Ok(Ok(response)) if response.is_success() => {
                            let elapsed = started.elapsed().as_millis() as u64;
                            balancer.record_probe(url, true, elapsed).await;
                        }
                        _ => {
                            balancer.record_probe(url, false, 0).await;
                            debug!(url, "health probe failed");
                        }
                    }
                }
            }
        })
    }
}
