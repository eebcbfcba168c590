//! Scalability Service
//!
//! Simulation harness exercising client-side scaling policies against a
//! configured list of backend URLs: balanced read-through requests with
//! bounded failover, pagination clamping, shard-key derivation, background
//! task queueing, and synthetic metrics.

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::SharedCache;
use crate::error::{ApiError, Result};
use crate::http::{Method, Transport, TransportRequest};
use crate::scale::{LoadBalancer, ScaleConfig, TaskQueue, DEFAULT_TASK_PRIORITY};

// == Pagination ==
/// Clamped pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
    pub skip: u64,
}

// == Cluster Metrics ==
/// A metrics sample for the UI dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterMetrics {
    pub requests_per_second: f64,
    pub average_response_time_ms: f64,
    pub error_rate: f64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub active_connections: u64,
}

// == Metrics Probe ==
/// Capability supplying metrics samples.
///
/// The simulation ships [`SyntheticMetricsProbe`]; a deployment with real
/// telemetry would substitute its own implementation here.
pub trait MetricsProbe: Send + Sync {
    fn sample(&self) -> ClusterMetrics;
}

// == Synthetic Metrics Probe ==
/// Illustrative stub: every sample is randomized and carries no operational
/// meaning. It exists only to drive a metrics display.
#[derive(Debug, Default)]
pub struct SyntheticMetricsProbe;

impl MetricsProbe for SyntheticMetricsProbe {
    fn sample(&self) -> ClusterMetrics {
        let mut rng = rand::thread_rng();
        ClusterMetrics {
            requests_per_second: rng.gen_range(10.0..500.0),
            average_response_time_ms: rng.gen_range(20.0..1500.0),
            error_rate: rng.gen_range(0.0..0.05),
            cpu_usage: rng.gen_range(5.0..95.0),
            memory_usage: rng.gen_range(20.0..95.0),
            active_connections: rng.gen_range(1..200),
        }
    }
}

// == Scalability Service ==
/// The simulator's client surface.
pub struct ScalabilityService {
    config: ScaleConfig,
    balancer: Arc<LoadBalancer>,
    cache: SharedCache,
    transport: Arc<dyn Transport>,
    tasks: Arc<TaskQueue>,
    metrics: Arc<dyn MetricsProbe>,
}

impl ScalabilityService {
    // == Constructor ==
    /// Builds the service around an already-resolved config (see
    /// [`ScaleConfig::refreshed_from`] for the one-shot remote refresh).
    pub fn new(
        config: ScaleConfig,
        fallback_url: impl Into<String>,
        cache: SharedCache,
        transport: Arc<dyn Transport>,
        metrics: Arc<dyn MetricsProbe>,
    ) -> Self {
        let balancer = Arc::new(LoadBalancer::new(&config, fallback_url));
        Self {
            config,
            balancer,
            cache,
            transport,
            tasks: Arc::new(TaskQueue::new()),
            metrics,
        }
    }

    /// Spawns the periodic health-check sweep for this service's balancer.
    pub fn spawn_health_checks(&self) -> JoinHandle<()> {
        self.balancer
            .spawn_health_checks(Arc::clone(&self.transport), self.config.health_check_interval)
    }

    /// The balancer, for callers that only need server selection.
    pub fn balancer(&self) -> &Arc<LoadBalancer> {
        &self.balancer
    }

    // == Request ==
    /// Cache-read-through GET against whichever server the balancer picks.
    ///
    /// On a transport failure the chosen server is marked unhealthy and,
    /// with failover enabled, the request is retried against the next
    /// candidate. The loop is bounded by the number of configured servers,
    /// so termination does not depend on the shrinking healthy set.
    pub async fn request(&self, path: &str, params: Option<Value>) -> Result<Value> {
        let max_attempts = self.config.servers.len().max(1);
        let mut last_error = ApiError::Transport("no request attempted".to_string());

        for attempt in 0..max_attempts {
            let server = self.balancer.next_server().await;
            let url = format!("{}{}", server, path);
            let key = match &params {
                Some(params) => format!("GET:{}:{}", url, params),
                None => format!("GET:{}", url),
            };

            if self.config.cache_enabled {
                let store = self.cache.read().await;
                if let Some(value) = store.peek_fresh(&key) {
                    return Ok(value);
                }
            }

            let mut request = TransportRequest::new(Method::Get, url.clone());
            request.params = params.clone();

            match self.transport.send(&request).await {
                Ok(response) if response.is_success() => {
                    if self.config.cache_enabled {
                        let mut store = self.cache.write().await;
                        store.set(key, response.body.clone(), Some(self.config.cache_ttl));
                    }
                    return Ok(response.body);
                }
                Ok(response) => {
                    return Err(ApiError::Status {
                        code: response.status,
                        message: format!("backend {} returned {}", server, response.status),
                    });
                }
                Err(err) => {
                    warn!(url, attempt, error = %err, "balanced request failed");
                    self.balancer.mark_unhealthy(&server).await;
                    last_error = err;
                    if !self.config.failover_enabled {
                        break;
                    }
                }
            }
        }

        Err(last_error)
    }

    // == Task Queue ==
    /// Appends a background task with the default priority.
    pub async fn enqueue_task(&self, task_type: impl Into<String>, data: Value) -> u64 {
        self.enqueue_task_with_priority(task_type, data, DEFAULT_TASK_PRIORITY)
            .await
    }

    /// Hands the task to the background worker, or, with async processing
    /// disabled, runs it to completion on the caller.
    pub async fn enqueue_task_with_priority(
        &self,
        task_type: impl Into<String>,
        data: Value,
        priority: u8,
    ) -> u64 {
        if self.config.async_processing_enabled {
            self.tasks.enqueue(task_type, data, priority).await
        } else {
            self.tasks.run_inline(task_type, data, priority).await
        }
    }

    pub fn task_queue(&self) -> &Arc<TaskQueue> {
        &self.tasks
    }

    // == Pagination ==
    /// Clamps `page >= 1` and `page_size` into `[1, max_page_size]`,
    /// defaulting the page size when omitted; `skip = (page-1) * page_size`.
    pub fn pagination_params(&self, page: i64, page_size: Option<i64>) -> Pagination {
        let page = page.max(1) as u64;
        let page_size = page_size
            .unwrap_or(self.config.default_page_size as i64)
            .clamp(1, self.config.max_page_size as i64) as u64;

        Pagination {
            page,
            page_size,
            skip: (page - 1) * page_size,
        }
    }

    // == Asset URL ==
    /// CDN-prefixed URL for a static asset. With the CDN disabled or no CDN
    /// URL configured, the path passes through unchanged.
    pub fn asset_url(&self, path: &str) -> String {
        if self.config.cdn_enabled {
            if let Some(cdn) = &self.config.cdn_url {
                return format!("{}{}", cdn, path);
            }
        }
        path.to_string()
    }

    // == Shard Key ==
    /// `"default"` when sharding is disabled; otherwise a fixed modulo
    /// scheme over the configured shard count. Not consistent hashing —
    /// a known limitation of the simulation, kept as-is.
    pub fn shard_key(&self, resource_type: &str, id: u64) -> String {
        if !self.config.sharding_enabled {
            return "default".to_string();
        }
        format!("{}_shard_{}", resource_type, id % self.config.shard_count)
    }

    // == Metrics ==
    /// Current metrics sample from the configured probe. With the synthetic
    /// probe these values are illustrative only.
    pub fn metrics(&self) -> ClusterMetrics {
        self.metrics.sample()
    }

    /// Names the thresholds the current sample exceeds. Driven entirely by
    /// the probe; with the synthetic probe this is display material, not a
    /// signal.
    pub fn needs_optimization(&self) -> Vec<String> {
        let sample = self.metrics.sample();
        let mut findings = Vec::new();

        if sample.cpu_usage > self.config.cpu_threshold {
            findings.push(format!(
                "cpu usage {:.1}% above threshold {:.1}%",
                sample.cpu_usage, self.config.cpu_threshold
            ));
        }
        if sample.memory_usage > self.config.memory_threshold {
            findings.push(format!(
                "memory usage {:.1}% above threshold {:.1}%",
                sample.memory_usage, self.config.memory_threshold
            ));
        }
        if sample.average_response_time_ms > self.config.response_time_threshold_ms as f64 {
            findings.push(format!(
                "average response time {:.0}ms above threshold {}ms",
                sample.average_response_time_ms, self.config.response_time_threshold_ms
            ));
        }

        if !findings.is_empty() {
            debug!(?findings, "synthetic metrics exceed thresholds");
        }
        findings
    }
}
