//! Scalability Module
//!
//! Simulation harness for client-side scaling policies: load-balanced
//! requests with failover, health checks, a priority task queue, pagination
//! clamping, shard keys, and synthetic metrics.

mod balancer;
mod config;
mod service;
mod task_queue;

pub use balancer::{LoadBalancer, ServerHealth};
pub use config::{LoadBalancingStrategy, ScaleConfig};
pub use service::{
    ClusterMetrics, MetricsProbe, Pagination, ScalabilityService, SyntheticMetricsProbe,
};
pub use task_queue::{TaskQueue, TaskStatus, WorkItem, DEFAULT_TASK_PRIORITY};
