//! ats-client - Client-side request pipeline for an applicant tracking system
//!
//! Read-through response caching with TTL and tag invalidation, concurrent
//! request de-duplication, durable offline replay of mutating requests, and
//! a scalability simulation harness.

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod http;
pub mod offline;
pub mod scale;
pub mod tasks;

pub use bootstrap::Services;
pub use config::Config;
pub use connectivity::{ConnectivityMonitor, SyncEvent};
pub use error::{ApiError, Result};
pub use http::{ApiClient, CacheOptions, Method, Outcome, RequestConfig, ReqwestTransport};
pub use offline::{JsonFileFormStore, MemoryFormStore, OfflineQueue};
pub use scale::{ScalabilityService, ScaleConfig};
pub use tasks::spawn_sweep_task;
