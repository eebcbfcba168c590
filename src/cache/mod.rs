//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, glob pattern scans, and
//! the tag namespace used for bulk invalidation.

mod entry;
mod glob;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use glob::{glob_match, GlobPattern};
pub use stats::CacheStats;
pub use store::CacheStore;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared handle to the process-wide cache store.
pub type SharedCache = Arc<RwLock<CacheStore>>;

/// Creates a fresh shared cache handle.
pub fn shared_cache() -> SharedCache {
    Arc::new(RwLock::new(CacheStore::new()))
}

// == Public Constants ==
/// Namespace prefix for the tag records that map a cache key to its tags.
/// `tags:<key>` holds a JSON array of the tags associated with `<key>`.
pub const TAG_PREFIX: &str = "tags:";
