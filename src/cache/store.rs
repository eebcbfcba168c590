//! Cache Store Module
//!
//! In-memory key/value store with per-entry TTL, glob pattern scans, and
//! lazy expiry on read backed by a periodic sweep.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, GlobPattern};

// == Cache Store ==
/// Key/value cache with TTL expiration.
///
/// Expired entries are deleted lazily when read through `get`/`has`; the
/// background sweep ([`crate::tasks::spawn_sweep_task`]) is a backstop for
/// entries that are never read again. The store holds no size limit: entries
/// leave through TTL, explicit deletion, or tag/pattern invalidation.
#[derive(Debug, Default)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Performance statistics
    stats: CacheStats,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty CacheStore.
    pub fn new() -> Self {
        Self::default()
    }

    // == Set ==
    /// Stores a key-value pair with optional TTL.
    ///
    /// `Some(ttl)` expires the entry `ttl` seconds from now; `None` never
    /// expires. Overwriting an existing key resets its expiry. Default-TTL
    /// policy lives in the HTTP client, not here.
    pub fn set(&mut self, key: String, value: Value, ttl_seconds: Option<u64>) {
        let entry = CacheEntry::new(value, ttl_seconds);
        self.entries.insert(key, entry);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns `None` on miss or expiry; an expired entry is deleted on the
    /// spot (lazy eviction).
    pub fn get(&mut self, key: &str) -> Option<Value> {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                self.entries.remove(key);
                self.stats.record_expired(1);
                self.stats.record_miss();
                self.stats.set_total_entries(self.entries.len());
                None
            }
            Some(entry) => {
                self.stats.record_hit();
                Some(entry.value.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Has ==
    /// Checks whether a non-expired entry exists for the key.
    ///
    /// Same miss/expiry semantics as `get`, without returning the value.
    pub fn has(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    // == Get Stale ==
    /// Returns the raw value for a key regardless of expiry, without
    /// deleting anything or touching statistics.
    ///
    /// Used by the offline GET fallback, which prefers a stale value over
    /// an error when the network is unreachable.
    pub fn get_stale(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Peek Fresh ==
    /// Non-destructive freshness probe: `Some(value)` only when the entry
    /// exists and has not expired. Unlike `get`, an expired entry is left in
    /// place so a later `get_stale` can still find it.
    pub fn peek_fresh(&self, key: &str) -> Option<Value> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            _ => None,
        }
    }

    // == Delete ==
    /// Removes one entry; returns whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        let existed = self.entries.remove(key).is_some();
        if existed {
            self.stats.set_total_entries(self.entries.len());
        }
        existed
    }

    // == Delete Pattern ==
    /// Removes every entry whose key matches the glob pattern.
    ///
    /// Returns the number of entries removed.
    pub fn delete_pattern(&mut self, pattern: &str) -> usize {
        let matcher = GlobPattern::new(pattern);
        let matching: Vec<String> = self
            .entries
            .keys()
            .filter(|key| matcher.matches(key))
            .cloned()
            .collect();

        let count = matching.len();
        for key in matching {
            self.entries.remove(&key);
        }

        if count > 0 {
            debug!(pattern, count, "deleted cache entries by pattern");
            self.stats.set_total_entries(self.entries.len());
        }
        count
    }

    // == Keys ==
    /// Lists non-expired keys matching the glob pattern.
    pub fn keys(&self, pattern: &str) -> Vec<String> {
        let matcher = GlobPattern::new(pattern);
        self.entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired() && matcher.matches(key))
            .map(|(key, _)| key.clone())
            .collect()
    }

    // == Increment ==
    /// Adds `by` to a numeric entry and returns the new value.
    ///
    /// An absent or expired key is created at `by` with no expiry; an
    /// expired entry is evicted first, the same lazy eviction `get`
    /// performs, so a stale count is never read. A present but non-numeric
    /// value returns `None` without mutating. An existing entry keeps its
    /// expiry instant, so the remaining TTL is unchanged.
    pub fn increment(&mut self, key: &str, by: i64) -> Option<i64> {
        if self.entries.get(key).is_some_and(|entry| entry.is_expired()) {
            self.entries.remove(key);
            self.stats.record_expired(1);
        }

        match self.entries.get_mut(key) {
            Some(entry) => {
                let current = entry.value.as_i64()?;
                let next = current + by;
                entry.value = Value::from(next);
                Some(next)
            }
            None => {
                self.set(key.to_string(), Value::from(by), None);
                Some(by)
            }
        }
    }

    // == Clear ==
    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats.set_total_entries(0);
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed. Called by the background
    /// sweep task.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();

        for key in expired_keys {
            self.entries.remove(&key);
        }

        if count > 0 {
            self.stats.record_expired(count as u64);
            self.stats.set_total_entries(self.entries.len());
        }
        count
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Length ==
    /// Returns the current number of entries (expired ones included until
    /// they are swept or read).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
