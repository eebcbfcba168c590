//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify store and glob-matching correctness properties.

use proptest::prelude::*;
use serde_json::{json, Value};

use crate::cache::{CacheStore, GlobPattern};

// == Strategies ==
/// Generates cache keys from the character set real keys use
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:/]{1,32}".prop_map(|s| s)
}

/// Generates JSON string values
fn value_strategy() -> impl Strategy<Value = Value> {
    "[a-zA-Z0-9 ]{0,64}".prop_map(Value::from)
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Storing a pair and reading it back (before expiry) returns the exact
    // value that was stored.
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), value in value_strategy()) {
        let mut store = CacheStore::new();

        store.set(key.clone(), value.clone(), None);

        let retrieved = store.get(&key);
        prop_assert_eq!(retrieved, Some(value), "Round-trip value mismatch");
    }

    // After a delete, a subsequent get returns nothing.
    #[test]
    fn prop_delete_removes_entry(key in key_strategy(), value in value_strategy()) {
        let mut store = CacheStore::new();

        store.set(key.clone(), value, None);
        prop_assert!(store.get(&key).is_some(), "Key should exist before delete");

        prop_assert!(store.delete(&key));
        prop_assert!(store.get(&key).is_none(), "Key should not exist after delete");
    }

    // Storing V1 then V2 under the same key makes get return V2.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        v1 in value_strategy(),
        v2 in value_strategy(),
    ) {
        let mut store = CacheStore::new();

        store.set(key.clone(), v1, None);
        store.set(key.clone(), v2.clone(), None);

        prop_assert_eq!(store.get(&key), Some(v2));
    }

    // Hit/miss statistics reflect exactly the gets that succeeded and failed.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut store = CacheStore::new();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    store.set(key, value, None);
                }
                CacheOp::Get { key } => {
                    match store.get(&key) {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    }
                }
                CacheOp::Delete { key } => {
                    store.delete(&key);
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, store.len(), "Total entries mismatch");
    }

    // `keys(pattern)` and `delete_pattern(pattern)` agree: the deletion count
    // equals the number of keys the scan reported, and none of them survive.
    #[test]
    fn prop_pattern_scan_and_delete_agree(
        keys in prop::collection::hash_set("[a-z]{1,8}", 1..20),
        prefix in "[a-z]{1,3}",
    ) {
        let mut store = CacheStore::new();
        for key in &keys {
            store.set(key.clone(), json!(1), None);
        }

        let pattern = format!("{}*", prefix);
        let matched = store.keys(&pattern);
        let removed = store.delete_pattern(&pattern);

        prop_assert_eq!(removed, matched.len());
        for key in matched {
            prop_assert!(store.get(&key).is_none(), "Matched key survived deletion");
        }
    }

    // A literal key (no wildcards) matches itself and only itself.
    #[test]
    fn prop_glob_literal_self_match(key in "[a-zA-Z0-9_:/{}\"]{1,32}") {
        let matcher = GlobPattern::new(&key);
        prop_assert!(matcher.matches(&key), "Literal pattern must match itself");
        let extended = format!("{}x", key);
        prop_assert!(!matcher.matches(&extended));
    }

    // `prefix*` matches exactly the strings that start with the prefix.
    #[test]
    fn prop_glob_prefix_star(prefix in "[a-z]{1,8}", suffix in "[a-z]{0,8}") {
        let matcher = GlobPattern::new(&format!("{}*", prefix));
        let candidate = format!("{}{}", prefix, suffix);
        prop_assert!(matcher.matches(&candidate));
    }

    // Incrementing a fresh counter n times yields n.
    #[test]
    fn prop_increment_accumulates(n in 1u64..20) {
        let mut store = CacheStore::new();
        let mut last = 0;
        for _ in 0..n {
            last = store.increment("counter", 1).unwrap();
        }
        prop_assert_eq!(last, n as i64);
    }
}
