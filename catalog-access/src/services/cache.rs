//! Typed in-memory caches backing the permission and credential tiers.
//!
//! Entries never expire. Memory grows with the number of distinct keys seen
//! until `clear()` is called or the owning core is dropped.

use dashmap::DashMap;
use std::hash::Hash;

fn record_lookup(cache: &'static str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("access_cache_lookups_total", "cache" => cache, "result" => result)
        .increment(1);
}

/// Concurrent map for a single concern. Values are cloned out so no shard
/// guard outlives the call.
pub struct Cache<K, V> {
    name: &'static str,
    entries: DashMap<K, V>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: DashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let value = self.entries.get(key).map(|entry| entry.value().clone());
        record_lookup(self.name, value.is_some());
        value
    }

    /// Last write wins.
    pub fn put(&self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    /// Drop every entry for which `keep` returns false.
    pub fn retain(&self, mut keep: impl FnMut(&K, &V) -> bool) {
        self.entries.retain(|key, value| keep(key, value));
    }

    pub fn clear(&self) {
        self.entries.clear();
        tracing::debug!(cache = self.name, "Cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Two-level cache keyed by an outer key (an identity) and an inner key (a
/// record or file), so every decision for one outer key can be dropped at once.
pub struct NestedCache<K1, K2, V> {
    name: &'static str,
    entries: DashMap<K1, DashMap<K2, V>>,
}

impl<K1, K2, V> NestedCache<K1, K2, V>
where
    K1: Eq + Hash,
    K2: Eq + Hash,
    V: Clone,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, outer: &K1, inner: &K2) -> Option<V> {
        let value = self
            .entries
            .get(outer)
            .and_then(|row| row.get(inner).map(|entry| entry.value().clone()));
        record_lookup(self.name, value.is_some());
        value
    }

    pub fn put(&self, outer: K1, inner: K2, value: V) {
        self.entries.entry(outer).or_default().insert(inner, value);
    }

    pub fn clear_outer(&self, outer: &K1) {
        self.entries.remove(outer);
    }

    pub fn clear(&self) {
        self.entries.clear();
        tracing::debug!(cache = self.name, "Cache cleared");
    }

    /// Total number of inner entries.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|row| row.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
