//! In-process cache backed by concurrent maps.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::service::{CacheResult, CacheService};

/// Writes between full purges of expired entries.
const PURGE_EVERY: usize = 1024;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Single-process cache with per-entry TTLs.
///
/// Suited to one-node deployments and tests. Expired entries are dropped
/// on read, and every 1024 writes the whole map is purged so
/// keys that are never read again do not pile up. Counters live in a
/// separate map and never expire; every counter present is pending.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
    counters: DashMap<String, i64>,
    writes: AtomicUsize,
}

impl MemoryCache {
    pub fn new() -> Self {
        debug!("Using MemoryCache");
        Self::default()
    }

    /// Number of live value entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every expired value entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        let removed = before.saturating_sub(self.entries.len());

        if removed > 0 {
            debug!(removed, "Purged expired cache entries");
        }
        removed
    }

    /// Current value of a pending counter.
    pub fn counter(&self, key: &str) -> Option<i64> {
        self.counters.get(key).map(|v| *v)
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }

        self.entries.remove_if(key, |_, e| e.expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1).is_multiple_of(PURGE_EVERY) {
            self.purge_expired();
        }

        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn increment_counter(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let mut counter = self.counters.entry(key.to_string()).or_insert(0);
        *counter += delta;
        Ok(*counter)
    }

    async fn take_counters(&self, limit: usize) -> CacheResult<Vec<(String, i64)>> {
        let keys: Vec<String> = self
            .counters
            .iter()
            .take(limit)
            .map(|e| e.key().clone())
            .collect();

        Ok(keys
            .into_iter()
            .filter_map(|key| self.counters.remove(&key))
            .filter(|(_, value)| *value != 0)
            .collect())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
