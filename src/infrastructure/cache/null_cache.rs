//! No-op cache implementation for disabled caching.

use std::time::Duration;

use super::service::{CacheResult, CacheService};
use async_trait::async_trait;
use tracing::debug;

/// A cache implementation that stores nothing.
///
/// Every read misses and every write is discarded, which puts the services
/// in pure durable-store mode. Counter increments report an error so that
/// click accounting goes straight to the durable store instead of vanishing.
pub struct NullCache;

impl NullCache {
    /// Creates a new NullCache instance.
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheService for NullCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn increment_counter(&self, _key: &str, _delta: i64) -> CacheResult<i64> {
        Err(super::CacheError::Operation(
            "counters are unavailable with caching disabled".to_string(),
        ))
    }

    async fn take_counters(&self, _limit: usize) -> CacheResult<Vec<(String, i64)>> {
        Ok(Vec::new())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_cache_never_stores() {
        let cache = NullCache::new();
        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.take_counters(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_null_cache_counter_reports_unavailable() {
        assert!(NullCache::new().increment_counter("clicks:a", 1).await.is_err());
    }
}
