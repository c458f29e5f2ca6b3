//! Cache service trait and error types.

use async_trait::async_trait;
use std::time::Duration;

/// Errors that can occur during cache operations.
///
/// These never escape the application services: every cache failure is
/// logged and treated as a miss or a fallback trigger.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    Connection(String),

    #[error("Cache operation error: {0}")]
    Operation(String),

    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_refusal() || e.is_timeout() || e.is_connection_dropped()
        {
            Self::Connection(e.to_string())
        } else {
            Self::Operation(e.to_string())
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Fast, volatile key/value store sitting in front of the durable store.
///
/// Absence of an entry is always a valid state. Implementations report
/// failures honestly; callers decide how to degrade.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process map with TTLs
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Returns the value stored at `key`, or `None` on a miss.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Stores `value` at `key` for `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Removes `key` if present.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Atomically adds `delta` to the counter at `key` and marks it pending.
    ///
    /// Returns the counter value after the increment.
    async fn increment_counter(&self, key: &str, delta: i64) -> CacheResult<i64>;

    /// Atomically removes and returns up to `limit` pending counters.
    ///
    /// Each returned `(key, value)` pair is gone from the cache, so the caller
    /// owns the delta and must push it back if it cannot apply it.
    async fn take_counters(&self, limit: usize) -> CacheResult<Vec<(String, i64)>>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}
