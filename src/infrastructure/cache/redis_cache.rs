//! Redis-backed cache implementation.

use std::time::Duration;

use super::service::{CacheError, CacheResult, CacheService};
use async_trait::async_trait;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tracing::{debug, info, warn};

/// Set holding the keys of counters not yet flushed to the durable store.
const DIRTY_COUNTERS_KEY: &str = "clicks:dirty";

/// Redis cache implementation.
///
/// Uses a `ConnectionManager` that reconnects on failure. Every call is
/// bounded by the configured response timeout. Errors are returned to the
/// caller, which decides how to degrade.
pub struct RedisCache {
    client: ConnectionManager,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Arguments
    ///
    /// - `redis_url` - Redis connection string (e.g., `"redis://localhost:6379"`)
    /// - `timeout` - Connect and per-command response timeout
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str, timeout: Duration) -> CacheResult<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            CacheError::Connection(format!("Failed to create Redis client: {}", e))
        })?;

        let config = ConnectionManagerConfig::new()
            .set_connection_timeout(Some(timeout))
            .set_response_timeout(Some(timeout));

        let manager = ConnectionManager::new_with_config(client, config)
            .await
            .map_err(|e| CacheError::Connection(format!("Failed to connect to Redis: {}", e)))?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::Connection(format!("Redis PING failed: {}", e)))?;

        info!("Connected to Redis");

        Ok(Self { client: manager })
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.client.clone();
        Ok(conn.get::<_, Option<String>>(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.client.clone();
        let seconds = ttl.as_secs().max(1);

        conn.set_ex::<_, _, ()>(key, value, seconds).await?;
        debug!(key, ttl_seconds = seconds, "Cache SET");
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.client.clone();

        let deleted = conn.del::<_, i64>(key).await?;
        if deleted > 0 {
            debug!(key, "Cache DEL");
        }
        Ok(())
    }

    async fn increment_counter(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let mut conn = self.client.clone();

        let (value,): (i64,) = redis::pipe()
            .atomic()
            .cmd("INCRBY")
            .arg(key)
            .arg(delta)
            .cmd("SADD")
            .arg(DIRTY_COUNTERS_KEY)
            .arg(key)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(value)
    }

    async fn take_counters(&self, limit: usize) -> CacheResult<Vec<(String, i64)>> {
        let mut conn = self.client.clone();

        let keys: Vec<String> = redis::cmd("SPOP")
            .arg(DIRTY_COUNTERS_KEY)
            .arg(limit)
            .query_async(&mut conn)
            .await?;

        let mut taken = Vec::with_capacity(keys.len());
        let mut pending = keys.into_iter();

        while let Some(key) = pending.next() {
            // An increment racing the SPOP re-adds the key to the set, so a
            // missing value here only means a later flush already took it.
            let result: redis::RedisResult<Option<i64>> =
                redis::cmd("GETDEL").arg(&key).query_async(&mut conn).await;

            match result {
                Ok(value) => {
                    if let Some(value) = value.filter(|v| *v != 0) {
                        taken.push((key, value));
                    }
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "GETDEL failed, returning unread counters to the dirty set");
                    let unread: Vec<String> = std::iter::once(key).chain(pending.by_ref()).collect();
                    if let Err(e) = conn
                        .sadd::<_, _, ()>(DIRTY_COUNTERS_KEY, &unread)
                        .await
                    {
                        warn!(count = unread.len(), error = %e, "Failed to re-mark counters as dirty");
                    }
                    break;
                }
            }
        }

        Ok(taken)
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
