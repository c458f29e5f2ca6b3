//! Caching layer in front of the durable store.
//!
//! Provides a [`CacheService`] trait with three implementations:
//! - [`RedisCache`] - Production Redis-backed cache
//! - [`MemoryCache`] - In-process cache for single-node setups and tests
//! - [`NullCache`] - No-op implementation for disabled caching
//!
//! [`keys`] defines the key layout and the fail-open JSON helpers the
//! services use.

pub mod keys;
mod memory_cache;
mod null_cache;
mod redis_cache;
mod service;

pub use memory_cache::MemoryCache;
pub use null_cache::NullCache;
pub use redis_cache::RedisCache;
pub use service::{CacheError, CacheResult, CacheService};

#[cfg(test)]
pub use service::MockCacheService;
