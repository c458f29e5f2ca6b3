//! Cache key layout and JSON read/write helpers.
//!
//! | Key                        | Value                 |
//! |----------------------------|-----------------------|
//! | `url:{code}`               | JSON `ShortLink`      |
//! | `lurl:{original_url}`      | JSON `ShortLink`      |
//! | `clicks:{code}`            | pending click counter |
//! | `analytics:{code}:{days}`  | JSON `Analytics`      |

use std::time::Duration;

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::service::CacheService;

pub const CACHE_HITS: &str = "snowlink_cache_hits_total";
pub const CACHE_MISSES: &str = "snowlink_cache_misses_total";
pub const CACHE_ERRORS: &str = "snowlink_cache_errors_total";

const CLICK_PREFIX: &str = "clicks:";

pub fn url_key(code: &str) -> String {
    format!("url:{code}")
}

pub fn original_url_key(original_url: &str) -> String {
    format!("lurl:{original_url}")
}

pub fn click_key(code: &str) -> String {
    format!("{CLICK_PREFIX}{code}")
}

/// Extracts the code from a key built by [`click_key`].
pub fn code_from_click_key(key: &str) -> Option<&str> {
    key.strip_prefix(CLICK_PREFIX).filter(|code| !code.is_empty())
}

pub fn analytics_key(code: &str, days: u32) -> String {
    format!("analytics:{code}:{days}")
}

/// Reads and decodes a JSON entry.
///
/// Misses, backend errors and undecodable payloads all come back as `None`.
/// Errors are logged and counted, never returned.
pub async fn get_json<T: DeserializeOwned>(cache: &dyn CacheService, key: &str) -> Option<T> {
    match cache.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "Cache HIT");
                counter!(CACHE_HITS).increment(1);
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                counter!(CACHE_MISSES).increment(1);
                None
            }
        },
        Ok(None) => {
            debug!(key, "Cache MISS");
            counter!(CACHE_MISSES).increment(1);
            None
        }
        Err(e) => {
            warn!(key, backend = cache.backend(), error = %e, "Cache read failed");
            counter!(CACHE_ERRORS).increment(1);
            None
        }
    }
}

/// Encodes and stores a JSON entry. Best-effort: failures are logged only.
pub async fn set_json<T: Serialize>(cache: &dyn CacheService, key: &str, value: &T, ttl: Duration) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(key, error = %e, "Failed to encode cache entry");
            return;
        }
    };

    if let Err(e) = cache.set(key, &raw, ttl).await {
        warn!(key, backend = cache.backend(), error = %e, "Cache write failed");
        counter!(CACHE_ERRORS).increment(1);
    }
}

/// Removes an entry. Best-effort: failures are logged only.
pub async fn evict(cache: &dyn CacheService, key: &str) {
    if let Err(e) = cache.delete(key).await {
        warn!(key, backend = cache.backend(), error = %e, "Cache eviction failed");
        counter!(CACHE_ERRORS).increment(1);
    }
}
