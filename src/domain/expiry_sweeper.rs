//! Periodic removal of expired links.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::domain::entities::ShortLink;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{
    CacheService,
    keys::{evict, original_url_key, url_key},
};

/// Deletes expired links from the store and evicts their cached mappings.
///
/// Eviction is best-effort. Expired entries left in the cache are still
/// rejected by the read-time expiry check.
///
/// # Errors
///
/// Returns the store error if the delete fails.
pub async fn sweep_expired(
    links: &dyn LinkRepository,
    cache: &dyn CacheService,
) -> Result<Vec<ShortLink>, AppError> {
    let removed = links.delete_expired().await?;

    for link in &removed {
        evict(cache, &url_key(&link.code)).await;
        evict(cache, &original_url_key(&link.original_url)).await;
    }

    if !removed.is_empty() {
        info!(count = removed.len(), "Swept expired links");
    }

    Ok(removed)
}

/// Runs [`sweep_expired`] every `interval` until `shutdown` flips.
pub async fn run_expiry_sweeper(
    links: Arc<dyn LinkRepository>,
    cache: Arc<dyn CacheService>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        if let Err(e) = sweep_expired(links.as_ref(), cache.as_ref()).await {
            warn!(error = %e, "Expiry sweep failed");
        }
    }

    info!("Expiry sweeper stopped");
}
