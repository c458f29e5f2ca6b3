//! Moves click counters accumulated in the cache into the durable store.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::domain::click_event::CLICKS_TOTAL;
use crate::domain::repositories::LinkRepository;
use crate::infrastructure::cache::{CacheService, keys::code_from_click_key};

/// Outcome of one flush batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Counters taken from the cache.
    pub taken: usize,
    /// Counters applied to the store.
    pub flushed: usize,
    /// Clicks applied to the store.
    pub clicks: i64,
    /// Counters pushed back to the cache after a store failure.
    pub requeued: usize,
    /// Counters whose link no longer exists.
    pub orphaned: usize,
}

/// Takes up to `batch` pending counters and applies each with one durable
/// `add_clicks`. A counter the store rejects is pushed back to the cache.
pub async fn flush_clicks(
    cache: &dyn CacheService,
    links: &dyn LinkRepository,
    batch: usize,
) -> FlushReport {
    let mut report = FlushReport::default();

    let counters = match cache.take_counters(batch).await {
        Ok(counters) => counters,
        Err(e) => {
            warn!(backend = cache.backend(), error = %e, "Failed to read pending click counters");
            return report;
        }
    };
    report.taken = counters.len();

    for (key, delta) in counters {
        let Some(code) = code_from_click_key(&key) else {
            warn!(key = %key, "Ignoring unrecognised counter key");
            continue;
        };

        match links.add_clicks(code, delta).await {
            Ok(true) => {
                report.flushed += 1;
                report.clicks += delta;
            }
            Ok(false) => {
                debug!(code, delta, "Dropping clicks for a deleted link");
                report.orphaned += 1;
            }
            Err(e) => {
                warn!(code, delta, error = %e, "Failed to flush clicks, returning them to the cache");
                report.requeued += 1;
                if let Err(e) = cache.increment_counter(&key, delta).await {
                    error!(code, delta, error = %e, "Clicks lost: counter could not be returned");
                    counter!(CLICKS_TOTAL, "path" => "failed").increment(delta.unsigned_abs());
                }
            }
        }
    }

    report
}

/// Flushes batches until the cache has no more pending counters or the
/// store starts refusing them.
pub async fn drain_clicks(
    cache: &dyn CacheService,
    links: &dyn LinkRepository,
    batch: usize,
) -> FlushReport {
    let batch = batch.max(1);
    let mut total = FlushReport::default();

    loop {
        let report = flush_clicks(cache, links, batch).await;

        total.taken += report.taken;
        total.flushed += report.flushed;
        total.clicks += report.clicks;
        total.requeued += report.requeued;
        total.orphaned += report.orphaned;

        if report.taken < batch || report.requeued > 0 {
            return total;
        }
    }
}

/// Drains pending counters every `interval` until `shutdown` flips, then
/// drains once more.
pub async fn run_click_flusher(
    cache: Arc<dyn CacheService>,
    links: Arc<dyn LinkRepository>,
    interval: Duration,
    batch: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        let report = drain_clicks(cache.as_ref(), links.as_ref(), batch).await;
        if report.taken > 0 {
            debug!(?report, "Flushed click counters");
        }
    }

    let report = drain_clicks(cache.as_ref(), links.as_ref(), batch).await;
    info!(flushed = report.flushed, clicks = report.clicks, "Final click flush complete");
}
