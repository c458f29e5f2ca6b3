//! Background worker applying queued clicks.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::domain::click_event::{CLICKS_TOTAL, ClickEvent};
use crate::domain::repositories::LinkRepository;
use crate::infrastructure::cache::{CacheService, keys::click_key};

/// Where a click ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Counted in the cache; the flusher moves it to the store later.
    Cache,
    /// Cache increment failed, counted directly in the store.
    Store,
    /// Store fallback found no such link.
    Missing,
    /// Both attempts failed; the click is lost.
    Failed,
}

impl ClickOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Store => "store",
            Self::Missing => "missing",
            Self::Failed => "failed",
        }
    }
}

/// Counts one click: one cache increment attempt, then one durable
/// increment only if the cache attempt errors. Never retries further.
pub async fn record_click(
    cache: &dyn CacheService,
    links: &dyn LinkRepository,
    code: &str,
) -> ClickOutcome {
    let cache_err = match cache.increment_counter(&click_key(code), 1).await {
        Ok(_) => return ClickOutcome::Cache,
        Err(e) => e,
    };

    debug!(code, backend = cache.backend(), error = %cache_err, "Cache increment failed, counting in store");

    match links.increment_click_count(code).await {
        Ok(true) => ClickOutcome::Store,
        Ok(false) => {
            debug!(code, "Click for unknown code ignored");
            ClickOutcome::Missing
        }
        Err(e) => {
            warn!(code, error = %e, "Failed to record click");
            ClickOutcome::Failed
        }
    }
}

/// Processes click events until every sender is dropped.
///
/// At most `concurrency` clicks are in flight at once. In-flight clicks are
/// awaited before returning.
pub async fn run_click_worker(
    mut rx: mpsc::Receiver<ClickEvent>,
    cache: Arc<dyn CacheService>,
    links: Arc<dyn LinkRepository>,
    concurrency: usize,
) {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut in_flight = JoinSet::new();

    while let Some(event) = rx.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };

        let cache = Arc::clone(&cache);
        let links = Arc::clone(&links);

        in_flight.spawn(async move {
            let outcome = record_click(cache.as_ref(), links.as_ref(), &event.code).await;
            counter!(CLICKS_TOTAL, "path" => outcome.as_str()).increment(1);
            drop(permit);
        });

        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    info!("Click worker stopped");
}
