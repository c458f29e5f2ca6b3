//! Click event model and non-blocking dispatch.

use metrics::counter;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

/// Metric counting clicks by the path that accounted for them.
pub const CLICKS_TOTAL: &str = "snowlink_clicks_total";

/// A successful redirect waiting to be counted.
///
/// Handed from the resolve path to the background click worker through a
/// bounded channel, so counting never delays the redirect and outlives the
/// request that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub code: String,
}

impl ClickEvent {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// Queues a click without waiting.
///
/// A full or closed queue drops the click with a warning. Returns whether
/// the event was queued.
pub fn dispatch_click(tx: &mpsc::Sender<ClickEvent>, code: &str) -> bool {
    match tx.try_send(ClickEvent::new(code)) {
        Ok(()) => true,
        Err(TrySendError::Full(ev)) => {
            warn!(code = %ev.code, "Click queue full, dropping click");
            counter!(CLICKS_TOTAL, "path" => "dropped").increment(1);
            false
        }
        Err(TrySendError::Closed(ev)) => {
            warn!(code = %ev.code, "Click queue closed, dropping click");
            counter!(CLICKS_TOTAL, "path" => "dropped").increment(1);
            false
        }
    }
}
