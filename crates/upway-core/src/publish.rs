// ── Publish transport seam ──
//
// The core only ever enqueues. Delivery, ordering per topic, retained
// storage and reconnects are the transport's business.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

use crate::error::CoreError;

/// An outbound message queue.
///
/// `enqueue` resolves once the message is accepted into the queue, not once
/// it is delivered. `pending_count` reports accepted-but-undelivered
/// messages and is what the shutdown drain waits on.
pub trait PublishSink: Send + Sync {
    fn enqueue(
        &self,
        topic: &str,
        payload: String,
        retain: bool,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn pending_count(&self) -> usize;

    /// Stop the transport. Called after the drain.
    fn shutdown(&self) -> impl Future<Output = ()> + Send;
}

/// Sink that only logs each publish. Used for `--dry-run`.
#[derive(Debug, Default)]
pub struct LogSink {
    published: AtomicUsize,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages logged so far.
    pub fn published(&self) -> usize {
        self.published.load(Ordering::Relaxed)
    }
}

impl PublishSink for LogSink {
    async fn enqueue(&self, topic: &str, payload: String, retain: bool) -> Result<(), CoreError> {
        self.published.fetch_add(1, Ordering::Relaxed);
        info!(topic, retain, payload = %payload, "dry-run publish");
        Ok(())
    }

    fn pending_count(&self) -> usize {
        0
    }

    async fn shutdown(&self) {}
}
