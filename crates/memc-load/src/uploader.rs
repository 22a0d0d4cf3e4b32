//! Upload worker: drains one destination queue into one store

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::models::{UploadItem, UploadOutcome};
use crate::store::KeyValueStore;

/// Writes every queued item for one destination class
///
/// Each item gets one attempt plus up to `retry_limit` immediate retries.
/// The worker ends when its queue is closed and returns exactly one
/// [`UploadOutcome`].
pub struct UploadWorker {
    class: String,
    store: Arc<dyn KeyValueStore>,
    retry_limit: u32,
}

impl UploadWorker {
    pub fn new(class: impl Into<String>, store: Arc<dyn KeyValueStore>, retry_limit: u32) -> Self {
        Self {
            class: class.into(),
            store,
            retry_limit,
        }
    }

    /// Write one item, retrying without delay; true if any attempt succeeded
    pub async fn upload(&self, item: &UploadItem) -> bool {
        let attempts = self.retry_limit.saturating_add(1);

        for attempt in 1..=attempts {
            match self.store.set(&item.key, &item.payload).await {
                Ok(()) => return true,
                Err(e) => {
                    debug!(
                        class = %self.class,
                        key = %item.key,
                        attempt,
                        error = %e,
                        "Store write failed"
                    );
                },
            }
        }

        warn!(
            class = %self.class,
            address = self.store.address(),
            key = %item.key,
            attempts,
            "Giving up on store write"
        );
        false
    }

    /// Drain `queue` until every sender is dropped
    pub async fn run(self, mut queue: mpsc::Receiver<UploadItem>) -> UploadOutcome {
        let mut outcome = UploadOutcome::default();

        while let Some(item) = queue.recv().await {
            if self.upload(&item).await {
                outcome.record_success();
            } else {
                outcome.record_failure();
            }
        }

        debug!(
            class = %self.class,
            processed = outcome.processed,
            errors = outcome.errors,
            "Upload queue drained"
        );
        outcome
    }
}
