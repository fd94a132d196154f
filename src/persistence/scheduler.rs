//! Debounced Saves
//!
//! Coalesces cart snapshots so at most one write happens per window.

use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle, time::sleep};
use tracing::{debug, warn};

use crate::{cart::CartSnapshot, persistence::CartPersistence};

/// Background task saving the latest snapshot a fixed window after the first
/// unsaved change.
#[derive(Debug)]
pub struct SaveScheduler {
    handle: JoinHandle<()>,
}

impl SaveScheduler {
    /// Start saving snapshots published on `changes`.
    ///
    /// The task ends once the publishing store is gone and its last snapshot has
    /// been written.
    #[must_use]
    pub fn spawn(
        persistence: Arc<CartPersistence>,
        mut changes: watch::Receiver<CartSnapshot>,
        window: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                sleep(window).await;

                let snapshot = changes.borrow_and_update().clone();

                debug!(owner = %snapshot.owner, lines = snapshot.lines.len(), "debounced save");

                persistence.save(&snapshot.lines, snapshot.owner).await;
            }
        });

        Self { handle }
    }

    /// Wait for the pending save, if any, and the task to end.
    pub async fn finish(self) {
        if let Err(err) = self.handle.await {
            warn!(error = %err, "save scheduler ended abnormally");
        }
    }
}
