//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;

use super::PixabayDownloader;

/// Upper bound on how long shutdown waits for a running batch
const SHUTDOWN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

impl PixabayDownloader {
    /// Gracefully shut down the downloader
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new batches and single downloads
    /// 2. Signals the active batch, if any, to stop (the current item finishes)
    /// 3. Waits for the batch to reach idle, bounded by a 30 second timeout
    /// 4. Emits [`Event::Shutdown`]
    ///
    /// The history ledger is persisted on every change, so nothing is left to
    /// flush here.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.batch.accepting_new.store(false, Ordering::SeqCst);

        if self.stop_batch().await {
            tracing::info!("Signaled active batch to stop");
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_for_batch()).await {
                Ok(()) => tracing::info!("Batch stopped"),
                Err(_) => tracing::warn!(
                    "Timeout waiting for batch to stop, proceeding with shutdown"
                ),
            }
        }

        self.emit_event(Event::Shutdown);

        tracing::info!(
            history_count = self.history.count(),
            "Graceful shutdown complete"
        );
        Ok(())
    }
}
