//! Batch orchestrator.
//!
//! A batch run walks result pages starting at `start_page`, downloads every
//! item not yet in the history ledger one at a time, and optionally advances
//! to the following pages. At most one run exists; it lives in a spawned task
//! and talks to observers only through events.
//!
//! Stopping is cooperative. The run checks its cancellation token before
//! every item, and the pacing delay, the page settle delay and page fetches
//! all race against the token. An item transfer that already started is
//! always allowed to finish.

use crate::error::{Error, Result};
use crate::types::{
    BatchConfig, BatchStart, BatchState, BatchStatus, Event, Page, StopReason,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{ActiveBatch, PixabayDownloader, RunProgress};

impl PixabayDownloader {
    /// Start a batch run
    ///
    /// Returns [`BatchStart::AlreadyRunning`] without touching the active run
    /// when one exists. The run itself proceeds in the background; watch the
    /// event stream for `BatchDone`.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error when no API key is configured, and with
    /// [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown).
    pub async fn start_batch(&self, mut config: BatchConfig) -> Result<BatchStart> {
        self.config.require_api_key()?;
        if !self.batch.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        config.query = config.query.trim().to_string();
        config.start_page = config.start_page.max(1);

        let mut active = self.batch.active.lock().await;
        if active.is_some() {
            tracing::info!(query = %config.query, "Batch already running, start ignored");
            return Ok(BatchStart::AlreadyRunning);
        }

        let run_id = self.batch.next_run_id.fetch_add(1, Ordering::SeqCst);
        let token = CancellationToken::new();
        let progress = Arc::new(RunProgress::default());
        progress
            .current_page
            .store(config.start_page, Ordering::SeqCst);

        *active = Some(ActiveBatch {
            run_id,
            token: token.clone(),
            config: config.clone(),
            started_at: chrono::Utc::now(),
            progress: progress.clone(),
        });

        tracing::info!(
            run_id,
            query = %config.query,
            start_page = config.start_page,
            auto_advance = config.auto_advance_pages,
            "Batch started"
        );
        self.emit_event(Event::BatchStarted {
            config: config.clone(),
        });

        let downloader = self.clone();
        tokio::spawn(async move {
            let reason = downloader.run_batch(&config, &token, &progress).await;
            downloader.finish_batch(run_id, reason, &progress).await;
        });

        Ok(BatchStart::Started)
    }

    /// Ask the active run to stop at its next checkpoint
    ///
    /// Returns immediately; the run ends asynchronously with
    /// [`StopReason::StoppedByRequest`]. Returns `false` when no run is active.
    /// Calling it repeatedly is harmless.
    pub async fn stop_batch(&self) -> bool {
        let active = self.batch.active.lock().await;
        match active.as_ref() {
            Some(run) => {
                if !run.token.is_cancelled() {
                    tracing::info!(run_id = run.run_id, "Batch stop requested");
                    run.token.cancel();
                }
                true
            }
            None => false,
        }
    }

    /// Current state of the orchestrator
    pub async fn batch_status(&self) -> BatchStatus {
        let active = self.batch.active.lock().await;
        let Some(run) = active.as_ref() else {
            return BatchStatus::idle();
        };

        BatchStatus {
            state: if run.token.is_cancelled() {
                BatchState::Stopping
            } else {
                BatchState::Running
            },
            config: Some(run.config.clone()),
            current_page: Some(run.progress.current_page.load(Ordering::SeqCst)),
            downloaded: run.progress.downloaded.load(Ordering::SeqCst),
            failed: run.progress.failed.load(Ordering::SeqCst),
            started_at: Some(run.started_at),
        }
    }

    /// Wait until no batch run is active
    pub async fn wait_for_batch(&self) {
        loop {
            if self.batch.active.lock().await.is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Return to idle, then announce the end of the run
    async fn finish_batch(&self, run_id: u64, reason: StopReason, progress: &RunProgress) {
        {
            let mut active = self.batch.active.lock().await;
            if active.as_ref().is_some_and(|run| run.run_id == run_id) {
                *active = None;
            }
        }

        let downloaded = progress.downloaded.load(Ordering::SeqCst);
        let failed = progress.failed.load(Ordering::SeqCst);
        let last_page = progress.current_page.load(Ordering::SeqCst);

        tracing::info!(run_id, %reason, downloaded, failed, last_page, "Batch finished");
        self.emit_event(Event::BatchDone {
            reason,
            downloaded,
            failed,
            last_page,
        });
    }

    /// The page loop; returns why the run ended
    async fn run_batch(
        &self,
        config: &BatchConfig,
        token: &CancellationToken,
        progress: &RunProgress,
    ) -> StopReason {
        let page_size = self.config.catalog.page_size;
        let settle_delay = self.config.download.page_settle_delay;

        let mut page = match self.reusable_results(config).await {
            Some(page) => page,
            None => match self.fetch_for_batch(config, config.start_page, token).await {
                Ok(Some(page)) => page,
                Ok(None) => return StopReason::StoppedByRequest,
                Err(_) => return StopReason::FetchError,
            },
        };

        loop {
            progress.current_page.store(page.number, Ordering::SeqCst);

            let pending = self.history.pending(&page.items);
            if pending.is_empty() && !config.auto_advance_pages {
                tracing::info!(page = page.number, "All items on page already downloaded");
                return StopReason::AllAlreadyDownloaded;
            }

            let total = pending.len();
            for (index, item) in pending.iter().enumerate() {
                if index > 0 && !pause(token, config.per_item_delay).await {
                    return StopReason::StoppedByRequest;
                }
                if token.is_cancelled() {
                    return StopReason::StoppedByRequest;
                }
                if self.in_flight.contains(&item.id) {
                    tracing::debug!(item_id = %item.id, "Item already downloading elsewhere, skipping");
                    continue;
                }

                self.emit_event(Event::BatchProgress {
                    index: index + 1,
                    total,
                    page: page.number,
                    item_id: item.id.clone(),
                });

                match self.fetch_item(item, None).await {
                    Ok(_) => {
                        progress.downloaded.fetch_add(1, Ordering::SeqCst);
                        self.refresh_items().await;
                    }
                    Err(Error::InProgress { .. }) => {
                        tracing::debug!(item_id = %item.id, "Item claimed by another download, skipping");
                    }
                    Err(e) => {
                        progress.failed.fetch_add(1, Ordering::SeqCst);
                        tracing::warn!(item_id = %item.id, page = page.number, error = %e, "Item failed, continuing batch");
                        self.emit_event(Event::ItemFailed {
                            id: item.id.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }

            if token.is_cancelled() {
                return StopReason::StoppedByRequest;
            }
            if !config.auto_advance_pages {
                return StopReason::Completed;
            }
            if !page.is_full(page_size) {
                return StopReason::NoMorePages;
            }

            let Some(next_page) = page.number.checked_add(1) else {
                return StopReason::NoMorePages;
            };
            self.emit_event(Event::BatchPageAdvance { next_page });
            if !pause(token, settle_delay).await {
                return StopReason::StoppedByRequest;
            }

            page = match self.fetch_for_batch(config, next_page, token).await {
                Ok(Some(page)) => page,
                Ok(None) => return StopReason::StoppedByRequest,
                Err(_) => {
                    progress.current_page.store(next_page, Ordering::SeqCst);
                    return StopReason::FetchError;
                }
            };

            if page.items.is_empty() {
                progress.current_page.store(next_page, Ordering::SeqCst);
                return StopReason::NoMorePages;
            }
        }
    }

    /// The current results, when they are the page this batch starts on
    async fn reusable_results(&self, config: &BatchConfig) -> Option<Page> {
        let results = self.last_results.read().await;
        results
            .as_ref()
            .filter(|page| page.query == config.query && page.number == config.start_page)
            .cloned()
    }

    /// Fetch a page unless the run is stopped first; `Ok(None)` means stopped
    async fn fetch_for_batch(
        &self,
        config: &BatchConfig,
        page: u32,
        token: &CancellationToken,
    ) -> Result<Option<Page>> {
        if token.is_cancelled() {
            return Ok(None);
        }

        tokio::select! {
            _ = token.cancelled() => Ok(None),
            fetched = self.load_page(&config.query, page) => fetched.map(Some),
        }
    }

    /// Re-announce the current results so observers see new ledger flags
    async fn refresh_items(&self) {
        let results = self.last_results.read().await;
        if let Some(page) = results.as_ref() {
            self.emit_items_changed(page);
        }
    }
}

/// Sleep for `delay` unless stopped first; returns `false` when stopped
async fn pause(token: &CancellationToken, delay: Duration) -> bool {
    if delay.is_zero() {
        return !token.is_cancelled();
    }

    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
