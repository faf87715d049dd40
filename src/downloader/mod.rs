//! Core downloader implementation split into focused submodules.
//!
//! The `PixabayDownloader` struct and its methods are organized by domain:
//! - [`search`] - Catalog search and the shared page fetch path
//! - [`single`] - Single-item downloads (interactive and batch)
//! - [`batch`] - Batch orchestrator state machine
//! - [`lifecycle`] - Shutdown coordination

mod batch;
mod lifecycle;
mod search;
mod single;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::catalog::{CatalogClient, PixabayClient};
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::{AssetFetcher, HttpAssetFetcher};
use crate::history::HistoryLedger;
use crate::types::{BatchConfig, Event, ItemId, Page};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64};

/// Bookkeeping for the one batch run that may be active
pub(crate) struct ActiveBatch {
    /// Identifies the run so a finishing task only clears its own entry
    pub(crate) run_id: u64,
    /// Stop flag observed by the run at each checkpoint
    pub(crate) token: tokio_util::sync::CancellationToken,
    /// Settings captured at start (copy-on-start)
    pub(crate) config: BatchConfig,
    /// When the run was started
    pub(crate) started_at: chrono::DateTime<chrono::Utc>,
    /// Counters updated by the run, read by status queries
    pub(crate) progress: Arc<RunProgress>,
}

/// Live counters of a batch run
#[derive(Debug, Default)]
pub(crate) struct RunProgress {
    pub(crate) current_page: AtomicU32,
    pub(crate) downloaded: AtomicU64,
    pub(crate) failed: AtomicU64,
}

/// Batch orchestrator state
#[derive(Clone)]
pub(crate) struct BatchControl {
    /// The active run, if any (protected by Mutex: at most one run exists)
    pub(crate) active: Arc<tokio::sync::Mutex<Option<ActiveBatch>>>,
    /// Run id counter
    pub(crate) next_run_id: Arc<AtomicU64>,
    /// Flag to indicate whether new work is accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

/// Ids whose payload is currently being transferred
///
/// Two transfers of one id would share the same `.part` file, so a second
/// claim is refused until the first guard is dropped.
#[derive(Clone, Default)]
pub(crate) struct InFlight {
    ids: Arc<Mutex<HashSet<ItemId>>>,
}

impl InFlight {
    /// Claim `id`; `None` when another transfer holds it
    pub(crate) fn claim(&self, id: &ItemId) -> Option<InFlightGuard> {
        let mut ids = self.ids.lock().unwrap_or_else(|p| p.into_inner());
        if !ids.insert(id.clone()) {
            return None;
        }
        Some(InFlightGuard {
            ids: self.ids.clone(),
            id: id.clone(),
        })
    }

    /// Whether `id` is being transferred right now
    pub(crate) fn contains(&self, id: &ItemId) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(id)
    }
}

/// Releases its id when dropped
pub(crate) struct InFlightGuard {
    ids: Arc<Mutex<HashSet<ItemId>>>,
    id: ItemId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.ids
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.id);
    }
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct PixabayDownloader {
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Download history ledger, the source of truth for "already downloaded"
    pub(crate) history: Arc<HistoryLedger>,
    /// Search API collaborator
    pub(crate) catalog: Arc<dyn CatalogClient>,
    /// Asset download collaborator
    pub(crate) fetcher: Arc<dyn AssetFetcher>,
    /// Most recently fetched page (interactive search or batch)
    pub(crate) last_results: Arc<tokio::sync::RwLock<Option<Page>>>,
    /// Batch orchestrator state
    pub(crate) batch: BatchControl,
    /// Items currently being transferred (single or batch)
    pub(crate) in_flight: InFlight,
}

impl PixabayDownloader {
    /// Create a new PixabayDownloader talking to the Pixabay API
    ///
    /// This loads the history ledger from `config.persistence.history_path` and
    /// builds the HTTP catalog client and asset fetcher. A missing API key is
    /// not an error here; operations that need it fail with a configuration
    /// error instead.
    pub async fn new(config: Config) -> Result<Self> {
        let catalog = Arc::new(PixabayClient::new(config.api_key.trim(), &config.catalog)?);
        let fetcher = Arc::new(HttpAssetFetcher::new(config.catalog.request_timeout)?);
        Ok(Self::with_collaborators(config, catalog, fetcher).await)
    }

    /// Create a downloader with explicit catalog and fetcher implementations
    pub async fn with_collaborators(
        config: Config,
        catalog: Arc<dyn CatalogClient>,
        fetcher: Arc<dyn AssetFetcher>,
    ) -> Self {
        // Buffer of 1000 events; slow subscribers get RecvError::Lagged
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        let history =
            HistoryLedger::open(config.persistence.history_path.clone(), event_tx.clone()).await;

        Self {
            event_tx,
            config: Arc::new(config),
            history: Arc::new(history),
            catalog,
            fetcher,
            last_results: Arc::new(tokio::sync::RwLock::new(None)),
            batch: BatchControl {
                active: Arc::new(tokio::sync::Mutex::new(None)),
                next_run_id: Arc::new(AtomicU64::new(1)),
                accepting_new: Arc::new(AtomicBool::new(true)),
            },
            in_flight: InFlight::default(),
        }
    }

    /// Subscribe to downloader events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pixabay_dl::{Config, PixabayDownloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = PixabayDownloader::new(Config::load("config.json")).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             println!("{:?}", event);
    ///         }
    ///     });
    ///
    ///     downloader.search("ocean", 1).await?;
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// The download history ledger
    pub fn history(&self) -> &HistoryLedger {
        &self.history
    }

    /// Number of ids in the download history
    pub fn downloaded_count(&self) -> usize {
        self.history.count()
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = Arc::new(self.clone());
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
