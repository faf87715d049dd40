//! # pixabay-dl
//!
//! Search the Pixabay video catalog and download results in deduplicated,
//! paced batches.
//!
//! ## Design
//!
//! - **History ledger** - every downloaded id is persisted; batches skip what
//!   is already on disk, across runs
//! - **One batch at a time** - a single background run walks pages and
//!   downloads items sequentially with a pause between them
//! - **Cooperative stop** - stopping never interrupts a file mid-transfer
//! - **Event-driven** - consumers subscribe to events, the downloader never
//!   calls back into them
//!
//! ## Quick Start
//!
//! ```no_run
//! use pixabay_dl::{Config, Event, PixabayDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.json");
//!     let downloader = PixabayDownloader::new(config.clone()).await?;
//!
//!     let mut events = downloader.subscribe();
//!     downloader.start_batch(config.batch_defaults("ocean", 1)).await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!         if matches!(event, Event::BatchDone { .. }) {
//!             break;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Catalog search client
pub mod catalog;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Asset download client
pub mod fetcher;
/// Download history ledger
pub mod history;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use catalog::{CatalogClient, PixabayClient};
pub use config::Config;
pub use downloader::PixabayDownloader;
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use fetcher::{AssetFetcher, HttpAssetFetcher};
pub use history::HistoryLedger;
pub use types::{
    BatchConfig, BatchStart, BatchState, BatchStatus, CatalogItem, Event, ItemId, ItemView, Page,
    SearchResults, StopReason, Variant,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method.
///
/// # Example
///
/// ```no_run
/// use pixabay_dl::{Config, PixabayDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = PixabayDownloader::new(Config::load("config.json")).await?;
///     let _server = downloader.spawn_api_server();
///
///     run_with_shutdown(downloader).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: PixabayDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

/// Wait for SIGINT or SIGTERM (Ctrl+C on non-Unix platforms)
///
/// Signal registration can fail in restricted environments; the function then
/// falls back to `tokio::signal::ctrl_c()`.
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Ok(mut only), Err(e)) | (Err(e), Ok(mut only)) => {
            tracing::warn!(error = %e, "Could not register both signal handlers");
            only.recv().await;
            tracing::info!("Received termination signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

/// Wait for Ctrl+C
#[cfg(not(unix))]
pub async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
