//! Application state for the API server

use crate::{Config, PixabayDownloader};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the downloader instance and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The main PixabayDownloader instance
    pub downloader: Arc<PixabayDownloader>,

    /// Configuration (read-only while the server runs)
    pub config: Arc<Config>,

    /// Cancelled once `POST /shutdown` has shut the downloader down
    pub shutdown_token: CancellationToken,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<PixabayDownloader>, config: Arc<Config>) -> Self {
        Self {
            downloader,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }
}
