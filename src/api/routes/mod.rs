//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`search`] — Catalog search and current results
//! - [`batch`] — Batch start, stop and status
//! - [`downloads`] — Single-item downloads
//! - [`history`] — Download history ledger
//! - [`config`] — Configuration
//! - [`system`] — Health, events, OpenAPI, shutdown

use crate::types::{BatchStart, ItemId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod batch;
mod config;
mod downloads;
mod history;
mod search;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use batch::*;
pub use config::*;
pub use downloads::*;
pub use history::*;
pub use search::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Query parameters for GET /search
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Search text
    pub q: String,
    /// 1-based page number (default: 1)
    pub page: Option<u32>,
}

/// Request body for POST /batch
///
/// Unset fields fall back to the configured download settings.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StartBatchRequest {
    /// Search text to walk
    pub query: String,
    /// First page to process (default: 1)
    pub start_page: Option<u32>,
    /// Pause between items in seconds
    pub per_item_delay: Option<u64>,
    /// Continue with the following pages
    pub auto_advance_pages: Option<bool>,
}

/// Response body for POST /batch
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StartBatchResponse {
    /// Whether a run was started or one was already running
    pub status: BatchStart,
}

/// Response body for DELETE /batch
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StopBatchResponse {
    /// `true` when a running batch was asked to stop
    pub stopping: bool,
}

/// Request body for POST /downloads
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct DownloadRequest {
    /// Id of an item in the current results
    pub id: ItemId,
    /// File name inside the download directory (default: `{prefix}-{id}.mp4`)
    ///
    /// Must be a bare name: separators, `..` and absolute paths are rejected.
    pub file_name: Option<String>,
}

/// Response body for POST /downloads
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadResponse {
    /// Downloaded item
    pub id: ItemId,
    /// Where the file was written
    #[schema(value_type = String)]
    pub path: PathBuf,
}

/// Response body for GET /history and DELETE /history
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct HistoryCountResponse {
    /// Number of ids in the ledger
    pub count: usize,
}

/// Response body for POST /history/import
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ImportHistoryResponse {
    /// Ids that were not in the ledger before
    pub added: usize,
    /// Number of ids in the ledger afterwards
    pub count: usize,
}
