//! Core types for pixabay-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use utoipa::ToSchema;

/// Opaque identifier of a catalog item
///
/// The remote API hands out integers, but identity is the string form: that is
/// what the ledger stores and compares. Deserializes from either a JSON number
/// or a JSON string.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Create a new ItemId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => ItemId(n.to_string()),
            Raw::Text(s) => ItemId(s),
        })
    }
}

/// A quality-specific downloadable rendition of an item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Variant {
    /// Download URL of the rendition
    pub url: String,
    /// Frame width in pixels (0 when unknown)
    #[serde(default)]
    pub width: u32,
    /// Frame height in pixels (0 when unknown)
    #[serde(default)]
    pub height: u32,
    /// Payload size in bytes (0 when unknown)
    #[serde(default)]
    pub size: u64,
    /// Preview image URL for this rendition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// One searchable asset of the catalog
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CatalogItem {
    /// Stable identifier, the dedup key
    pub id: ItemId,
    /// Length of the video in seconds
    pub duration_seconds: u64,
    /// Comma-separated tag list
    pub tags: String,
    /// Link to the item's page on the catalog website
    pub page_url: String,
    /// Legacy preview image id (older API responses only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture_id: Option<String>,
    /// Renditions keyed by quality label ("large", "medium", "small", "tiny")
    pub variants: BTreeMap<String, Variant>,
}

impl CatalogItem {
    /// Pick the download variant following `priority`
    ///
    /// Labels are tried in order; a label that is missing or carries an empty
    /// URL falls through to the next one. Returns `None` when nothing is usable.
    pub fn select_variant<S: AsRef<str>>(&self, priority: &[S]) -> Option<(&str, &Variant)> {
        priority.iter().find_map(|label| {
            self.variants
                .get_key_value(label.as_ref())
                .filter(|(_, variant)| !variant.url.trim().is_empty())
                .map(|(label, variant)| (label.as_str(), variant))
        })
    }

    /// Deterministic filename for this item, `{prefix}-{id}.mp4`
    pub fn file_name(&self, prefix: &str) -> String {
        let id: String = self
            .id
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{prefix}-{id}.mp4")
    }

    /// Preview image URL, if the API provided one
    pub fn thumbnail_url(&self) -> Option<String> {
        self.variants
            .values()
            .find_map(|v| v.thumbnail.clone().filter(|t| !t.is_empty()))
            .or_else(|| {
                self.picture_id
                    .as_ref()
                    .filter(|p| !p.is_empty())
                    .map(|p| format!("https://i.vimeocdn.com/video/{p}_295x166.jpg"))
            })
    }
}

/// One page of search results
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Page {
    /// Query that produced this page
    pub query: String,
    /// 1-based page number
    pub number: u32,
    /// Items in the order returned by the API
    pub items: Vec<CatalogItem>,
    /// Total number of accessible results reported by the API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_hits: Option<u64>,
}

impl Page {
    /// An empty page, the well-formed "no more results" answer
    pub fn empty(query: impl Into<String>, number: u32) -> Self {
        Self {
            query: query.into(),
            number,
            items: Vec::new(),
            total_hits: None,
        }
    }

    /// Whether another page may follow (item count equals the page size)
    pub fn is_full(&self, page_size: u32) -> bool {
        page_size > 0 && self.items.len() == page_size as usize
    }
}

/// A catalog item annotated with its ledger status
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ItemView {
    /// The item itself
    pub item: CatalogItem,
    /// Whether the ledger already holds this item's id
    pub downloaded: bool,
}

/// Search results as shown to a controller
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchResults {
    /// Query that was searched
    pub query: String,
    /// 1-based page number
    pub page: u32,
    /// Items with their ledger status
    pub items: Vec<ItemView>,
    /// A next page may exist
    pub has_next: bool,
    /// A previous page exists
    pub has_previous: bool,
    /// Total number of accessible results reported by the API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_hits: Option<u64>,
}

/// Immutable snapshot of batch settings, captured when a batch starts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BatchConfig {
    /// Search query to walk
    pub query: String,
    /// First page to process (1-based)
    pub start_page: u32,
    /// Pause between consecutive items, in whole seconds on the wire
    #[serde(with = "crate::config::duration_serde")]
    #[schema(value_type = u64)]
    pub per_item_delay: Duration,
    /// Continue with following pages once a page is done
    pub auto_advance_pages: bool,
}

/// Lifecycle state of the batch orchestrator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    /// No batch is running
    Idle,
    /// A batch is running
    Running,
    /// A stop was requested; the run exits at its next checkpoint
    Stopping,
}

/// Why a batch run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every requested page was processed
    Completed,
    /// Every item on the page was already in the ledger
    AllAlreadyDownloaded,
    /// A controller called stop
    StoppedByRequest,
    /// The last page was reached
    NoMorePages,
    /// A page could not be fetched
    FetchError,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            StopReason::Completed => "batch completed",
            StopReason::AllAlreadyDownloaded => "all items on this page already downloaded",
            StopReason::StoppedByRequest => "stopped by request",
            StopReason::NoMorePages => "stopped: no more results",
            StopReason::FetchError => "stopped: fetch error",
        };
        f.write_str(text)
    }
}

/// Outcome of a start request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BatchStart {
    /// A new run was spawned
    Started,
    /// A run is already in progress; nothing was changed
    AlreadyRunning,
}

/// Snapshot of the orchestrator for status queries
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BatchStatus {
    /// Current lifecycle state
    pub state: BatchState,
    /// Settings of the active run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<BatchConfig>,
    /// Page currently being processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u32>,
    /// Items downloaded so far in this run
    pub downloaded: u64,
    /// Items that failed so far in this run
    pub failed: u64,
    /// When the active run started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl BatchStatus {
    /// Status of an orchestrator with no active run
    pub fn idle() -> Self {
        Self {
            state: BatchState::Idle,
            config: None,
            current_page: None,
            downloaded: 0,
            failed: 0,
            started_at: None,
        }
    }
}

/// Event emitted by the downloader
///
/// This is the only channel through which the orchestrator talks to observers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A search request was sent
    Searching {
        /// Query text
        query: String,
        /// Requested page
        page: u32,
    },

    /// A search returned results
    ResultsLoaded {
        /// Query text
        query: String,
        /// Page number
        page: u32,
        /// Number of items on the page
        count: usize,
    },

    /// A batch run started
    BatchStarted {
        /// Settings captured for the run
        config: BatchConfig,
    },

    /// The batch is about to download an item
    BatchProgress {
        /// 1-based position among the page's pending items
        index: usize,
        /// Number of pending items on the page
        total: usize,
        /// Page being processed
        page: u32,
        /// Item being downloaded
        item_id: ItemId,
    },

    /// The batch is moving on to the next page
    BatchPageAdvance {
        /// Page about to be fetched
        next_page: u32,
    },

    /// A batch run reached a terminal state; Start may be offered again
    BatchDone {
        /// Why the run ended
        reason: StopReason,
        /// Items downloaded during the run
        downloaded: u64,
        /// Items that failed during the run
        failed: u64,
        /// Last page the run worked on
        last_page: u32,
    },

    /// An item was downloaded and recorded in the ledger
    ItemDownloaded {
        /// Item id
        id: ItemId,
        /// Where the payload was written
        path: PathBuf,
    },

    /// An item could not be downloaded
    ItemFailed {
        /// Item id
        id: ItemId,
        /// Error message
        error: String,
    },

    /// The current result list changed (new page or new ledger state)
    ItemsChanged {
        /// Page number of the snapshot
        page: u32,
        /// Items with their ledger status
        items: Vec<ItemView>,
    },

    /// The ledger was modified (record, import or clear)
    HistoryChanged {
        /// Number of ids in the ledger afterwards
        count: usize,
    },

    /// A reportable error (transport, configuration, persistence)
    Error {
        /// Error message
        message: String,
    },

    /// Graceful shutdown initiated
    Shutdown,
}
