//! Download history ledger
//!
//! The ledger is the set of item ids that have already been downloaded. It is
//! the single source of truth for "already downloaded": the batch filter, the
//! result snapshots, and the controller's counter all read it.
//!
//! The set lives in memory behind a `RwLock` so readers (`count`, `contains`)
//! never wait on disk I/O. Every mutation rewrites the whole JSON array on disk
//! and emits [`Event::HistoryChanged`]. Mutations are serialized by an async
//! mutex so that concurrent writers persist in the same order they mutate.
//!
//! A failed write is reported to the caller but the in-memory change stands:
//! forgetting a download is worse than re-downloading it once.

use crate::error::{Error, Result};
use crate::types::{CatalogItem, Event};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

/// Persistent set of downloaded item ids
pub struct HistoryLedger {
    path: PathBuf,
    ids: RwLock<HashSet<String>>,
    write_lock: tokio::sync::Mutex<()>,
    event_tx: broadcast::Sender<Event>,
}

impl HistoryLedger {
    /// Open the ledger stored at `path`
    ///
    /// A missing or malformed file yields an empty ledger. Change notifications
    /// are sent on `event_tx`.
    pub async fn open(path: impl Into<PathBuf>, event_tx: broadcast::Sender<Event>) -> Self {
        let path = path.into();
        let ids = Self::read_ids(&path).await;
        tracing::info!(path = %path.display(), count = ids.len(), "History ledger loaded");

        Self {
            path,
            ids: RwLock::new(ids),
            write_lock: tokio::sync::Mutex::new(()),
            event_tx,
        }
    }

    /// Read persisted ids, treating any failure as "no history"
    pub async fn read_ids(path: &Path) -> HashSet<String> {
        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashSet::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read history, starting empty");
                return HashSet::new();
            }
        };

        match parse_id_array(&content) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Malformed history, starting empty");
                HashSet::new()
            }
        }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `id` has been downloaded
    pub fn contains(&self, id: &str) -> bool {
        self.read().contains(id)
    }

    /// Number of recorded ids
    pub fn count(&self) -> usize {
        self.read().len()
    }

    /// Sorted copy of all recorded ids
    pub fn snapshot(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Items whose id is not in the ledger, in their original order
    pub fn pending(&self, items: &[CatalogItem]) -> Vec<CatalogItem> {
        let ids = self.read();
        items
            .iter()
            .filter(|item| !ids.contains(item.id.as_str()))
            .cloned()
            .collect()
    }

    /// Record a downloaded id and persist the ledger
    ///
    /// Returns `Ok(false)` when the id was already present; nothing is written
    /// in that case.
    pub async fn record(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let inserted = self.write().insert(id.to_string());
        if !inserted {
            return Ok(false);
        }

        let result = self.persist_locked().await;
        self.notify_changed();
        result.map(|()| true)
    }

    /// Merge ids from a JSON array file into the ledger (union)
    ///
    /// Accepts string and integer ids. Returns how many ids were new. Unlike
    /// startup loading, an unreadable or malformed import file is an error.
    pub async fn import(&self, source: &Path) -> Result<usize> {
        let content = tokio::fs::read(source).await?;
        let incoming = parse_id_array(&content)?;
        self.merge(incoming).await
    }

    /// Merge already-parsed ids into the ledger (union), returning how many were new
    pub async fn merge(&self, incoming: impl IntoIterator<Item = String>) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let added = {
            let mut ids = self.write();
            let before = ids.len();
            ids.extend(incoming);
            ids.len() - before
        };

        let result = self.persist_locked().await;
        self.notify_changed();
        tracing::info!(added, total = self.count(), "History imported");
        result.map(|()| added)
    }

    /// Write the ledger to `destination` in the persisted format
    pub async fn export(&self, destination: &Path) -> Result<usize> {
        let ids = self.snapshot();
        crate::utils::write_json_atomic(destination, &ids).await?;
        tracing::info!(path = %destination.display(), count = ids.len(), "History exported");
        Ok(ids.len())
    }

    /// Forget every recorded id and persist the empty ledger
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        self.write().clear();

        let result = self.persist_locked().await;
        self.notify_changed();
        tracing::info!("History cleared");
        result
    }

    /// Rewrite the backing file; caller holds `write_lock`
    async fn persist_locked(&self) -> Result<()> {
        let ids = self.snapshot();
        crate::utils::write_json_atomic(&self.path, &ids)
            .await
            .inspect_err(|e| {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to persist history");
            })
    }

    fn notify_changed(&self) {
        self.event_tx
            .send(Event::HistoryChanged {
                count: self.count(),
            })
            .ok();
    }

    fn read(&self) -> RwLockReadGuard<'_, HashSet<String>> {
        self.ids.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashSet<String>> {
        self.ids.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Parse a JSON array of ids; numbers are converted to their string form
fn parse_id_array(content: &[u8]) -> Result<HashSet<String>> {
    let values: Vec<serde_json::Value> = serde_json::from_slice(content)?;
    let mut ids = HashSet::with_capacity(values.len());
    for value in values {
        match value {
            serde_json::Value::String(s) => {
                ids.insert(s);
            }
            serde_json::Value::Number(n) => {
                ids.insert(n.to_string());
            }
            other => {
                return Err(Error::Other(format!(
                    "history entries must be strings or numbers, found {other}"
                )));
            }
        }
    }
    Ok(ids)
}
