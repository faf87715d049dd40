//! Single-item downloads.
//!
//! [`PixabayDownloader::download_single`] is the interactive entry point and
//! reports failures to its caller. The batch orchestrator uses the same
//! [`fetch_item`](PixabayDownloader::fetch_item) pipeline but only logs them.

use crate::error::{Error, Result};
use crate::types::{CatalogItem, Event, ItemId};
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use super::PixabayDownloader;

impl PixabayDownloader {
    /// Download one item now, outside any batch
    ///
    /// Without `destination` the file lands at `{download_dir}/{prefix}-{id}.mp4`;
    /// repeating the download overwrites that file. On success the id is
    /// recorded in the history ledger.
    ///
    /// # Errors
    ///
    /// Every failure is returned: [`Error::NoVariant`] when the item has no
    /// usable rendition, transport or write errors otherwise.
    pub async fn download_single(
        &self,
        item: &CatalogItem,
        destination: Option<PathBuf>,
    ) -> Result<PathBuf> {
        if !self.batch.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        match self.fetch_item(item, destination).await {
            Ok(path) => Ok(path),
            Err(e) => {
                self.emit_event(Event::ItemFailed {
                    id: item.id.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Download an item of the current result set by id
    pub async fn download_result(
        &self,
        id: &ItemId,
        destination: Option<PathBuf>,
    ) -> Result<PathBuf> {
        let item = {
            let results = self.last_results.read().await;
            results
                .as_ref()
                .and_then(|page| page.items.iter().find(|item| &item.id == id).cloned())
        };

        match item {
            Some(item) => self.download_single(&item, destination).await,
            None => Err(Error::NotFound(format!(
                "item {} is not in the current results",
                id
            ))),
        }
    }

    /// Select a variant, stream it to disk and record the id
    ///
    /// The id is claimed for the whole transfer; a concurrent download of the
    /// same id fails with [`Error::InProgress`].
    ///
    /// The ledger write happens before `ItemDownloaded` is emitted. A ledger
    /// persistence failure is reported as an `Error` event but does not fail
    /// the download: the file is on disk and the id is in memory.
    pub(crate) async fn fetch_item(
        &self,
        item: &CatalogItem,
        destination: Option<PathBuf>,
    ) -> Result<PathBuf> {
        let download = &self.config.download;

        let _claim = self.in_flight.claim(&item.id).ok_or_else(|| Error::InProgress {
            id: item.id.to_string(),
        })?;

        let (label, variant) =
            item.select_variant(&download.variant_priority)
                .ok_or_else(|| Error::NoVariant {
                    id: item.id.to_string(),
                })?;

        let path = destination.unwrap_or_else(|| {
            download
                .download_dir
                .join(item.file_name(&download.filename_prefix))
        });

        tracing::debug!(item_id = %item.id, variant = label, url = %variant.url, "Downloading item");
        let bytes = self.fetcher.download_to_file(&variant.url, &path).await?;

        if let Err(e) = self.history.record(item.id.as_str()).await {
            self.emit_event(Event::Error {
                message: format!("failed to save download history: {}", e),
            });
        }

        tracing::info!(item_id = %item.id, path = %path.display(), bytes, "Item downloaded");
        self.emit_event(Event::ItemDownloaded {
            id: item.id.clone(),
            path: path.clone(),
        });

        Ok(path)
    }
}
