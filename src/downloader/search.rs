//! Catalog search and the page fetch path shared with the batch orchestrator.

use crate::error::Result;
use crate::types::{Event, ItemView, Page, SearchResults};

use super::PixabayDownloader;

impl PixabayDownloader {
    /// Search the catalog and make the page the current result set
    ///
    /// `page` is 1-based; 0 is treated as 1. Fails with a configuration error,
    /// before any request is sent, when no API key is configured.
    pub async fn search(&self, query: &str, page: u32) -> Result<SearchResults> {
        self.config.require_api_key()?;

        let page = self.load_page(query.trim(), page.max(1)).await?;
        Ok(self.annotate(&page))
    }

    /// The current result set with up-to-date ledger flags, if a page was loaded
    pub async fn current_results(&self) -> Option<SearchResults> {
        let results = self.last_results.read().await;
        results.as_ref().map(|page| self.annotate(page))
    }

    /// Fetch a page, make it current, and announce it
    ///
    /// Emits `Searching` before the request, then `ResultsLoaded` and
    /// `ItemsChanged` on success or `Error` on failure. Interactive search and
    /// batch page advances both go through here.
    pub(crate) async fn load_page(&self, query: &str, page: u32) -> Result<Page> {
        self.emit_event(Event::Searching {
            query: query.to_string(),
            page,
        });

        let catalog = &self.config.catalog;
        let fetched = match self
            .catalog
            .fetch_page(query, page, catalog.page_size, catalog.safe_search)
            .await
        {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(query, page, error = %e, "Catalog fetch failed");
                self.emit_event(Event::Error {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        tracing::info!(query, page, count = fetched.items.len(), "Results loaded");
        self.emit_event(Event::ResultsLoaded {
            query: query.to_string(),
            page,
            count: fetched.items.len(),
        });

        *self.last_results.write().await = Some(fetched.clone());
        self.emit_items_changed(&fetched);

        Ok(fetched)
    }

    /// Announce the ledger status of `page` to observers
    pub(crate) fn emit_items_changed(&self, page: &Page) {
        let results = self.annotate(page);
        self.emit_event(Event::ItemsChanged {
            page: results.page,
            items: results.items,
        });
    }

    /// Pair each item of `page` with its ledger status
    pub(crate) fn annotate(&self, page: &Page) -> SearchResults {
        let items = page
            .items
            .iter()
            .map(|item| ItemView {
                downloaded: self.history.contains(item.id.as_str()),
                item: item.clone(),
            })
            .collect();

        SearchResults {
            query: page.query.clone(),
            page: page.number,
            items,
            has_next: page.is_full(self.config.catalog.page_size),
            has_previous: page.number > 1,
            total_hits: page.total_hits,
        }
    }
}
