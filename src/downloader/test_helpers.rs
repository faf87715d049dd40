//! Shared test helpers for creating PixabayDownloader instances in tests.

use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::downloader::PixabayDownloader;
use crate::error::{Error, Result};
use crate::fetcher::AssetFetcher;
use crate::types::{CatalogItem, Event, ItemId, Page, Variant};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

/// Page size used by test downloaders
pub(crate) const TEST_PAGE_SIZE: u32 = 3;

/// Build an item whose only variant is `label`, at `https://cdn.test/{id}/{label}.mp4`
pub(crate) fn item_with_variant(id: &str, label: &str) -> CatalogItem {
    let mut variants = BTreeMap::new();
    variants.insert(
        label.to_string(),
        Variant {
            url: asset_url(id, label),
            width: 1920,
            height: 1080,
            size: 1024,
            thumbnail: None,
        },
    );

    CatalogItem {
        id: ItemId::new(id),
        duration_seconds: 10,
        tags: "test".to_string(),
        page_url: format!("https://pixabay.com/videos/id-{id}/"),
        picture_id: None,
        variants,
    }
}

/// Build a downloadable item with a single "large" variant
pub(crate) fn item(id: &str) -> CatalogItem {
    item_with_variant(id, "large")
}

/// Build an item with no variants at all
pub(crate) fn item_without_variants(id: &str) -> CatalogItem {
    let mut item = item(id);
    item.variants.clear();
    item
}

/// URL used by test items
pub(crate) fn asset_url(id: &str, label: &str) -> String {
    format!("https://cdn.test/{id}/{label}.mp4")
}

/// Build `count` items with ids `{prefix}{n}`
pub(crate) fn items(prefix: &str, count: usize) -> Vec<CatalogItem> {
    (1..=count).map(|n| item(&format!("{prefix}{n}"))).collect()
}

/// Scripted answer of the stub catalog for one page
#[derive(Clone)]
pub(crate) enum StubPage {
    Items(Vec<CatalogItem>),
    Fail,
}

/// Catalog returning scripted pages; unscripted pages are empty
#[derive(Default)]
pub(crate) struct StubCatalog {
    pages: Mutex<HashMap<u32, StubPage>>,
    calls: Mutex<Vec<(String, u32)>>,
    gate: Option<Gate>,
}

impl StubCatalog {
    /// A catalog whose fetches block until [`release_one`](Self::release_one)
    pub(crate) fn gated() -> Self {
        Self {
            gate: Some(Gate::new()),
            ..Self::default()
        }
    }

    /// Wait until a gated fetch has started
    pub(crate) async fn wait_entered(&self) {
        if let Some(gate) = &self.gate {
            gate.wait_entered().await;
        }
    }

    pub(crate) fn set_page(&self, page: u32, items: Vec<CatalogItem>) {
        self.pages
            .lock()
            .unwrap()
            .insert(page, StubPage::Items(items));
    }

    pub(crate) fn fail_page(&self, page: u32) {
        self.pages.lock().unwrap().insert(page, StubPage::Fail);
    }

    /// `(query, page)` of every fetch, in order
    pub(crate) fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogClient for StubCatalog {
    async fn fetch_page(
        &self,
        query: &str,
        page: u32,
        _page_size: u32,
        _safe_search: bool,
    ) -> Result<Page> {
        self.calls.lock().unwrap().push((query.to_string(), page));
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        let scripted = self.pages.lock().unwrap().get(&page).cloned();
        match scripted {
            Some(StubPage::Items(items)) => Ok(Page {
                query: query.to_string(),
                number: page,
                items,
                total_hits: None,
            }),
            Some(StubPage::Fail) => Err(Error::Api {
                status: 500,
                message: "scripted failure".to_string(),
            }),
            None => Ok(Page::empty(query, page)),
        }
    }
}

/// Fetcher writing a tiny file instantly, failing for selected URLs
#[derive(Default)]
pub(crate) struct StubFetcher {
    fail_urls: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    gate: Option<Gate>,
}

/// Holds every call until the test releases it
pub(crate) struct Gate {
    entered: tokio::sync::Notify,
    release: tokio::sync::Semaphore,
}

impl Gate {
    fn new() -> Self {
        Self {
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Semaphore::new(0),
        }
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.acquire().await.unwrap().forget();
    }

    async fn wait_entered(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.entered.notified())
            .await
            .expect("gated call never started");
    }
}

impl StubFetcher {
    /// A fetcher whose transfers block until [`release_one`](Self::release_one)
    pub(crate) fn gated() -> Self {
        Self {
            gate: Some(Gate::new()),
            ..Self::default()
        }
    }

    pub(crate) fn fail_url(&self, url: impl Into<String>) {
        self.fail_urls.lock().unwrap().insert(url.into());
    }

    /// URLs of every transfer attempt, in order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Wait until a gated transfer has started
    pub(crate) async fn wait_entered(&self) {
        if let Some(gate) = &self.gate {
            gate.wait_entered().await;
        }
    }

    /// Let one gated transfer finish
    pub(crate) fn release_one(&self) {
        if let Some(gate) = &self.gate {
            gate.release.add_permits(1);
        }
    }
}

#[async_trait]
impl AssetFetcher for StubFetcher {
    async fn download_to_file(&self, url: &str, destination: &Path) -> Result<u64> {
        self.calls.lock().unwrap().push(url.to_string());

        if let Some(gate) = &self.gate {
            gate.pass().await;
        }

        if self.fail_urls.lock().unwrap().contains(url) {
            return Err(Error::AssetStatus {
                url: url.to_string(),
                status: 404,
            });
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, url.as_bytes()).await?;
        Ok(url.len() as u64)
    }
}

/// A configuration rooted in `dir` with no pacing delays
pub(crate) fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.api_key = "test-key".to_string();
    config.catalog.page_size = TEST_PAGE_SIZE;
    config.download.download_dir = dir.join("downloads");
    config.download.per_item_delay = Duration::ZERO;
    config.download.page_settle_delay = Duration::ZERO;
    config.persistence.history_path = dir.join("history.json");
    config
}

/// Test downloader wired to stub collaborators
pub(crate) struct TestDownloader {
    pub(crate) downloader: PixabayDownloader,
    pub(crate) catalog: Arc<StubCatalog>,
    pub(crate) fetcher: Arc<StubFetcher>,
    pub(crate) temp_dir: tempfile::TempDir,
}

/// Helper to create a test PixabayDownloader with stub catalog and fetcher.
pub(crate) async fn create_test_downloader() -> TestDownloader {
    create_test_downloader_with(StubFetcher::default(), |_| {}).await
}

/// Like [`create_test_downloader`], with a custom fetcher and config tweaks.
pub(crate) async fn create_test_downloader_with(
    fetcher: StubFetcher,
    configure: impl FnOnce(&mut Config),
) -> TestDownloader {
    create_test_downloader_with_catalog(StubCatalog::default(), fetcher, configure).await
}

/// Like [`create_test_downloader_with`], with a custom catalog as well.
pub(crate) async fn create_test_downloader_with_catalog(
    catalog: StubCatalog,
    fetcher: StubFetcher,
    configure: impl FnOnce(&mut Config),
) -> TestDownloader {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    configure(&mut config);

    let catalog = Arc::new(catalog);
    let fetcher = Arc::new(fetcher);
    let downloader =
        PixabayDownloader::with_collaborators(config, catalog.clone(), fetcher.clone()).await;

    TestDownloader {
        downloader,
        catalog,
        fetcher,
        temp_dir,
    }
}

/// Receive events until `BatchDone`, returning everything seen (BatchDone last)
pub(crate) async fn collect_until_done(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
) -> Vec<Event> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for BatchDone")
            .expect("event channel closed");
        let done = matches!(event, Event::BatchDone { .. });
        events.push(event);
        if done {
            return events;
        }
    }
}

/// The `BatchDone` event at the end of `events`
pub(crate) fn done_event(events: &[Event]) -> &Event {
    events.last().expect("no events")
}
