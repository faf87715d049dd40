//! Catalog client: search the remote video catalog one page at a time
//!
//! [`CatalogClient`] is the seam the downloader depends on. [`PixabayClient`]
//! is the production implementation talking to the Pixabay video API.

use crate::config::CatalogConfig;
use crate::error::{Error, Result};
use crate::types::{CatalogItem, ItemId, Page, Variant};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Marker in the body of the API's 400 answer for a page past the last one
const OUT_OF_RANGE_MARKER: &str = "out of valid range";

/// Source of search result pages
///
/// Implementations must answer a legitimately exhausted query with an empty
/// [`Page`], and reserve `Err` for transport, authorization and protocol
/// failures.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch one page of results for `query`
    async fn fetch_page(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
        safe_search: bool,
    ) -> Result<Page>;
}

/// Pixabay video search API client
pub struct PixabayClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    video_type: String,
}

impl PixabayClient {
    /// Create a client for `api_key` using the endpoint and timeout from `config`
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(api_key: impl Into<String>, config: &CatalogConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("pixabay-dl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
            api_key: api_key.into(),
            video_type: config.video_type.clone(),
        })
    }

    fn page_url(&self, query: &str, page: u32, page_size: u32, safe_search: bool) -> Result<url::Url> {
        let page = page.to_string();
        let per_page = page_size.to_string();
        url::Url::parse_with_params(
            &self.base_url,
            [
                ("key", self.api_key.as_str()),
                ("q", query),
                ("page", page.as_str()),
                ("per_page", per_page.as_str()),
                ("safesearch", if safe_search { "true" } else { "false" }),
                ("video_type", self.video_type.as_str()),
            ],
        )
        .map_err(|e| Error::config(format!("invalid catalog base URL: {e}"), "catalog.base_url"))
    }
}

#[async_trait]
impl CatalogClient for PixabayClient {
    async fn fetch_page(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
        safe_search: bool,
    ) -> Result<Page> {
        let url = self.page_url(query, page, page_size, safe_search)?;
        debug!(query, page, page_size, "Fetching catalog page");

        let response = self.http_client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::BAD_REQUEST && body.contains(OUT_OF_RANGE_MARKER) {
                debug!(query, page, "Page past the end of results");
                return Ok(Page::empty(query, page));
            }
            return Err(Error::Api {
                status: status.as_u16(),
                message: body.trim().to_string(),
            });
        }

        let body: SearchResponse = response.json().await?;
        let items: Vec<CatalogItem> = body.hits.into_iter().map(CatalogItem::from).collect();
        debug!(query, page, count = items.len(), total_hits = body.total_hits, "Catalog page received");

        Ok(Page {
            query: query.to_string(),
            number: page,
            items,
            total_hits: Some(body.total_hits),
        })
    }
}

/// Wire format of a search response
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "totalHits", default)]
    total_hits: u64,
    #[serde(default)]
    hits: Vec<Hit>,
}

/// Wire format of one search hit
#[derive(Debug, Deserialize)]
struct Hit {
    id: ItemId,
    #[serde(default)]
    duration: u64,
    #[serde(default)]
    tags: String,
    #[serde(rename = "pageURL", default)]
    page_url: String,
    #[serde(default, deserialize_with = "picture_id")]
    picture_id: Option<String>,
    #[serde(default)]
    videos: BTreeMap<String, Variant>,
}

impl From<Hit> for CatalogItem {
    fn from(hit: Hit) -> Self {
        CatalogItem {
            id: hit.id,
            duration_seconds: hit.duration,
            tags: hit.tags,
            page_url: hit.page_url,
            picture_id: hit.picture_id,
            variants: hit.videos,
        }
    }
}

// The API has sent picture_id both as a string and as a number
fn picture_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<ItemId>::deserialize(deserializer)?.map(|id| id.0))
}
