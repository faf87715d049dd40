//! Asset fetcher: stream a remote file to disk
//!
//! Payloads are written chunk by chunk to a `.part` sibling and renamed into
//! place only once the body has been read completely. A failed transfer never
//! leaves a file at the destination path.

use crate::error::{Error, Result};
use crate::utils::partial_path;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Downloads a single URL to a file
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Stream `url` into `destination`, returning the number of bytes written
    ///
    /// An existing file at `destination` is replaced.
    async fn download_to_file(&self, url: &str, destination: &Path) -> Result<u64>;
}

/// HTTP implementation of [`AssetFetcher`]
#[derive(Clone)]
pub struct HttpAssetFetcher {
    http_client: reqwest::Client,
}

impl HttpAssetFetcher {
    /// Create a fetcher whose connection attempts time out after `connect_timeout`
    ///
    /// No overall timeout is applied: large videos may legitimately take long.
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("pixabay-dl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    async fn stream_to(&self, url: &str, part: &Path) -> Result<u64> {
        let mut response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::AssetStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let write_err = |source| Error::Write {
            path: part.to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::create(part).await.map_err(write_err)?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await.map_err(write_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_err)?;

        Ok(written)
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn download_to_file(&self, url: &str, destination: &Path) -> Result<u64> {
        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| Error::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let part = partial_path(destination);
        let written = match self.stream_to(url, &part).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e);
            }
        };

        if let Err(source) = tokio::fs::rename(&part, destination).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(Error::Write {
                path: destination.to_path_buf(),
                source,
            });
        }

        debug!(url, path = %destination.display(), bytes = written, "Asset downloaded");
        Ok(written)
    }
}
