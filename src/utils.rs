//! Utility functions for file handling

use crate::error::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Sibling path used while a file is being written, `name.ext.part`
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "download".into());
    name.push(".part");
    path.with_file_name(name)
}

/// Serialize `value` as pretty JSON and replace `path` atomically
///
/// The content is written to a `.part` sibling first and renamed over the
/// target, so readers never observe a half-written file. Parent directories
/// are created as needed.
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| Error::Write {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let tmp = partial_path(path);
    tokio::fs::write(&tmp, &json)
        .await
        .map_err(|source| Error::Write {
            path: tmp.clone(),
            source,
        })?;

    if let Err(source) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(Error::Write {
            path: path.to_path_buf(),
            source,
        });
    }

    Ok(())
}
