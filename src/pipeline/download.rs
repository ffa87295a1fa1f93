// src/pipeline/download.rs
// =============================================================================
// Saves one image to disk.
//
// The file name is the last path segment of the image URL, so
//   http://img.nagi.ee/full/cat.jpg  ->  <directory>/cat.jpg
// An existing file with that name is overwritten.
//
// The body is streamed chunk by chunk into the file, then flushed and synced
// before we report success. Any failure comes back as a DownloadError; the
// caller logs it and carries on with the other images.
// =============================================================================

use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::DownloadError;

/// Transfers one image to local storage.
#[async_trait]
pub trait Download: Send + Sync {
    /// Returns the path the image was written to.
    async fn download(&self, asset_url: &str) -> Result<PathBuf, DownloadError>;
}

pub struct HttpDownloader {
    client: Client,
    directory: PathBuf,
}

impl HttpDownloader {
    pub fn new(client: Client, directory: impl Into<PathBuf>) -> Self {
        Self {
            client,
            directory: directory.into(),
        }
    }
}

#[async_trait]
impl Download for HttpDownloader {
    async fn download(&self, asset_url: &str) -> Result<PathBuf, DownloadError> {
        let destination = destination_for(&self.directory, asset_url)
            .ok_or_else(|| DownloadError::NoFileName(asset_url.to_string()))?;

        debug!(url = %asset_url, path = %destination.display(), "downloading");
        let mut response = self.client.get(asset_url).send().await?;
        if !response.status().is_success() {
            return Err(DownloadError::Status(response.status().as_u16()));
        }

        let mut file = File::create(&destination)
            .await
            .map_err(|source| DownloadError::Create {
                path: destination.clone(),
                source,
            })?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)
                .await
                .map_err(|source| DownloadError::Write {
                    path: destination.clone(),
                    source,
                })?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|source| DownloadError::Write {
            path: destination.clone(),
            source,
        })?;
        file.sync_all().await.map_err(|source| DownloadError::Sync {
            path: destination.clone(),
            source,
        })?;

        info!(path = %destination.display(), bytes = written, "saved");
        Ok(destination)
    }
}

/// Where an image URL ends up inside `directory`.
///
/// Uses the last non-empty path segment of the URL; None when there is none
/// (e.g. "http://host/").
pub fn destination_for(directory: &Path, asset_url: &str) -> Option<PathBuf> {
    let url = Url::parse(asset_url).ok()?;
    let name = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    // Refuse names that would step outside the directory
    if name == "." || name == ".." {
        return None;
    }
    Some(directory.join(name))
}
