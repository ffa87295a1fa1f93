// src/pipeline/sink.rs
// =============================================================================
// The two consumers of the item channel.
//
// - DownloadSink: resolves every image page to its image and downloads it,
//   with at most N downloads running at once
// - ReportSink: --dry-run; prints every image page URL, one per line
//
// Both drain the channel until the walker closes it. The download sink then
// also waits for every download it started, so when drain() returns there is
// no work left anywhere.
//
// Back-pressure in the download sink:
// - Before spawning a download the sink takes a token from the pool.
//   When all tokens are out, the sink loop waits right there, which in turn
//   stops it from pulling new items off the channel.
// =============================================================================

use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use super::download::Download;
use super::tokens::TokenPool;
use crate::error::{CrawlError, DownloadError};
use crate::extract::AssetResolver;

/// Counts reported by a finished sink.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SinkSummary {
    /// Item URLs taken off the channel
    pub items: usize,
    /// Items whose page had no usable image
    pub without_asset: usize,
    /// Downloads that were started
    pub started: usize,
    pub saved: usize,
    pub failed: usize,
}

/// Consumes the item channel until it is closed.
#[async_trait]
pub trait ItemSink: Send {
    async fn drain(&mut self, items: mpsc::Receiver<String>) -> Result<SinkSummary, CrawlError>;
}

pub struct DownloadSink {
    resolver: AssetResolver,
    downloader: Arc<dyn Download>,
    tokens: TokenPool,
}

impl DownloadSink {
    pub fn new(resolver: AssetResolver, downloader: Arc<dyn Download>, tokens: TokenPool) -> Self {
        Self {
            resolver,
            downloader,
            tokens,
        }
    }
}

#[async_trait]
impl ItemSink for DownloadSink {
    async fn drain(&mut self, mut items: mpsc::Receiver<String>) -> Result<SinkSummary, CrawlError> {
        let mut summary = SinkSummary::default();
        let mut downloads = JoinSet::new();

        while let Some(item) = items.recv().await {
            summary.items += 1;

            let Some(asset) = self.resolver.resolve(&item).await else {
                debug!(url = %item, "no image found, skipping");
                summary.without_asset += 1;
                continue;
            };

            if self.tokens.available() == Some(0) {
                debug!("all download slots busy, waiting");
            }
            // Waits here while every slot is taken
            let token = self.tokens.acquire().await?;
            let downloader = Arc::clone(&self.downloader);
            downloads.spawn(async move {
                let _token = token;
                let result = downloader.download(&asset).await;
                (asset, result)
            });
            summary.started += 1;

            while let Some(finished) = downloads.try_join_next() {
                record(&mut summary, finished);
            }
        }

        debug!(pending = downloads.len(), "item channel closed, waiting for downloads");
        while let Some(finished) = downloads.join_next().await {
            record(&mut summary, finished);
        }

        info!(
            items = summary.items,
            saved = summary.saved,
            failed = summary.failed,
            without_asset = summary.without_asset,
            "downloads finished"
        );
        Ok(summary)
    }
}

fn record(
    summary: &mut SinkSummary,
    finished: Result<(String, Result<std::path::PathBuf, DownloadError>), JoinError>,
) {
    match finished {
        Ok((_, Ok(_))) => summary.saved += 1,
        Ok((url, Err(e))) => {
            warn!(%url, error = %e, "image download failed");
            summary.failed += 1;
        }
        Err(e) => {
            warn!(error = %e, "download task died");
            summary.failed += 1;
        }
    }
}

/// Writes every item URL to `out`, one per line.
pub struct ReportSink<W> {
    out: W,
}

impl<W: Write + Send> ReportSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

#[async_trait]
impl<W: Write + Send> ItemSink for ReportSink<W> {
    async fn drain(&mut self, mut items: mpsc::Receiver<String>) -> Result<SinkSummary, CrawlError> {
        let mut summary = SinkSummary::default();

        while let Some(item) = items.recv().await {
            summary.items += 1;
            if let Err(e) = writeln!(self.out, "{}", item).and_then(|_| self.out.flush()) {
                // A closed pipe (`| head`) is a normal way to stop a dry run
                if e.kind() == std::io::ErrorKind::BrokenPipe {
                    debug!("output closed, stopping");
                } else {
                    warn!(error = %e, "could not write item URL");
                }
                break;
            }
        }

        Ok(summary)
    }
}
