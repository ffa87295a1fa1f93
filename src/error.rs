// src/error.rs
// =============================================================================
// Typed errors for the three layers that can fail:
// - FetchError: a page could not be retrieved
// - CrawlError: the run itself cannot continue (fatal)
// - DownloadError: one image could not be saved (recoverable)
//
// Only CrawlError ever reaches main(). The other two are logged by whoever
// receives them and the run moves on.
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

/// A page could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, connect, TLS, ...)
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-2xx status
    #[error("HTTP {0}")]
    Status(u16),

    /// Only used by in-memory fetchers in tests
    #[cfg(test)]
    #[error("no such page: {0}")]
    NotFound(String),
}

/// Errors that abort the whole run.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("could not fetch listing page {url}: {source}")]
    ListingPage {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("download slots were closed while the crawl was running")]
    TokenPoolClosed,

    #[error("{0} task failed: {1}")]
    Task(&'static str, #[source] tokio::task::JoinError),
}

/// One image could not be saved. The run continues.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("no file name in {0}")]
    NoFileName(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("could not create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not sync {path}: {source}")]
    Sync {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
