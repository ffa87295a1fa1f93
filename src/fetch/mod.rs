// src/fetch/mod.rs
// =============================================================================
// This module retrieves HTML pages.
//
// Both the pagination walker and the asset resolver need "give me the page
// at this URL". They only see the Fetch trait, so tests can hand them an
// in-memory set of pages instead of a real server.
//
// Parsing is not part of this trait: scraper's Html type can't
// be sent between threads, so callers parse the returned text inside a plain
// (non-async) block and keep only the Strings they extract.
// =============================================================================

mod http;

use async_trait::async_trait;

use crate::error::FetchError;

pub use http::{build_client, HttpFetcher};

/// Retrieves the body of a page.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// A fixed set of pages keyed by URL. Records every URL it was asked for.
    #[derive(Default)]
    pub struct StaticPages {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl StaticPages {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetch for StaticPages {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::NotFound(url.to_string()))
        }
    }
}
