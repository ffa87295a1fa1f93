// src/fetch/http.rs
// =============================================================================
// Fetches pages over HTTP(S) with reqwest.
//
// One Client is built per run and shared by the fetcher and the downloader
// (Client is a cheap handle around a connection pool, so cloning it is fine).
//
// No request timeout is configured: a server that never answers stalls only
// the task waiting on it.
// =============================================================================

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::Fetch;
use crate::error::FetchError;

/// Builds the HTTP client used for every request of a run.
pub fn build_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Fetch implementation backed by a reqwest Client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let html = response.text().await?;
        Ok(html)
    }
}
