// src/crawl/walker.rs
// =============================================================================
// This module walks the gallery's listing pages, one after the other.
//
// How it works:
// 1. Fetch the current listing page
// 2. Send every image page link on it down the item channel, in order
// 3. Look for the "next page" link
// 4. Stop if there is none, or if it points back at the current page;
//    otherwise make it the current page and repeat
//
// The walker owns the sending half of the channel. When walk() returns, for
// any reason, the sender is dropped and the channel closes. That close is the
// only "no more items" signal the rest of the pipeline gets.
//
// Back-pressure:
// - The channel holds a single item, so send() waits until the sink has
//   taken the previous one. The walker never runs far ahead of the sink.
//
// Rust concepts:
// - mpsc::Sender: The producing side of a tokio channel
// - Ownership: Moving the sender in means dropping it closes the channel
// =============================================================================

use scraper::Html;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::CrawlError;
use crate::extract::{resolve_link, SiteRules};
use crate::fetch::Fetch;

/// Counts reported by a finished walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkSummary {
    /// Listing pages fetched
    pub pages: usize,
    /// Item URLs sent down the channel
    pub items: usize,
}

// What we extracted from one listing page
#[derive(Debug)]
struct ListingPage {
    items: Vec<String>,
    next: Option<String>,
}

pub struct PaginationWalker {
    fetcher: Arc<dyn Fetch>,
    rules: Arc<SiteRules>,
    base_url: Url,
}

impl PaginationWalker {
    pub fn new(fetcher: Arc<dyn Fetch>, rules: Arc<SiteRules>, base_url: Url) -> Self {
        Self {
            fetcher,
            rules,
            base_url,
        }
    }

    /// Walks every listing page starting at `seed`, sending item URLs to `items`.
    ///
    /// A listing page that can't be fetched is fatal: without it we can't
    /// know what comes next.
    pub async fn walk(&self, seed: String, items: mpsc::Sender<String>) -> Result<WalkSummary, CrawlError> {
        let mut summary = WalkSummary::default();
        let mut current = seed;

        loop {
            info!(page = summary.pages + 1, url = %current, "fetching links");

            let html = self
                .fetcher
                .fetch(&current)
                .await
                .map_err(|source| CrawlError::ListingPage {
                    url: current.clone(),
                    source,
                })?;
            summary.pages += 1;

            let page = self.parse_listing(&html);

            for item in page.items {
                if items.send(item).await.is_err() {
                    warn!("item consumer stopped early, ending the walk");
                    return Ok(summary);
                }
                summary.items += 1;
            }

            match page.next {
                None => {
                    debug!(url = %current, "no next page");
                    break;
                }
                Some(next) if same_page(&next, &current) => {
                    debug!(url = %current, "next page points to itself");
                    break;
                }
                Some(next) => current = next,
            }
        }

        info!(pages = summary.pages, items = summary.items, "pagination finished");
        Ok(summary)
    }

    // Html isn't Send, so parsing stays in this synchronous helper and only
    // owned Strings come out of it.
    fn parse_listing(&self, html: &str) -> ListingPage {
        let document = Html::parse_document(html);

        let items = self
            .rules
            .item_links
            .extract(&document)
            .into_iter()
            .filter_map(|href| {
                let item = resolve_link(&self.base_url, &href);
                if item.is_none() {
                    debug!(%href, "item link is not an http(s) link, skipping");
                }
                item
            })
            .collect();

        let next = self
            .rules
            .next_page
            .last(&document)
            .and_then(|href| resolve_link(&self.base_url, &href));

        ListingPage { items, next }
    }
}

// Compares two page URLs in their parsed form, so "http://nagi.ee" and
// "http://NAGI.ee:80/" count as the same page
fn same_page(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
