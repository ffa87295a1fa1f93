// src/extract/asset.rs
// =============================================================================
// Turns an image page URL into the URL of the image file itself.
//
// How it works:
// 1. Fetch the image page
// 2. If the page offers size variants, follow the one for the configured
//    size (the original) to its detail page
// 3. On the detail page, read the image next to the first table
//
// Every failure along the way (page not reachable, variant missing, image
// missing) ends in None. One broken page never stops the crawl.
// =============================================================================

use scraper::Html;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use super::rules::{resolve_link, SiteRules};
use crate::config::ImageSize;
use crate::fetch::Fetch;

/// What an image page told us.
enum ItemPage {
    /// The page links to a detail page for the wanted size
    Variant(String),
    /// The page lists sizes, but not the one we want
    NoMatchingVariant,
    /// No size list at all: the image (if any) is on this page
    Direct(Option<String>),
}

pub struct AssetResolver {
    fetcher: Arc<dyn Fetch>,
    rules: Arc<SiteRules>,
    base_url: Url,
    size: ImageSize,
}

impl AssetResolver {
    pub fn new(fetcher: Arc<dyn Fetch>, rules: Arc<SiteRules>, base_url: Url, size: ImageSize) -> Self {
        Self {
            fetcher,
            rules,
            base_url,
            size,
        }
    }

    /// Resolves `item_url` to an absolute image URL, or None.
    pub async fn resolve(&self, item_url: &str) -> Option<String> {
        let html = self.fetch_or_log(item_url).await?;

        let page_url = match self.inspect_item_page(item_url, &html) {
            ItemPage::Direct(asset) => return asset,
            ItemPage::NoMatchingVariant => {
                debug!(url = %item_url, size = ?self.size, "no link for the requested size");
                return None;
            }
            ItemPage::Variant(url) => url,
        };

        let html = self.fetch_or_log(&page_url).await?;
        self.asset_on_page(&page_url, &html)
    }

    async fn fetch_or_log(&self, url: &str) -> Option<String> {
        match self.fetcher.fetch(url).await {
            Ok(html) => Some(html),
            Err(e) => {
                warn!(%url, error = %e, "could not open image page");
                None
            }
        }
    }

    fn inspect_item_page(&self, item_url: &str, html: &str) -> ItemPage {
        let document = Html::parse_document(html);
        let variants = self.rules.size_variants.extract(&document);

        if variants.is_empty() {
            return ItemPage::Direct(self.asset_in_document(item_url, &document));
        }

        let marker = self.size.query_marker();
        variants
            .iter()
            .filter(|href| href.contains(marker))
            .find_map(|href| resolve_link(&self.base_url, href))
            .map_or(ItemPage::NoMatchingVariant, ItemPage::Variant)
    }

    fn asset_on_page(&self, page_url: &str, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        self.asset_in_document(page_url, &document)
    }

    // The image src may be relative to the page it sits on
    fn asset_in_document(&self, page_url: &str, document: &Html) -> Option<String> {
        let src = self.rules.asset.extract(document)?;
        let page = Url::parse(page_url).unwrap_or_else(|_| self.base_url.clone());
        let asset = resolve_link(&page, &src);
        if asset.is_none() {
            debug!(url = %page_url, %src, "image source is not an http(s) link");
        }
        asset
    }
}
