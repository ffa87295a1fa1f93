// src/extract/rules.rs
// =============================================================================
// Site-specific extraction rules.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
//
// Everything that depends on the gallery's markup is in this file. The rest
// of the program only asks "give me the item links", "give me the next page",
// "give me the image", so pointing the tool at a different site means writing
// a different SiteRules and nothing else.
//
// Rust concepts:
// - Option<T>: A missing link is a normal outcome, not an error
// - Iterators: find_map / filter_map to walk matching elements
// =============================================================================

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::error::CrawlError;

/// Selects elements and reads one attribute from each of them.
#[derive(Debug, Clone)]
pub struct LinkRule {
    name: &'static str,
    selector: Selector,
    attr: &'static str,
}

impl LinkRule {
    pub fn new(name: &'static str, selector: &str, attr: &'static str) -> Result<Self, CrawlError> {
        Ok(Self {
            name,
            selector: parse_selector(selector)?,
            attr,
        })
    }

    /// Returns the attribute of every matching element, in document order.
    ///
    /// Elements that match but lack the attribute are skipped.
    pub fn extract(&self, document: &Html) -> Vec<String> {
        document
            .select(&self.selector)
            .filter_map(|element| {
                let value = element.value().attr(self.attr);
                if value.is_none() {
                    debug!(rule = self.name, attr = self.attr, "attribute not found, skipping");
                }
                value.map(str::to_string)
            })
            .collect()
    }

    /// Like `extract`, but keeps only the last hit.
    ///
    /// Pages with a pager above and below the list agree in practice; when
    /// they don't, the bottom one wins.
    pub fn last(&self, document: &Html) -> Option<String> {
        self.extract(document).pop()
    }
}

/// Finds the image that sits next to the first container element.
///
/// On a detail page the full-size image lives inside the same block as the
/// first table, so we climb to the table's parent and look for an image there.
#[derive(Debug, Clone)]
pub struct AssetRule {
    container: Selector,
    image: Selector,
}

impl AssetRule {
    pub fn new(container: &str, image: &str) -> Result<Self, CrawlError> {
        Ok(Self {
            container: parse_selector(container)?,
            image: parse_selector(image)?,
        })
    }

    /// Returns the raw `src` of the image, or None when the page doesn't
    /// have the expected structure.
    pub fn extract(&self, document: &Html) -> Option<String> {
        let container = document.select(&self.container).next()?;
        let parent = container.parent().and_then(ElementRef::wrap)?;

        let src = parent
            .select(&self.image)
            .find_map(|img| img.value().attr("src"));
        if src.is_none() {
            debug!("image element or src attribute not found");
        }
        src.map(str::to_string)
    }
}

/// All the rules needed to crawl one site.
#[derive(Debug, Clone)]
pub struct SiteRules {
    /// Links from a listing page to the individual image pages
    pub item_links: LinkRule,
    /// The "next page" link of a listing page
    pub next_page: LinkRule,
    /// Links to the size variants on an image page
    pub size_variants: LinkRule,
    /// The actual image on a detail page
    pub asset: AssetRule,
}

impl SiteRules {
    /// Rules for the nagi.ee gallery markup.
    pub fn gallery() -> Result<Self, CrawlError> {
        Ok(Self {
            item_links: LinkRule::new("item link", "div.imagelog p a", "href")?,
            next_page: LinkRule::new(
                "pager link",
                r#"div.pager a.navi[id^="next_pager_"]"#,
                "href",
            )?,
            size_variants: LinkRule::new("size variant", "#zoom ul li a", "href")?,
            asset: AssetRule::new("div table", "img")?,
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector, CrawlError> {
    Selector::parse(selector).map_err(|e| CrawlError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

// Turns an href into an absolute http(s) URL
//
// Absolute links are returned exactly as written, relative ones are joined
// onto `base`. Anchors and non-HTTP schemes (mailto:, javascript:) give None.
//
// Examples:
//   base = "http://nagi.ee"
//   href = "/gallery?page=2"            -> Some("http://nagi.ee/gallery?page=2")
//   href = "http://nagi.ee/image/7"     -> Some("http://nagi.ee/image/7")
//   href = "#top"                       -> None
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    match Url::parse(href) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Some(href.to_string()),
        Ok(_) => None,
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(href).ok().map(|u| u.to_string()),
        Err(_) => None,
    }
}
