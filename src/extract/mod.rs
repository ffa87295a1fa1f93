// src/extract/mod.rs
// =============================================================================
// This module pulls links out of gallery pages.
//
// Submodules:
// - rules: The site-specific CSS rules (item links, pager, size variants,
//          image) and relative-link resolution
// - asset: Follows an image page to the URL of the full-size image file
// =============================================================================

mod asset;
mod rules;

pub use asset::AssetResolver;
pub use rules::{resolve_link, SiteRules};
