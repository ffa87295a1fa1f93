// src/crawl/mod.rs
// =============================================================================
// This module handles walking the gallery.
//
// Features:
// - Follows "next page" links one page at a time
// - Streams image page URLs out as soon as a page is parsed
// - Stops on the last page, or when a pager loops back to the same page
//
// There is no visited set: the only loop protection is the "next page is
// the current page" check.
// =============================================================================

mod walker;

pub use walker::{PaginationWalker, WalkSummary};
