// src/config.rs
// =============================================================================
// The run configuration.
//
// A Config is built exactly once from the command line (see cli.rs) before
// any task is spawned. After that it is shared read-only behind an Arc, so
// concurrent workers can read it without locking.
// =============================================================================

use std::path::PathBuf;
use url::Url;

/// Base domain used for relative pager and size-variant links.
pub const DEFAULT_BASE_URL: &str = "http://nagi.ee";

/// Default number of simultaneous image downloads.
pub const DEFAULT_PARALLEL: usize = 4;

/// Which size variant of an image to fetch.
///
/// Only the original size is offered by the CLI for now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageSize {
    #[default]
    Original,
}

impl ImageSize {
    /// Query fragment that identifies this size in a variant link.
    pub fn query_marker(self) -> &'static str {
        match self {
            ImageSize::Original => "size=o",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Where images are written. `None` in dry-run mode.
    pub directory: Option<PathBuf>,
    /// First listing page of the gallery
    pub seed_url: Url,
    /// Relative links are joined onto this
    pub base_url: Url,
    pub verbose: bool,
    pub dry_run: bool,
    /// Maximum in-flight downloads; 0 disables the limit
    pub parallel: usize,
    pub size: ImageSize,
}
