// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
//   gallery-backup [--parallel N] [--verbose] [--dry-run] <directory> <url>
//
// clap handles flags, --help and --version. The positional arguments need one
// extra rule clap can't express on its own: in --dry-run mode the directory
// may be left out, so a single positional is the gallery URL. That rule lives
// in Cli::into_config, which reports violations through clap so the usage
// text and exit code stay the same as for any other argument error.
// =============================================================================

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use url::Url;

use crate::config::{Config, ImageSize, DEFAULT_BASE_URL, DEFAULT_PARALLEL};

#[derive(Parser, Debug)]
#[command(
    name = "gallery-backup",
    version,
    about = "Download every full-size image of a paginated gallery",
    long_about = "gallery-backup walks a gallery page by page, follows every image to its \
                  original-size version and saves it into <DIRECTORY>. \
                  With --dry-run it only prints the image pages it would visit.",
    override_usage = "gallery-backup [OPTIONS] <DIRECTORY> <URL>\n       gallery-backup --dry-run [OPTIONS] <URL>"
)]
pub struct Cli {
    /// How many downloads may run at the same time; 0 removes the limit
    #[arg(long, default_value_t = DEFAULT_PARALLEL)]
    pub parallel: usize,

    /// Log progress and skipped links to stderr
    #[arg(long)]
    pub verbose: bool,

    /// Only print the image pages that would be downloaded
    #[arg(long)]
    pub dry_run: bool,

    /// Domain that relative gallery links are resolved against
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Directory the images are saved into
    #[arg(value_name = "DIRECTORY")]
    pub directory: Option<String>,

    /// First page of the gallery
    #[arg(value_name = "URL")]
    pub url: Option<String>,
}

impl Cli {
    /// Validates the positional arguments and builds the run configuration.
    pub fn into_config(self) -> Result<Config, clap::Error> {
        // Empty strings count as missing, like an unset argument
        let directory = self.directory.filter(|d| !d.is_empty());
        let url = self.url.filter(|u| !u.is_empty());

        let (directory, seed) = match (directory, url) {
            (Some(dir), Some(url)) => (Some(PathBuf::from(dir)), url),
            // A lone positional in dry-run mode is the gallery URL
            (Some(url), None) if self.dry_run => (None, url),
            (None, Some(url)) if self.dry_run => (None, url),
            _ => {
                return Err(usage_error(
                    ErrorKind::MissingRequiredArgument,
                    "both <DIRECTORY> and <URL> are required unless --dry-run is given",
                ))
            }
        };

        let seed_url = parse_url(&seed)?;
        let base_url = parse_url(&self.base_url)?;

        Ok(Config {
            directory,
            seed_url,
            base_url,
            verbose: self.verbose,
            dry_run: self.dry_run,
            parallel: self.parallel,
            size: ImageSize::Original,
        })
    }
}

fn parse_url(raw: &str) -> Result<Url, clap::Error> {
    Url::parse(raw).map_err(|e| {
        usage_error(
            ErrorKind::ValueValidation,
            &format!("invalid URL '{}': {}", raw, e),
        )
    })
}

fn usage_error(kind: ErrorKind, message: &str) -> clap::Error {
    Cli::command().error(kind, message)
}
