// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap into an immutable Config
// 2. Set up logging (stderr; chattier with --verbose)
// 3. Run the crawl / download pipeline
// 4. Exit with proper code (0 = done, 1 = fatal error, 2 = usage error)
//
// Rust concepts used:
// - async/await: Many downloads run concurrently on the tokio runtime
// - Arc: The Config is shared read-only with every task
// =============================================================================

// Module declarations - tells Rust about our other source files
mod cli;      // src/cli.rs - command-line parsing
mod config;   // src/config.rs - the run configuration
mod crawl;    // src/crawl/ - walking the listing pages
mod error;    // src/error.rs - error types
mod extract;  // src/extract/ - site-specific link extraction
mod fetch;    // src/fetch/ - fetching pages
mod pipeline; // src/pipeline/ - channel, sinks and downloads

use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cli::Cli;

#[tokio::main]
async fn main() {
    // Usage errors print clap's message and exit with code 2
    let config = Cli::parse().into_config().unwrap_or_else(|e| e.exit());

    init_logging(config.verbose);

    let exit_code = match pipeline::run(Arc::new(config), std::io::stdout()).await {
        Ok(_) => 0,
        Err(e) => {
            // {:#} prints the whole cause chain on one line
            eprintln!("Error: {:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

// RUST_LOG overrides the default filter when set
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "gallery_backup=debug"
    } else {
        "gallery_backup=warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
