// src/pipeline/mod.rs
// =============================================================================
// This module wires the whole run together.
//
//   seed URL -> PaginationWalker -> item channel -> sink
//
// Submodules:
// - tokens: The pool of download slots (--parallel)
// - download: Saves one image to disk
// - sink: DownloadSink (normal run) and ReportSink (--dry-run)
//
// The walker and the sink run as two separate tokio tasks. run_pipeline()
// waits for both; since the download sink waits for its own downloads before
// returning, nothing is left running when it returns.
//
// If the walker fails (a listing page can't be fetched) the sink task is
// aborted straight away, taking any running downloads with it.
// =============================================================================

mod download;
mod sink;
mod tokens;

use anyhow::Context;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::Config;
use crate::crawl::{PaginationWalker, WalkSummary};
use crate::error::CrawlError;
use crate::extract::{AssetResolver, SiteRules};
use crate::fetch::{build_client, Fetch, HttpFetcher};

use download::HttpDownloader;
use sink::{DownloadSink, ItemSink, ReportSink, SinkSummary};
use tokens::TokenPool;

/// The item channel holds one URL: the walker can be at most one item
/// ahead of the sink.
const ITEM_CHANNEL_CAPACITY: usize = 1;

/// What a complete run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub walk: WalkSummary,
    pub sink: SinkSummary,
}

/// Runs `walker` from `seed` into `sink` and waits until both are done.
pub async fn run_pipeline(
    walker: PaginationWalker,
    seed: String,
    mut sink: Box<dyn ItemSink>,
) -> Result<RunReport, CrawlError> {
    let (tx, rx) = mpsc::channel(ITEM_CHANNEL_CAPACITY);

    let walking = tokio::spawn(async move { walker.walk(seed, tx).await });
    let draining = tokio::spawn(async move { sink.drain(rx).await });

    let walked = walking
        .await
        .map_err(|e| CrawlError::Task("pagination", e))
        .and_then(|result| result);
    let walk = match walked {
        Ok(summary) => summary,
        Err(e) => {
            draining.abort();
            return Err(e);
        }
    };

    let sink = draining.await.map_err(|e| CrawlError::Task("sink", e))??;

    Ok(RunReport { walk, sink })
}

/// Builds every component from `config` and runs the pipeline.
///
/// In dry-run mode item URLs are written to `report_out` and nothing is
/// created on disk.
pub async fn run<W>(config: Arc<Config>, report_out: W) -> anyhow::Result<RunReport>
where
    W: Write + Send + 'static,
{
    let client = build_client().context("could not build the HTTP client")?;
    let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(client.clone()));
    let rules = Arc::new(SiteRules::gallery()?);

    let walker = PaginationWalker::new(fetcher.clone(), rules.clone(), config.base_url.clone());

    let sink: Box<dyn ItemSink> = if config.dry_run {
        Box::new(ReportSink::new(report_out))
    } else {
        let directory = config
            .directory
            .as_ref()
            .context("an output directory is required unless --dry-run is given")?;
        create_output_dir(directory).await?;

        let resolver = AssetResolver::new(fetcher, rules, config.base_url.clone(), config.size);
        let downloader = Arc::new(HttpDownloader::new(client, directory.clone()));
        Box::new(DownloadSink::new(resolver, downloader, TokenPool::new(config.parallel)))
    };

    info!(
        url = %config.seed_url,
        dry_run = config.dry_run,
        parallel = config.parallel,
        "starting"
    );
    let report = run_pipeline(walker, config.seed_url.to_string(), sink).await?;
    info!(
        pages = report.walk.pages,
        items = report.walk.items,
        saved = report.sink.saved,
        failed = report.sink.failed,
        "done"
    );

    Ok(report)
}

// rwxr-x--- for the owner and group
async fn create_output_dir(directory: &Path) -> anyhow::Result<()> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o750);

    builder
        .create(directory)
        .await
        .with_context(|| format!("could not create output directory {}", directory.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageSize;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use url::Url;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // Writer whose contents the test can still read after run() took it
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn config(server: &MockServer, directory: Option<PathBuf>, dry_run: bool) -> Arc<Config> {
        Arc::new(Config {
            directory,
            seed_url: Url::parse(&format!("{}/gallery", server.uri())).unwrap(),
            base_url: Url::parse(&server.uri()).unwrap(),
            verbose: false,
            dry_run,
            parallel: 2,
            size: ImageSize::Original,
        })
    }

    fn listing(items: &[String], next: Option<&str>) -> String {
        let links: String = items
            .iter()
            .map(|href| format!(r#"<p><a href="{}">img</a></p>"#, href))
            .collect();
        let pager = next
            .map(|href| format!(r#"<a class="navi" id="next_pager_1" href="{}">next</a>"#, href))
            .unwrap_or_default();
        format!(
            r#"<div class="imagelog">{}</div><div class="pager">{}</div>"#,
            links, pager
        )
    }

    async fn page(server: &MockServer, at: &str, html: String) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_downloads_every_image_on_a_single_page() {
        let server = MockServer::start().await;
        let items = vec![
            format!("{}/photo/1", server.uri()),
            format!("{}/photo/2", server.uri()),
        ];
        page(&server, "/gallery", listing(&items, None)).await;
        for n in 1..=2 {
            page(
                &server,
                &format!("/photo/{}", n),
                format!(
                    r#"<div id="zoom"><ul><li><a href="/photo/{n}/original?size=o">o</a></li></ul></div>"#,
                    n = n
                ),
            )
            .await;
            page(
                &server,
                &format!("/photo/{}/original", n),
                format!(r#"<div><table></table><img src="/full/{}.jpg"></div>"#, n),
            )
            .await;
            Mock::given(method("GET"))
                .and(path(format!("/full/{}.jpg", n)))
                .respond_with(ResponseTemplate::new(200).set_body_string(format!("image {}", n)))
                .expect(1)
                .mount(&server)
                .await;
        }

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("backup");
        let report = run(config(&server, Some(out.clone()), false), SharedBuf::default())
            .await
            .unwrap();

        assert_eq!(report.walk, WalkSummary { pages: 1, items: 2 });
        assert_eq!(report.sink.saved, 2);
        assert_eq!(std::fs::read_to_string(out.join("1.jpg")).unwrap(), "image 1");
        assert_eq!(std::fs::read_to_string(out.join("2.jpg")).unwrap(), "image 2");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&out).unwrap().permissions().mode();
            assert_eq!(mode & 0o777 & !0o750, 0);
        }
    }

    #[tokio::test]
    async fn test_self_referencing_pager_is_walked_once() {
        let server = MockServer::start().await;
        let items = vec![format!("{}/photo/1", server.uri())];
        Mock::given(method("GET"))
            .and(path("/gallery"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing(&items, Some("/gallery"))))
            .expect(1)
            .mount(&server)
            .await;

        let buf = SharedBuf::default();
        let report = run(config(&server, None, true), buf.clone()).await.unwrap();

        assert_eq!(report.walk, WalkSummary { pages: 1, items: 1 });
        assert_eq!(buf.contents(), format!("{}/photo/1\n", server.uri()));
    }

    #[tokio::test]
    async fn test_dry_run_prints_items_of_every_page() {
        let server = MockServer::start().await;
        let first = vec![
            format!("{}/photo/1", server.uri()),
            format!("{}/photo/2", server.uri()),
        ];
        let second = vec![format!("{}/photo/3", server.uri())];
        page(&server, "/gallery", listing(&first, Some("/gallery/2"))).await;
        page(&server, "/gallery/2", listing(&second, None)).await;
        // Dry-run must never touch an image page or image
        Mock::given(method("GET"))
            .and(path_regex("^/(photo|full)/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("never");
        let buf = SharedBuf::default();
        let report = run(config(&server, Some(out.clone()), true), buf.clone())
            .await
            .unwrap();

        assert_eq!(report.walk, WalkSummary { pages: 2, items: 3 });
        assert_eq!(
            buf.contents(),
            format!(
                "{u}/photo/1\n{u}/photo/2\n{u}/photo/3\n",
                u = server.uri()
            )
        );
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_unreachable_listing_page_fails_the_run() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gallery"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = run(config(&server, None, true), SharedBuf::default())
            .await
            .unwrap_err();

        match err.downcast_ref::<CrawlError>() {
            Some(CrawlError::ListingPage { source, .. }) => {
                assert!(matches!(source, crate::error::FetchError::Status(503)))
            }
            other => panic!("expected a listing page error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_items_without_images_download_nothing() {
        let server = MockServer::start().await;
        let items = vec![
            format!("{}/photo/1", server.uri()),
            format!("{}/photo/2", server.uri()),
        ];
        page(&server, "/gallery", listing(&items, None)).await;
        page(&server, "/photo/1", "<p>removed</p>".to_string()).await;
        // /photo/2 is not mounted: wiremock answers 404

        let dir = tempfile::tempdir().unwrap();
        let report = run(config(&server, Some(dir.path().to_path_buf()), false), SharedBuf::default())
            .await
            .unwrap();

        assert_eq!(report.sink.items, 2);
        assert_eq!(report.sink.without_asset, 2);
        assert_eq!(report.sink.started, 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
