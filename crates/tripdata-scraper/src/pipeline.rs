//! The scrape run: fetch, extract, download, report.

use std::io::Write;
use tracing::info;

use crate::config::ScrapeConfig;
use crate::download::{ByteSource, DownloadSummary, Downloader};
use crate::error::ScrapeResult;
use crate::extract::extract_links;
use crate::fetch::PageFetcher;
use crate::report::Reporter;

/// Run one scrape against `config.target_url`.
///
/// The destination directory is created up front (unless this is a dry
/// run). Fetch errors end the run before anything is downloaded; per-link
/// errors follow `config.failure_policy`.
pub async fn run<F, S, W>(
    config: &ScrapeConfig,
    fetcher: &F,
    source: S,
    reporter: &mut Reporter<W>,
) -> ScrapeResult<DownloadSummary>
where
    F: PageFetcher + ?Sized,
    S: ByteSource,
    W: Write,
{
    config.validate()?;

    if !config.dry_run {
        tokio::fs::create_dir_all(&config.download_dir).await?;
    }

    let html = fetcher.fetch_html(&config.target_url).await?;
    let links = extract_links(&html, &config.pattern);
    info!(count = links.len(), pattern = %config.pattern, "links extracted");

    reporter.found(&links, &config.pattern)?;

    if config.dry_run {
        reporter.dry_run(links.len(), &config.download_dir)?;
        return Ok(DownloadSummary::default());
    }

    let downloader = Downloader::from_config(source, config);
    let summary = downloader.download_all(&links, reporter).await?;

    reporter.finished(&summary, downloader.dir())?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::testing::CannedSource;
    use crate::download::FailurePolicy;
    use crate::error::ScrapeError;
    use crate::fetch::StaticFetcher;
    use async_trait::async_trait;
    use tempfile::TempDir;

    const PAGE: &str = r#"
        <html><body><table>
            <tr><td><a href="https://host/x/yellow_tripdata_2025-01.parquet">Yellow Taxi Trip Records</a></td></tr>
            <tr><td><a href="https://host/x/green_tripdata_2025-01.parquet">Green Taxi Trip Records</a></td></tr>
            <tr><td><a href="https://host/x/yellow_tripdata_2025-02.parquet">Yellow Taxi Trip Records</a></td></tr>
            <tr><td><a href="https://host/x/yellow_tripdata_2025-03.parquet">Yellow Taxi Trip Records</a></td></tr>
        </table></body></html>
    "#;

    const JAN: &str = "https://host/x/yellow_tripdata_2025-01.parquet";
    const FEB: &str = "https://host/x/yellow_tripdata_2025-02.parquet";
    const MAR: &str = "https://host/x/yellow_tripdata_2025-03.parquet";

    fn config_in(dir: &TempDir) -> ScrapeConfig {
        ScrapeConfig {
            target_url: "https://example.com/trip-record-data.page".to_string(),
            download_dir: dir.path().join("yellow_taxi_2025"),
            ..ScrapeConfig::default()
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl PageFetcher for FailingFetcher {
        async fn fetch_html(&self, url: &str) -> ScrapeResult<String> {
            Err(ScrapeError::Navigation {
                url: url.to_string(),
                source: anyhow::anyhow!("navigation timed out after 60000ms"),
            })
        }
    }

    #[tokio::test]
    async fn test_run_downloads_matches_and_reports() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let source = CannedSource::default()
            .with_body(JAN, b"jan")
            .with_body(FEB, b"feb")
            .with_body(MAR, b"mar");
        let mut reporter = Reporter::new(Vec::new());

        let summary = run(&config, &StaticFetcher::new(PAGE), source.clone(), &mut reporter)
            .await
            .unwrap();

        assert_eq!(summary.downloaded.len(), 3);
        assert_eq!(
            source.requested(),
            vec![JAN.to_string(), FEB.to_string(), MAR.to_string()]
        );

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Found 3 Yellow Taxi files:");
        assert_eq!(lines[1], JAN);
        assert_eq!(lines[4], "Downloading yellow_tripdata_2025-01.parquet...");
        assert_eq!(
            *lines.last().unwrap(),
            format!("✅ All files downloaded to {}", config.download_dir.display())
        );
    }

    #[tokio::test]
    async fn test_run_with_no_matches_makes_no_requests() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let source = CannedSource::default();
        let mut reporter = Reporter::new(Vec::new());

        let html = r#"<a href="https://host/x/fhv_tripdata_2025-01.parquet">FHV</a>"#;
        let summary = run(&config, &StaticFetcher::new(html), source.clone(), &mut reporter)
            .await
            .unwrap();

        assert_eq!(summary.total(), 0);
        assert!(source.requested().is_empty());
        assert!(config.download_dir.is_dir());

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(out.starts_with("Found 0 Yellow Taxi files:\n"));
        assert!(out.contains("✅ All files downloaded to"));
    }

    #[tokio::test]
    async fn test_run_aborts_on_server_error_by_default() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let source = CannedSource::default()
            .with_body(JAN, b"jan")
            .with_status(FEB, 503)
            .with_body(MAR, b"mar");
        let mut reporter = Reporter::new(Vec::new());

        let err = run(&config, &StaticFetcher::new(PAGE), source.clone(), &mut reporter)
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::HttpStatus { status: 503, .. }));
        assert!(!source.requested().contains(&MAR.to_string()));
        assert!(config.download_dir.join("yellow_tripdata_2025-01.parquet").exists());

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(!out.contains("All files downloaded"));
    }

    #[tokio::test]
    async fn test_run_continues_past_server_error_when_asked() {
        let dir = TempDir::new().unwrap();
        let config = ScrapeConfig {
            failure_policy: FailurePolicy::Continue,
            ..config_in(&dir)
        };
        let source = CannedSource::default()
            .with_body(JAN, b"jan")
            .with_status(FEB, 503)
            .with_body(MAR, b"mar");
        let mut reporter = Reporter::new(Vec::new());

        let summary = run(&config, &StaticFetcher::new(PAGE), source.clone(), &mut reporter)
            .await
            .unwrap();

        assert_eq!(summary.downloaded.len(), 2);
        assert_eq!(summary.failed.len(), 1);
        assert!(config.download_dir.join("yellow_tripdata_2025-03.parquet").exists());

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(out.contains("⚠ 1 of 3 files failed"));
    }

    #[tokio::test]
    async fn test_fetch_failure_downloads_nothing() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let source = CannedSource::default();
        let mut reporter = Reporter::new(Vec::new());

        let err = run(&config, &FailingFetcher, source.clone(), &mut reporter)
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::Navigation { .. }));
        assert!(source.requested().is_empty());
        assert!(reporter.into_inner().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let config = ScrapeConfig {
            dry_run: true,
            ..config_in(&dir)
        };
        let source = CannedSource::default();
        let mut reporter = Reporter::new(Vec::new());

        run(&config, &StaticFetcher::new(PAGE), source.clone(), &mut reporter)
            .await
            .unwrap();

        assert!(source.requested().is_empty());
        assert!(!config.download_dir.exists());
        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(out.contains("Dry run: 3 files would be considered for"));
    }
}
