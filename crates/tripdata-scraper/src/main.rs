// Copyright 2026 Tripdata Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::{bail, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use tripdata_scraper::config::{
    resolve_download_dir, resolve_target_url, ScrapeConfig, DEFAULT_CHUNK_SIZE,
    DEFAULT_NAV_TIMEOUT_MS, DEFAULT_PATTERN,
};
use tripdata_scraper::logging::{self, Verbosity};
use tripdata_scraper::{
    cli, pipeline, BrowserFetcher, FailurePolicy, HttpSource, PageFetcher, Reporter,
    StaticFetcher,
};

#[derive(Parser)]
#[command(
    name = "tripdata",
    about = "Download this year's NYC yellow taxi trip record files",
    version,
    after_help = "Files already present in the download directory are never fetched again."
)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct RunArgs {
    /// Page listing the trip record files [env: TRIPDATA_URL]
    #[arg(long, global = true)]
    url: Option<String>,

    /// Directory the files are saved to [env: TRIPDATA_DIR]
    #[arg(long, global = true)]
    dir: Option<String>,

    /// Substring a link must contain to be downloaded
    #[arg(long, default_value = DEFAULT_PATTERN)]
    pattern: String,

    /// Keep going when a single file fails instead of stopping the run
    #[arg(long)]
    continue_on_error: bool,

    /// Page load budget in milliseconds
    #[arg(long, default_value_t = DEFAULT_NAV_TIMEOUT_MS)]
    timeout: u64,

    /// List matching links without downloading anything
    #[arg(long)]
    dry_run: bool,

    /// Read the index page from a saved HTML file instead of launching a browser
    #[arg(long, value_name = "FILE")]
    from_html: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

impl RunArgs {
    fn to_config(&self) -> ScrapeConfig {
        ScrapeConfig {
            target_url: resolve_target_url(self.url.as_deref()),
            download_dir: resolve_download_dir(self.dir.as_deref()),
            pattern: self.pattern.clone(),
            failure_policy: if self.continue_on_error {
                FailurePolicy::Continue
            } else {
                FailurePolicy::Abort
            },
            nav_timeout_ms: self.timeout,
            chunk_size: DEFAULT_CHUNK_SIZE,
            dry_run: self.dry_run,
        }
    }
}

async fn scrape(args: &RunArgs) -> Result<()> {
    let config = args.to_config();

    let fetcher: Box<dyn PageFetcher> = match &args.from_html {
        Some(path) => {
            let html = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            Box::new(StaticFetcher::new(html))
        }
        None => Box::new(BrowserFetcher::new(config.nav_timeout_ms)),
    };

    let source = HttpSource::new().context("failed to build HTTP client")?;
    let mut reporter = Reporter::stdout();

    let summary = pipeline::run(&config, fetcher.as_ref(), source, &mut reporter).await?;

    if !summary.is_clean() {
        bail!(
            "{} of {} downloads failed",
            summary.failed.len(),
            summary.total()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(Verbosity::from_flags(cli.verbose, cli.quiet));

    let result = match &cli.command {
        None => scrape(&cli.run).await,
        Some(Commands::Doctor) => cli::doctor::run(&cli.run.to_config()).await,
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "tripdata", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }

    result
}
