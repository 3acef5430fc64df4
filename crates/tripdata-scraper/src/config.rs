//! Run configuration and its resolution from flags, environment and defaults.

use crate::download::FailurePolicy;
use crate::error::{ScrapeError, ScrapeResult};
use std::path::PathBuf;

/// The TLC page listing the monthly trip record files.
pub const DEFAULT_TARGET_URL: &str = "https://www.nyc.gov/site/tlc/about/tlc-trip-record-data.page";

/// Where downloaded files land unless told otherwise.
pub const DEFAULT_DOWNLOAD_DIR: &str = "yellow_taxi_2025";

/// Substring every wanted href contains (this year's yellow cab files).
pub const DEFAULT_PATTERN: &str = "yellow_tripdata_2025";

/// Block size used when writing a download to disk.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Browser navigation budget in milliseconds.
pub const DEFAULT_NAV_TIMEOUT_MS: u64 = 60_000;

/// Environment override for the target page.
pub const ENV_TARGET_URL: &str = "TRIPDATA_URL";

/// Environment override for the download directory.
pub const ENV_DOWNLOAD_DIR: &str = "TRIPDATA_DIR";

/// Everything a single scrape run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeConfig {
    pub target_url: String,
    pub download_dir: PathBuf,
    pub pattern: String,
    pub failure_policy: FailurePolicy,
    pub nav_timeout_ms: u64,
    pub chunk_size: usize,
    /// List matches without downloading anything.
    pub dry_run: bool,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            pattern: DEFAULT_PATTERN.to_string(),
            failure_policy: FailurePolicy::Abort,
            nav_timeout_ms: DEFAULT_NAV_TIMEOUT_MS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            dry_run: false,
        }
    }
}

impl ScrapeConfig {
    /// Check the target URL parses before anything expensive starts.
    pub fn validate(&self) -> ScrapeResult<()> {
        url::Url::parse(&self.target_url).map_err(|source| ScrapeError::InvalidUrl {
            url: self.target_url.clone(),
            source,
        })?;
        Ok(())
    }

    /// Whether the pattern is the stock yellow cab one.
    pub fn uses_default_pattern(&self) -> bool {
        self.pattern == DEFAULT_PATTERN
    }
}

/// Resolve the target page URL: explicit flag, then `TRIPDATA_URL`, then the default.
pub fn resolve_target_url(explicit: Option<&str>) -> String {
    if let Some(url) = explicit {
        return url.to_string();
    }

    if let Ok(env_url) = std::env::var(ENV_TARGET_URL) {
        if !env_url.is_empty() {
            return env_url;
        }
    }

    DEFAULT_TARGET_URL.to_string()
}

/// Resolve the download directory: explicit flag, then `TRIPDATA_DIR`, then the default.
pub fn resolve_download_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(dir) = explicit {
        return PathBuf::from(dir);
    }

    if let Ok(env_dir) = std::env::var(ENV_DOWNLOAD_DIR) {
        if !env_dir.is_empty() {
            return PathBuf::from(env_dir);
        }
    }

    PathBuf::from(DEFAULT_DOWNLOAD_DIR)
}
