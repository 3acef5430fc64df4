//! Sequential downloader for extracted links.
//!
//! Links are handled one at a time in the order given. A link whose file
//! name already exists in the destination directory is skipped without any
//! network traffic; existence is the only signal, so a truncated file left
//! by an interrupted run is never repaired.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::extract::Link;
use crate::report::Reporter;

/// Body of a remote file, chunk by chunk.
pub type ByteStream = BoxStream<'static, ScrapeResult<Bytes>>;

/// Opens remote resources for streaming.
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Start fetching `url`. A failure status must surface here, before any
    /// body is handed out.
    async fn open(&self, url: &str) -> ScrapeResult<ByteStream>;
}

/// What to do when one link fails to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the whole run on the first failure.
    #[default]
    Abort,
    /// Report the failure and move on to the next link.
    Continue,
}

/// A link that could not be downloaded under [`FailurePolicy::Continue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDownload {
    pub file_name: String,
    pub error: String,
}

/// Per-outcome file names of one downloader pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub downloaded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedDownload>,
}

impl DownloadSummary {
    pub fn total(&self) -> usize {
        self.downloaded.len() + self.skipped.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Plain HTTP GET source backed by reqwest.
#[derive(Clone)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> ScrapeResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tripdata-scraper/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ByteSource for HttpSource {
    async fn open(&self, url: &str) -> ScrapeResult<ByteStream> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        debug!(url, status = status.as_u16(), "download response");

        if status.is_client_error() || status.is_server_error() {
            return Err(ScrapeError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(resp.bytes_stream().map_err(ScrapeError::from).boxed())
    }
}

/// Downloads links into one directory through a [`ByteSource`].
pub struct Downloader<S> {
    source: S,
    dir: PathBuf,
    chunk_size: usize,
    policy: FailurePolicy,
}

impl<S: ByteSource> Downloader<S> {
    pub fn new(source: S, dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            dir: dir.into(),
            chunk_size: crate::config::DEFAULT_CHUNK_SIZE,
            policy: FailurePolicy::Abort,
        }
    }

    pub fn from_config(source: S, config: &ScrapeConfig) -> Self {
        Self::new(source, &config.download_dir)
            .with_chunk_size(config.chunk_size)
            .with_policy(config.failure_policy)
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Download every link in order, reporting each decision.
    ///
    /// Under [`FailurePolicy::Abort`] the first failed link ends the pass
    /// with its error; files written before it stay on disk.
    pub async fn download_all<W: Write>(
        &self,
        links: &[Link],
        reporter: &mut Reporter<W>,
    ) -> ScrapeResult<DownloadSummary> {
        let mut summary = DownloadSummary::default();

        for link in links {
            let file_name = link.file_name();

            if file_name.is_empty() {
                warn!(%link, "link has no file name, skipping");
                reporter.unnamed(link)?;
                summary.skipped.push(link.to_string());
                continue;
            }

            let dest = self.dir.join(file_name);
            if dest.exists() {
                debug!(path = %dest.display(), "already present");
                reporter.skipping(file_name)?;
                summary.skipped.push(file_name.to_string());
                continue;
            }

            reporter.downloading(file_name)?;
            match self.download_one(link, &dest).await {
                Ok(bytes) => {
                    info!(file = file_name, bytes, "downloaded");
                    summary.downloaded.push(file_name.to_string());
                }
                Err(e) => match self.policy {
                    FailurePolicy::Abort => return Err(e),
                    FailurePolicy::Continue => {
                        warn!(file = file_name, "download failed: {}", e.chain_message());
                        reporter.failed(file_name, &e)?;
                        summary.failed.push(FailedDownload {
                            file_name: file_name.to_string(),
                            error: e.chain_message(),
                        });
                    }
                },
            }
        }

        Ok(summary)
    }

    /// Stream one link to `dest`, returning the number of bytes written.
    async fn download_one(&self, link: &Link, dest: &Path) -> ScrapeResult<u64> {
        // Open first so a failure status never leaves an empty file behind.
        let mut body = self.source.open(link.as_str()).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        write_chunked(&mut body, &mut file, self.chunk_size).await
    }
}

/// Copy `body` into `writer` in blocks of exactly `chunk_size` bytes; only
/// the final block may be shorter. Returns the number of bytes written.
async fn write_chunked<W>(
    body: &mut ByteStream,
    writer: &mut W,
    chunk_size: usize,
) -> ScrapeResult<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut pending = BytesMut::with_capacity(chunk_size);
    let mut written = 0u64;

    while let Some(chunk) = body.next().await {
        pending.extend_from_slice(&chunk?);
        while pending.len() >= chunk_size {
            let block = pending.split_to(chunk_size);
            writer.write_all(&block).await?;
            written += block.len() as u64;
        }
    }
    if !pending.is_empty() {
        writer.write_all(&pending).await?;
        written += pending.len() as u64;
    }
    writer.flush().await?;

    Ok(written)
}
