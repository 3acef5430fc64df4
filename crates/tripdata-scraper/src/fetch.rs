//! Fetching the index page.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{ScrapeError, ScrapeResult};
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::{render_page, Renderer};

/// Something that can hand back the rendered HTML of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_html(&self, url: &str) -> ScrapeResult<String>;
}

/// Fetches pages through a short-lived headless Chromium session.
///
/// Each call launches a browser, renders one page and shuts the browser
/// down again, whether or not the render succeeded.
#[derive(Debug, Clone)]
pub struct BrowserFetcher {
    timeout_ms: u64,
}

impl BrowserFetcher {
    pub fn new(timeout_ms: u64) -> Self {
        Self { timeout_ms }
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch_html(&self, url: &str) -> ScrapeResult<String> {
        info!(url, "rendering index page");
        let renderer = ChromiumRenderer::new().await.map_err(ScrapeError::Launch)?;
        with_renderer(&renderer, url, self.timeout_ms).await
    }
}

/// Render `url` with `renderer`, then shut the renderer down on every path.
pub async fn with_renderer(
    renderer: &dyn Renderer,
    url: &str,
    timeout_ms: u64,
) -> ScrapeResult<String> {
    let html = render_page(renderer, url, timeout_ms).await;

    if let Err(e) = renderer.shutdown().await {
        warn!("browser shutdown failed: {e:#}");
    }

    html
}

/// Serves a fixed document; used to drive the pipeline without a browser.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    html: String,
}

impl StaticFetcher {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch_html(&self, _url: &str) -> ScrapeResult<String> {
        Ok(self.html.clone())
    }
}
