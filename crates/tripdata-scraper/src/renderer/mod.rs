//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (Chromium via chromiumoxide), plus the scoped
//! [`render_page`] helper that always releases the tab it opens.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{ScrapeError, ScrapeResult};

/// Result of navigating to a URL.
#[derive(Debug, Clone)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Get the full page HTML.
    async fn get_html(&self) -> Result<String>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Open a tab, load `url` and return its rendered HTML.
///
/// The tab is closed on every path, including failed navigation. A close
/// failure after a successful render is logged, not returned.
pub async fn render_page(
    renderer: &dyn Renderer,
    url: &str,
    timeout_ms: u64,
) -> ScrapeResult<String> {
    let mut ctx = renderer.new_context().await.map_err(ScrapeError::Launch)?;

    let html = load_html(ctx.as_mut(), url, timeout_ms).await;

    if let Err(e) = ctx.close().await {
        warn!("failed to close browser tab: {e:#}");
    }

    html
}

async fn load_html(
    ctx: &mut dyn RenderContext,
    url: &str,
    timeout_ms: u64,
) -> ScrapeResult<String> {
    let nav = ctx
        .navigate(url, timeout_ms)
        .await
        .map_err(|source| ScrapeError::Navigation {
            url: url.to_string(),
            source,
        })?;
    debug!(
        final_url = %nav.final_url,
        load_time_ms = nav.load_time_ms,
        "page loaded"
    );

    let html = ctx.get_html().await.map_err(ScrapeError::Render)?;
    debug!(bytes = html.len(), "rendered HTML captured");
    Ok(html)
}
