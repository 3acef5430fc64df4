//! Chromium-based renderer using chromiumoxide.

use super::{NavigationResult, RenderContext, Renderer};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Environment override for the Chromium executable.
pub const ENV_CHROMIUM_PATH: &str = "TRIPDATA_CHROMIUM_PATH";

/// Executable names tried on `PATH`, in order.
const SYSTEM_BINARIES: &[&str] = &["google-chrome", "chromium", "chromium-browser"];

/// Chrome for Testing layouts under `<cache dir>/tripdata/chromium`.
#[cfg(target_os = "macos")]
const BUNDLED_LAYOUTS: &[&str] = &[
    "chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
    "chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
];
#[cfg(not(target_os = "macos"))]
const BUNDLED_LAYOUTS: &[&str] = &["chrome-linux64/chrome", "chrome"];

#[cfg(target_os = "macos")]
const APP_LOCATIONS: &[&str] = &["/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"];
#[cfg(not(target_os = "macos"))]
const APP_LOCATIONS: &[&str] = &[];

/// Locate a Chromium executable: env override, cached Chrome for Testing,
/// `PATH`, then well-known install locations.
pub fn find_chromium() -> Option<PathBuf> {
    std::env::var_os(ENV_CHROMIUM_PATH)
        .map(PathBuf::from)
        .filter(|p| p.exists())
        .or_else(|| {
            let base = dirs::cache_dir()?.join("tripdata/chromium");
            first_existing(BUNDLED_LAYOUTS.iter().map(|rel| base.join(rel)))
        })
        .or_else(|| SYSTEM_BINARIES.iter().find_map(|name| which::which(name).ok()))
        .or_else(|| first_existing(APP_LOCATIONS.iter().map(PathBuf::from)))
}

fn first_existing(candidates: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|p| p.exists())
}

/// Run `work` under a single `timeout_ms` budget.
async fn within_budget<T>(timeout_ms: u64, work: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(Duration::from_millis(timeout_ms), work).await {
        Ok(result) => result.context("navigation failed"),
        Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
    }
}

/// Chromium-based renderer owning one headless browser process.
///
/// Call [`Renderer::shutdown`] when done. If the renderer is dropped
/// without it, chromiumoxide kills the child process when the `Browser`
/// goes away and the handler task is aborted here.
pub struct ChromiumRenderer {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance.
    pub async fn new() -> Result<Self> {
        let mut builder = BrowserConfig::builder();
        match find_chromium() {
            Some(path) => {
                debug!(path = %path.display(), "using Chromium executable");
                builder = builder.chrome_executable(path);
            }
            None => debug!("no Chromium found in known locations, using chromiumoxide detection"),
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // The CDP connection only makes progress while the handler is polled.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler error: {e}");
                }
            }
        });

        info!("headless Chromium launched");

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await.context("failed to close Chromium")?;
        browser
            .wait()
            .await
            .context("failed waiting for Chromium to exit")?;
        self.handler.abort();
        info!("headless Chromium shut down");
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

impl Drop for ChromiumRenderer {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    active_count: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();
        let page = &self.page;

        // goto resolves on the load event; script-driven navigations that
        // follow get to settle inside the same budget
        within_budget(timeout_ms, async {
            page.goto(url).await?;
            let _ = page.wait_for_navigation().await;
            anyhow::Ok(())
        })
        .await?;

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        Ok(NavigationResult {
            final_url,
            load_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn get_html(&self) -> Result<String> {
        self.page.content().await.context("failed to read page HTML")
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        self.page.close().await.context("failed to close page")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::render_page;

    #[test]
    fn test_find_chromium_honours_env_override() {
        let exe = std::env::current_exe().expect("test binary path");
        std::env::set_var(ENV_CHROMIUM_PATH, &exe);
        assert_eq!(find_chromium(), Some(exe));

        let missing = PathBuf::from("/nonexistent/tripdata/chrome");
        std::env::set_var(ENV_CHROMIUM_PATH, &missing);
        assert_ne!(find_chromium(), Some(missing));
        std::env::remove_var(ENV_CHROMIUM_PATH);
    }

    #[test]
    fn test_first_existing_keeps_order() {
        let exe = std::env::current_exe().expect("test binary path");
        let found = first_existing([PathBuf::from("/nonexistent/a"), exe.clone(), PathBuf::from("/")]);
        assert_eq!(found, Some(exe));
        assert_eq!(first_existing(Vec::<PathBuf>::new()), None);
    }

    #[tokio::test]
    async fn test_budget_passes_result_through() {
        let value = within_budget(1_000, async { anyhow::Ok(7) }).await.unwrap();
        assert_eq!(value, 7);

        let err = within_budget(1_000, async {
            Err::<(), _>(anyhow::anyhow!("net::ERR_NAME_NOT_RESOLVED"))
        })
            .await
            .unwrap_err();
        assert_eq!(format!("{err:#}"), "navigation failed: net::ERR_NAME_NOT_RESOLVED");
    }

    #[tokio::test]
    async fn test_budget_covers_settle_step() {
        // First step finishes, the settle step never does.
        let err = within_budget(50, async {
            tokio::task::yield_now().await;
            std::future::pending::<()>().await;
            anyhow::Ok(())
        })
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "navigation timed out after 50ms");
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_renders_script_generated_links() {
        let renderer = ChromiumRenderer::new()
            .await
            .expect("failed to create renderer");

        let page = "data:text/html,<div id='list'></div><script>\
            document.getElementById('list').innerHTML = \
            '<a href=\"https://host/yellow_tripdata_2025-01.parquet\">Jan</a>';\
            </script>";

        let html = render_page(&renderer, page, 10_000)
            .await
            .expect("render failed");
        assert!(html.contains("yellow_tripdata_2025-01.parquet"));
        assert_eq!(renderer.active_contexts(), 0);

        renderer.shutdown().await.expect("shutdown failed");
    }
}
