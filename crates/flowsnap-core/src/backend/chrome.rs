//! Headless Chrome render backend.
//!
//! Thin wrapper over the external browser engine: navigate to the local
//! render page with the document in the query string, wait for the embedded
//! viewer to finish drawing, capture the viewport as PNG. No orchestration
//! logic lives here.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};

use crate::domain::RenderTask;
use crate::error::{Error, Result};
use crate::ports::{BackendFactory, RenderBackend};

/// The element the render page mounts the workflow viewer into. Captures are
/// scoped to this element so the snapshot never includes page background
/// around the viewer.
pub(crate) const VIEWER_SELECTOR: &str = "n8n-demo";

/// Configuration for one browser session.
#[derive(Debug, Clone)]
pub struct ChromeConfig {
    /// Base URL of the local page server, e.g. `http://127.0.0.1:5000`.
    pub server_url: String,
    pub width: u32,
    pub height: u32,
    pub dark_mode: bool,
    /// Budget for page operations (navigation, element waits).
    pub timeout: Duration,
    /// How long to let the embedded viewer draw before capturing. The
    /// visualization renders in a cross-origin iframe with no completion
    /// signal we can observe, so this is a plain wait.
    pub wait_time: Duration,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".to_string(),
            width: 1920,
            height: 1080,
            dark_mode: false,
            timeout: Duration::from_secs(120),
            wait_time: Duration::from_secs(60),
        }
    }
}

/// One headless Chrome session. Owns the browser process; dropping the
/// backend releases it, so a session can never outlive its worker.
pub struct ChromeBackend {
    browser: Browser,
    config: ChromeConfig,
}

impl ChromeBackend {
    /// Launch a browser session. Failures here are infrastructure failures,
    /// not task failures.
    pub fn launch(config: ChromeConfig) -> Result<Self> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((config.width, config.height)))
            .build()
            .map_err(|e| Error::BackendStartup(format!("launch options: {e}")))?;

        let browser =
            Browser::new(options).map_err(|e| Error::BackendStartup(format!("launch: {e}")))?;

        tracing::info!(
            width = config.width,
            height = config.height,
            dark_mode = config.dark_mode,
            "browser session started"
        );
        Ok(Self { browser, config })
    }

    fn render_url(&self, payload: &serde_json::Value) -> String {
        render_url(&self.config, payload)
    }
}

fn render_url(config: &ChromeConfig, payload: &serde_json::Value) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("workflow", &payload.to_string());
    query.append_pair("width", &config.width.to_string());
    query.append_pair("height", &config.height.to_string());
    if config.dark_mode {
        query.append_pair("dark", "true");
    }
    format!("{}/render?{}", config.server_url, query.finish())
}

#[async_trait]
impl RenderBackend for ChromeBackend {
    async fn render(&self, task: &RenderTask) -> Result<()> {
        let browser = self.browser.clone();
        let url = self.render_url(task.payload());
        let output = task.output_path().to_path_buf();
        let timeout = self.config.timeout;
        let wait_time = self.config.wait_time;

        // The CDP client is synchronous; keep it off the async workers.
        tokio::task::spawn_blocking(move || {
            capture_page(&browser, &url, &output, timeout, wait_time)
        })
        .await
        .map_err(|e| Error::Render(format!("render task panicked: {e}")))?
    }
}

fn capture_page(
    browser: &Browser,
    url: &str,
    output: &Path,
    timeout: Duration,
    wait_time: Duration,
) -> Result<()> {
    let tab = browser
        .new_tab()
        .map_err(|e| Error::Render(format!("new tab: {e}")))?;
    tab.set_default_timeout(timeout);

    let captured = drive_tab(&tab, url, output, wait_time);

    // The tab must be released on every exit path or the session
    // accumulates pages across retries.
    if let Err(e) = tab.close(true) {
        tracing::debug!(error = %e, "tab close failed");
    }

    captured
}

fn drive_tab(
    tab: &headless_chrome::Tab,
    url: &str,
    output: &Path,
    wait_time: Duration,
) -> Result<()> {
    tab.navigate_to(url)
        .map_err(|e| Error::Render(format!("navigation failed: {e}")))?;
    tab.wait_until_navigated()
        .map_err(|e| Error::Render(format!("wait for navigation failed: {e}")))?;

    let viewer = tab
        .wait_for_element(VIEWER_SELECTOR)
        .map_err(|e| Error::Render(format!("viewer element not found: {e}")))?;

    // Let the embedded viewer draw.
    std::thread::sleep(wait_time);

    // Capture the viewer element only, not the surrounding page.
    let png = viewer
        .capture_screenshot(Page::CaptureScreenshotFormatOption::Png)
        .map_err(|e| Error::Render(format!("screenshot failed: {e}")))?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, &png)?;

    tracing::debug!(output = %output.display(), bytes = png.len(), "snapshot written");
    Ok(())
}

/// Launches one independent browser session per worker, so one crashed or
/// hung session cannot touch another worker's renders.
pub struct ChromeBackendFactory {
    config: ChromeConfig,
}

impl ChromeBackendFactory {
    pub fn new(config: ChromeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BackendFactory for ChromeBackendFactory {
    async fn create(&self, worker_id: usize) -> Result<Box<dyn RenderBackend>> {
        let config = self.config.clone();
        let backend = tokio::task::spawn_blocking(move || ChromeBackend::launch(config))
            .await
            .map_err(|e| Error::BackendStartup(format!("launch task panicked: {e}")))??;

        tracing::debug!(worker_id, "backend instance created");
        Ok(Box::new(backend))
    }
}
