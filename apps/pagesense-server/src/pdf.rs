//! HTML to PDF rasterization with headless Chrome
//!
//! A fresh browser is launched per report and always shut down afterwards,
//! whether export succeeded or not. Every page step (open, load, image wait,
//! print) is bounded by the configured timeout; overrunning any of them fails
//! the render. Pages are A4 with background graphics and half-inch margins.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::RendererConfig;

/// A4 in inches
const PAPER_WIDTH_IN: f64 = 8.27;
const PAPER_HEIGHT_IN: f64 = 11.69;
const MARGIN_IN: f64 = 0.5;

const CHROME_ARGS: [&str; 6] = [
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--no-first-run",
    "--no-zygote",
];

/// Resolves once every `<img>` has loaded or failed
const WAIT_FOR_IMAGES_JS: &str = r#"(async () => {
    const pending = Array.from(document.images)
        .filter(img => !img.complete)
        .map(img => new Promise(resolve => {
            img.addEventListener('load', resolve, { once: true });
            img.addEventListener('error', resolve, { once: true });
        }));
    await Promise.all(pending);
    return pending.length;
})()"#;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Browser error: {0}")]
    Browser(#[from] CdpError),

    #[error("PDF export timed out after {0:?}")]
    Timeout(Duration),
}

/// Turns a self-contained HTML document into PDF bytes
#[async_trait]
pub trait PdfRasterizer: Send + Sync {
    async fn rasterize(&self, html: &str) -> Result<Vec<u8>, RenderError>;
}

pub struct ChromePdfRasterizer {
    config: RendererConfig,
}

impl ChromePdfRasterizer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self, user_data_dir: PathBuf) -> Result<BrowserConfig, RenderError> {
        let mut builder = BrowserConfig::builder()
            .args(CHROME_ARGS)
            .user_data_dir(user_data_dir);

        if let Some(path) = &self.config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(RenderError::Launch)
    }

    /// Run one browser step under the render timeout
    async fn bounded<T, F>(&self, step: &'static str, fut: F) -> Result<T, RenderError>
    where
        F: Future<Output = Result<T, CdpError>>,
    {
        match tokio::time::timeout(self.config.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!(step, timeout = ?self.config.timeout, "Browser step timed out");
                Err(RenderError::Timeout(self.config.timeout))
            }
        }
    }

    async fn export(&self, browser: &Browser, html: &str) -> Result<Vec<u8>, RenderError> {
        let page = self.bounded("open", browser.new_page("about:blank")).await?;
        self.bounded("load", page.set_content(html)).await?;

        // Chart images come from a remote service
        let pending = self.bounded("images", page.evaluate(WAIT_FOR_IMAGES_JS)).await?;
        debug!(pending = ?pending.value(), "Report images settled");

        let params = PrintToPdfParams {
            print_background: Some(true),
            paper_width: Some(PAPER_WIDTH_IN),
            paper_height: Some(PAPER_HEIGHT_IN),
            margin_top: Some(MARGIN_IN),
            margin_bottom: Some(MARGIN_IN),
            margin_left: Some(MARGIN_IN),
            margin_right: Some(MARGIN_IN),
            ..Default::default()
        };

        let pdf = self.bounded("print", page.pdf(params)).await?;

        let _ = page.close().await;
        Ok(pdf)
    }
}

/// Unique per launch so concurrent renders never share a profile
fn fresh_user_data_dir() -> PathBuf {
    static LAUNCH_ID: AtomicU64 = AtomicU64::new(0);
    let id = LAUNCH_ID.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!("pagesense-chrome-{}-{}", std::process::id(), id))
}

impl ChromePdfRasterizer {
    /// Export with a throwaway profile at `user_data_dir`, removed afterwards
    async fn rasterize_with_profile(&self, html: &str, user_data_dir: &Path) -> Result<Vec<u8>, RenderError> {
        let result = self.run_browser(html, user_data_dir).await;

        if let Err(e) = tokio::fs::remove_dir_all(user_data_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %e, dir = %user_data_dir.display(), "Failed to remove browser profile");
            }
        }

        result
    }

    async fn run_browser(&self, html: &str, user_data_dir: &Path) -> Result<Vec<u8>, RenderError> {
        let config = self.browser_config(user_data_dir.to_path_buf())?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {:?}", e);
                    break;
                }
            }
        });

        let result = self.export(&browser, html).await;

        if let Err(e) = browser.close().await {
            warn!(error = %e, "Failed to close browser");
        }
        let _ = browser.wait().await;
        handle.abort();

        result
    }
}

#[async_trait]
impl PdfRasterizer for ChromePdfRasterizer {
    #[instrument(skip(self, html), fields(html_len = html.len()))]
    async fn rasterize(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        let result = self.rasterize_with_profile(html, &fresh_user_data_dir()).await;

        match &result {
            Ok(pdf) => info!(bytes = pdf.len(), "PDF exported"),
            Err(e) => warn!(error = %e, "PDF export failed"),
        }
        result
    }
}
