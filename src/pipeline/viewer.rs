//! The browser seam: a [`Viewer`] trait and its Chrome implementation.
//!
//! The capture loop in [`crate::pipeline::capture`] only talks to [`Viewer`],
//! so it can be driven by a scripted fake in tests and by [`ChromeViewer`]
//! (chromiumoxide over the DevTools protocol) in production.
//!
//! chromiumoxide needs its `Handler` stream polled for any command to make
//! progress; [`ChromeViewer::launch`] spawns a task for that and aborts it in
//! [`Viewer::close`].

use crate::config::DownloadConfig;
use crate::error::BoxPdfError;
use crate::scripts;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// One rendered page as the viewer handed it over.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCapture {
    /// `data:image/...;base64,...` URL, or None if nothing rendered in time.
    pub data_url: Option<String>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Deserialize)]
struct PageCount {
    total: Option<usize>,
}

/// A paged document viewer the capture loop can drive.
#[async_trait]
pub trait Viewer: Send {
    /// Raw title of the viewer tab.
    async fn title(&mut self) -> Result<String, BoxPdfError>;

    /// Page count advertised by the viewer, if any.
    async fn page_count(&mut self) -> Result<Option<usize>, BoxPdfError>;

    /// Make the page navigation controls visible. Best effort.
    async fn reveal_controls(&mut self) -> Result<(), BoxPdfError>;

    /// Grab the page currently shown.
    async fn capture_page(&mut self) -> Result<RawCapture, BoxPdfError>;

    /// Advance to the next page; `false` when there is none.
    async fn next_page(&mut self) -> Result<bool, BoxPdfError>;

    /// Shut the viewer down. Called exactly once, also after errors.
    async fn close(&mut self) -> Result<(), BoxPdfError>;
}

/// [`Viewer`] backed by a chromiumoxide-controlled Chrome.
pub struct ChromeViewer {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    capture_js: String,
}

impl ChromeViewer {
    /// Launch Chrome, open `url`, and wait until the preview shows a page.
    pub async fn launch(url: &str, config: &DownloadConfig) -> Result<Self, BoxPdfError> {
        let browser_config = browser_config(config)?;
        info!("Launching Chrome ({}headless)", if config.headless { "" } else { "not " });

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BoxPdfError::BrowserLaunch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler stopped: {}", e);
                    break;
                }
            }
        });

        let page = match browser.new_page(url).await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(BoxPdfError::browser("opening the viewer", e));
            }
        };

        let mut viewer = Self {
            browser,
            page,
            handler,
            capture_js: scripts::capture_script(
                config.page_render_timeout_ms,
                config.min_page_width,
            ),
        };
        if let Err(e) = viewer.wait_until_ready(config.wait_time).await {
            let _ = viewer.close().await;
            return Err(e);
        }
        Ok(viewer)
    }

    /// Poll the readiness script every 500 ms for at most `max_wait`.
    ///
    /// A timeout is not an error: some previews render lazily, and the capture
    /// loop reports `NoPagesCaptured` if nothing ever appears.
    async fn wait_until_ready(&self, max_wait: Duration) -> Result<(), BoxPdfError> {
        let _ = self.page.wait_for_navigation().await;
        info!("Waiting for preview to load (max {:?})", max_wait);

        let start = Instant::now();
        while start.elapsed() < max_wait {
            if self.eval::<bool>(scripts::PREVIEW_READY, "checking preview").await? {
                info!("Preview loaded in {:.1}s", start.elapsed().as_secs_f64());
                sleep(Duration::from_millis(500)).await;
                return Ok(());
            }
            sleep(Duration::from_millis(500)).await;
        }
        warn!("Preview not ready after {:?}, proceeding anyway", max_wait);
        Ok(())
    }

    async fn eval<T: DeserializeOwned>(
        &self,
        js: &str,
        action: &'static str,
    ) -> Result<T, BoxPdfError> {
        let params = EvaluateParams::builder()
            .expression(js)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(|e| BoxPdfError::browser(action, e))?;
        self.page
            .evaluate_expression(params)
            .await
            .map_err(|e| BoxPdfError::browser(action, e))?
            .into_value::<T>()
            .map_err(|e| BoxPdfError::browser(action, e))
    }
}

#[async_trait]
impl Viewer for ChromeViewer {
    async fn title(&mut self) -> Result<String, BoxPdfError> {
        let title = self
            .page
            .get_title()
            .await
            .map_err(|e| BoxPdfError::browser("reading the title", e))?;
        Ok(title.unwrap_or_default())
    }

    async fn page_count(&mut self) -> Result<Option<usize>, BoxPdfError> {
        let count: PageCount = self.eval(scripts::PAGE_COUNT, "reading the page count").await?;
        Ok(count.total.filter(|&n| n > 0))
    }

    async fn reveal_controls(&mut self) -> Result<(), BoxPdfError> {
        let preview = match self.page.find_element(scripts::PREVIEW_SELECTOR).await {
            Ok(el) => el,
            Err(e) => {
                debug!("Preview element not found: {}", e);
                return Ok(());
            }
        };
        if let Err(e) = preview.hover().await {
            debug!("Hover failed: {}", e);
            return Ok(());
        }
        for _ in 0..20 {
            if self
                .eval::<bool>(scripts::CONTROLS_PRESENT, "waiting for page controls")
                .await?
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        debug!("Page controls did not appear after hover");
        Ok(())
    }

    async fn capture_page(&mut self) -> Result<RawCapture, BoxPdfError> {
        self.eval(&self.capture_js, "capturing a page").await
    }

    async fn next_page(&mut self) -> Result<bool, BoxPdfError> {
        self.eval(scripts::NEXT_PAGE, "turning the page").await
    }

    async fn close(&mut self) -> Result<(), BoxPdfError> {
        let closed = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler.abort();
        closed
            .map(|_| ())
            .map_err(|e| BoxPdfError::browser("closing Chrome", e))
    }
}

/// Map the run config onto chromiumoxide's launch options.
fn browser_config(config: &DownloadConfig) -> Result<BrowserConfig, BoxPdfError> {
    let (width, height) = config.window_size;
    let mut builder = BrowserConfig::builder()
        .window_size(width, height)
        .viewport(Viewport {
            width,
            height,
            device_scale_factor: Some(config.device_scale_factor),
            ..Viewport::default()
        })
        .arg("--disable-blink-features=AutomationControlled")
        .arg(format!(
            "--force-device-scale-factor={}",
            config.device_scale_factor
        ));

    if !config.headless {
        builder = builder.with_head();
    }
    if config.no_sandbox {
        builder = builder.no_sandbox();
    }
    if let Some(ref path) = config.chrome_executable {
        builder = builder.chrome_executable(path);
    }

    builder.build().map_err(BoxPdfError::BrowserLaunch)
}
