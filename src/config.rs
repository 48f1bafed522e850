//! Configuration types for a capture-and-assemble run.
//!
//! Every knob lives in [`DownloadConfig`], built via its
//! [`DownloadConfigBuilder`]. Setters clamp obviously out-of-range values;
//! [`DownloadConfigBuilder::build`] rejects combinations that cannot work.

use crate::error::BoxPdfError;
use crate::progress::ProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Tesseract language list: one or more codes joined with `+` (`eng`, `eng+fra`, `chi_sim`).
static OCR_LANGUAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+(\+[A-Za-z0-9_]+)*$").unwrap());

/// Configuration for one run of the pipeline.
///
/// # Example
/// ```rust
/// use boxpdf::DownloadConfig;
///
/// let config = DownloadConfig::builder()
///     .max_pages(10)
///     .grayscale(true)
///     .ocr(true)
///     .ocr_language("eng+fra")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_pages, Some(10));
/// ```
#[derive(Clone)]
pub struct DownloadConfig {
    /// Maximum time to wait for the preview to render its first page. Default: 15 s.
    pub wait_time: Duration,

    /// Pause unit between pages. The loop sleeps a fifth of it after each
    /// "next page" click. Default: 1.5 s.
    pub scroll_pause: Duration,

    /// Capture at most this many pages. Default: unlimited.
    pub max_pages: Option<usize>,

    /// How long the in-page capture script waits for a page surface. Default: 2000 ms.
    pub page_render_timeout_ms: u64,

    /// Minimum intrinsic width (px) for a canvas or image to count as a page. Default: 800.
    pub min_page_width: u32,

    /// Browser window size in CSS pixels. Default: 2560 × 4000.
    pub window_size: (u32, u32),

    /// Device scale factor; 2 doubles the resolution of rendered pages. Default: 2.0.
    pub device_scale_factor: f64,

    /// Chrome/Chromium executable. If None, chromiumoxide auto-detects one.
    pub chrome_executable: Option<PathBuf>,

    /// Run Chrome without a visible window. Default: true.
    pub headless: bool,

    /// Pass `--no-sandbox` to Chrome (needed in some containers). Default: false.
    pub no_sandbox: bool,

    /// Folder receiving the image directory and the PDFs. Default: `dl_files`.
    pub output_dir: PathBuf,

    /// Assemble the captured images into a PDF. Default: true.
    pub make_pdf: bool,

    /// Keep page images after the PDF is written. Default: true.
    pub keep_images: bool,

    /// Rewrite every page image as 8-bit grayscale before assembly. Default: false.
    pub grayscale: bool,

    /// Add a text layer with ocrmypdf. Default: false.
    pub ocr: bool,

    /// OCR language(s) passed to ocrmypdf. Default: `eng`.
    pub ocr_language: String,

    /// Parallel jobs for ocrmypdf. Default: 4.
    pub ocr_jobs: usize,

    /// PDF backend. Default: [`Assembler::Native`].
    pub assembler: Assembler,

    /// Resolution assumed when sizing PDF pages from pixel dimensions. Default: 96.
    pub image_dpi: u32,

    /// Program invoked for [`Assembler::Img2Pdf`]. Default: `img2pdf`.
    pub img2pdf_program: PathBuf,

    /// Program invoked for the OCR pass. Default: `ocrmypdf`.
    pub ocr_program: PathBuf,

    /// Probe the viewer URL over HTTP before launching Chrome. Default: true.
    pub preflight: bool,

    /// Timeout for the probe, in seconds. Default: 30.
    pub preflight_timeout_secs: u64,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            wait_time: Duration::from_secs(15),
            scroll_pause: Duration::from_millis(1500),
            max_pages: None,
            page_render_timeout_ms: 2000,
            min_page_width: 800,
            window_size: (2560, 4000),
            device_scale_factor: 2.0,
            chrome_executable: None,
            headless: true,
            no_sandbox: false,
            output_dir: PathBuf::from("dl_files"),
            make_pdf: true,
            keep_images: true,
            grayscale: false,
            ocr: false,
            ocr_language: "eng".to_string(),
            ocr_jobs: 4,
            assembler: Assembler::default(),
            image_dpi: 96,
            img2pdf_program: PathBuf::from("img2pdf"),
            ocr_program: PathBuf::from("ocrmypdf"),
            preflight: true,
            preflight_timeout_secs: 30,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DownloadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadConfig")
            .field("wait_time", &self.wait_time)
            .field("scroll_pause", &self.scroll_pause)
            .field("max_pages", &self.max_pages)
            .field("window_size", &self.window_size)
            .field("device_scale_factor", &self.device_scale_factor)
            .field("chrome_executable", &self.chrome_executable)
            .field("headless", &self.headless)
            .field("output_dir", &self.output_dir)
            .field("make_pdf", &self.make_pdf)
            .field("keep_images", &self.keep_images)
            .field("grayscale", &self.grayscale)
            .field("ocr", &self.ocr)
            .field("ocr_language", &self.ocr_language)
            .field("assembler", &self.assembler)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ProgressCallback>"),
            )
            .finish()
    }
}

impl DownloadConfig {
    /// Create a new builder for `DownloadConfig`.
    pub fn builder() -> DownloadConfigBuilder {
        DownloadConfigBuilder {
            config: Self::default(),
        }
    }

    /// Delay after clicking "next page".
    pub fn page_turn_delay(&self) -> Duration {
        self.scroll_pause / 5
    }
}

/// Builder for [`DownloadConfig`].
#[derive(Debug)]
pub struct DownloadConfigBuilder {
    config: DownloadConfig,
}

impl DownloadConfigBuilder {
    pub fn wait_time(mut self, wait: Duration) -> Self {
        self.config.wait_time = wait;
        self
    }

    pub fn scroll_pause(mut self, pause: Duration) -> Self {
        self.config.scroll_pause = pause;
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = Some(n);
        self
    }

    pub fn page_render_timeout_ms(mut self, ms: u64) -> Self {
        self.config.page_render_timeout_ms = ms.max(100);
        self
    }

    pub fn min_page_width(mut self, px: u32) -> Self {
        self.config.min_page_width = px;
        self
    }

    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.config.window_size = (width.max(320), height.max(240));
        self
    }

    pub fn device_scale_factor(mut self, factor: f64) -> Self {
        self.config.device_scale_factor = factor.clamp(0.5, 4.0);
        self
    }

    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_executable = Some(path.into());
        self
    }

    pub fn headless(mut self, v: bool) -> Self {
        self.config.headless = v;
        self
    }

    pub fn no_sandbox(mut self, v: bool) -> Self {
        self.config.no_sandbox = v;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn make_pdf(mut self, v: bool) -> Self {
        self.config.make_pdf = v;
        self
    }

    pub fn keep_images(mut self, v: bool) -> Self {
        self.config.keep_images = v;
        self
    }

    pub fn grayscale(mut self, v: bool) -> Self {
        self.config.grayscale = v;
        self
    }

    pub fn ocr(mut self, v: bool) -> Self {
        self.config.ocr = v;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn ocr_jobs(mut self, n: usize) -> Self {
        self.config.ocr_jobs = n.max(1);
        self
    }

    pub fn assembler(mut self, assembler: Assembler) -> Self {
        self.config.assembler = assembler;
        self
    }

    pub fn image_dpi(mut self, dpi: u32) -> Self {
        self.config.image_dpi = dpi.clamp(36, 1200);
        self
    }

    pub fn img2pdf_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.img2pdf_program = program.into();
        self
    }

    pub fn ocr_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.ocr_program = program.into();
        self
    }

    pub fn preflight(mut self, v: bool) -> Self {
        self.config.preflight = v;
        self
    }

    pub fn preflight_timeout_secs(mut self, secs: u64) -> Self {
        self.config.preflight_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DownloadConfig, BoxPdfError> {
        let c = &self.config;
        if c.wait_time < Duration::from_secs(1) {
            return Err(BoxPdfError::InvalidConfig(format!(
                "wait time must be at least 1s, got {:?}",
                c.wait_time
            )));
        }
        if c.max_pages == Some(0) {
            return Err(BoxPdfError::InvalidConfig(
                "max pages must be ≥ 1 when set".into(),
            ));
        }
        if !OCR_LANGUAGE_RE.is_match(&c.ocr_language) {
            return Err(BoxPdfError::InvalidConfig(format!(
                "OCR language '{}' is not a '+'-joined list of language codes",
                c.ocr_language
            )));
        }
        if c.ocr && !c.make_pdf {
            return Err(BoxPdfError::InvalidConfig(
                "OCR needs a PDF to work on; drop --no-pdf or --ocr".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Backend that turns the ordered image set into one PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Assembler {
    /// Built-in writer (lopdf). JPEGs are embedded without re-encoding.
    #[default]
    Native,
    /// External `img2pdf` program.
    Img2Pdf,
}

impl fmt::Display for Assembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assembler::Native => f.write_str("native"),
            Assembler::Img2Pdf => f.write_str("img2pdf"),
        }
    }
}
