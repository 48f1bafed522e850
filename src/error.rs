//! Error types for the boxpdf library.
//!
//! Two error types reflect two failure modes:
//!
//! * [`BoxPdfError`] — **Fatal**: the run cannot continue (bad URL, viewer
//!   unreachable, no pages rendered, external tool missing or failing).
//!   Returned as `Err(BoxPdfError)` from every pipeline stage.
//!
//! * [`PageError`] — **Non-fatal**: the viewer did not render one page, or
//!   its image could not be written. Collected in
//!   [`crate::output::CaptureOutput::missed`]; the capture loop moves on.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the boxpdf library.
#[derive(Debug, Error)]
pub enum BoxPdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The argument is not an HTTP/HTTPS URL.
    #[error("Invalid URL '{url}': expected an http:// or https:// link")]
    InvalidUrl { url: String },

    /// The URL is well formed but does not point at a Box.com viewer.
    #[error("URL '{url}' is not a box.com shared link")]
    UnsupportedHost { url: String },

    /// Neither or both of URL and image directory were supplied.
    #[error("Provide either a viewer URL or an image directory (--from-images), not {0}")]
    AmbiguousSource(&'static str),

    /// `--from-images` pointed at something that is not a directory.
    #[error("Image directory not found: '{path}'")]
    ImageDirNotFound { path: PathBuf },

    /// The image directory holds no `page_*.png` / `page_*.jpg` files.
    #[error("No page images found in '{path}'\nExpected files named page_0001.png, page_0002.jpg, …")]
    NoImagesFound { path: PathBuf },

    // ── Viewer errors ─────────────────────────────────────────────────────
    /// Reachability check failed before the browser was launched.
    #[error("Viewer '{url}' cannot be reached: {reason}\nCheck your internet connection or pass --skip-preflight.")]
    ViewerUnreachable { url: String, reason: String },

    /// Reachability check exceeded its timeout.
    #[error("Viewer '{url}' did not answer within {secs}s")]
    PreflightTimeout { url: String, secs: u64 },

    /// Chrome could not be started.
    #[error(
        "Failed to launch Chrome: {0}\n\n\
Install Chrome or Chromium, or point at an existing binary with --chrome-path.\n\
Inside containers you may also need --no-sandbox.\n"
    )]
    BrowserLaunch(String),

    /// A DevTools command failed while driving the viewer.
    #[error("Browser error while {action}: {detail}")]
    Browser { action: &'static str, detail: String },

    /// The capture loop finished without saving a single page.
    #[error("No pages could be captured from '{url}'\nThe preview may not have loaded; try a larger --wait-time.")]
    NoPagesCaptured { url: String },

    /// Ctrl-C arrived while the browser was running.
    #[error("Interrupted after capturing {captured} pages")]
    Interrupted { captured: usize },

    // ── Image errors ──────────────────────────────────────────────────────
    /// A page image could not be decoded or re-encoded.
    #[error("Failed to process image '{path}': {detail}")]
    ImageFailed { path: PathBuf, detail: String },

    // ── Assembly / OCR errors ─────────────────────────────────────────────
    /// The native PDF writer failed.
    #[error("PDF assembly failed: {0}")]
    AssemblyFailed(String),

    /// An external program is not installed or not on PATH.
    #[error("'{tool}' is not installed or not on PATH.\n{hint}")]
    ToolNotFound { tool: String, hint: String },

    /// An external program exited unsuccessfully.
    #[error("'{tool}' failed with exit code {}\n{stderr}", describe_code(.code))]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create, write or remove a file or directory.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BoxPdfError {
    /// Wrap an I/O error together with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BoxPdfError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn browser(action: &'static str, err: impl std::fmt::Display) -> Self {
        BoxPdfError::Browser {
            action,
            detail: err.to_string(),
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "<signal>".to_string(), |c| c.to_string())
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The viewer showed nothing capturable within the render timeout.
    #[error("Page {page}: nothing rendered within {timeout_ms}ms")]
    CaptureMissed { page: usize, timeout_ms: u64 },

    /// The captured data could not be decoded or written.
    #[error("Page {page}: could not save capture: {detail}")]
    SaveFailed { page: usize, detail: String },
}

impl PageError {
    /// The viewer page number this error refers to.
    pub fn page(&self) -> usize {
        match self {
            PageError::CaptureMissed { page, .. } | PageError::SaveFailed { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_failed_display_with_code() {
        let e = BoxPdfError::ToolFailed {
            tool: "ocrmypdf".into(),
            code: Some(2),
            stderr: "bad input".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("ocrmypdf"), "got: {msg}");
        assert!(msg.contains("exit code 2"), "got: {msg}");
        assert!(msg.contains("bad input"), "got: {msg}");
    }

    #[test]
    fn tool_failed_display_killed_by_signal() {
        let e = BoxPdfError::ToolFailed {
            tool: "img2pdf".into(),
            code: None,
            stderr: String::new(),
        };
        assert!(e.to_string().contains("<signal>"));
    }

    #[test]
    fn no_pages_display_mentions_url() {
        let e = BoxPdfError::NoPagesCaptured {
            url: "https://app.box.com/s/abc".into(),
        };
        assert!(e.to_string().contains("https://app.box.com/s/abc"));
    }

    #[test]
    fn page_error_reports_page() {
        let e = PageError::CaptureMissed {
            page: 7,
            timeout_ms: 2000,
        };
        assert_eq!(e.page(), 7);
        assert!(e.to_string().contains("2000ms"));

        let e = PageError::SaveFailed {
            page: 3,
            detail: "disk full".into(),
        };
        assert_eq!(e.page(), 3);
    }

    #[test]
    fn io_helper_keeps_path() {
        let e = BoxPdfError::io(
            "/tmp/x.pdf",
            std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        );
        assert!(e.to_string().contains("/tmp/x.pdf"));
    }
}
