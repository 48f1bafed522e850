//! # boxpdf
//!
//! Save a Box.com shared-link preview as a PDF.
//!
//! Box previews render each page into a canvas or an inline image, and the
//! download button is often disabled. This crate drives a real Chrome over the
//! DevTools protocol, saves every rendered page as an image, and assembles the
//! images into one PDF, optionally grayscale and with an OCR text layer.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Box.com link
//!  │
//!  ├─ 1. Input      validate the link, probe it over HTTP
//!  ├─ 2. Capture    Chrome pages through the preview, page_0001.png …
//!  ├─ 3. Grayscale  optional, in place
//!  ├─ 4. Assemble   one PDF page per image (lopdf or img2pdf)
//!  ├─ 5. OCR        optional ocrmypdf pass → <title>_ocr.pdf
//!  └─ 6. Cleanup    optional removal of the images
//! ```
//!
//! An existing image directory can enter at step 3 with [`process_images`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use boxpdf::{download, DownloadConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DownloadConfig::builder()
//!         .max_pages(10)
//!         .grayscale(true)
//!         .build()?;
//!     let output = download("https://app.box.com/s/abc123", &config).await?;
//!     println!("{:?}", output.pdf_path);
//!     eprintln!("{} pages, {} missed", output.stats.page_count, output.stats.missed_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `boxpdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## External Tools
//!
//! | Tool | Needed for |
//! |------|------------|
//! | Chrome / Chromium | capturing from a link |
//! | `ocrmypdf` | `--ocr` |
//! | `img2pdf` | `--assembler img2pdf` only |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod run;
pub mod scripts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Assembler, DownloadConfig, DownloadConfigBuilder};
pub use error::{BoxPdfError, PageError};
pub use output::{CaptureOutput, RunOutput, RunStats};
pub use pipeline::input::{resolve_source, validate_viewer_url, Source};
pub use pipeline::viewer::{ChromeViewer, RawCapture, Viewer};
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback, Stage};
pub use run::{capture, capture_with, download, download_sync, finish, process_images, run};
