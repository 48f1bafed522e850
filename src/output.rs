//! Result types returned by the capture and run entry points.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the capture stage left on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureOutput {
    /// Sanitised document title, also the image directory's name.
    pub title: String,
    /// Directory holding `page_NNNN.*` images.
    pub image_dir: PathBuf,
    /// Saved images in page order.
    pub images: Vec<PathBuf>,
    /// Page count reported by the viewer, if it showed one.
    pub detected_pages: Option<usize>,
    /// Viewer pages that produced no image.
    pub missed: Vec<PageError>,
    /// Wall-clock time spent in the capture loop.
    pub duration_ms: u64,
}

/// Everything a full run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub title: String,
    pub image_dir: PathBuf,
    /// Page images in assembly order. Paths no longer exist when
    /// `images_deleted` is true.
    pub images: Vec<PathBuf>,
    /// Assembled PDF, unless PDF creation was disabled.
    pub pdf_path: Option<PathBuf>,
    /// PDF with the text layer, when OCR ran.
    pub ocr_pdf_path: Option<PathBuf>,
    pub images_deleted: bool,
    pub stats: RunStats,
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Page count the viewer advertised. Always None for `--from-images` runs.
    pub detected_pages: Option<usize>,
    /// Pages in the image set handed to assembly.
    pub page_count: usize,
    /// Viewer pages that could not be captured.
    pub missed_pages: usize,
    pub capture_duration_ms: u64,
    pub grayscale_duration_ms: u64,
    pub assemble_duration_ms: u64,
    pub ocr_duration_ms: u64,
    pub total_duration_ms: u64,
}
