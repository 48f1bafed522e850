//! Progress-callback trait for capture and pipeline events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::DownloadConfigBuilder::progress_callback`] to receive
//! events as pages are captured and as later stages start.
//!
//! # Example
//!
//! ```rust
//! use boxpdf::{DownloadConfig, RunProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     captured: AtomicUsize,
//! }
//!
//! impl RunProgressCallback for CountingCallback {
//!     fn on_page_captured(&self, page_num: usize, _expected: Option<usize>, bytes: usize) {
//!         self.captured.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}: {bytes} bytes");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { captured: AtomicUsize::new(0) });
//!
//! let config = DownloadConfig::builder()
//!     .progress_callback(counter as Arc<dyn RunProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// A post-capture pipeline stage, reported through [`RunProgressCallback::on_stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Grayscale,
    Assemble,
    Ocr,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Grayscale => "Converting to grayscale",
            Stage::Assemble => "Creating PDF",
            Stage::Ocr => "Running OCR",
            Stage::Cleanup => "Removing page images",
        };
        f.write_str(name)
    }
}

/// Called by the pipeline as it captures pages and runs later stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The pipeline is sequential, but implementations must
/// still be `Send + Sync` so the config can cross task boundaries.
pub trait RunProgressCallback: Send + Sync {
    /// Called once before the first page is captured.
    ///
    /// # Arguments
    /// * `expected` — page count read from the viewer, or the page limit if
    ///   lower; `None` when neither is known
    fn on_capture_start(&self, expected: Option<usize>) {
        let _ = expected;
    }

    /// Called after a page image has been written.
    ///
    /// # Arguments
    /// * `page_num` — 1-based index of the saved image
    /// * `expected` — same value passed to `on_capture_start`
    /// * `bytes`    — size of the written image file
    fn on_page_captured(&self, page_num: usize, expected: Option<usize>, bytes: usize) {
        let _ = (page_num, expected, bytes);
    }

    /// Called when the viewer page `target_page` yielded no image.
    fn on_page_missed(&self, target_page: usize, error: &str) {
        let _ = (target_page, error);
    }

    /// Called once after the capture loop ends.
    fn on_capture_complete(&self, captured: usize) {
        let _ = captured;
    }

    /// Called as each post-capture stage begins.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DownloadConfig`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        captured: AtomicUsize,
        missed: AtomicUsize,
        expected: Mutex<Option<usize>>,
        stages: Mutex<Vec<Stage>>,
    }

    impl RunProgressCallback for TrackingCallback {
        fn on_capture_start(&self, expected: Option<usize>) {
            *self.expected.lock().unwrap() = expected;
        }

        fn on_page_captured(&self, _page_num: usize, _expected: Option<usize>, _bytes: usize) {
            self.captured.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_missed(&self, _target_page: usize, _error: &str) {
            self.missed.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage(&self, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_capture_start(Some(5));
        cb.on_page_captured(1, Some(5), 42);
        cb.on_page_missed(2, "nothing rendered");
        cb.on_capture_complete(4);
        cb.on_stage(Stage::Assemble);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_capture_start(Some(3));
        tracker.on_page_captured(1, Some(3), 100);
        tracker.on_page_missed(2, "timeout");
        tracker.on_page_captured(2, Some(3), 200);
        tracker.on_stage(Stage::Grayscale);
        tracker.on_stage(Stage::Assemble);

        assert_eq!(*tracker.expected.lock().unwrap(), Some(3));
        assert_eq!(tracker.captured.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.missed.load(Ordering::SeqCst), 1);
        assert_eq!(
            *tracker.stages.lock().unwrap(),
            vec![Stage::Grayscale, Stage::Assemble]
        );
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::Ocr.to_string(), "Running OCR");
        assert_eq!(Stage::Cleanup.to_string(), "Removing page images");
    }
}
