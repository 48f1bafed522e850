//! End-to-end tests against a live Box.com shared link.
//!
//! These launch a real Chrome and hit the network, so they are gated behind
//! the `E2E_ENABLED` environment variable and need a link in `BOXPDF_E2E_URL`.
//!
//! Run with:
//!   E2E_ENABLED=1 BOXPDF_E2E_URL=https://app.box.com/s/... cargo test --test e2e -- --nocapture
//!
//! Set `BOXPDF_E2E_CHROME` to use a specific Chrome binary.

use boxpdf::{
    capture, download, validate_viewer_url, BoxPdfError, DownloadConfig, DownloadConfigBuilder,
    NoopProgressCallback, RunOutput, RunProgressCallback,
};
use lopdf::Document;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED and BOXPDF_E2E_URL are both set.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        match std::env::var("BOXPDF_E2E_URL") {
            Ok(url) if !url.is_empty() => url,
            _ => {
                println!("SKIP — set BOXPDF_E2E_URL to a Box.com shared link");
                return;
            }
        }
    }};
}

fn base_builder(out: &std::path::Path) -> DownloadConfigBuilder {
    let mut builder = DownloadConfig::builder()
        .output_dir(out)
        .no_sandbox(std::env::var("BOXPDF_E2E_NO_SANDBOX").is_ok());
    if let Ok(chrome) = std::env::var("BOXPDF_E2E_CHROME") {
        builder = builder.chrome_executable(chrome);
    }
    builder
}

fn assert_pdf_pages(output: &RunOutput, expected: usize) {
    let pdf = output.pdf_path.as_ref().expect("PDF path");
    let doc = Document::load(pdf).expect("readable PDF");
    assert_eq!(doc.get_pages().len(), expected, "pages in {}", pdf.display());
    println!("✓ {} ({} pages)", pdf.display(), expected);
}

// ── Live capture ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_download_first_two_pages() {
    let url = e2e_skip_unless_ready!();
    let out = tempfile::tempdir().unwrap();
    let config = base_builder(out.path()).max_pages(2).build().unwrap();

    let output = download(&url, &config).await.expect("download should succeed");

    assert_eq!(output.stats.page_count, 2);
    assert_eq!(output.images.len(), 2);
    assert_pdf_pages(&output, 2);
    println!("Stats: {:?}", output.stats);
}

#[tokio::test]
async fn test_capture_reports_progress() {
    struct Counter(AtomicUsize);
    impl RunProgressCallback for Counter {
        fn on_page_captured(&self, _page: usize, _expected: Option<usize>, _bytes: usize) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let url = e2e_skip_unless_ready!();
    let out = tempfile::tempdir().unwrap();
    let counter = Arc::new(Counter(AtomicUsize::new(0)));
    let config = base_builder(out.path())
        .max_pages(3)
        .progress_callback(counter.clone() as Arc<dyn RunProgressCallback>)
        .build()
        .unwrap();

    let captured = capture(&url, &config).await.expect("capture should succeed");

    assert_eq!(counter.0.load(Ordering::SeqCst), captured.images.len());
    assert!(captured.images.len() <= 3);
    for img in &captured.images {
        let decoded = image::open(img).expect("captured image decodes");
        assert!(decoded.width() >= 800, "page narrower than 800px: {}", img.display());
    }
}

#[tokio::test]
async fn test_grayscale_and_delete_images() {
    let url = e2e_skip_unless_ready!();
    let out = tempfile::tempdir().unwrap();
    let config = base_builder(out.path())
        .max_pages(1)
        .grayscale(true)
        .keep_images(false)
        .progress_callback(Arc::new(NoopProgressCallback))
        .build()
        .unwrap();

    let output = download(&url, &config).await.expect("download should succeed");

    assert!(output.images_deleted);
    assert!(!output.image_dir.exists());
    assert_pdf_pages(&output, 1);
}

// ── Failure modes ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unreachable_link_fails_before_chrome() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP");
        return;
    }
    let out = tempfile::tempdir().unwrap();
    let config = base_builder(out.path())
        .chrome_executable("/definitely/not/chrome")
        .preflight_timeout_secs(20)
        .build()
        .unwrap();

    let err = download("https://app.box.com/s/this-link-does-not-exist-000000", &config)
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            BoxPdfError::ViewerUnreachable { .. } | BoxPdfError::PreflightTimeout { .. }
        ),
        "unexpected error: {err}"
    );
}

#[test]
fn test_rejects_non_box_links() {
    assert!(matches!(
        validate_viewer_url("https://example.com/s/abc"),
        Err(BoxPdfError::UnsupportedHost { .. })
    ));
}

#[test]
fn test_noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();
}
