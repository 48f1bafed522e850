//! Run entry points: capture from a viewer, or start from existing images,
//! then grayscale → assemble → OCR → cleanup.
//!
//! Both entry points converge on [`finish`], so the same image set produces
//! the same PDF no matter how it got onto disk.
//!
//! Ctrl-C is handled for the whole run: whichever stage is active stops, the
//! browser is closed, half-written PDFs are removed, and the run returns
//! [`BoxPdfError::Interrupted`].

use crate::config::DownloadConfig;
use crate::error::BoxPdfError;
use crate::output::{CaptureOutput, RunOutput, RunStats};
use crate::pipeline::capture::capture_into;
use crate::pipeline::input::{self, Source};
use crate::pipeline::viewer::{ChromeViewer, Viewer};
use crate::pipeline::{assemble, cleanup, grayscale, images, ocr};
use crate::progress::Stage;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Capture a Box.com preview and turn it into a PDF.
///
/// # Errors
/// Returns `Err(BoxPdfError)` only for fatal errors: a bad or unreachable
/// link, Chrome failing, no page captured, or a later stage failing. Pages
/// the viewer did not render are reported in
/// [`RunStats::missed_pages`] instead.
pub async fn download(
    url: impl AsRef<str>,
    config: &DownloadConfig,
) -> Result<RunOutput, BoxPdfError> {
    let mut interrupt = interrupt();
    let captured = capture_inner(url.as_ref(), config, &mut interrupt).await?;
    finish_inner(captured, config, &mut interrupt).await
}

/// Build the PDF from `page_*` images already on disk.
pub async fn process_images(
    dir: impl AsRef<Path>,
    config: &DownloadConfig,
) -> Result<RunOutput, BoxPdfError> {
    let dir = dir.as_ref();
    let images = images::list_page_images(dir)?;
    info!("Using {} existing images from {}", images.len(), dir.display());

    finish(
        CaptureOutput {
            title: input::title_from_dir(dir),
            image_dir: dir.to_path_buf(),
            images,
            detected_pages: None,
            missed: Vec::new(),
            duration_ms: 0,
        },
        config,
    )
    .await
}

/// Dispatch on the resolved [`Source`].
pub async fn run(source: &Source, config: &DownloadConfig) -> Result<RunOutput, BoxPdfError> {
    match source {
        Source::Viewer(url) => download(url.as_str(), config).await,
        Source::Images(dir) => process_images(dir, config).await,
    }
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn download_sync(source: &Source, config: &DownloadConfig) -> Result<RunOutput, BoxPdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BoxPdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(source, config))
}

/// Capture only: validate the link, launch Chrome and save every page.
pub async fn capture(
    url: impl AsRef<str>,
    config: &DownloadConfig,
) -> Result<CaptureOutput, BoxPdfError> {
    capture_inner(url.as_ref(), config, &mut interrupt()).await
}

async fn capture_inner(
    url: &str,
    config: &DownloadConfig,
    interrupt: &mut Interrupt,
) -> Result<CaptureOutput, BoxPdfError> {
    let url = input::validate_viewer_url(url)?;
    if config.preflight {
        input::preflight(&url, config.preflight_timeout_secs).await?;
    }

    let mut viewer = ChromeViewer::launch(url.as_str(), config).await?;
    capture_closing(&mut viewer, url.as_str(), config, interrupt).await
}

/// Capture from an already opened [`Viewer`], which is closed afterwards
/// whatever the outcome.
///
/// Images go to `<output_dir>/<title>/`; page images left there by an earlier
/// run are removed first so the directory holds exactly this capture.
pub async fn capture_with<V: Viewer + ?Sized>(
    viewer: &mut V,
    url: &str,
    config: &DownloadConfig,
) -> Result<CaptureOutput, BoxPdfError> {
    capture_closing(viewer, url, config, &mut interrupt()).await
}

async fn capture_closing<V: Viewer + ?Sized>(
    viewer: &mut V,
    url: &str,
    config: &DownloadConfig,
    interrupt: &mut Interrupt,
) -> Result<CaptureOutput, BoxPdfError> {
    let result = capture_open(viewer, url, config, interrupt).await;
    if let Err(e) = viewer.close().await {
        warn!("Closing the viewer failed: {}", e);
    }
    result
}

async fn capture_open<V: Viewer + ?Sized>(
    viewer: &mut V,
    url: &str,
    config: &DownloadConfig,
    interrupt: &mut Interrupt,
) -> Result<CaptureOutput, BoxPdfError> {
    let start = Instant::now();
    let tab_title = viewer.title().await?;
    let title = input::title_from_tab(&tab_title);
    info!("Document title: {}", title);

    let image_dir = config.output_dir.join(&title);
    tokio::fs::create_dir_all(&image_dir)
        .await
        .map_err(|e| BoxPdfError::io(&image_dir, e))?;
    remove_stale_images(&image_dir).await?;

    let tally = AtomicUsize::new(0);
    let pages = tokio::select! {
        res = capture_into(viewer, &image_dir, config, &tally) => res?,
        _ = interrupt => {
            warn!("Interrupted, stopping capture");
            return Err(BoxPdfError::Interrupted {
                captured: tally.load(Ordering::SeqCst),
            });
        }
    };

    if pages.images.is_empty() {
        return Err(BoxPdfError::NoPagesCaptured {
            url: url.to_string(),
        });
    }

    Ok(CaptureOutput {
        title,
        image_dir,
        images: pages.images,
        detected_pages: pages.detected_pages,
        missed: pages.missed,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
///
/// One instance is polled by every stage of a run, so a signal that arrives
/// between two stages is still seen by the next one.
type Interrupt = Pin<Box<dyn Future<Output = ()> + Send>>;

fn interrupt() -> Interrupt {
    Box::pin(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            debug!("Ctrl-C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    })
}

async fn remove_stale_images(dir: &Path) -> Result<(), BoxPdfError> {
    let stale = match images::list_page_images(dir) {
        Ok(stale) => stale,
        Err(BoxPdfError::NoImagesFound { .. }) => return Ok(()),
        Err(e) => return Err(e),
    };
    debug!("Removing {} images from an earlier run", stale.len());
    for path in &stale {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| BoxPdfError::io(path, e))?;
    }
    Ok(())
}

/// Shared tail of every run: grayscale → assemble → OCR → cleanup.
pub async fn finish(
    captured: CaptureOutput,
    config: &DownloadConfig,
) -> Result<RunOutput, BoxPdfError> {
    finish_inner(captured, config, &mut interrupt()).await
}

async fn finish_inner(
    captured: CaptureOutput,
    config: &DownloadConfig,
    interrupt: &mut Interrupt,
) -> Result<RunOutput, BoxPdfError> {
    let count = captured.images.len();
    let (pdf_path, ocr_path) = pdf_paths(config, &captured.title);

    tokio::select! {
        res = finish_stages(captured, config) => res,
        _ = interrupt => {
            warn!("Interrupted, stopping");
            for tmp in [pdf_path.with_extension("pdf.tmp"), ocr_path.with_extension("pdf.tmp")] {
                let _ = tokio::fs::remove_file(&tmp).await;
            }
            Err(BoxPdfError::Interrupted { captured: count })
        }
    }
}

/// `<out>/<title>.pdf` and `<out>/<title>_ocr.pdf`.
fn pdf_paths(config: &DownloadConfig, title: &str) -> (PathBuf, PathBuf) {
    (
        config.output_dir.join(format!("{title}.pdf")),
        config.output_dir.join(format!("{title}_ocr.pdf")),
    )
}

async fn finish_stages(
    captured: CaptureOutput,
    config: &DownloadConfig,
) -> Result<RunOutput, BoxPdfError> {
    let start = Instant::now();
    let CaptureOutput {
        title,
        image_dir,
        images,
        detected_pages,
        missed,
        duration_ms,
    } = captured;

    let mut stats = RunStats {
        detected_pages,
        page_count: images.len(),
        missed_pages: missed.len(),
        capture_duration_ms: duration_ms,
        ..Default::default()
    };
    let stage = |s: Stage| {
        if let Some(ref cb) = config.progress_callback {
            cb.on_stage(s);
        }
    };

    if config.grayscale {
        stage(Stage::Grayscale);
        let t = Instant::now();
        grayscale::grayscale_images(&images).await?;
        stats.grayscale_duration_ms = t.elapsed().as_millis() as u64;
    }

    let mut pdf_path: Option<PathBuf> = None;
    let mut ocr_pdf_path: Option<PathBuf> = None;
    if config.make_pdf {
        stage(Stage::Assemble);
        let t = Instant::now();
        let (path, ocr_path) = pdf_paths(config, &title);
        assemble::assemble_pdf(&images, &path, &title, config).await?;
        stats.assemble_duration_ms = t.elapsed().as_millis() as u64;
        info!("PDF saved: {}", path.display());

        if config.ocr {
            stage(Stage::Ocr);
            let t = Instant::now();
            ocr::ocr_pdf(&path, &ocr_path, config).await?;
            stats.ocr_duration_ms = t.elapsed().as_millis() as u64;
            ocr_pdf_path = Some(ocr_path);
        }
        pdf_path = Some(path);
    }

    let mut images_deleted = false;
    if !config.keep_images {
        if pdf_path.is_some() {
            stage(Stage::Cleanup);
            cleanup::remove_images(&images, &image_dir).await?;
            images_deleted = true;
        } else {
            warn!("No PDF was created, keeping images in {}", image_dir.display());
        }
    }

    stats.total_duration_ms = duration_ms + start.elapsed().as_millis() as u64;
    info!(
        "Done: {} pages, {}ms total",
        stats.page_count, stats.total_duration_ms
    );

    Ok(RunOutput {
        title,
        image_dir,
        images,
        pdf_path,
        ocr_pdf_path,
        images_deleted,
        stats,
    })
}
