//! The capture loop: page through a [`Viewer`] and save every rendered page.
//!
//! Files are numbered by *captured* page, so a page the viewer fails to
//! render leaves no gap: the image set is always `page_0001 … page_{n}`.
//! With a page limit `L`, the loop stops as soon as `L` images are saved.

use crate::config::DownloadConfig;
use crate::error::{BoxPdfError, PageError};
use crate::pipeline::decode::decode_data_url;
use crate::pipeline::images::page_file_name;
use crate::pipeline::viewer::Viewer;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Upper bound on viewer pages visited when the viewer shows no page count.
pub const FALLBACK_PAGE_CEILING: usize = 500;

/// Re-hover the preview before every this-many pages so the toolbar stays up.
const REVEAL_EVERY: usize = 20;

/// Images saved by one pass of the capture loop.
#[derive(Debug, Clone, Default)]
pub struct CapturedPages {
    /// Written files, in page order.
    pub images: Vec<PathBuf>,
    /// Page count the viewer advertised.
    pub detected_pages: Option<usize>,
    /// Viewer pages that yielded no image.
    pub missed: Vec<PageError>,
}

/// Page through `viewer`, writing each page into `image_dir`.
///
/// `image_dir` must already exist. Browser failures abort the loop; a single
/// page that does not render or cannot be saved is recorded in
/// [`CapturedPages::missed`] and the loop moves on.
pub async fn capture_pages<V: Viewer + ?Sized>(
    viewer: &mut V,
    image_dir: &Path,
    config: &DownloadConfig,
) -> Result<CapturedPages, BoxPdfError> {
    let tally = AtomicUsize::new(0);
    capture_into(viewer, image_dir, config, &tally).await
}

/// [`capture_pages`], publishing the running count of saved pages in `tally`
/// so a caller that cancels the future still knows how far it got.
pub(crate) async fn capture_into<V: Viewer + ?Sized>(
    viewer: &mut V,
    image_dir: &Path,
    config: &DownloadConfig,
    tally: &AtomicUsize,
) -> Result<CapturedPages, BoxPdfError> {
    let limit = config.max_pages;
    info!(
        "Starting capture (max: {})",
        limit.map_or_else(|| "unlimited".to_string(), |n| n.to_string())
    );

    viewer.reveal_controls().await?;
    let detected = viewer.page_count().await?;
    if let Some(n) = detected {
        info!("Viewer reports {} pages", n);
    }

    let expected = match (limit, detected) {
        (Some(l), Some(d)) => Some(l.min(d)),
        (l, d) => l.or(d),
    };
    let mut ceiling = detected.unwrap_or(FALLBACK_PAGE_CEILING);
    if let Some(l) = limit {
        ceiling = ceiling.max(l);
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_capture_start(expected);
    }

    let mut out = CapturedPages {
        detected_pages: detected,
        ..Default::default()
    };

    for target_page in 1..=ceiling {
        if target_page % REVEAL_EVERY == 1 && target_page > 1 {
            viewer.reveal_controls().await?;
        }

        let raw = viewer.capture_page().await?;
        match raw.data_url {
            None => {
                let miss = PageError::CaptureMissed {
                    page: target_page,
                    timeout_ms: config.page_render_timeout_ms,
                };
                warn!("Could not capture page {}", target_page);
                record_miss(config, &mut out, miss);
            }
            Some(data_url) => {
                let n = out.images.len() + 1;
                match save_page(image_dir, n, &data_url).await {
                    Ok((path, bytes)) => {
                        debug!(
                            "Saved page {} ({}x{}, {} bytes) → {}",
                            target_page,
                            raw.width,
                            raw.height,
                            bytes,
                            path.display()
                        );
                        out.images.push(path);
                        tally.store(n, Ordering::SeqCst);
                        if let Some(ref cb) = config.progress_callback {
                            cb.on_page_captured(n, expected, bytes);
                        }
                    }
                    Err(detail) => {
                        warn!("Error saving page {}: {}", target_page, detail);
                        record_miss(
                            config,
                            &mut out,
                            PageError::SaveFailed {
                                page: target_page,
                                detail,
                            },
                        );
                    }
                }
            }
        }

        if limit.is_some_and(|l| out.images.len() >= l) {
            debug!("Page limit reached");
            break;
        }
        if !viewer.next_page().await? {
            debug!("No next page after viewer page {}", target_page);
            break;
        }
        sleep(config.page_turn_delay()).await;
    }

    info!("Captured {} pages", out.images.len());
    if let Some(ref cb) = config.progress_callback {
        cb.on_capture_complete(out.images.len());
    }
    Ok(out)
}

fn record_miss(config: &DownloadConfig, out: &mut CapturedPages, miss: PageError) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_page_missed(miss.page(), &miss.to_string());
    }
    out.missed.push(miss);
}

/// Decode one capture and write it as the `n`-th page image.
async fn save_page(image_dir: &Path, n: usize, data_url: &str) -> Result<(PathBuf, usize), String> {
    let page = decode_data_url(data_url)?;
    let path = image_dir.join(page_file_name(n, page.format));
    tokio::fs::write(&path, &page.bytes)
        .await
        .map_err(|e| format!("{}: {e}", path.display()))?;
    Ok((path, page.bytes.len()))
}
