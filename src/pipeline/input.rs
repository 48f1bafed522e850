//! Input resolution: validate the viewer URL or the existing image directory.
//!
//! The browser is the slowest and most fragile collaborator, so everything
//! that can be checked without it is checked here first: URL syntax, that the
//! host is Box.com, and (optionally) that the link answers over plain HTTP.

use crate::error::BoxPdfError;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Where the page images come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Capture from a Box.com preview.
    Viewer(Url),
    /// Skip capture; assemble images already on disk.
    Images(PathBuf),
}

/// Characters that cannot appear in a file name on at least one platform.
static RE_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).unwrap());

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Parse `input` and accept it only if it is an http(s) link on `box.com`
/// or one of its subdomains (`app.box.com`, `acme.app.box.com`).
pub fn validate_viewer_url(input: &str) -> Result<Url, BoxPdfError> {
    let trimmed = input.trim();
    if !is_url(trimmed) {
        return Err(BoxPdfError::InvalidUrl {
            url: input.to_string(),
        });
    }
    let url = Url::parse(trimmed).map_err(|_| BoxPdfError::InvalidUrl {
        url: input.to_string(),
    })?;

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    if host != "box.com" && !host.ends_with(".box.com") {
        return Err(BoxPdfError::UnsupportedHost {
            url: input.to_string(),
        });
    }
    Ok(url)
}

/// Turn the CLI's two mutually exclusive inputs into a [`Source`].
pub fn resolve_source(
    url: Option<&str>,
    from_images: Option<&Path>,
) -> Result<Source, BoxPdfError> {
    match (url, from_images) {
        (Some(_), Some(_)) => Err(BoxPdfError::AmbiguousSource("both")),
        (None, None) => Err(BoxPdfError::AmbiguousSource("neither")),
        (Some(u), None) => validate_viewer_url(u).map(Source::Viewer),
        (None, Some(dir)) => {
            if !dir.is_dir() {
                return Err(BoxPdfError::ImageDirNotFound {
                    path: dir.to_path_buf(),
                });
            }
            debug!("Using existing images in {}", dir.display());
            Ok(Source::Images(dir.to_path_buf()))
        }
    }
}

/// Probe the viewer with a single GET so an unreachable link fails before
/// Chrome is started.
pub async fn preflight(url: &Url, timeout_secs: u64) -> Result<(), BoxPdfError> {
    info!("Checking that {} is reachable", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| BoxPdfError::ViewerUnreachable {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url.clone()).send().await.map_err(|e| {
        if e.is_timeout() {
            BoxPdfError::PreflightTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            BoxPdfError::ViewerUnreachable {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(BoxPdfError::ViewerUnreachable {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }
    debug!("Preflight OK: HTTP {}", response.status());
    Ok(())
}

/// Derive a file-system-safe document name from a browser tab title.
///
/// Box titles look like `Quarterly Report.pdf | Powered by Box`: keep the part
/// before the first `|`, drop the file extension, and replace characters that
/// cannot appear in file names.
pub fn title_from_tab(tab_title: &str) -> String {
    let head = tab_title.split('|').next().unwrap_or_default().trim();
    let stem = match head.rsplit_once('.') {
        Some((stem, ext)) if !stem.trim().is_empty() && !ext.contains(' ') => stem,
        _ => head,
    };
    sanitize_name(stem)
}

/// Document name for `--from-images` runs: the directory's own name.
pub fn title_from_dir(dir: &Path) -> String {
    let name = dir
        .components()
        .next_back()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .unwrap_or_default();
    sanitize_name(&name)
}

fn sanitize_name(raw: &str) -> String {
    let cleaned = RE_UNSAFE.replace_all(raw.trim(), "_");
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned.to_string()
    }
}
