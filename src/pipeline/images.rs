//! Page image naming and discovery.
//!
//! Pages are stored as `page_{n:04}.{png|jpg}` with `n` starting at 1. Listing
//! sorts on the parsed number, which matches plain filename order for the
//! zero-padded names and keeps working past page 9999.

use crate::error::BoxPdfError;
use crate::pipeline::decode::PageFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

static RE_PAGE_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^page_(\d+)\.(png|jpe?g)$").unwrap());

/// File name for the `n`-th captured page (1-based).
pub fn page_file_name(n: usize, format: PageFormat) -> String {
    format!("page_{:04}.{}", n, format.extension())
}

/// Page number encoded in a file name, if it follows the `page_N.ext` scheme.
pub fn page_number(file_name: &str) -> Option<usize> {
    RE_PAGE_FILE
        .captures(file_name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// List the page images in `dir`, in page order.
///
/// Files that do not match `page_N.{png,jpg,jpeg}` are ignored.
///
/// # Errors
/// `Io` if the directory cannot be read, `NoImagesFound` if it holds no pages.
pub fn list_page_images(dir: &Path) -> Result<Vec<PathBuf>, BoxPdfError> {
    let entries = std::fs::read_dir(dir).map_err(|e| BoxPdfError::io(dir, e))?;

    let mut pages: Vec<(usize, String, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BoxPdfError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(n) = page_number(&name) {
            pages.push((n, name, path));
        }
    }

    if pages.is_empty() {
        return Err(BoxPdfError::NoImagesFound {
            path: dir.to_path_buf(),
        });
    }

    pages.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    debug!("Found {} page images in {}", pages.len(), dir.display());
    Ok(pages.into_iter().map(|(_, _, p)| p).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_zero_padded() {
        assert_eq!(page_file_name(1, PageFormat::Png), "page_0001.png");
        assert_eq!(page_file_name(42, PageFormat::Jpeg), "page_0042.jpg");
        assert_eq!(page_file_name(12345, PageFormat::Png), "page_12345.png");
    }

    #[test]
    fn parses_page_numbers() {
        assert_eq!(page_number("page_0007.png"), Some(7));
        assert_eq!(page_number("page_12.JPG"), Some(12));
        assert_eq!(page_number("page_3.jpeg"), Some(3));
        assert_eq!(page_number("page_x.png"), None);
        assert_eq!(page_number("cover.png"), None);
        assert_eq!(page_number("page_0001.png.tmp"), None);
    }

    #[test]
    fn lists_in_page_order_and_skips_strays() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "page_0010.png",
            "page_0002.jpg",
            "page_0001.png",
            "page_10000.png",
            "notes.txt",
            "thumb.png",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("page_0003.png")).unwrap();

        let listed: Vec<String> = list_page_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            listed,
            vec!["page_0001.png", "page_0002.jpg", "page_0010.png", "page_10000.png"]
        );
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.md"), b"x").unwrap();
        assert!(matches!(
            list_page_images(dir.path()),
            Err(BoxPdfError::NoImagesFound { .. })
        ));
    }
}
