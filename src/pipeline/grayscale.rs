//! In-place grayscale conversion of page images.
//!
//! Each image is rewritten as 8-bit single-channel in its original format,
//! with any transparency composited over white first.
//! Images that are already single-channel are skipped, so running the stage
//! twice leaves the files byte-for-byte as the first run left them.

use crate::error::BoxPdfError;
use image::{ColorType, DynamicImage, ImageFormat, Rgb, RgbImage, Rgba};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Convert every image in `images` to grayscale, in place.
///
/// Runs on the blocking pool; decoding and re-encoding large PNGs is CPU-bound.
///
/// # Returns
/// How many files were rewritten (already-gray images are not counted).
pub async fn grayscale_images(images: &[PathBuf]) -> Result<usize, BoxPdfError> {
    let images = images.to_vec();
    tokio::task::spawn_blocking(move || {
        let mut rewritten = 0;
        for path in &images {
            if grayscale_in_place(path)? {
                rewritten += 1;
            }
        }
        info!("Converted {} of {} images to grayscale", rewritten, images.len());
        Ok(rewritten)
    })
    .await
    .map_err(|e| BoxPdfError::Internal(format!("Grayscale task panicked: {}", e)))?
}

/// Rewrite one image as 8-bit luma. Returns false if it was already gray.
pub fn grayscale_in_place(path: &Path) -> Result<bool, BoxPdfError> {
    let failed = |detail: String| BoxPdfError::ImageFailed {
        path: path.to_path_buf(),
        detail,
    };

    let format = ImageFormat::from_path(path).map_err(|e| failed(e.to_string()))?;
    let img = image::open(path).map_err(|e| failed(e.to_string()))?;
    if img.color() == ColorType::L8 {
        debug!("{} already grayscale", path.display());
        return Ok(false);
    }

    let gray = DynamicImage::ImageLuma8(flatten_alpha(img).to_luma8());
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| BoxPdfError::io(dir, e))?;
    gray.write_to(tmp.as_file_mut(), format)
        .map_err(|e| failed(e.to_string()))?;
    tmp.persist(path)
        .map_err(|e| BoxPdfError::io(path, e.error))?;

    debug!("Grayscaled {}", path.display());
    Ok(true)
}

/// Composite images with an alpha channel over white.
///
/// Canvas exports are RGBA with a transparent background; dropping alpha
/// outright would turn that background black.
pub fn flatten_alpha(img: DynamicImage) -> DynamicImage {
    if !img.color().has_alpha() {
        return img;
    }
    let gray = matches!(img.color(), ColorType::La8 | ColorType::La16);
    let rgba = img.to_rgba8();
    let rgb = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let a = a as u16;
        let over_white = |c: u8| ((c as u16 * a + 255 * (255 - a)) / 255) as u8;
        Rgb([over_white(r), over_white(g), over_white(b)])
    });
    let flat = DynamicImage::ImageRgb8(rgb);
    if gray {
        DynamicImage::ImageLuma8(flat.to_luma8())
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn converts_rgb_png_and_skips_second_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page_0001.png");
        RgbImage::from_fn(8, 8, |x, y| Rgb([(x * 30) as u8, (y * 30) as u8, 200]))
            .save(&path)
            .unwrap();

        assert!(grayscale_in_place(&path).unwrap());
        assert_eq!(image::open(&path).unwrap().color(), ColorType::L8);

        let before = std::fs::read(&path).unwrap();
        assert!(!grayscale_in_place(&path).unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn transparent_background_becomes_white() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page_0001.png");
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        img.save(&path).unwrap();

        assert!(grayscale_in_place(&path).unwrap());
        let gray = image::open(&path).unwrap().to_luma8();
        assert_eq!(gray.get_pixel(0, 0).0, [0]);
        assert_eq!(gray.get_pixel(3, 3).0, [255]);
    }

    #[test]
    fn flatten_blends_partial_alpha() {
        let pixel = RgbaImage::from_pixel(1, 1, Rgba([0, 100, 255, 128]));
        let flat = flatten_alpha(DynamicImage::ImageRgba8(pixel));
        assert_eq!(flat.color(), ColorType::Rgb8);
        assert_eq!(flat.to_rgb8().get_pixel(0, 0).0, [127, 177, 255]);
    }

    #[test]
    fn jpeg_keeps_its_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page_0001.jpg");
        RgbImage::from_pixel(16, 16, Rgb([10, 120, 240])).save(&path).unwrap();

        assert!(grayscale_in_place(&path).unwrap());
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn unreadable_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page_0001.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(matches!(
            grayscale_in_place(&path),
            Err(BoxPdfError::ImageFailed { .. })
        ));
    }

    #[test]
    fn async_wrapper_counts_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("page_0001.png");
        let b = dir.path().join("page_0002.png");
        RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])).save(&a).unwrap();
        image::GrayImage::from_pixel(4, 4, image::Luma([9])).save(&b).unwrap();

        let n = tokio_test::block_on(grayscale_images(&[a, b])).unwrap();
        assert_eq!(n, 1);
    }
}
