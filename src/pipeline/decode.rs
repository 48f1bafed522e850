//! Data-URL decoding: viewer capture → image bytes plus file extension.
//!
//! The capture script always asks for PNG, but a viewer that serves JPEG
//! tiles can hand those back unchanged. The bytes are sniffed rather than
//! trusting the MIME header, so the extension on disk matches the content.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use tracing::debug;

/// Encoded formats a page image may be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
    Png,
    Jpeg,
}

impl PageFormat {
    /// File extension used for captured pages.
    pub fn extension(self) -> &'static str {
        match self {
            PageFormat::Png => "png",
            PageFormat::Jpeg => "jpg",
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            PageFormat::Png => ImageFormat::Png,
            PageFormat::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// A decoded page, ready to be written to disk.
#[derive(Debug, Clone)]
pub struct DecodedPage {
    pub bytes: Vec<u8>,
    pub format: PageFormat,
}

/// Decode a `data:image/...;base64,...` URL.
///
/// # Errors
/// A human-readable reason when the URL is not base64 image data.
pub fn decode_data_url(data_url: &str) -> Result<DecodedPage, String> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| "not a data: URL".to_string())?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| "data URL has no payload".to_string())?;
    if !header.ends_with(";base64") {
        return Err(format!("unsupported data URL encoding '{header}'"));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("invalid base64: {e}"))?;

    let format = match image::guess_format(&bytes) {
        Ok(ImageFormat::Png) => PageFormat::Png,
        Ok(ImageFormat::Jpeg) => PageFormat::Jpeg,
        Ok(other) => return Err(format!("unsupported image format {other:?}")),
        Err(_) if header.contains("png") => PageFormat::Png,
        Err(_) if header.contains("jpeg") || header.contains("jpg") => PageFormat::Jpeg,
        Err(e) => return Err(format!("unrecognised image data: {e}")),
    };
    debug!("Decoded data URL → {} bytes {:?}", bytes.len(), format);

    Ok(DecodedPage { bytes, format })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encoded(format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 128, 255, 255])));
        let img = if format == ImageFormat::Jpeg {
            DynamicImage::ImageRgb8(img.to_rgb8())
        } else {
            img
        };
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    #[test]
    fn decodes_png() {
        let url = format!("data:image/png;base64,{}", STANDARD.encode(encoded(ImageFormat::Png)));
        let page = decode_data_url(&url).expect("decode");
        assert_eq!(page.format, PageFormat::Png);
        assert_eq!(page.format.extension(), "png");
    }

    #[test]
    fn content_wins_over_header() {
        // JPEG bytes under a PNG header are stored as .jpg
        let url = format!("data:image/png;base64,{}", STANDARD.encode(encoded(ImageFormat::Jpeg)));
        let page = decode_data_url(&url).expect("decode");
        assert_eq!(page.format, PageFormat::Jpeg);
        assert_eq!(page.format.extension(), "jpg");
    }

    #[test]
    fn rejects_malformed_urls() {
        assert!(decode_data_url("https://example.com/a.png").is_err());
        assert!(decode_data_url("data:image/png;base64").is_err());
        assert!(decode_data_url("data:image/png,rawtext").is_err());
        assert!(decode_data_url("data:image/png;base64,!!!").is_err());
        assert!(decode_data_url("data:text/plain;base64,aGVsbG8=").is_err());
    }
}
