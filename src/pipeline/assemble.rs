//! PDF assembly: ordered page images → one multi-page PDF.
//!
//! Two backends share one contract: N images in, N pages out, same order,
//! written atomically (temp file + rename) so a failed run never leaves a
//! truncated PDF behind.
//!
//! The native backend mirrors what img2pdf does: JPEG data is embedded as-is
//! (`DCTDecode`), anything else is decoded and stored Flate-compressed, and
//! each page is exactly as large as its image at the configured DPI.

use crate::config::{Assembler, DownloadConfig};
use crate::error::BoxPdfError;
use crate::pipeline::grayscale::flatten_alpha;
use crate::pipeline::tool::run_tool;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, ImageDecoder, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::ffi::OsString;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const IMG2PDF_HINT: &str = "Install with: pip install img2pdf (or use --assembler native)";

/// Assemble `images` into `pdf_path` with the configured backend.
pub async fn assemble_pdf(
    images: &[PathBuf],
    pdf_path: &Path,
    title: &str,
    config: &DownloadConfig,
) -> Result<(), BoxPdfError> {
    if images.is_empty() {
        return Err(BoxPdfError::AssemblyFailed("no images to assemble".into()));
    }
    if let Some(parent) = pdf_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BoxPdfError::io(parent, e))?;
    }

    info!(
        "Creating PDF {} from {} images ({})",
        pdf_path.display(),
        images.len(),
        config.assembler
    );

    let tmp_path = pdf_path.with_extension("pdf.tmp");
    let result = match config.assembler {
        Assembler::Native => {
            let images = images.to_vec();
            let title = title.to_string();
            let dpi = config.image_dpi;
            let bytes = tokio::task::spawn_blocking(move || build_pdf(&images, &title, dpi))
                .await
                .map_err(|e| BoxPdfError::Internal(format!("Assembly task panicked: {}", e)))??;
            tokio::fs::write(&tmp_path, &bytes)
                .await
                .map_err(|e| BoxPdfError::io(&tmp_path, e))
        }
        Assembler::Img2Pdf => {
            let mut args: Vec<OsString> = vec!["-o".into(), tmp_path.clone().into_os_string()];
            args.extend(images.iter().map(|p| p.clone().into_os_string()));
            run_tool(&config.img2pdf_program, args, IMG2PDF_HINT)
                .await
                .map(|_| ())
        }
    };

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }

    tokio::fs::rename(&tmp_path, pdf_path)
        .await
        .map_err(|e| BoxPdfError::io(pdf_path, e))?;
    Ok(())
}

/// An image ready to become a PDF XObject.
struct EmbeddedImage {
    width: u32,
    height: u32,
    color_space: &'static str,
    filter: &'static str,
    data: Vec<u8>,
}

/// Build a complete PDF in memory, one page per image, in slice order.
pub fn build_pdf(images: &[PathBuf], title: &str, dpi: u32) -> Result<Vec<u8>, BoxPdfError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let scale = 72.0 / dpi as f32;

    let mut kids: Vec<Object> = Vec::with_capacity(images.len());
    for path in images {
        let img = load_image(path)?;
        let (w, h) = (img.width as f32 * scale, img.height as f32 * scale);

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => img.width as i64,
                "Height" => img.height as i64,
                "ColorSpace" => img.color_space,
                "BitsPerComponent" => 8,
                "Filter" => img.filter,
            },
            img.data,
        ));

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![w.into(), 0.into(), 0.into(), h.into(), 0.into(), 0.into()],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| BoxPdfError::AssemblyFailed(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), w.into(), h.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        kids.push(page_id.into());
        debug!("Added {} as page {}", path.display(), kids.len());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id: ObjectId = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Producer" => Object::string_literal(concat!("boxpdf ", env!("CARGO_PKG_VERSION"))),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| BoxPdfError::AssemblyFailed(e.to_string()))?;
    Ok(buf)
}

fn load_image(path: &Path) -> Result<EmbeddedImage, BoxPdfError> {
    let failed = |detail: String| BoxPdfError::ImageFailed {
        path: path.to_path_buf(),
        detail,
    };
    let bytes = std::fs::read(path).map_err(|e| BoxPdfError::io(path, e))?;

    if image::guess_format(&bytes).ok() == Some(ImageFormat::Jpeg) {
        let decoder = JpegDecoder::new(Cursor::new(&bytes)).map_err(|e| failed(e.to_string()))?;
        let (width, height) = decoder.dimensions();
        let color_space = match decoder.color_type() {
            ColorType::L8 => "DeviceGray",
            ColorType::Rgb8 => "DeviceRGB",
            other => return Err(failed(format!("unsupported JPEG colour type {other:?}"))),
        };
        return Ok(EmbeddedImage {
            width,
            height,
            color_space,
            filter: "DCTDecode",
            data: bytes,
        });
    }

    let decoded = image::load_from_memory(&bytes).map_err(|e| failed(e.to_string()))?;
    let img = flatten_alpha(decoded);
    let (width, height) = (img.width(), img.height());
    let gray = matches!(img.color(), ColorType::L8 | ColorType::L16);
    let (color_space, raw) = if gray {
        ("DeviceGray", img.to_luma8().into_raw())
    } else {
        ("DeviceRGB", img.to_rgb8().into_raw())
    };

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&raw)
        .and_then(|_| encoder.finish())
        .map(|data| EmbeddedImage {
            width,
            height,
            color_space,
            filter: "FlateDecode",
            data,
        })
        .map_err(|e| failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use image::{GrayAlphaImage, GrayImage, Luma, LumaA, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Read;

    #[test]
    fn page_size_follows_dpi() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page_0001.png");
        RgbImage::from_pixel(192, 96, Rgb([255, 0, 0])).save(&path).unwrap();

        let bytes = build_pdf(&[path], "t", 96).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        let w = media_box[2].as_float().unwrap();
        let h = media_box[3].as_float().unwrap();
        assert!((w - 144.0).abs() < 0.01, "width {w}");
        assert!((h - 72.0).abs() < 0.01, "height {h}");
    }

    #[test]
    fn mixed_formats_embed_with_matching_filters() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("page_0001.png");
        let jpg = dir.path().join("page_0002.jpg");
        GrayImage::from_pixel(10, 10, Luma([50])).save(&png).unwrap();
        RgbImage::from_pixel(10, 10, Rgb([1, 2, 3])).save(&jpg).unwrap();

        assert_eq!(load_image(&png).unwrap().filter, "FlateDecode");
        assert_eq!(load_image(&png).unwrap().color_space, "DeviceGray");
        let j = load_image(&jpg).unwrap();
        assert_eq!(j.filter, "DCTDecode");
        assert_eq!(j.color_space, "DeviceRGB");
        assert_eq!(j.data, std::fs::read(&jpg).unwrap());

        let bytes = build_pdf(&[png, jpg], "mixed", 96).unwrap();
        assert_eq!(Document::load_mem(&bytes).unwrap().get_pages().len(), 2);
    }

    #[test]
    fn transparent_pixels_embed_as_white() {
        let dir = tempfile::tempdir().unwrap();
        let rgba = dir.path().join("page_0001.png");
        let la = dir.path().join("page_0002.png");
        RgbaImage::from_pixel(3, 2, Rgba([0, 0, 0, 0])).save(&rgba).unwrap();
        GrayAlphaImage::from_pixel(3, 2, LumaA([0, 0])).save(&la).unwrap();

        let inflate = |img: &EmbeddedImage| {
            let mut raw = Vec::new();
            ZlibDecoder::new(img.data.as_slice())
                .read_to_end(&mut raw)
                .unwrap();
            raw
        };

        let color = load_image(&rgba).unwrap();
        assert_eq!(color.color_space, "DeviceRGB");
        assert_eq!(inflate(&color), vec![255u8; 3 * 2 * 3]);

        let gray = load_image(&la).unwrap();
        assert_eq!(gray.color_space, "DeviceGray");
        assert_eq!(inflate(&gray), vec![255u8; 3 * 2]);
    }

    #[test]
    fn corrupt_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page_0001.png");
        std::fs::write(&path, b"garbage").unwrap();
        assert!(matches!(
            build_pdf(&[path], "t", 96),
            Err(BoxPdfError::ImageFailed { .. })
        ));
    }

    #[tokio::test]
    async fn missing_img2pdf_reports_tool_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page_0001.png");
        RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])).save(&path).unwrap();
        let config = DownloadConfig::builder()
            .assembler(Assembler::Img2Pdf)
            .img2pdf_program("/definitely/not/here/img2pdf")
            .build()
            .unwrap();
        let pdf = dir.path().join("out.pdf");

        let err = assemble_pdf(&[path], &pdf, "t", &config).await.unwrap_err();
        assert!(matches!(err, BoxPdfError::ToolNotFound { .. }));
        assert!(!pdf.exists());
        assert!(!pdf.with_extension("pdf.tmp").exists());
    }
}
