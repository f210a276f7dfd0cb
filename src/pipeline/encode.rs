//! Image encoding: `DynamicImage` → PNG bytes → base64 `ImageData`.
//!
//! PNG keeps rendered text crisp; JPEG artefacts around glyphs hurt the
//! reviewer's reading of small print. `detail: "high"` asks GPT-4-class models
//! for the full tile budget so a 4× résumé page is not downsampled to a single
//! low-resolution tile.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Lossless PNG encoding of a rendered page.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} page → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// Wrap stored PNG bytes as a vision-model attachment.
pub fn image_attachment(png: &[u8]) -> ImageData {
    let b64 = STANDARD.encode(png);
    debug!("Image attachment → {} bytes base64", b64.len());
    ImageData::new(b64, "image/png").with_detail("high")
}

/// Output name for the rendered page: `cv.pdf` → `cv.png`.
///
/// Only a trailing `.pdf` (any case) is replaced; other names get `.png`
/// appended.
pub fn image_file_name(document_name: &str) -> String {
    let stem = match document_name.len().checked_sub(4) {
        Some(cut)
            if document_name.is_char_boundary(cut)
                && document_name[cut..].eq_ignore_ascii_case(".pdf") =>
        {
            &document_name[..cut]
        }
        _ => document_name,
    };
    let stem = if stem.is_empty() { "resume" } else { stem };
    format!("{stem}.png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 6, Rgba([255, 0, 0, 255])));
        let png = encode_png(&img).expect("encode should succeed");
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let back = image::load_from_memory(&png).expect("decodes");
        assert_eq!((back.width(), back.height()), (10, 6));
    }

    #[test]
    fn attachment_is_base64_png() {
        let data = image_attachment(b"\x89PNG fake");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, b"\x89PNG fake");
    }

    #[test]
    fn image_name_replaces_pdf_extension() {
        assert_eq!(image_file_name("cv.pdf"), "cv.png");
        assert_eq!(image_file_name("Jane Doe.PDF"), "Jane Doe.png");
        assert_eq!(image_file_name("report.pdf.pdf"), "report.pdf.png");
        assert_eq!(image_file_name("notes"), "notes.png");
        assert_eq!(image_file_name(".pdf"), "resume.png");
        assert_eq!(image_file_name("résumé.pdf"), "résumé.png");
    }
}
