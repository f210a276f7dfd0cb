//! Page rasterisation: render page 1 of a PDF to a PNG via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is CPU-bound and keeps
//! thread-local state. Parsing, rendering and PNG encoding therefore run on
//! tokio's blocking pool so executor threads never stall.
//!
//! ## Why a fixed 4× scale?
//!
//! A letter-size page is 612 × 792 pt; at 4× that is 2448 × 3168 px, enough
//! for a sharp on-screen preview and for the reviewer model to read 8 pt text.
//! The scale is not configurable so every stored preview has the same density.

use crate::error::ConvertError;
use crate::pipeline::encode::{encode_png, image_file_name};
use crate::pipeline::engine;
use crate::record::DocumentFile;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info};

/// Magnification applied to the page's intrinsic size in points.
pub const RENDER_SCALE: f32 = 4.0;

/// A rendered first page.
#[derive(Debug)]
pub struct RasterImage {
    /// Temporary PNG on local disk for immediate preview. Deleted on drop.
    pub preview: TempPath,
    /// The same PNG as a named file for upload.
    pub file: DocumentFile,
    pub width: u32,
    pub height: u32,
    /// Intrinsic page size in points.
    pub page_width_pts: f32,
    pub page_height_pts: f32,
}

impl RasterImage {
    /// Local reference to the preview image.
    pub fn image_ref(&self) -> &Path {
        &self.preview
    }
}

/// Turns a document into a preview image of its first page.
///
/// Every failure is returned as a [`ConvertError`]; implementations must not
/// panic on malformed input.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, document: &DocumentFile) -> Result<RasterImage, ConvertError>;
}

/// Production rasterizer backed by the shared PDFium engine.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to a specific pdfium library file on first use.
    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library: Some(path.into()),
        }
    }
}

#[async_trait]
impl Rasterizer for PdfiumRasterizer {
    async fn rasterize(&self, document: &DocumentFile) -> Result<RasterImage, ConvertError> {
        let engine = engine::pdfium(self.library.clone()).await?;
        let bytes = document.bytes.clone();
        let name = image_file_name(&document.name);

        let image = tokio::task::spawn_blocking(move || rasterize_blocking(&engine, &bytes, name))
            .await
            .map_err(|e| ConvertError::Internal(format!("Render task panicked: {e}")))??;

        info!(
            "Rasterised '{}' → {}x{} px ({} bytes)",
            document.name,
            image.width,
            image.height,
            image.file.len()
        );
        Ok(image)
    }
}

/// Blocking render + encode + preview write.
fn rasterize_blocking(
    pdfium: &Pdfium,
    bytes: &[u8],
    image_name: String,
) -> Result<RasterImage, ConvertError> {
    let (image, page_width_pts, page_height_pts) = render_first_page(pdfium, bytes)?;
    let png = encode_png(&image).map_err(|e| ConvertError::EncodeFailed(e.to_string()))?;
    let preview = write_preview(&png, &image_name)?;

    Ok(RasterImage {
        preview,
        width: image.width(),
        height: image.height(),
        file: DocumentFile::png(image_name, png),
        page_width_pts,
        page_height_pts,
    })
}

fn render_first_page(
    pdfium: &Pdfium,
    bytes: &[u8],
) -> Result<(DynamicImage, f32, f32), ConvertError> {
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| ConvertError::NotADocument(format!("{:?}", e)))?;

    let pages = document.pages();
    debug!("PDF loaded: {} pages", pages.len());
    if pages.len() == 0 {
        return Err(ConvertError::EmptyDocument);
    }

    let page = pages
        .get(0)
        .map_err(|e| ConvertError::RenderFailed(format!("{:?}", e)))?;
    let width_pts = page.width().value;
    let height_pts = page.height().value;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(RENDER_SCALE);
    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| ConvertError::RenderFailed(format!("{:?}", e)))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page 1 ({:.1}x{:.1} pt) → {}x{} px",
        width_pts,
        height_pts,
        image.width(),
        image.height()
    );
    Ok((image, width_pts, height_pts))
}

fn write_preview(png: &[u8], image_name: &str) -> Result<TempPath, ConvertError> {
    let prefix = image_name.trim_end_matches(".png");
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".png")
        .tempfile()
        .map_err(|e| ConvertError::PreviewUnavailable(e.to_string()))?;
    file.write_all(png)
        .map_err(|e| ConvertError::PreviewUnavailable(e.to_string()))?;
    Ok(file.into_temp_path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_file_is_written_and_removed_on_drop() {
        let path = write_preview(b"\x89PNG data", "cv.png").unwrap();
        let on_disk: PathBuf = path.to_path_buf();
        assert_eq!(std::fs::read(&on_disk).unwrap(), b"\x89PNG data");
        assert!(on_disk
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with(".png"));
        drop(path);
        assert!(!on_disk.exists());
    }
}
