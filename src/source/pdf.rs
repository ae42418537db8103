//! PDF page source backed by pdfium (Chromium's PDF library)
//!
//! The pdfium shared library is looked up next to the executable first,
//! then in the system library path.

use std::path::Path;

use async_trait::async_trait;
use image::RgbaImage;
use pdfium_render::prelude::*;

use super::{PageSource, SourceError};
use crate::analyze::geometry::Frame;

/// Pixels per PDF point when rasterizing. 2.0 renders at 144 DPI.
const RENDER_SCALE: f32 = 2.0;

/// Bind the pdfium library.
pub fn bind_pdfium() -> Result<Pdfium, SourceError> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| SourceError::Library(e.to_string()))?;
    Ok(Pdfium::new(bindings))
}

/// An open PDF document
pub struct PdfPageSource<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfPageSource<'a> {
    pub fn open(pdfium: &'a Pdfium, path: &Path) -> Result<Self, SourceError> {
        if !path.is_file() {
            return Err(SourceError::Open {
                path: path.to_path_buf(),
                reason: "no such file".to_string(),
            });
        }
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| SourceError::Open {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        tracing::info!(
            "Opened {} ({} pages)",
            path.display(),
            document.pages().len()
        );
        Ok(Self { document })
    }

    fn page(&self, index: usize) -> Result<PdfPage<'_>, SourceError> {
        let count = self.page_count();
        let out_of_range = || SourceError::PageOutOfRange { index, count };
        let page_index = PdfPageIndex::try_from(index).map_err(|_| out_of_range())?;
        self.document
            .pages()
            .get(page_index)
            .map_err(|_| out_of_range())
    }
}

#[async_trait(?Send)]
impl PageSource for PdfPageSource<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    async fn page_text(&self, index: usize) -> Option<String> {
        let page = self.page(index).ok()?;
        page.text().map(|text| text.all()).ok()
    }

    async fn page_raster(&self, index: usize) -> Result<RgbaImage, SourceError> {
        let page = self.page(index)?;
        let render_error = |reason: String| SourceError::Render { index, reason };

        let target_width = (page.width().value * RENDER_SCALE).round() as i32;
        let bitmap = page
            .render_with_config(&PdfRenderConfig::new().set_target_width(target_width.max(1)))
            .map_err(|e| render_error(e.to_string()))?;

        let width = u32::try_from(bitmap.width()).map_err(|e| render_error(e.to_string()))?;
        let height = u32::try_from(bitmap.height()).map_err(|e| render_error(e.to_string()))?;
        RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes())
            .ok_or_else(|| render_error("bitmap size mismatch".to_string()))
    }

    fn page_frame(&self, index: usize) -> Result<Frame, SourceError> {
        let page = self.page(index)?;
        Frame::page(
            f64::from(page.width().value),
            f64::from(page.height().value),
        )
        .ok_or(SourceError::InvalidFrame { index })
    }
}
