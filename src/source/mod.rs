//! Page sources: where page text, rasters and geometry come from.

#[cfg(feature = "pdf")]
pub mod pdf;

use std::path::PathBuf;

use async_trait::async_trait;
use image::RgbaImage;
use thiserror::Error;

use crate::analyze::geometry::Frame;

#[cfg(feature = "pdf")]
pub use pdf::{bind_pdfium, PdfPageSource};

/// Failures opening a document or retrieving one of its pages
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    #[error("Cannot open {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    #[error("PDF library unavailable: {0}")]
    Library(String),

    #[error("Page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    #[error("Failed to render page {index}: {reason}")]
    Render { index: usize, reason: String },

    #[error("Page {index} has an invalid media box")]
    InvalidFrame { index: usize },
}

/// A paged document.
///
/// Implementations may wrap non-thread-safe FFI handles, so the trait does
/// not require `Send`. Page indices are 0-based.
#[async_trait(?Send)]
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Extracted text of a page, `None` when the page has no text layer.
    async fn page_text(&self, index: usize) -> Option<String>;

    /// The page rendered to a bitmap.
    async fn page_raster(&self, index: usize) -> Result<RgbaImage, SourceError>;

    /// The page's media box in page space.
    fn page_frame(&self, index: usize) -> Result<Frame, SourceError>;
}
