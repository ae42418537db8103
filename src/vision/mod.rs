//! Vision engine seam: rectangle detection and text recognition.
//!
//! The classification core only talks to the two traits below through
//! [`VisionEngine`], so alternative backends can be swapped in without
//! touching the region or table logic. Two backends ship with the crate:
//!
//! | Capability | Backend | Notes |
//! |------------|---------|-------|
//! | Rectangles | [`ContourDetector`] | pure Rust, `imageproc` contour tracing |
//! | Text | [`TesseractRecognizer`] | `tesseract` subprocess, TSV output |

pub mod contours;
pub mod tesseract;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analyze::geometry::RelativeBox;

pub use contours::ContourDetector;
pub use tesseract::TesseractRecognizer;

/// Vision backend errors
#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Rectangle detection failed: {0}")]
    Detection(String),

    #[error("Text recognition failed: {0}")]
    Recognition(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: &'static str, seconds: u64 },

    #[error("Vision backend unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, VisionError>;

/// Parameters for one rectangle detection pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangleQuery {
    /// Minimum shorter-side / longer-side ratio (0.0-1.0)
    pub min_aspect: f64,
    /// Maximum shorter-side / longer-side ratio (0.0-1.0)
    pub max_aspect: f64,
    /// Only report rectangles not enclosed by another reported rectangle
    pub outermost_only: bool,
}

impl RectangleQuery {
    #[must_use]
    pub fn new(min_aspect: f64, max_aspect: f64) -> Self {
        Self {
            min_aspect,
            max_aspect,
            outermost_only: false,
        }
    }

    #[must_use]
    pub fn outermost(mut self) -> Self {
        self.outermost_only = true;
        self
    }

    /// Whether an aspect ratio falls inside the requested bounds.
    pub fn accepts_aspect(&self, aspect: f64) -> bool {
        aspect >= self.min_aspect && aspect <= self.max_aspect
    }
}

/// Recognition quality/speed trade-off
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionLevel {
    Fast,
    #[default]
    Accurate,
}

/// Options for a text recognition request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionOptions {
    pub level: RecognitionLevel,
    /// Preferred languages as BCP-47 tags, most preferred first
    pub languages: Vec<String>,
    /// Let the engine correct words against its language model
    pub use_correction: bool,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            level: RecognitionLevel::Accurate,
            languages: vec!["zh-Hant".to_string(), "en-US".to_string()],
            use_correction: true,
        }
    }
}

/// One recognized span of text.
///
/// Only the engine's top candidate is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    pub bounds: RelativeBox,
    /// Confidence of the top candidate (0.0-1.0)
    pub confidence: f32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, bounds: RelativeBox, confidence: f32) -> Self {
        Self {
            text: text.into(),
            bounds,
            confidence,
        }
    }
}

/// Finds rectangles in a bitmap.
#[async_trait]
pub trait RectangleDetector: Send + Sync {
    /// Detect rectangles, returned as boxes relative to `bitmap`.
    async fn detect(&self, bitmap: &RgbaImage, query: &RectangleQuery) -> Result<Vec<RelativeBox>>;
}

/// Recognizes text in a bitmap.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(
        &self,
        bitmap: &RgbaImage,
        options: &RecognitionOptions,
    ) -> Result<Vec<TextFragment>>;
}

/// Facade over a detector and recognizer that bounds every call with a
/// timeout.
#[derive(Clone)]
pub struct VisionEngine {
    detector: Arc<dyn RectangleDetector>,
    recognizer: Arc<dyn TextRecognizer>,
    timeout: Duration,
}

impl VisionEngine {
    pub fn new(
        detector: Arc<dyn RectangleDetector>,
        recognizer: Arc<dyn TextRecognizer>,
        timeout: Duration,
    ) -> Self {
        Self {
            detector,
            recognizer,
            timeout,
        }
    }

    pub async fn detect_rectangles(
        &self,
        bitmap: &RgbaImage,
        query: &RectangleQuery,
    ) -> Result<Vec<RelativeBox>> {
        tokio::time::timeout(self.timeout, self.detector.detect(bitmap, query))
            .await
            .map_err(|_| VisionError::Timeout {
                operation: "rectangle detection",
                seconds: self.timeout.as_secs(),
            })?
    }

    pub async fn recognize_text(
        &self,
        bitmap: &RgbaImage,
        options: &RecognitionOptions,
    ) -> Result<Vec<TextFragment>> {
        tokio::time::timeout(self.timeout, self.recognizer.recognize(bitmap, options))
            .await
            .map_err(|_| VisionError::Timeout {
                operation: "text recognition",
                seconds: self.timeout.as_secs(),
            })?
    }
}
