//! Single-image text recognition.
//!
//! Unlike document analysis, a recognition failure here is fatal: there is
//! nothing to degrade to.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::vision::{RecognitionOptions, VisionEngine, VisionError};

/// OCR errors
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to load image {}: {reason}", path.display())]
    ImageLoad { path: PathBuf, reason: String },

    #[error("Text recognition failed: {0}")]
    Recognition(#[from] VisionError),
}

pub type Result<T> = std::result::Result<T, OcrError>;

/// Stages of an OCR run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrStage {
    Loading,
    Recognizing { width: u32, height: u32 },
    Finished { lines: usize },
}

impl fmt::Display for OcrStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading image..."),
            Self::Recognizing { width, height } => {
                write!(f, "Recognizing text in {width}x{height} image...")
            }
            Self::Finished { lines } => write!(f, "Recognition complete, {lines} lines"),
        }
    }
}

pub type OcrProgressCallback = Box<dyn Fn(&OcrStage) + Send + Sync>;

/// Recognizes all text in an image file
pub struct OcrService {
    engine: VisionEngine,
    options: RecognitionOptions,
    progress: Option<OcrProgressCallback>,
}

impl OcrService {
    pub fn new(engine: VisionEngine, options: RecognitionOptions) -> Self {
        Self {
            engine,
            options,
            progress: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, callback: OcrProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    fn emit(&self, stage: &OcrStage) {
        if let Some(ref callback) = self.progress {
            callback(stage);
        }
    }

    /// Recognized lines joined by newlines, in the recognizer's order.
    pub async fn recognize_file(&self, path: &Path) -> Result<String> {
        self.emit(&OcrStage::Loading);
        let load_error = |reason: String| OcrError::ImageLoad {
            path: path.to_path_buf(),
            reason,
        };

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| load_error(e.to_string()))?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| load_error(e.to_string()))?
            .to_rgba8();

        let (width, height) = image.dimensions();
        tracing::info!("Loaded {} ({width}x{height})", path.display());
        self.emit(&OcrStage::Recognizing { width, height });

        let fragments = self.engine.recognize_text(&image, &self.options).await?;
        self.emit(&OcrStage::Finished {
            lines: fragments.len(),
        });

        let lines: Vec<String> = fragments.into_iter().map(|f| f.text).collect();
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::geometry::RelativeBox;
    use crate::vision::{
        RectangleDetector, RectangleQuery, TextFragment, TextRecognizer, Result as VisionResult,
    };
    use async_trait::async_trait;
    use image::RgbaImage;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct NoRectangles;

    #[async_trait]
    impl RectangleDetector for NoRectangles {
        async fn detect(&self, _: &RgbaImage, _: &RectangleQuery) -> VisionResult<Vec<RelativeBox>> {
            Ok(vec![])
        }
    }

    struct Lines(Vec<&'static str>);

    #[async_trait]
    impl TextRecognizer for Lines {
        async fn recognize(&self, _: &RgbaImage, _: &RecognitionOptions) -> VisionResult<Vec<TextFragment>> {
            Ok(self
                .0
                .iter()
                .map(|t| TextFragment::new(*t, RelativeBox::new(0.0, 0.0, 1.0, 0.1), 0.9))
                .collect())
        }
    }

    struct Broken;

    #[async_trait]
    impl TextRecognizer for Broken {
        async fn recognize(&self, _: &RgbaImage, _: &RecognitionOptions) -> VisionResult<Vec<TextFragment>> {
            Err(VisionError::Recognition("engine crashed".to_string()))
        }
    }

    fn service(recognizer: Arc<dyn TextRecognizer>) -> OcrService {
        let engine = VisionEngine::new(Arc::new(NoRectangles), recognizer, Duration::from_secs(5));
        OcrService::new(engine, RecognitionOptions::default())
    }

    fn png_file(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("page.png");
        RgbaImage::new(16, 8).save(&path).unwrap();
        path
    }

    #[test]
    fn joins_lines_with_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let path = png_file(&dir);
        let text = tokio_test::block_on(
            service(Arc::new(Lines(vec!["first line", "second line"]))).recognize_file(&path),
        )
        .unwrap();
        assert_eq!(text, "first line\nsecond line");
    }

    #[tokio::test]
    async fn reports_stages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = png_file(&dir);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let ocr = service(Arc::new(Lines(vec!["a"])))
            .with_progress(Box::new(move |stage: &OcrStage| sink.lock().unwrap().push(stage.clone())));

        ocr.recognize_file(&path).await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                OcrStage::Loading,
                OcrStage::Recognizing {
                    width: 16,
                    height: 8
                },
                OcrStage::Finished { lines: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn missing_file_is_a_load_error() {
        let err = service(Arc::new(Lines(vec![])))
            .recognize_file(Path::new("/nonexistent/scan.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::ImageLoad { .. }));
    }

    #[tokio::test]
    async fn undecodable_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"not an image").unwrap();
        let err = service(Arc::new(Lines(vec![]))).recognize_file(&path).await.unwrap_err();
        assert!(matches!(err, OcrError::ImageLoad { .. }));
    }

    #[tokio::test]
    async fn recognition_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = png_file(&dir);
        let err = service(Arc::new(Broken)).recognize_file(&path).await.unwrap_err();
        assert!(matches!(err, OcrError::Recognition(VisionError::Recognition(_))));
    }
}
