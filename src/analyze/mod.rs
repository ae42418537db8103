//! Document analysis pipeline
//!
//! Walks a paged document and sorts every rectangular region it finds:
//! - Page text is concatenated in page order
//! - Regions come from an outermost-rectangle pass over each page raster
//! - Dense regions (many nested rectangles) are treated as tables and their
//!   text is rebuilt into a grid; regions without table text become charts
//! - Everything else is kept as an image

pub mod classify;
pub mod geometry;
pub mod page;
pub mod progress;
pub mod regions;
pub mod report;
pub mod table;

use image::RgbaImage;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::source::{PageSource, SourceError};
use crate::vision::{RecognitionLevel, RecognitionOptions, RectangleQuery, VisionEngine};

pub use classify::RegionClassifier;
pub use geometry::{Frame, RelativeBox};
pub use page::PageAnalyzer;
pub use progress::{channel_progress, CancelToken, ProgressCallback, ProgressEvent, ScanState};
pub use regions::{Region, RegionExtractor};
pub use report::{AnalysisReport, ReportFormat};
pub use table::{GridSettings, TableGrid, TableReconstructor};

/// Analysis pipeline errors
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to load document: {0}")]
    SourceLoad(#[from] SourceError),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Format error: {0}")]
    Format(#[from] std::fmt::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// What a region turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Table,
    Chart,
    Image,
    /// Classification failed
    Unknown,
}

impl ChartType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Chart => "chart",
            Self::Image => "image",
            Self::Unknown => "unknown",
        }
    }
}

/// A table region and its content
#[derive(Debug, Clone, Serialize)]
pub struct DetectedTable {
    pub page: usize,
    pub frame: Frame,
    pub grid: TableGrid,
}

/// A chart region, or a region whose classification failed
#[derive(Debug, Clone, Serialize)]
pub struct DetectedChart {
    pub page: usize,
    pub frame: Frame,
    pub kind: ChartType,
}

/// An image region with its pixels
#[derive(Debug, Clone, Serialize)]
pub struct DetectedImage {
    pub page: usize,
    pub frame: Frame,
    /// Serialized as `[width, height]`
    #[serde(rename = "pixel_size", serialize_with = "serialize_dimensions")]
    pub image: RgbaImage,
}

fn serialize_dimensions<S: Serializer>(image: &RgbaImage, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    image.dimensions().serialize(serializer)
}

/// Everything found in one document.
///
/// Only the analyzer appends to it; callers get read access.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisResult {
    text: String,
    tables: Vec<DetectedTable>,
    charts: Vec<DetectedChart>,
    images: Vec<DetectedImage>,
}

impl AnalysisResult {
    /// Page texts in page order, each followed by a newline.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tables(&self) -> &[DetectedTable] {
        &self.tables
    }

    /// Chart regions, including those tagged [`ChartType::Unknown`].
    pub fn charts(&self) -> &[DetectedChart] {
        &self.charts
    }

    pub fn images(&self) -> &[DetectedImage] {
        &self.images
    }

    /// Charts proper, excluding unclassified regions.
    pub fn chart_count(&self) -> usize {
        self.charts
            .iter()
            .filter(|c| c.kind == ChartType::Chart)
            .count()
    }

    pub fn unclassified_count(&self) -> usize {
        self.charts
            .iter()
            .filter(|c| c.kind == ChartType::Unknown)
            .count()
    }

    pub(crate) fn push_page_text(&mut self, text: &str) {
        self.text.push_str(text);
        self.text.push('\n');
    }

    pub(crate) fn push_table(&mut self, page: usize, frame: Frame, grid: TableGrid) {
        self.tables.push(DetectedTable { page, frame, grid });
    }

    pub(crate) fn push_chart(&mut self, page: usize, frame: Frame, kind: ChartType) {
        self.charts.push(DetectedChart { page, frame, kind });
    }

    pub(crate) fn push_image(&mut self, page: usize, frame: Frame, image: RgbaImage) {
        self.images.push(DetectedImage { page, frame, image });
    }
}

/// Analyzer configuration, the `[analysis]` table of the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Nested rectangles needed for a region to count as a table
    pub structure_threshold: usize,
    /// Maximum vertical distance between fragments of one row (0.0-1.0)
    pub row_threshold: f64,
    /// Aspect bounds for the rectangle pass inside a region
    pub region_min_aspect: f64,
    pub region_max_aspect: f64,
    /// Aspect bounds for the page-level region pass
    pub page_min_aspect: f64,
    pub page_max_aspect: f64,
    /// Order table cells left-to-right
    pub sort_cells_by_x: bool,
    /// Recognition languages as BCP-47 tags, most preferred first
    pub languages: Vec<String>,
    pub language_correction: bool,
    /// Recognized fragments below this confidence are discarded
    pub min_confidence: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            structure_threshold: classify::DEFAULT_STRUCTURE_THRESHOLD,
            row_threshold: 0.1,
            region_min_aspect: 0.3,
            region_max_aspect: 1.0,
            page_min_aspect: 0.0,
            page_max_aspect: 1.0,
            sort_cells_by_x: true,
            languages: RecognitionOptions::default().languages,
            language_correction: true,
            min_confidence: 0.0,
        }
    }
}

impl AnalyzerConfig {
    /// Page-level pass: outermost rectangles only.
    pub fn page_query(&self) -> RectangleQuery {
        RectangleQuery::new(self.page_min_aspect, self.page_max_aspect).outermost()
    }

    /// In-region pass: nested rectangles count too.
    pub fn region_query(&self) -> RectangleQuery {
        RectangleQuery::new(self.region_min_aspect, self.region_max_aspect)
    }

    pub fn recognition_options(&self) -> RecognitionOptions {
        RecognitionOptions {
            level: RecognitionLevel::Accurate,
            languages: self.languages.clone(),
            use_correction: self.language_correction,
        }
    }

    pub fn grid_settings(&self) -> GridSettings {
        GridSettings {
            row_threshold: self.row_threshold,
            sort_cells_by_x: self.sort_cells_by_x,
            min_confidence: self.min_confidence,
        }
    }
}

/// Main document analyzer
pub struct DocumentAnalyzer {
    pages: PageAnalyzer,
    progress: Option<ProgressCallback>,
    cancel: CancelToken,
}

impl DocumentAnalyzer {
    pub fn new(engine: VisionEngine, config: &AnalyzerConfig) -> Self {
        let pages = PageAnalyzer::new(
            RegionExtractor::new(engine.clone(), config.page_query()),
            RegionClassifier::new(engine.clone(), config.region_query(), config.structure_threshold),
            TableReconstructor::new(engine, config.recognition_options(), config.grid_settings()),
        );
        Self {
            pages,
            progress: None,
            cancel: CancelToken::new(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(state) = event.state() {
            tracing::debug!("Scan state: {state:?}");
        }
        if let Some(ref callback) = self.progress {
            callback(&event);
        }
    }

    /// Open a source with `load`, then analyse it.
    ///
    /// Load failures are reported through progress and returned; no partial
    /// result exists in that case.
    pub async fn open_and_analyze<S, F>(&self, load: F) -> Result<AnalysisResult>
    where
        S: PageSource,
        F: FnOnce() -> std::result::Result<S, SourceError>,
    {
        self.emit(ProgressEvent::Loading);
        let source = match load() {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!("Failed to load document: {e}");
                self.emit(ProgressEvent::Failed {
                    reason: e.to_string(),
                });
                return Err(e.into());
            }
        };
        self.analyze(&source).await
    }

    /// Analyse every page of an open source, strictly in order.
    pub async fn analyze<S: PageSource + ?Sized>(&self, source: &S) -> Result<AnalysisResult> {
        let page_count = source.page_count();
        tracing::info!("Analysing {page_count} pages");
        self.emit(ProgressEvent::SourceLoaded { page_count });

        let mut result = AnalysisResult::default();
        let emit = |event: ProgressEvent| self.emit(event);

        for index in 0..page_count {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled());
            }
            self.emit(ProgressEvent::PageStarted {
                page: index,
                page_count,
            });
            match self
                .pages
                .analyze_page(source, index, &mut result, &emit, &self.cancel)
                .await
            {
                Ok(()) => {}
                Err(AnalysisError::Cancelled) => return Err(self.cancelled()),
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "Found {} tables, {} charts, {} images",
            result.tables.len(),
            result.chart_count(),
            result.images.len()
        );
        self.emit(ProgressEvent::Completed {
            tables: result.tables.len(),
            charts: result.chart_count(),
            images: result.images.len(),
        });
        Ok(result)
    }

    fn cancelled(&self) -> AnalysisError {
        tracing::info!("Analysis cancelled");
        self.emit(ProgressEvent::Cancelled);
        AnalysisError::Cancelled
    }
}
