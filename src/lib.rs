//! `pagelens` - PDF region classification and table extraction
//!
//! # Features
//!
//! - **Page text**: Text layer of every page, concatenated in page order
//! - **Region detection**: Rectangular regions found on each page raster
//! - **Classification**: Ruled regions become tables, the rest charts or images
//! - **Table reconstruction**: OCR fragments clustered into rows and cells
//!
//! # Example
//!
//! ```rust,no_run
//! use pagelens::{bind_pdfium, AnalysisReport, Config, DocumentAnalyzer, PdfPageSource, ReportFormat};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let analyzer = DocumentAnalyzer::new(config.vision.engine(), &config.analysis);
//!     let pdfium = bind_pdfium()?;
//!     let result = analyzer
//!         .open_and_analyze(|| PdfPageSource::open(&pdfium, "report.pdf".as_ref()))
//!         .await?;
//!     println!("{}", AnalysisReport::generate(&result, ReportFormat::Text)?);
//!     Ok(())
//! }
//! ```

pub mod analyze;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ocr;
pub mod source;
pub mod vision;

pub use analyze::{
    AnalysisError, AnalysisReport, AnalysisResult, AnalyzerConfig, CancelToken, ChartType,
    DocumentAnalyzer, Frame, ProgressEvent, RelativeBox, ReportFormat, TableGrid,
};
pub use config::Config;
pub use ocr::{OcrError, OcrService};
pub use source::{PageSource, SourceError};
#[cfg(feature = "pdf")]
pub use source::{bind_pdfium, PdfPageSource};
pub use vision::{
    ContourDetector, RecognitionOptions, RectangleDetector, RectangleQuery, TesseractRecognizer,
    TextFragment, TextRecognizer, VisionEngine, VisionError,
};

/// Version of pagelens
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
