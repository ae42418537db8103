//! Progress reporting and cancellation for an analysis pass

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use super::ChartType;

/// Where a document pass currently is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanState {
    LoadingSource,
    ProcessingPage { page: usize },
    Completed,
    Cancelled,
    Failed { reason: String },
}

/// Progress events emitted while analysing a document.
///
/// Pages and regions are 0-based; the `Display` impl numbers them from 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Loading,
    SourceLoaded { page_count: usize },
    PageStarted { page: usize, page_count: usize },
    RegionsFound { page: usize, count: usize },
    RegionClassified { page: usize, region: usize, kind: ChartType },
    Completed { tables: usize, charts: usize, images: usize },
    Cancelled,
    Failed { reason: String },
}

impl ProgressEvent {
    /// State the pass is in after this event.
    pub fn state(&self) -> Option<ScanState> {
        match self {
            Self::Loading => Some(ScanState::LoadingSource),
            Self::PageStarted { page, .. } => Some(ScanState::ProcessingPage { page: *page }),
            Self::Completed { .. } => Some(ScanState::Completed),
            Self::Cancelled => Some(ScanState::Cancelled),
            Self::Failed { reason } => Some(ScanState::Failed {
                reason: reason.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading document..."),
            Self::SourceLoaded { page_count } => {
                write!(f, "Document loaded, {page_count} pages")
            }
            Self::PageStarted { page, page_count } => {
                write!(f, "Processing page {}/{page_count}", page + 1)
            }
            Self::RegionsFound { page, count } => {
                write!(f, "Found {count} regions on page {}", page + 1)
            }
            Self::RegionClassified { page, region, kind } => write!(
                f,
                "Page {} region {}: {}",
                page + 1,
                region + 1,
                kind.label()
            ),
            Self::Completed {
                tables,
                charts,
                images,
            } => write!(
                f,
                "Analysis complete: {tables} tables, {charts} charts, {images} images"
            ),
            Self::Cancelled => write!(f, "Analysis cancelled"),
            Self::Failed { reason } => write!(f, "Analysis failed: {reason}"),
        }
    }
}

/// Progress sink. Invoked synchronously on the analysing task; it must not
/// block for long.
pub type ProgressCallback = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Forward every event into a channel, for consumers that prefer a stream.
///
/// Events are dropped once the receiver is gone.
pub fn channel_progress(tx: UnboundedSender<ProgressEvent>) -> ProgressCallback {
    Box::new(move |event: &ProgressEvent| {
        let _ = tx.send(event.clone());
    })
}

/// Shared cancellation flag, checked between pages and regions
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
