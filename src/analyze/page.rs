//! Per-page pass: text, regions, classification, tables

use super::classify::RegionClassifier;
use super::progress::{CancelToken, ProgressEvent};
use super::regions::{Region, RegionExtractor};
use super::table::TableReconstructor;
use super::{AnalysisError, AnalysisResult, ChartType, Result};
use crate::source::PageSource;

/// Runs the region pipeline over one page at a time
pub struct PageAnalyzer {
    extractor: RegionExtractor,
    classifier: RegionClassifier,
    reconstructor: TableReconstructor,
}

impl PageAnalyzer {
    pub fn new(
        extractor: RegionExtractor,
        classifier: RegionClassifier,
        reconstructor: TableReconstructor,
    ) -> Self {
        Self {
            extractor,
            classifier,
            reconstructor,
        }
    }

    /// Analyse page `index`, appending everything found to `result`.
    ///
    /// Only cancellation is an error; vision and raster failures degrade
    /// the page or region instead.
    pub async fn analyze_page<S: PageSource + ?Sized>(
        &self,
        source: &S,
        index: usize,
        result: &mut AnalysisResult,
        emit: &(dyn Fn(ProgressEvent) + '_),
        cancel: &CancelToken,
    ) -> Result<()> {
        let text = source.page_text(index).await.unwrap_or_default();
        result.push_page_text(&text);

        let regions = self.page_regions(source, index).await;
        emit(ProgressEvent::RegionsFound {
            page: index,
            count: regions.len(),
        });

        for (region_index, region) in regions.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }
            let kind = self.classify_region(index, region, result).await;
            emit(ProgressEvent::RegionClassified {
                page: index,
                region: region_index,
                kind,
            });
        }
        Ok(())
    }

    /// Raster and page-level detection failures leave the page without
    /// regions.
    async fn page_regions<S: PageSource + ?Sized>(&self, source: &S, index: usize) -> Vec<Region> {
        let (bitmap, frame) = match (source.page_raster(index).await, source.page_frame(index)) {
            (Ok(bitmap), Ok(frame)) => (bitmap, frame),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Page {}: no regions, {e}", index + 1);
                return Vec::new();
            }
        };

        match self.extractor.extract_regions(&bitmap, &frame).await {
            Ok(regions) => regions,
            Err(e) => {
                tracing::warn!("Page {}: region detection failed: {e}", index + 1);
                Vec::new()
            }
        }
    }

    async fn classify_region(&self, page: usize, region: Region, result: &mut AnalysisResult) -> ChartType {
        let structured = match self.classifier.is_structured(&region.image).await {
            Ok(structured) => structured,
            Err(e) => {
                tracing::warn!("Page {}: classification failed: {e}", page + 1);
                result.push_chart(page, region.frame, ChartType::Unknown);
                return ChartType::Unknown;
            }
        };

        if !structured {
            result.push_image(page, region.frame, region.image);
            return ChartType::Image;
        }

        match self.reconstructor.reconstruct_table(&region.image).await {
            Ok(Some(grid)) => {
                result.push_table(page, region.frame, grid);
                ChartType::Table
            }
            Ok(None) => {
                result.push_chart(page, region.frame, ChartType::Chart);
                ChartType::Chart
            }
            Err(e) => {
                tracing::warn!("Page {}: table recognition failed: {e}", page + 1);
                result.push_chart(page, region.frame, ChartType::Chart);
                ChartType::Chart
            }
        }
    }
}
