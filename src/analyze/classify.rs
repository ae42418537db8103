//! Structured-region test.
//!
//! A region is "structured" (a table candidate) when a nested rectangle
//! detection pass over its crop finds at least `threshold` rectangles:
//! ruled tables produce one rectangle per cell, photos and charts rarely
//! produce more than a frame. No text is recognized here.

use image::RgbaImage;

use crate::vision::{self, RectangleQuery, VisionEngine};

/// Rectangle count at or above which a region is structured
pub const DEFAULT_STRUCTURE_THRESHOLD: usize = 4;

pub struct RegionClassifier {
    engine: VisionEngine,
    query: RectangleQuery,
    threshold: usize,
}

impl RegionClassifier {
    pub fn new(engine: VisionEngine, query: RectangleQuery, threshold: usize) -> Self {
        Self {
            engine,
            query,
            threshold,
        }
    }

    /// Rectangles inside the region, nested ones included.
    pub async fn count_rectangles(&self, region: &RgbaImage) -> vision::Result<usize> {
        let boxes = self.engine.detect_rectangles(region, &self.query).await?;
        Ok(boxes.len())
    }

    pub async fn is_structured(&self, region: &RgbaImage) -> vision::Result<bool> {
        let count = self.count_rectangles(region).await?;
        tracing::debug!("Region has {count} rectangles (threshold {})", self.threshold);
        Ok(count >= self.threshold)
    }
}
