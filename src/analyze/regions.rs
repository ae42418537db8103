//! Candidate region extraction from a rendered page

use image::RgbaImage;

use super::geometry::{Frame, RelativeBox};
use crate::vision::{self, RectangleQuery, VisionEngine};

/// A rectangular area of a page with its pixels.
#[derive(Debug, Clone)]
pub struct Region {
    /// Position on the page, in page space
    pub frame: Frame,
    /// Crop of the page raster
    pub image: RgbaImage,
}

/// Finds rectangular regions on a page raster and crops them out
pub struct RegionExtractor {
    engine: VisionEngine,
    query: RectangleQuery,
}

impl RegionExtractor {
    pub fn new(engine: VisionEngine, query: RectangleQuery) -> Self {
        Self { engine, query }
    }

    /// One detection pass over the page. Boxes that cannot be mapped onto
    /// the page or the bitmap are dropped.
    pub async fn extract_regions(
        &self,
        page_bitmap: &RgbaImage,
        page_frame: &Frame,
    ) -> vision::Result<Vec<Region>> {
        let boxes = self
            .engine
            .detect_rectangles(page_bitmap, &self.query)
            .await?;
        let detected = boxes.len();

        let regions: Vec<Region> = boxes
            .iter()
            .filter_map(|rel| crop_region(page_bitmap, page_frame, rel))
            .collect();

        if regions.len() < detected {
            tracing::debug!(
                "Dropped {} of {detected} detected boxes",
                detected - regions.len()
            );
        }
        Ok(regions)
    }
}

/// Scale a relative box onto the page and cut its pixels out of the bitmap.
pub fn crop_region(bitmap: &RgbaImage, page_frame: &Frame, rel: &RelativeBox) -> Option<Region> {
    let Some(frame) = rel.to_frame(page_frame) else {
        tracing::debug!("Skipping invalid box {rel:?}");
        return None;
    };
    let Some(px) = rel.to_pixel_rect(bitmap.width(), bitmap.height()) else {
        tracing::debug!("Skipping box {rel:?}: empty crop");
        return None;
    };
    let image = image::imageops::crop_imm(bitmap, px.left, px.top, px.width, px.height).to_image();
    Some(Region { frame, image })
}
