//! Rectangle detection by contour tracing.
//!
//! The bitmap is thresholded into an ink mask, borders are traced with
//! `imageproc`'s Suzuki-Abe implementation, and every border whose points
//! hug its own bounding box is reported as a rectangle. Ruled table cells
//! show up as hole borders nested inside the outer border of the grid, so a
//! nested query over a table crop yields one rectangle per cell.

use async_trait::async_trait;
use image::{GrayImage, Luma, RgbaImage};
use imageproc::contours::{find_contours, Contour};
use imageproc::point::Point;

use super::{RectangleDetector, RectangleQuery, Result, VisionError};
use crate::analyze::geometry::RelativeBox;

/// Fraction of border points that must lie on the bounding box edges.
const MIN_EDGE_FRACTION: f64 = 0.9;

/// Pure-Rust rectangle detector.
#[derive(Debug, Clone)]
pub struct ContourDetector {
    /// Minimum rectangle side, relative to the bitmap's shorter side
    min_size: f64,
    /// Luma below this value counts as ink
    ink_threshold: u8,
}

impl Default for ContourDetector {
    fn default() -> Self {
        Self {
            min_size: 0.05,
            ink_threshold: 128,
        }
    }
}

/// Inclusive pixel bounds of a traced border.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl Bounds {
    fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

impl ContourDetector {
    #[must_use]
    pub fn new(min_size: f64, ink_threshold: u8) -> Self {
        Self {
            min_size,
            ink_threshold,
        }
    }

    /// Synchronous detection, used by the async wrapper on a blocking thread.
    pub fn detect_blocking(&self, bitmap: &RgbaImage, query: &RectangleQuery) -> Vec<RelativeBox> {
        let (width, height) = bitmap.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let mask = self.ink_mask(bitmap);
        let contours: Vec<Contour<u32>> = find_contours(&mask);
        let min_side = self.min_size * f64::from(width.min(height));

        let mut accepted = vec![false; contours.len()];
        let mut boxes = Vec::new();

        for (idx, contour) in contours.iter().enumerate() {
            if contour.points.len() < 4 {
                continue;
            }
            let Some(bounds) = bounding_box(&contour.points) else {
                continue;
            };
            if f64::from(bounds.width()) < min_side || f64::from(bounds.height()) < min_side {
                continue;
            }
            if !hugs_bounds(&contour.points, &bounds) {
                continue;
            }

            let rel = to_relative(&bounds, width, height);
            if !query.accepts_aspect(rel.aspect_ratio(width, height)) {
                continue;
            }
            if query.outermost_only && has_accepted_ancestor(&contours, &accepted, idx) {
                continue;
            }

            accepted[idx] = true;
            boxes.push(rel);
        }

        tracing::debug!(
            "Contour detector: {} borders, {} rectangles",
            contours.len(),
            boxes.len()
        );
        boxes
    }

    /// Threshold into a mask where ink is 255 and paper is 0.
    fn ink_mask(&self, bitmap: &RgbaImage) -> GrayImage {
        let gray = image::imageops::grayscale(bitmap);
        let mut mask = GrayImage::new(gray.width(), gray.height());
        for (x, y, pixel) in gray.enumerate_pixels() {
            let value = if pixel.0[0] < self.ink_threshold { 255 } else { 0 };
            mask.put_pixel(x, y, Luma([value]));
        }
        mask
    }
}

#[async_trait]
impl RectangleDetector for ContourDetector {
    async fn detect(&self, bitmap: &RgbaImage, query: &RectangleQuery) -> Result<Vec<RelativeBox>> {
        let detector = self.clone();
        let bitmap = bitmap.clone();
        let query = *query;
        tokio::task::spawn_blocking(move || detector.detect_blocking(&bitmap, &query))
            .await
            .map_err(|e| VisionError::Detection(e.to_string()))
    }
}

fn bounding_box(points: &[Point<u32>]) -> Option<Bounds> {
    let first = points.first()?;
    let mut bounds = Bounds {
        min_x: first.x,
        min_y: first.y,
        max_x: first.x,
        max_y: first.y,
    };
    for p in points {
        bounds.min_x = bounds.min_x.min(p.x);
        bounds.min_y = bounds.min_y.min(p.y);
        bounds.max_x = bounds.max_x.max(p.x);
        bounds.max_y = bounds.max_y.max(p.y);
    }
    Some(bounds)
}

/// A border is rectangular when nearly all its points sit on one of the
/// four edges of its bounding box.
fn hugs_bounds(points: &[Point<u32>], bounds: &Bounds) -> bool {
    let shorter = f64::from(bounds.width().min(bounds.height()));
    let tolerance = (shorter * 0.02).max(2.0);

    let on_edge = points
        .iter()
        .filter(|p| {
            let dx = f64::from((p.x - bounds.min_x).min(bounds.max_x - p.x));
            let dy = f64::from((p.y - bounds.min_y).min(bounds.max_y - p.y));
            dx.min(dy) <= tolerance
        })
        .count();

    on_edge as f64 / points.len() as f64 >= MIN_EDGE_FRACTION
}

fn to_relative(bounds: &Bounds, width: u32, height: u32) -> RelativeBox {
    let w = f64::from(width);
    let h = f64::from(height);
    let bottom = f64::from(bounds.min_y + bounds.height());
    RelativeBox::new(
        f64::from(bounds.min_x) / w,
        (1.0 - bottom / h).max(0.0),
        f64::from(bounds.width()) / w,
        f64::from(bounds.height()) / h,
    )
}

fn has_accepted_ancestor(contours: &[Contour<u32>], accepted: &[bool], idx: usize) -> bool {
    let mut parent = contours[idx].parent;
    while let Some(p) = parent {
        if accepted[p] {
            return true;
        }
        parent = contours[p].parent;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn blank(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, PAPER)
    }

    fn hline(img: &mut RgbaImage, y: u32, x0: u32, x1: u32) {
        for x in x0..=x1 {
            img.put_pixel(x, y, INK);
        }
    }

    fn vline(img: &mut RgbaImage, x: u32, y0: u32, y1: u32) {
        for y in y0..=y1 {
            img.put_pixel(x, y, INK);
        }
    }

    /// Ruled grid with `cols` x `rows` cells inside a 10px margin.
    fn grid(cols: u32, rows: u32, cell: u32) -> RgbaImage {
        let width = cols * cell + 20;
        let height = rows * cell + 20;
        let mut img = blank(width, height);
        for r in 0..=rows {
            hline(&mut img, 10 + r * cell, 10, 10 + cols * cell);
        }
        for c in 0..=cols {
            vline(&mut img, 10 + c * cell, 10, 10 + rows * cell);
        }
        img
    }

    #[test]
    fn blank_bitmap_has_no_rectangles() {
        let detector = ContourDetector::default();
        let boxes = detector.detect_blocking(&blank(100, 100), &RectangleQuery::new(0.0, 1.0));
        assert!(boxes.is_empty());
    }

    #[test]
    fn nested_query_counts_each_cell() {
        let detector = ContourDetector::default();
        let boxes = detector.detect_blocking(&grid(3, 2, 40), &RectangleQuery::new(0.3, 1.0));
        // Six cell holes, plus the outer border of the grid
        assert!(boxes.len() >= 6, "found {} rectangles", boxes.len());
    }

    #[test]
    fn outermost_query_reports_only_the_frame() {
        let detector = ContourDetector::default();
        let boxes = detector.detect_blocking(
            &grid(3, 2, 40),
            &RectangleQuery::new(0.0, 1.0).outermost(),
        );
        assert_eq!(boxes.len(), 1);
        let frame = boxes[0];
        assert!(frame.width > 0.8 && frame.height > 0.7);
    }

    #[test]
    fn aspect_bounds_filter_wide_boxes() {
        let detector = ContourDetector::default();
        let mut img = blank(200, 100);
        // 150x20 box: aspect 0.13
        hline(&mut img, 40, 20, 170);
        hline(&mut img, 60, 20, 170);
        vline(&mut img, 20, 40, 60);
        vline(&mut img, 170, 40, 60);
        let boxes = detector.detect_blocking(&img, &RectangleQuery::new(0.3, 1.0));
        assert!(boxes.is_empty());
        let boxes = detector.detect_blocking(&img, &RectangleQuery::new(0.0, 1.0));
        assert!(!boxes.is_empty());
    }

    #[test]
    fn relative_boxes_use_bottom_left_origin() {
        let detector = ContourDetector::default();
        let mut img = blank(100, 100);
        // Square near the top-left corner, rows 10..=49
        hline(&mut img, 10, 10, 49);
        hline(&mut img, 49, 10, 49);
        vline(&mut img, 10, 10, 49);
        vline(&mut img, 49, 10, 49);
        let boxes =
            detector.detect_blocking(&img, &RectangleQuery::new(0.0, 1.0).outermost());
        assert_eq!(boxes.len(), 1);
        assert!((boxes[0].y - 0.5).abs() < 1e-9);
        assert!((boxes[0].height - 0.4).abs() < 1e-9);
    }

    #[test]
    fn tiny_borders_are_ignored() {
        let detector = ContourDetector::new(0.2, 128);
        let mut img = blank(100, 100);
        hline(&mut img, 10, 10, 15);
        hline(&mut img, 15, 10, 15);
        vline(&mut img, 10, 10, 15);
        vline(&mut img, 15, 10, 15);
        let boxes = detector.detect_blocking(&img, &RectangleQuery::new(0.0, 1.0));
        assert!(boxes.is_empty());
    }
}
