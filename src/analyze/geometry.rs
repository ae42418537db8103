//! Page-space rectangles and the relative boxes vision engines report.
//!
//! Both types use a bottom-left origin with y growing upwards, matching PDF
//! user space. Bitmaps, in contrast, store rows top-down; the conversion
//! between the two lives in [`RelativeBox::to_pixel_rect`].

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in absolute page coordinates (PDF points).
///
/// Deserialization applies the same checks as [`Frame::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FrameFields")]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Deserialize)]
struct FrameFields {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl TryFrom<FrameFields> for Frame {
    type Error = &'static str;

    fn try_from(f: FrameFields) -> Result<Self, Self::Error> {
        Self::new(f.x, f.y, f.width, f.height).ok_or("frame must be finite, non-negative and non-empty")
    }
}

impl Frame {
    /// Build a frame, rejecting negative origins, non-positive sizes and
    /// non-finite values.
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Option<Self> {
        let finite = [x, y, width, height].iter().all(|v| v.is_finite());
        if !finite || x < 0.0 || y < 0.0 || width <= 0.0 || height <= 0.0 {
            return None;
        }
        Some(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Frame of a whole page with the given media box size.
    #[must_use]
    pub fn page(width: f64, height: f64) -> Option<Self> {
        Self::new(0.0, 0.0, width, height)
    }
}

/// Bounding box with every coordinate expressed as a fraction (0..=1) of the
/// analysed bitmap. Origin is the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Integer pixel rectangle with a top-left origin, as used for cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl RelativeBox {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when all coordinates are finite, inside the unit square, and the
    /// box has a positive area.
    pub fn is_valid(&self) -> bool {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.x >= 0.0
            && self.y >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= 1.0 + f64::EPSILON
            && self.y + self.height <= 1.0 + f64::EPSILON
    }

    /// Scale against a page frame, yielding an absolute frame in page space.
    pub fn to_frame(&self, page: &Frame) -> Option<Frame> {
        if !self.is_valid() {
            return None;
        }
        Frame::new(
            page.x + self.x * page.width,
            page.y + self.y * page.height,
            self.width * page.width,
            self.height * page.height,
        )
    }

    /// Map onto a `width` x `height` bitmap, flipping the y axis.
    ///
    /// The rectangle is clamped to the bitmap; `None` means nothing is left
    /// after clamping.
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> Option<PixelRect> {
        if !self.is_valid() || width == 0 || height == 0 {
            return None;
        }
        let w = f64::from(width);
        let h = f64::from(height);

        let left = (self.x * w).floor().clamp(0.0, w);
        let right = ((self.x + self.width) * w).ceil().clamp(0.0, w);
        let top = ((1.0 - self.y - self.height) * h).floor().clamp(0.0, h);
        let bottom = ((1.0 - self.y) * h).ceil().clamp(0.0, h);

        if right <= left || bottom <= top {
            return None;
        }
        Some(PixelRect {
            left: left as u32,
            top: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }

    /// Shorter side over longer side, in bitmap units.
    pub fn aspect_ratio(&self, bitmap_width: u32, bitmap_height: u32) -> f64 {
        let w = self.width * f64::from(bitmap_width);
        let h = self.height * f64::from(bitmap_height);
        let (short, long) = if w < h { (w, h) } else { (h, w) };
        if long <= 0.0 {
            0.0
        } else {
            short / long
        }
    }
}
