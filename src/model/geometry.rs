//! Geometry primitives for annotation shapes.
//!
//! All coordinates are absolute pixels in the image's orientation-corrected
//! frame. Rectangles are 0-based and half-open: `x_min` is the first column
//! inside the box, `x_max` the first column outside it. Format-specific
//! conventions (Pascal VOC's 1-based inclusive integers, YOLO's normalized
//! center/size ratios) are converted at the codec boundary only.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in absolute pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Rect {
    /// Create a new rectangle. No ordering is enforced here; use
    /// [`Rect::is_ordered`] to validate parsed input.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Whether min coordinates are strictly below max coordinates.
    pub fn is_ordered(&self) -> bool {
        self.x_min < self.x_max && self.y_min < self.y_max
    }

    /// Whether the rectangle lies entirely within a `width` x `height` image.
    pub fn is_within(&self, width: f64, height: f64) -> bool {
        self.x_min >= 0.0 && self.y_min >= 0.0 && self.x_max <= width && self.y_max <= height
    }
}

/// A single 2D point in absolute pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether the point lies within a `width` x `height` image.
    pub fn is_within(&self, width: f64, height: f64) -> bool {
        self.x >= 0.0 && self.y >= 0.0 && self.x <= width && self.y <= height
    }
}
