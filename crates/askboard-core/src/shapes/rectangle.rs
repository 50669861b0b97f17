//! Rectangle shape.

use super::{ShapeGeometry, ShapeStyle, box_bounds};
use kurbo::{Rect, Size};
use serde::{Deserialize, Serialize};

/// A closed rectangle with optional rounded corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rectangle {
    pub w: f64,
    pub h: f64,
    /// Corner radius (0 = sharp corners).
    #[serde(default)]
    pub corner_radius: f64,
    #[serde(default)]
    pub style: ShapeStyle,
}

impl Rectangle {
    pub fn new(w: f64, h: f64) -> Self {
        Self {
            w,
            h,
            corner_radius: 0.0,
            style: ShapeStyle::default(),
        }
    }
}

impl ShapeGeometry for Rectangle {
    fn local_bounds(&self) -> Rect {
        box_bounds(self.w, self.h)
    }

    fn set_size(&mut self, size: Size) {
        self.w = size.width;
        self.h = size.height;
    }
}
