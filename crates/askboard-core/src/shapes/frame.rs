//! Frame shape: a named container drawn behind its contents.

use super::{ShapeGeometry, box_bounds};
use kurbo::{Rect, Size};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub w: f64,
    pub h: f64,
    #[serde(default)]
    pub name: String,
}

impl Frame {
    pub fn new(w: f64, h: f64) -> Self {
        Self {
            w,
            h,
            name: String::new(),
        }
    }
}

impl ShapeGeometry for Frame {
    fn local_bounds(&self) -> Rect {
        box_bounds(self.w, self.h)
    }

    fn set_size(&mut self, size: Size) {
        self.w = size.width;
        self.h = size.height;
    }
}
