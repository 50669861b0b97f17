//! Group shape for moving several shapes as one unit.

use super::{ShapeGeometry, box_bounds};
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// A group. Members point at it through `parent_id`; the group itself only
/// records the extent its members had when it was formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub w: f64,
    pub h: f64,
}

impl Group {
    pub fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }

    /// Group sized to cover `members`, plus the page position to place it at.
    pub fn covering(members: Rect) -> (Point, Self) {
        (members.origin(), Self::new(members.width(), members.height()))
    }
}

impl ShapeGeometry for Group {
    fn local_bounds(&self) -> Rect {
        box_bounds(self.w, self.h)
    }

    fn set_size(&mut self, size: Size) {
        self.w = size.width;
        self.h = size.height;
    }
}
