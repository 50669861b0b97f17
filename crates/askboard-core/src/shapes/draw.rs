//! Freehand ink stroke.

use super::{ShapeGeometry, ShapeStyle};
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// A freehand stroke. Points are relative to the owning shape's position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draw {
    pub points: Vec<Point>,
    /// Closed strokes are filled outlines; open strokes are handwriting.
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default)]
    pub style: ShapeStyle,
}

impl Draw {
    /// Create from existing points.
    pub fn from_points(points: Vec<Point>) -> Self {
        Self {
            points,
            is_closed: false,
            style: ShapeStyle::default(),
        }
    }
}

impl ShapeGeometry for Draw {
    fn local_bounds(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect::ZERO;
        };
        self.points
            .iter()
            .skip(1)
            .fold(Rect::from_points(*first, *first), |acc, p| acc.union_pt(*p))
    }

    /// Scales the points so their bounding box matches `size`.
    fn set_size(&mut self, size: Size) {
        let bounds = self.local_bounds();
        let sx = if bounds.width() > f64::EPSILON { size.width / bounds.width() } else { 1.0 };
        let sy = if bounds.height() > f64::EPSILON { size.height / bounds.height() } else { 1.0 };
        for point in &mut self.points {
            point.x = bounds.x0 + (point.x - bounds.x0) * sx;
            point.y = bounds.y0 + (point.y - bounds.y0) * sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let draw = Draw::from_points(vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 50.0),
            Point::new(50.0, 100.0),
        ]);

        let bounds = draw.local_bounds();
        assert!((bounds.x0).abs() < f64::EPSILON);
        assert!((bounds.y0).abs() < f64::EPSILON);
        assert!((bounds.x1 - 100.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_set_size_scales_points() {
        let mut draw = Draw::from_points(vec![Point::new(10.0, 10.0), Point::new(20.0, 30.0)]);
        draw.set_size(Size::new(20.0, 10.0));
        let bounds = draw.local_bounds();
        assert!((bounds.x0 - 10.0).abs() < f64::EPSILON);
        assert!((bounds.width() - 20.0).abs() < f64::EPSILON);
        assert!((bounds.height() - 10.0).abs() < f64::EPSILON);
    }
}
