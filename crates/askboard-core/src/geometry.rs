//! Bounding-box helpers used by frame and layout math.
//!
//! All boxes are page-space `kurbo::Rect`s. These functions are pure and do
//! not normalize their input.

use kurbo::{Point, Rect};
use thiserror::Error;

/// Geometry errors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Cannot compute bounds of an empty list")]
    EmptyInput,
}

/// Minimal axis-aligned box covering every input box.
pub fn union_bounds<I>(bounds: I) -> Result<Rect, GeometryError>
where
    I: IntoIterator<Item = Rect>,
{
    let mut iter = bounds.into_iter();
    let first = iter.next().ok_or(GeometryError::EmptyInput)?;
    Ok(iter.fold(first, |acc, rect| acc.union(rect)))
}

/// Expand a box by `amount` on every edge.
///
/// A negative amount shrinks the box. Width or height may become negative
/// when the amount is large relative to the box; clamping is up to the caller.
pub fn pad(bounds: Rect, amount: f64) -> Rect {
    Rect::new(
        bounds.x0 - amount,
        bounds.y0 - amount,
        bounds.x1 + amount,
        bounds.y1 + amount,
    )
}

/// Whether `point` lies inside `bounds` (edges included).
pub fn contains_point(bounds: Rect, point: Point) -> bool {
    point.x >= bounds.x0 && point.x <= bounds.x1 && point.y >= bounds.y0 && point.y <= bounds.y1
}

/// Whether `inner` lies completely inside `outer` (edges included).
pub fn contains_rect(outer: Rect, inner: Rect) -> bool {
    inner.x0 >= outer.x0 && inner.y0 >= outer.y0 && inner.x1 <= outer.x1 && inner.y1 <= outer.y1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rect_eq(a: Rect, b: Rect) {
        assert!((a.x0 - b.x0).abs() < f64::EPSILON, "{a:?} != {b:?}");
        assert!((a.y0 - b.y0).abs() < f64::EPSILON, "{a:?} != {b:?}");
        assert!((a.x1 - b.x1).abs() < f64::EPSILON, "{a:?} != {b:?}");
        assert!((a.y1 - b.y1).abs() < f64::EPSILON, "{a:?} != {b:?}");
    }

    #[test]
    fn test_union_empty() {
        assert_eq!(union_bounds(Vec::new()), Err(GeometryError::EmptyInput));
    }

    #[test]
    fn test_union_single_is_unchanged() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_rect_eq(union_bounds([rect]).unwrap(), rect);
    }

    #[test]
    fn test_union_many() {
        let union = union_bounds([
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(-5.0, 20.0, 3.0, 30.0),
            Rect::new(40.0, 5.0, 50.0, 6.0),
        ])
        .unwrap();
        assert_rect_eq(union, Rect::new(-5.0, 0.0, 50.0, 30.0));
    }

    #[test]
    fn test_pad() {
        let padded = pad(Rect::new(0.0, 0.0, 10.0, 10.0), 20.0);
        assert_rect_eq(padded, Rect::new(-20.0, -20.0, 30.0, 30.0));
        assert!((padded.width() - 50.0).abs() < f64::EPSILON);
        assert!((padded.height() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pad_negative_can_invert() {
        let shrunk = pad(Rect::new(0.0, 0.0, 10.0, 10.0), -8.0);
        assert!((shrunk.width() + 6.0).abs() < f64::EPSILON);
        assert!((shrunk.height() + 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_containment() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(contains_point(outer, Point::new(100.0, 50.0)));
        assert!(!contains_point(outer, Point::new(100.1, 50.0)));
        assert!(contains_rect(outer, Rect::new(10.0, 10.0, 90.0, 90.0)));
        assert!(!contains_rect(outer, Rect::new(10.0, 10.0, 110.0, 90.0)));
    }
}
