//! Camera module for pan/zoom transforms and animated re-centering.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Camera collaborator used by controllers that need to move the view.
pub trait Viewport {
    /// Page point currently at the center of the screen.
    fn view_center(&self) -> Point;

    /// Bring `bounds` to the center of the screen over `duration`.
    fn center_on(&mut self, bounds: Rect, duration: Duration);
}

/// An in-flight pan from one offset to another.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PanAnimation {
    from: Vec2,
    to: Vec2,
    elapsed: Duration,
    duration: Duration,
}

/// Cubic ease-in-out on `t` in [0, 1].
fn ease_in_out(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Camera manages the view transform for the canvas.
///
/// It handles panning (translation) and zooming (scaling) operations,
/// converting between screen coordinates and page coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation offset (pan)
    pub offset: Vec2,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Screen size in pixels.
    pub viewport: Size,
    #[serde(skip)]
    animation: Option<PanAnimation>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Size::new(1280.0, 800.0))
    }
}

impl Camera {
    pub fn new(viewport: Size) -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: 0.1,
            max_zoom: 10.0,
            viewport,
            animation: None,
        }
    }

    /// Page-to-screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Screen-to-page transform.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Pan by a screen-space delta. Cancels any running animation.
    pub fn pan(&mut self, delta: Vec2) {
        self.animation = None;
        self.offset += delta;
    }

    /// Zoom, keeping the given screen point fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        self.animation = None;
        let world_point = self.screen_to_world(screen_point);
        self.zoom = new_zoom;
        let new_screen = self.world_to_screen(world_point);
        self.offset += screen_point - new_screen;
    }

    /// Page-space rectangle currently visible.
    pub fn visible_bounds(&self) -> Rect {
        let top_left = self.screen_to_world(Point::ZERO);
        let bottom_right =
            self.screen_to_world(Point::new(self.viewport.width, self.viewport.height));
        Rect::from_points(top_left, bottom_right)
    }

    /// Offset that puts `page_point` at the screen center at the current zoom.
    fn offset_centering(&self, page_point: Point) -> Vec2 {
        Vec2::new(
            self.viewport.width / 2.0 - page_point.x * self.zoom,
            self.viewport.height / 2.0 - page_point.y * self.zoom,
        )
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Advance the running animation by `dt`. Returns true while still moving.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let Some(mut anim) = self.animation else {
            return false;
        };
        anim.elapsed += dt;
        let t = (anim.elapsed.as_secs_f64() / anim.duration.as_secs_f64()).min(1.0);
        self.offset = anim.from.lerp(anim.to, ease_in_out(t));

        if t >= 1.0 {
            self.offset = anim.to;
            self.animation = None;
            false
        } else {
            self.animation = Some(anim);
            true
        }
    }
}

impl Viewport for Camera {
    fn view_center(&self) -> Point {
        self.screen_to_world(Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0))
    }

    fn center_on(&mut self, bounds: Rect, duration: Duration) {
        let target = self.offset_centering(bounds.center());
        if duration.is_zero() {
            self.animation = None;
            self.offset = target;
            return;
        }
        self.animation = Some(PanAnimation {
            from: self.offset,
            to: target,
            elapsed: Duration::ZERO,
            duration,
        });
    }
}
