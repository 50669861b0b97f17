//! Shape definitions for the whiteboard document.
//!
//! Every shape is a flat record (`Shape`) with a position, rotation, optional
//! parent and a free-form `meta` map. Type-specific data lives in
//! [`ShapeProps`]. Parent/child is a non-owning relation: the document owns
//! every shape and keeps `parent_id` consistent.

mod draw;
mod frame;
mod group;
mod rectangle;
mod spec;
mod text_response;

pub use draw::Draw;
pub use frame::Frame;
pub use group::Group;
pub use rectangle::Rectangle;
pub use spec::ShapeSpec;
pub use text_response::{LifecycleError, ResponseState, TextResponse};

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for shapes.
pub type ShapeId = Uuid;

/// Meta key marking a group as move-only.
pub const NO_RESIZE_KEY: &str = "noResize";

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }
}

/// Stroke and fill settings carried by ink and geometric shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeStyle {
    pub stroke_color: SerializableColor,
    pub stroke_width: f64,
    /// Fill color (None = no fill).
    #[serde(default)]
    pub fill_color: Option<SerializableColor>,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            stroke_color: SerializableColor::black(),
            stroke_width: 2.0,
            fill_color: None,
            opacity: 1.0,
        }
    }
}

/// Discriminant of the shape variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeKind {
    Draw,
    Frame,
    Group,
    TextResponse,
    /// Closed geometric shape; anything that is not one of the above.
    Rectangle,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeKind::Draw => "draw",
            ShapeKind::Frame => "frame",
            ShapeKind::Group => "group",
            ShapeKind::TextResponse => "text-response",
            ShapeKind::Rectangle => "rectangle",
        };
        f.write_str(name)
    }
}

/// Engine-private flags attached to a shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeMeta(Map<String, Value>);

impl ShapeMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Shallow merge: keys in `partial` overwrite existing keys.
    pub fn merge(&mut self, partial: ShapeMeta) {
        self.0.extend(partial.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the shape is locked against resizing.
    pub fn no_resize(&self) -> bool {
        self.0
            .get(NO_RESIZE_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Local-space geometry shared by every props type.
pub trait ShapeGeometry {
    /// Bounding box relative to the shape's position, ignoring rotation.
    fn local_bounds(&self) -> Rect;

    /// Resize to `size`, keeping the local origin fixed.
    fn set_size(&mut self, size: Size);
}

/// Type-specific shape data, tagged by `type` when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ShapeProps {
    Draw(Draw),
    Frame(Frame),
    Group(Group),
    TextResponse(TextResponse),
    Rectangle(Rectangle),
}

impl ShapeProps {
    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeProps::Draw(_) => ShapeKind::Draw,
            ShapeProps::Frame(_) => ShapeKind::Frame,
            ShapeProps::Group(_) => ShapeKind::Group,
            ShapeProps::TextResponse(_) => ShapeKind::TextResponse,
            ShapeProps::Rectangle(_) => ShapeKind::Rectangle,
        }
    }

    fn geometry(&self) -> &dyn ShapeGeometry {
        match self {
            ShapeProps::Draw(p) => p,
            ShapeProps::Frame(p) => p,
            ShapeProps::Group(p) => p,
            ShapeProps::TextResponse(p) => p,
            ShapeProps::Rectangle(p) => p,
        }
    }

    fn geometry_mut(&mut self) -> &mut dyn ShapeGeometry {
        match self {
            ShapeProps::Draw(p) => p,
            ShapeProps::Frame(p) => p,
            ShapeProps::Group(p) => p,
            ShapeProps::TextResponse(p) => p,
            ShapeProps::Rectangle(p) => p,
        }
    }
}

/// A shape in the canvas document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub(crate) id: ShapeId,
    /// Top-left of the local frame, in page coordinates.
    pub position: Point,
    /// Rotation in radians around `position`.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub parent_id: Option<ShapeId>,
    #[serde(default)]
    pub meta: ShapeMeta,
    pub props: ShapeProps,
}

impl Shape {
    /// Create a new shape with a fresh ID at the page origin.
    pub fn new(props: ShapeProps) -> Self {
        Self::with_id(Uuid::new_v4(), props)
    }

    /// Create a shape with a specific ID (for storage and remote changes).
    pub fn with_id(id: ShapeId, props: ShapeProps) -> Self {
        Self {
            id,
            position: Point::ZERO,
            rotation: 0.0,
            parent_id: None,
            meta: ShapeMeta::default(),
            props,
        }
    }

    /// Builder-style position.
    pub fn at(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn kind(&self) -> ShapeKind {
        self.props.kind()
    }

    /// Unrotated size of the shape.
    pub fn size(&self) -> Size {
        self.props.geometry().local_bounds().size()
    }

    pub fn set_size(&mut self, size: Size) {
        self.props.geometry_mut().set_size(size);
    }

    /// Local-to-page transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.position.to_vec2()) * Affine::rotate(self.rotation)
    }

    /// Axis-aligned bounding box in page coordinates.
    pub fn bounds(&self) -> Rect {
        let local = self.props.geometry().local_bounds();
        if self.rotation == 0.0 {
            local + self.position.to_vec2()
        } else {
            self.transform().transform_rect_bbox(local)
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }

    /// Open freehand ink, the input of auto-framing.
    pub fn is_handwriting(&self) -> bool {
        matches!(&self.props, ShapeProps::Draw(d) if !d.is_closed)
    }

    pub fn is_group(&self) -> bool {
        matches!(self.props, ShapeProps::Group(_))
    }

    pub fn as_draw(&self) -> Option<&Draw> {
        match &self.props {
            ShapeProps::Draw(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_text_response(&self) -> Option<&TextResponse> {
        match &self.props {
            ShapeProps::TextResponse(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_text_response_mut(&mut self) -> Option<&mut TextResponse> {
        match &mut self.props {
            ShapeProps::TextResponse(t) => Some(t),
            _ => None,
        }
    }
}

/// Box-shaped local bounds anchored at the local origin.
fn box_bounds(w: f64, h: f64) -> Rect {
    Rect::new(0.0, 0.0, w, h)
}
