//! Shape creation requests.

use super::{Shape, ShapeId, ShapeKind, ShapeMeta, ShapeProps, TextResponse};
use crate::store::StoreError;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A loosely typed request to create a shape.
///
/// Mirrors the JSON a collaborator would send: `{"type": "frame", "x": 0,
/// "y": 0, "props": {"w": 10, "h": 10}}`. Props are checked against the
/// requested type when the request is turned into a [`Shape`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeSpec {
    #[serde(rename = "type", default)]
    pub kind: Option<ShapeKind>,
    #[serde(default)]
    pub id: Option<ShapeId>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub parent_id: Option<ShapeId>,
    #[serde(default)]
    pub meta: ShapeMeta,
    #[serde(default)]
    pub props: Map<String, Value>,
}

impl ShapeSpec {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Spec carrying already-typed props.
    pub fn from_props(props: &ShapeProps) -> Self {
        let props_map = match serde_json::to_value(props) {
            Ok(Value::Object(mut map)) => {
                map.remove("type");
                map
            }
            _ => Map::new(),
        };
        Self {
            kind: Some(props.kind()),
            props: props_map,
            ..Self::default()
        }
    }

    /// Frame covering `bounds`.
    pub fn frame(bounds: Rect) -> Self {
        Self::new(ShapeKind::Frame)
            .at(bounds.origin())
            .with_prop("w", bounds.width())
            .with_prop("h", bounds.height())
    }

    pub fn text_response(position: Point, response: TextResponse) -> Self {
        Self::from_props(&ShapeProps::TextResponse(response)).at(position)
    }

    pub fn at(mut self, position: Point) -> Self {
        self.x = position.x;
        self.y = position.y;
        self
    }

    pub fn with_id(mut self, id: ShapeId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_parent(mut self, parent: ShapeId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn with_meta(mut self, meta: ShapeMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Validate the request and build the shape.
    pub fn into_shape(self) -> Result<Shape, StoreError> {
        let kind = self
            .kind
            .ok_or_else(|| StoreError::InvalidSpec("missing shape type".to_string()))?;

        if ![self.x, self.y, self.rotation].iter().all(|v| v.is_finite()) {
            return Err(StoreError::InvalidSpec(format!(
                "{kind}: position and rotation must be finite"
            )));
        }

        let mut tagged = self.props;
        tagged.insert("type".to_string(), serde_json::to_value(kind).unwrap_or(Value::Null));
        let props: ShapeProps = serde_json::from_value(Value::Object(tagged))
            .map_err(|e| StoreError::InvalidSpec(format!("{kind}: {e}")))?;
        validate_props(&props).map_err(|e| StoreError::InvalidSpec(format!("{kind}: {e}")))?;

        Ok(Shape {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            position: Point::new(self.x, self.y),
            rotation: self.rotation,
            parent_id: self.parent_id,
            meta: self.meta,
            props,
        })
    }
}

fn validate_box(w: f64, h: f64) -> Result<(), String> {
    if !(w.is_finite() && h.is_finite()) || w < 0.0 || h < 0.0 {
        return Err(format!("invalid size {w}x{h}"));
    }
    Ok(())
}

fn validate_props(props: &ShapeProps) -> Result<(), String> {
    match props {
        ShapeProps::Draw(draw) => {
            if draw.points.is_empty() {
                return Err("stroke has no points".to_string());
            }
            if draw.points.iter().any(|p| !(p.x.is_finite() && p.y.is_finite())) {
                return Err("stroke has non-finite points".to_string());
            }
            Ok(())
        }
        ShapeProps::Frame(frame) => validate_box(frame.w, frame.h),
        ShapeProps::Group(group) => validate_box(group.w, group.h),
        ShapeProps::Rectangle(rect) => validate_box(rect.w, rect.h),
        ShapeProps::TextResponse(response) => {
            validate_box(response.w, response.h)?;
            response.validate()
        }
    }
}
