//! Auto-framing: wrap loose handwriting in a frame and lock it into a group.

use crate::geometry::{pad, union_bounds};
use crate::shapes::{NO_RESIZE_KEY, Shape, ShapeId, ShapeMeta, ShapeSpec};
use crate::store::{ShapeStore, StoreError, StoreResult};

/// Default space between the handwriting and the frame edge.
pub const DEFAULT_FRAME_MARGIN: f64 = 20.0;

/// What an auto-frame request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoFrameOutcome {
    /// A locked group was created and selected.
    Framed(ShapeId),
    /// Nothing to frame, or the strokes vanished mid-way. No mutation.
    NoOp,
}

/// Turns a selection of freehand strokes into a handwriting group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoFrameEngine {
    pub margin: f64,
}

impl Default for AutoFrameEngine {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_MARGIN)
    }
}

impl AutoFrameEngine {
    pub fn new(margin: f64) -> Self {
        Self { margin }
    }

    /// Frame the handwriting in `selection`.
    ///
    /// Frame creation, z-ordering, reparenting, grouping and tagging commit as
    /// one batch. A stroke deleted concurrently rolls the batch back and
    /// yields [`AutoFrameOutcome::NoOp`]; other store failures propagate.
    pub fn auto_frame<S: ShapeStore>(
        &self,
        store: &mut S,
        selection: &[Shape],
    ) -> StoreResult<AutoFrameOutcome> {
        let (strokes, bounds): (Vec<ShapeId>, Vec<_>) = selection
            .iter()
            .filter(|shape| shape.is_handwriting())
            .filter_map(|shape| store.shape_bounds(shape.id()).map(|b| (shape.id(), b)))
            .unzip();

        if strokes.is_empty() {
            log::debug!("Auto-frame: no handwriting in selection");
            return Ok(AutoFrameOutcome::NoOp);
        }

        let frame_bounds = pad(union_bounds(bounds)?, self.margin);

        let result = store.run_atomic(|store| {
            let locked = ShapeSpec::frame(frame_bounds)
                .with_meta(ShapeMeta::new().with(NO_RESIZE_KEY, true));
            let frame = store.create_shape(locked)?;
            store.send_to_back(&[frame])?;
            store.reparent(&strokes, frame)?;

            let mut members = Vec::with_capacity(strokes.len() + 1);
            members.push(frame);
            members.extend_from_slice(&strokes);
            let group = store.group(&members)?;
            store.update_meta(group, ShapeMeta::new().with(NO_RESIZE_KEY, true))?;
            Ok(group)
        });

        match result {
            Ok(group) => {
                log::info!("Framed {} strokes into group {}", strokes.len(), group);
                Ok(AutoFrameOutcome::Framed(group))
            }
            Err(StoreError::ShapeNotFound(id)) => {
                log::warn!("Auto-frame abandoned, shape {} disappeared", id);
                Ok(AutoFrameOutcome::NoOp)
            }
            Err(err) => Err(err),
        }
    }

    /// Frame the handwriting in the store's current selection.
    pub fn auto_frame_selection<S: ShapeStore>(
        &self,
        store: &mut S,
    ) -> StoreResult<AutoFrameOutcome> {
        let selection = store.selected_shapes();
        self.auto_frame(store, &selection)
    }
}
