//! Store facade over the shared canvas document.
//!
//! Controllers only talk to the document through [`ShapeStore`]. Multi-shape
//! edits must go through [`ShapeStore::run_atomic`] so undo history and
//! connected peers never observe an intermediate state.

mod batch;
mod document;

pub use batch::{Change, ChangeBatch};
pub use document::{CanvasDocument, MAX_UNDO_HISTORY};

use crate::geometry::GeometryError;
use crate::shapes::{Shape, ShapeId, ShapeKind, ShapeMeta, ShapeSpec};
use kurbo::Rect;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// The shape is gone, usually deleted concurrently. Soft failure.
    #[error("Shape not found: {0}")]
    ShapeNotFound(ShapeId),
    #[error("Invalid shape spec: {0}")]
    InvalidSpec(String),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Pre-commit hook: receives the committed state (absent on creation) and the
/// proposed state, returns the state to commit.
///
/// Guards run on every local and remote mutation of their shape kind,
/// including drag updates, so they must be cheap and free of side effects.
pub type MutationGuard = Arc<dyn Fn(Option<&Shape>, Shape) -> Shape + Send + Sync>;

/// Mutation guards keyed by shape kind, applied in registration order.
#[derive(Clone, Default)]
pub struct GuardRegistry {
    guards: HashMap<ShapeKind, Vec<MutationGuard>>,
}

impl GuardRegistry {
    pub fn register(&mut self, kind: ShapeKind, guard: MutationGuard) {
        self.guards.entry(kind).or_default().push(guard);
    }

    /// Run the guards for `next`'s kind.
    pub fn apply(&self, prev: Option<&Shape>, next: Shape) -> Shape {
        match self.guards.get(&next.kind()) {
            Some(guards) => guards.iter().fold(next, |state, guard| guard(prev, state)),
            None => next,
        }
    }

    pub fn len(&self) -> usize {
        self.guards.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for GuardRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.guards.iter().map(|(k, v)| (*k, v.len())).collect();
        kinds.sort_by_key(|(k, _)| k.to_string());
        f.debug_struct("GuardRegistry").field("guards", &kinds).finish()
    }
}

/// Contract over the mutable canvas document.
///
/// Every mutating method fails with [`StoreError::ShapeNotFound`] if a
/// referenced id no longer exists at call time.
pub trait ShapeStore {
    /// Currently selected shapes that still exist.
    fn selected_shapes(&self) -> Vec<Shape>;

    fn shape(&self, id: ShapeId) -> Option<&Shape>;

    /// Page-space bounds, or `None` if the shape was deleted.
    fn shape_bounds(&self, id: ShapeId) -> Option<Rect> {
        self.shape(id).map(Shape::bounds)
    }

    fn create_shape(&mut self, spec: ShapeSpec) -> StoreResult<ShapeId>;

    /// Replace a shape's state. Mutation guards may correct the proposal.
    fn update_shape(&mut self, shape: Shape) -> StoreResult<()>;

    fn remove_shapes(&mut self, ids: &[ShapeId]) -> StoreResult<()>;

    /// Move shapes behind everything else, keeping their relative order.
    fn send_to_back(&mut self, ids: &[ShapeId]) -> StoreResult<()>;

    fn reparent(&mut self, ids: &[ShapeId], parent: ShapeId) -> StoreResult<()>;

    /// Group shapes under a new group shape and return its id.
    fn group(&mut self, ids: &[ShapeId]) -> StoreResult<ShapeId>;

    /// Shallow-merge `partial` into the shape's meta.
    fn update_meta(&mut self, id: ShapeId, partial: ShapeMeta) -> StoreResult<()>;

    fn select(&mut self, ids: &[ShapeId]);

    fn register_mutation_guard(&mut self, kind: ShapeKind, guard: MutationGuard);

    /// Run `f` as one undo step and one synchronization unit.
    ///
    /// If `f` fails, none of its mutations are committed.
    fn run_atomic<T, F>(&mut self, f: F) -> StoreResult<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> StoreResult<T>;
}
