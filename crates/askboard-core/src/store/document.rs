//! In-memory canvas document implementing the store facade.

use super::{
    Change, ChangeBatch, GuardRegistry, MutationGuard, ShapeStore, StoreError, StoreResult,
};
use crate::geometry::union_bounds;
use crate::shapes::{Group, Shape, ShapeId, ShapeKind, ShapeMeta, ShapeProps, ShapeSpec};
use kurbo::{Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Maximum number of undo states to keep.
pub const MAX_UNDO_HISTORY: usize = 50;

/// A snapshot of document state for undo/redo and rollback.
#[derive(Debug, Clone)]
struct DocumentSnapshot {
    shapes: HashMap<ShapeId, Shape>,
    z_order: Vec<ShapeId>,
    selection: Vec<ShapeId>,
}

/// A canvas document containing all shapes.
///
/// Every mutation is committed as part of a batch: explicit ones opened with
/// [`ShapeStore::run_atomic`], or an implicit single-call batch. A committed
/// batch becomes one undo step and one [`ChangeBatch`] in the outbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasDocument {
    /// Unique document identifier.
    pub id: String,
    /// Document name.
    pub name: String,
    shapes: HashMap<ShapeId, Shape>,
    /// Z-order of shapes (back to front).
    z_order: Vec<ShapeId>,
    #[serde(skip)]
    selection: Vec<ShapeId>,
    #[serde(skip)]
    undo_stack: Vec<DocumentSnapshot>,
    #[serde(skip)]
    redo_stack: Vec<DocumentSnapshot>,
    #[serde(skip)]
    guards: GuardRegistry,
    /// Changes of the batch currently open, if any.
    #[serde(skip)]
    pending: Option<Vec<Change>>,
    /// Committed batches not yet sent to peers.
    #[serde(skip)]
    outgoing: Vec<ChangeBatch>,
}

impl Default for CanvasDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: "Untitled".to_string(),
            shapes: HashMap::new(),
            z_order: Vec::new(),
            selection: Vec::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            guards: GuardRegistry::default(),
            pending: None,
            outgoing: Vec::new(),
        }
    }

    fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            shapes: self.shapes.clone(),
            z_order: self.z_order.clone(),
            selection: self.selection.clone(),
        }
    }

    fn restore(&mut self, snapshot: DocumentSnapshot) {
        self.shapes = snapshot.shapes;
        self.z_order = snapshot.z_order;
        self.selection = snapshot.selection;
    }

    /// Restore a history entry. Every shape it brings back passes the guards
    /// with the current state as the committed one.
    fn restore_guarded(&mut self, snapshot: DocumentSnapshot) {
        let DocumentSnapshot {
            shapes,
            z_order,
            selection,
        } = snapshot;
        let shapes = shapes
            .into_iter()
            .map(|(id, shape)| (id, self.guards.apply(self.shapes.get(&id), shape)))
            .collect();
        self.restore(DocumentSnapshot {
            shapes,
            z_order,
            selection,
        });
    }

    fn commit(&mut self, before: DocumentSnapshot, changes: Vec<Change>) {
        if changes.is_empty() {
            return;
        }

        self.undo_stack.push(before);
        self.redo_stack.clear();
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }

        let batch = ChangeBatch::new(compact(changes));
        log::debug!("Committed batch of {} changes", batch.len());
        self.outgoing.push(batch);
    }

    fn record(&mut self, change: Change) {
        if let Some(pending) = self.pending.as_mut() {
            pending.push(change);
        }
    }

    fn require(&self, id: ShapeId) -> StoreResult<&Shape> {
        self.shapes.get(&id).ok_or(StoreError::ShapeNotFound(id))
    }

    fn require_all(&self, ids: &[ShapeId]) -> StoreResult<()> {
        ids.iter().try_for_each(|&id| self.require(id).map(|_| ()))
    }

    /// Commit a shape state through the mutation guards.
    ///
    /// With `cascade`, a group translation moves its children along.
    fn put(&mut self, next: Shape, cascade: bool) {
        let next = self.guards.apply(self.shapes.get(&next.id), next);
        let id = next.id;

        let moved_by = match self.shapes.get(&id) {
            Some(prev) if cascade && prev.is_group() => Some(next.position - prev.position),
            Some(_) => None,
            None => {
                self.z_order.push(id);
                None
            }
        };

        self.shapes.insert(id, next.clone());
        self.record(Change::Put { shape: next });

        if let Some(delta) = moved_by.filter(|d| *d != Vec2::ZERO) {
            for child_id in self.children_of(id) {
                if let Some(mut child) = self.shapes.get(&child_id).cloned() {
                    child.translate(delta);
                    self.put(child, true);
                }
            }
        }
    }

    /// Remove a shape and everything parented under it.
    fn remove_tree(&mut self, id: ShapeId) {
        for child_id in self.children_of(id) {
            self.remove_tree(child_id);
        }
        if self.shapes.remove(&id).is_some() {
            self.z_order.retain(|&z| z != id);
            self.selection.retain(|&s| s != id);
            self.record(Change::Remove { id });
        }
    }

    fn set_z_order(&mut self, z_order: Vec<ShapeId>) {
        let mut seen = HashSet::new();
        let mut order: Vec<ShapeId> = z_order
            .into_iter()
            .filter(|id| self.shapes.contains_key(id) && seen.insert(*id))
            .collect();
        // Shapes the incoming order does not mention keep their place on top
        order.extend(self.z_order.iter().filter(|id| !seen.contains(*id)).copied());
        self.z_order = order;
        self.record(Change::Reorder {
            z_order: self.z_order.clone(),
        });
    }

    fn is_descendant(&self, candidate: ShapeId, ancestor: ShapeId) -> bool {
        let mut current = self.shapes.get(&candidate).and_then(|s| s.parent_id);
        let mut hops = 0;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            hops += 1;
            if hops > self.shapes.len() {
                return false;
            }
            current = self.shapes.get(&parent).and_then(|s| s.parent_id);
        }
        false
    }

    /// Direct children of `id`, in z-order.
    pub fn children_of(&self, id: ShapeId) -> Vec<ShapeId> {
        self.z_order
            .iter()
            .filter(|z| self.shapes.get(*z).and_then(|s| s.parent_id) == Some(id))
            .copied()
            .collect()
    }

    /// Shapes in z-order (back to front).
    pub fn shapes_ordered(&self) -> impl Iterator<Item = &Shape> {
        self.z_order.iter().filter_map(|id| self.shapes.get(id))
    }

    pub fn z_order(&self) -> &[ShapeId] {
        &self.z_order
    }

    /// Position of a shape in the back-to-front order.
    pub fn z_index(&self, id: ShapeId) -> Option<usize> {
        self.z_order.iter().position(|&z| z == id)
    }

    pub fn selection(&self) -> &[ShapeId] {
        &self.selection
    }

    /// Get the bounding box of all shapes.
    pub fn bounds(&self) -> Option<Rect> {
        union_bounds(self.shapes.values().map(Shape::bounds)).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Whether a batch is currently open.
    pub fn in_batch(&self) -> bool {
        self.pending.is_some()
    }

    /// Undo the last committed batch.
    /// Returns true if undo was performed, false if nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.restore_guarded(snapshot);
        self.publish_diff(&current);
        self.redo_stack.push(current);
        true
    }

    /// Redo the last undone batch.
    /// Returns true if redo was performed, false if nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.restore_guarded(snapshot);
        self.publish_diff(&current);
        self.undo_stack.push(current);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Queue the difference between `before` and the current state for peers.
    fn publish_diff(&mut self, before: &DocumentSnapshot) {
        let mut changes: Vec<Change> = before
            .z_order
            .iter()
            .filter(|id| !self.shapes.contains_key(*id))
            .map(|&id| Change::Remove { id })
            .collect();
        changes.extend(
            self.shapes_ordered()
                .filter(|shape| before.shapes.get(&shape.id) != Some(*shape))
                .map(|shape| Change::Put {
                    shape: shape.clone(),
                }),
        );
        // Peers append unknown shapes on top; reorder only if that is not enough
        let mut expected: Vec<ShapeId> = before
            .z_order
            .iter()
            .filter(|id| self.shapes.contains_key(*id))
            .copied()
            .collect();
        expected.extend(
            self.z_order
                .iter()
                .filter(|id| !before.shapes.contains_key(*id))
                .copied(),
        );
        if expected != self.z_order {
            changes.push(Change::Reorder {
                z_order: self.z_order.clone(),
            });
        }
        if !changes.is_empty() {
            self.outgoing.push(ChangeBatch::new(changes));
        }
    }

    /// Apply a batch received from a peer.
    ///
    /// Guards still run on every put. Remote changes are not undoable locally
    /// and are not echoed back into the outbox.
    pub fn apply_remote(&mut self, batch: ChangeBatch) {
        let open = self.pending.replace(Vec::new());
        for change in batch.changes {
            match change {
                Change::Put { shape } => self.put(shape, false),
                Change::Remove { id } => self.remove_tree(id),
                Change::Reorder { z_order } => self.set_z_order(z_order),
            }
        }
        self.pending = open;
    }

    /// Take committed batches (drains the outbox).
    pub fn take_outgoing(&mut self) -> Vec<ChangeBatch> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON. Guards must be registered again.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Keep only the last change per shape, in the order those last changes
/// happened. The final z-order goes last so it can refer to every put shape.
fn compact(changes: Vec<Change>) -> Vec<Change> {
    let mut seen = HashSet::new();
    let mut reorder = None;
    let mut kept: Vec<Change> = Vec::with_capacity(changes.len());
    for change in changes.into_iter().rev() {
        let target = match &change {
            Change::Put { shape } => Some(shape.id()),
            Change::Remove { id } => Some(*id),
            Change::Reorder { .. } => None,
        };
        match target {
            Some(id) if seen.insert(id) => kept.push(change),
            Some(_) => {}
            None if reorder.is_none() => reorder = Some(change),
            None => {}
        }
    }
    kept.reverse();
    kept.extend(reorder);
    kept
}

impl ShapeStore for CanvasDocument {
    fn selected_shapes(&self) -> Vec<Shape> {
        self.selection
            .iter()
            .filter_map(|id| self.shapes.get(id))
            .cloned()
            .collect()
    }

    fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    fn create_shape(&mut self, spec: ShapeSpec) -> StoreResult<ShapeId> {
        self.run_atomic(move |doc| {
            let shape = spec.into_shape()?;
            if doc.shapes.contains_key(&shape.id) {
                return Err(StoreError::InvalidSpec(format!("duplicate shape id {}", shape.id)));
            }
            if let Some(parent) = shape.parent_id {
                doc.require(parent)?;
            }
            let id = shape.id;
            doc.put(shape, true);
            Ok(id)
        })
    }

    fn update_shape(&mut self, shape: Shape) -> StoreResult<()> {
        self.run_atomic(move |doc| {
            doc.require(shape.id)?;
            if let Some(parent) = shape.parent_id {
                doc.require(parent)?;
            }
            doc.put(shape, true);
            Ok(())
        })
    }

    fn remove_shapes(&mut self, ids: &[ShapeId]) -> StoreResult<()> {
        self.run_atomic(|doc| {
            doc.require_all(ids)?;
            for &id in ids {
                doc.remove_tree(id);
            }
            Ok(())
        })
    }

    fn send_to_back(&mut self, ids: &[ShapeId]) -> StoreResult<()> {
        self.run_atomic(|doc| {
            doc.require_all(ids)?;
            let (mut back, rest): (Vec<ShapeId>, Vec<ShapeId>) =
                doc.z_order.iter().partition(|id| ids.contains(id));
            back.extend(rest);
            doc.set_z_order(back);
            Ok(())
        })
    }

    fn reparent(&mut self, ids: &[ShapeId], parent: ShapeId) -> StoreResult<()> {
        self.run_atomic(|doc| {
            doc.require(parent)?;
            doc.require_all(ids)?;
            for &id in ids {
                if id == parent || doc.is_descendant(parent, id) {
                    return Err(StoreError::InvalidSpec(format!(
                        "cannot parent {id} under its own descendant {parent}"
                    )));
                }
                let mut shape = doc.require(id)?.clone();
                shape.parent_id = Some(parent);
                doc.put(shape, false);
            }
            Ok(())
        })
    }

    fn group(&mut self, ids: &[ShapeId]) -> StoreResult<ShapeId> {
        self.run_atomic(|doc| {
            if ids.is_empty() {
                return Err(StoreError::InvalidSpec("cannot group zero shapes".to_string()));
            }
            doc.require_all(ids)?;

            let covered = union_bounds(ids.iter().filter_map(|id| doc.shape_bounds(*id)))?;
            let (origin, props) = Group::covering(covered);
            let first_parent = doc.require(ids[0])?.parent_id;
            let shared_parent = ids
                .iter()
                .all(|id| doc.shapes.get(id).map(|s| s.parent_id) == Some(first_parent))
                .then_some(first_parent)
                .flatten();

            let mut group = Shape::new(ShapeProps::Group(props)).at(origin);
            group.parent_id = shared_parent;
            let group_id = group.id();
            doc.put(group, false);

            // Sit directly above the frontmost member
            let front = ids.iter().filter_map(|id| doc.z_index(*id)).max().unwrap_or(0);
            let mut order = doc.z_order.clone();
            order.retain(|&z| z != group_id);
            order.insert((front + 1).min(order.len()), group_id);
            doc.set_z_order(order);

            for &id in ids {
                let mut member = doc.require(id)?.clone();
                member.parent_id = Some(group_id);
                doc.put(member, false);
            }

            doc.select(&[group_id]);
            Ok(group_id)
        })
    }

    fn update_meta(&mut self, id: ShapeId, partial: ShapeMeta) -> StoreResult<()> {
        self.run_atomic(move |doc| {
            let mut shape = doc.require(id)?.clone();
            shape.meta.merge(partial);
            doc.put(shape, false);
            Ok(())
        })
    }

    fn select(&mut self, ids: &[ShapeId]) {
        self.selection = ids
            .iter()
            .filter(|id| self.shapes.contains_key(*id))
            .copied()
            .collect();
    }

    fn register_mutation_guard(&mut self, kind: ShapeKind, guard: MutationGuard) {
        self.guards.register(kind, guard);
    }

    fn run_atomic<T, F>(&mut self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Self) -> StoreResult<T>,
    {
        let before = self.snapshot();
        let outermost = self.pending.is_none();
        let mark = self.pending.get_or_insert_with(Vec::new).len();

        match f(self) {
            Ok(value) => {
                if outermost {
                    let changes = self.pending.take().unwrap_or_default();
                    self.commit(before, changes);
                }
                Ok(value)
            }
            Err(err) => {
                self.restore(before);
                if outermost {
                    self.pending = None;
                } else if let Some(pending) = self.pending.as_mut() {
                    pending.truncate(mark);
                }
                log::debug!("Rolled back batch: {}", err);
                Err(err)
            }
        }
    }
}
