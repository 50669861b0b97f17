//! Mutation guards installed on every board document.

use crate::shapes::{Shape, ShapeKind};
use crate::store::{MutationGuard, ShapeStore};
use std::sync::Arc;

/// Keep `noResize` shapes (handwriting groups and their frames) at their
/// committed size.
///
/// Translation passes untouched. Any change of size or rotation sends
/// position, size and rotation back to the committed values; the rest of the
/// proposal (meta, parent) is kept.
pub fn keep_handwriting_size(prev: Option<&Shape>, mut next: Shape) -> Shape {
    let Some(prev) = prev else {
        return next;
    };
    if !(prev.meta.no_resize() || next.meta.no_resize()) {
        return next;
    }
    if prev.size() == next.size() && prev.rotation == next.rotation {
        return next;
    }

    log::debug!("Reverted resize of locked {} {}", next.kind(), next.id());
    next.position = prev.position;
    next.rotation = prev.rotation;
    next.set_size(prev.size());
    next
}

/// Keep settled text responses settled. Geometry edits still pass.
pub fn keep_response_settled(prev: Option<&Shape>, mut next: Shape) -> Shape {
    let Some(before) = prev.and_then(Shape::as_text_response) else {
        return next;
    };
    if !before.state().is_settled() {
        return next;
    }
    if let Some(after) = next.as_text_response_mut() {
        let changed = after.state() != before.state()
            || after.response_text() != before.response_text()
            || after.error_message() != before.error_message();
        if changed {
            log::debug!("Kept settled response as {}", before.state());
            after.restore_response_from(before);
        }
    }
    next
}

/// Register the board's guards on `store`.
pub fn install_guards<S: ShapeStore>(store: &mut S) {
    let resize: MutationGuard = Arc::new(keep_handwriting_size);
    let settled: MutationGuard = Arc::new(keep_response_settled);
    store.register_mutation_guard(ShapeKind::Group, resize.clone());
    store.register_mutation_guard(ShapeKind::Frame, resize);
    store.register_mutation_guard(ShapeKind::TextResponse, settled);
}
