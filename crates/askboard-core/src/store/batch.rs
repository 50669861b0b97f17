//! Change batches: the unit of synchronization between peers.

use crate::shapes::{Shape, ShapeId};
use serde::{Deserialize, Serialize};

/// A single committed document change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Change {
    /// Shape created or replaced.
    Put { shape: Shape },
    Remove { id: ShapeId },
    /// New back-to-front z-order.
    Reorder { z_order: Vec<ShapeId> },
}

/// Changes committed together. Peers apply a batch all at once or not at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeBatch {
    pub changes: Vec<Change>,
}

impl ChangeBatch {
    pub fn new(changes: Vec<Change>) -> Self {
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Ids of every shape put by this batch.
    pub fn put_ids(&self) -> impl Iterator<Item = ShapeId> + '_ {
        self.changes.iter().filter_map(|change| match change {
            Change::Put { shape } => Some(shape.id()),
            _ => None,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
