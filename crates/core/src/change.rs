//! Typed change events between two ordered result sequences

use crate::record::Record;
use serde::Serialize;

/// One observed difference between two ordered result sequences.
///
/// Within a reconciliation pass, deletes are emitted first in descending
/// old-index order, then adds and updates in ascending new-index order, so
/// every index is valid against the sequence state at the moment the event
/// is applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Change {
    /// Record appeared at `index` in the new sequence.
    Add { record: Record, index: usize },
    /// Record changed value, position, or both. A pure move still carries
    /// the full record with `index != previous_index`.
    Update {
        record: Record,
        index: usize,
        previous_index: usize,
    },
    /// Record vanished from `index` in the prior sequence.
    Delete { record: Record, index: usize },
}

impl Change {
    /// The record carried by this change.
    pub fn record(&self) -> &Record {
        match self {
            Change::Add { record, .. }
            | Change::Update { record, .. }
            | Change::Delete { record, .. } => record,
        }
    }

    /// Index the change applies at: the new index for adds and updates, the
    /// old index for deletes.
    pub fn index(&self) -> usize {
        match self {
            Change::Add { index, .. }
            | Change::Update { index, .. }
            | Change::Delete { index, .. } => *index,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Change::Add { .. } => "add",
            Change::Update { .. } => "update",
            Change::Delete { .. } => "delete",
        }
    }
}
