//! Last-delivered result snapshot

use crate::index_map::IndexMap;
use crate::record::{Record, RecordError};

/// An ordered result sequence plus its identity index.
///
/// Owned exclusively by the reconciler that produced it. Consumers observe
/// change events or a downstream store, never the snapshot itself; the
/// accessors here are read-only.
#[derive(Debug, Clone)]
pub struct Snapshot {
    rows: Vec<Record>,
    index: IndexMap,
}

impl Snapshot {
    /// Build a snapshot from an owned sequence, indexing it in O(n).
    pub fn build(rows: Vec<Record>, id_field: &str) -> Result<Self, RecordError> {
        let index = IndexMap::build(&rows, id_field)?;
        Ok(Self { rows, index })
    }

    pub(crate) fn from_parts(rows: Vec<Record>, index: IndexMap) -> Self {
        Self { rows, index }
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn index(&self) -> &IndexMap {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
