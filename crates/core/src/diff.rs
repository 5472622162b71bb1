//! Ordered reconciliation diff
//!
//! Compares a prior snapshot against a freshly fetched sequence and emits
//! the ordered add/update/delete events that transform one into the other,
//! keeping a working index map consistent with every structural splice.

use crate::change::Change;
use crate::index_map::IndexMap;
use crate::record::{identity_of, Record, RecordError};
use crate::snapshot::Snapshot;

/// Result of one diff pass: the ordered change events plus the snapshot the
/// reconciler retains for the next pass.
#[derive(Debug)]
pub struct DiffOutcome {
    pub changes: Vec<Change>,
    pub snapshot: Snapshot,
}

/// Diff `new_rows` against `prior`.
///
/// `offset` shifts every emitted index; pass the range start when the fetch
/// covered a sub-range of a larger virtual collection so indices come out
/// absolute rather than page-relative.
///
/// Deletes are walked back-to-front over the prior sequence, so earlier
/// removal indices never need adjustment for deletions that have already
/// been emitted. Adds and updates are then walked front-to-back over the new
/// sequence. Insertions and removals re-number the working index map for
/// every shifted position; a relocated record re-points only its own entry,
/// so the records it displaced still report the position they were last
/// observed at and moves are never swallowed by each other's patching. Two
/// records that swap places therefore produce two updates, each carrying
/// the other's old position.
///
/// A record missing its identity field fails the whole pass; rows are never
/// silently dropped.
pub fn diff_snapshots(
    prior: &Snapshot,
    new_rows: &[Record],
    id_field: &str,
    offset: usize,
) -> Result<DiffOutcome, RecordError> {
    let new_index = IndexMap::build(new_rows, id_field)?;
    let mut changes = Vec::new();

    let mut working: Vec<Record> = prior.rows().to_vec();
    let mut working_index = prior.index().clone();

    // Deletes against the prior sequence, last element first.
    for position in (0..working.len()).rev() {
        let id = identity_of(&working[position], id_field)?;
        if !new_index.contains(&id) {
            let removed = working.remove(position);
            working_index.patch_from(&working, id_field, position)?;
            working_index.remove(&id);
            changes.push(Change::Delete {
                record: removed,
                index: offset + position,
            });
        }
    }

    // Adds and updates against the new sequence, first element onward.
    for (position, row) in new_rows.iter().enumerate() {
        let id = identity_of(row, id_field)?;
        match working_index.get(&id) {
            None => {
                working.insert(position, row.clone());
                working_index.patch_from(&working, id_field, position)?;
                changes.push(Change::Add {
                    record: row.clone(),
                    index: offset + position,
                });
            }
            Some(previous) if previous == position => {
                let replaced = std::mem::replace(&mut working[position], row.clone());
                if replaced != *row {
                    changes.push(Change::Update {
                        record: row.clone(),
                        index: offset + position,
                        previous_index: offset + position,
                    });
                }
            }
            Some(previous) => {
                // A move is always reported, even with unchanged fields.
                changes.push(Change::Update {
                    record: row.clone(),
                    index: offset + position,
                    previous_index: offset + previous,
                });
                working_index.set(id, position);
            }
        }
    }

    Ok(DiffOutcome {
        changes,
        snapshot: Snapshot::from_parts(new_rows.to_vec(), new_index),
    })
}
