//! Identity -> position lookup for ordered result sequences

use crate::record::{identity_of, Identity, Record, RecordError};
use ahash::AHashMap;

/// Keyed lookup from record identity to its current position in an ordered
/// sequence.
///
/// Invariant: for a sequence `S`, `get(id) == Some(i)` iff the record at
/// `S[i]` carries `id`, for every id present in `S`. Callers that splice the
/// sequence must re-patch the map immediately, so it never observes a
/// sequence it has not been updated for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexMap {
    entries: AHashMap<Identity, usize>,
}

impl IndexMap {
    /// Build a fresh map for an ordered sequence in O(n).
    pub fn build(rows: &[Record], id_field: &str) -> Result<Self, RecordError> {
        let mut entries = AHashMap::with_capacity(rows.len());
        for (position, row) in rows.iter().enumerate() {
            entries.insert(identity_of(row, id_field)?, position);
        }
        Ok(Self { entries })
    }

    /// Position of an identity, if present.
    pub fn get(&self, id: &Identity) -> Option<usize> {
        self.entries.get(id).copied()
    }

    pub fn contains(&self, id: &Identity) -> bool {
        self.entries.contains_key(id)
    }

    /// Re-number entries for rows at or after `start` after an insertion or
    /// removal in the underlying sequence.
    ///
    /// O(k) for the k shifted rows. Rows here were already validated when
    /// their sequence was first indexed, so extraction failures only occur
    /// if the caller spliced in unvalidated data.
    pub fn patch_from(
        &mut self,
        rows: &[Record],
        id_field: &str,
        start: usize,
    ) -> Result<(), RecordError> {
        for (position, row) in rows.iter().enumerate().skip(start) {
            self.entries.insert(identity_of(row, id_field)?, position);
        }
        Ok(())
    }

    /// Point an identity at a new position without renumbering its
    /// neighbours.
    pub fn set(&mut self, id: Identity, position: usize) {
        self.entries.insert(id, position);
    }

    /// Drop the entry for a removed identity.
    pub fn remove(&mut self, id: &Identity) -> Option<usize> {
        self.entries.remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: u64) -> Record {
        json!({ "id": id }).as_object().cloned().unwrap()
    }

    #[test]
    fn test_build_indexes_every_row() {
        let rows = vec![row(10), row(20), row(30)];
        let map = IndexMap::build(&rows, "id").unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&Identity::from("10")), Some(0));
        assert_eq!(map.get(&Identity::from("20")), Some(1));
        assert_eq!(map.get(&Identity::from("30")), Some(2));
    }

    #[test]
    fn test_build_fails_on_missing_identity() {
        let rows = vec![row(1), json!({ "v": "x" }).as_object().cloned().unwrap()];
        assert!(IndexMap::build(&rows, "id").is_err());
    }

    #[test]
    fn test_patch_after_removal() {
        let mut rows = vec![row(1), row(2), row(3)];
        let mut map = IndexMap::build(&rows, "id").unwrap();

        let removed = rows.remove(0);
        map.patch_from(&rows, "id", 0).unwrap();
        map.remove(&identity_of(&removed, "id").unwrap());

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&Identity::from("2")), Some(0));
        assert_eq!(map.get(&Identity::from("3")), Some(1));
        assert_eq!(map.get(&Identity::from("1")), None);
    }

    #[test]
    fn test_patch_after_insertion() {
        let mut rows = vec![row(1), row(3)];
        let mut map = IndexMap::build(&rows, "id").unwrap();

        rows.insert(1, row(2));
        map.patch_from(&rows, "id", 1).unwrap();

        assert_eq!(map.get(&Identity::from("1")), Some(0));
        assert_eq!(map.get(&Identity::from("2")), Some(1));
        assert_eq!(map.get(&Identity::from("3")), Some(2));
    }

    #[test]
    fn test_patched_map_matches_full_rebuild() {
        let mut rows: Vec<Record> = (0..8).map(row).collect();
        let mut map = IndexMap::build(&rows, "id").unwrap();

        rows.remove(3);
        map.patch_from(&rows, "id", 3).unwrap();
        map.remove(&Identity::from("3"));

        rows.insert(0, row(99));
        map.patch_from(&rows, "id", 0).unwrap();

        assert_eq!(map, IndexMap::build(&rows, "id").unwrap());
    }
}
