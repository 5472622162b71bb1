//! Concurrent in-memory keyed store

use crate::KeyedStore;
use dashmap::DashMap;
use rq_core::{Identity, Record};

/// In-memory keyed store backed by a concurrent map.
///
/// Intended as the default reconciliation target for consumers that want a
/// queryable copy of the result set rather than a change-event stream.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<Identity, Record>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Current record for an identity, if present.
    pub fn get(&self, id: &Identity) -> Option<Record> {
        self.records.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &Identity) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Snapshot of all identities currently held, in unspecified order.
    pub fn identities(&self) -> Vec<Identity> {
        self.records.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl KeyedStore for MemoryStore {
    fn add(&self, id: Identity, record: Record) {
        self.records.insert(id, record);
    }

    fn put(&self, id: Identity, record: Record) {
        self.records.insert(id, record);
    }

    fn remove(&self, id: &Identity) {
        self.records.remove(id);
    }
}
