//! Keyed target stores for reconciled result sets
//!
//! A reconciler can be pointed at a store instead of an event listener; add,
//! update and delete changes then become `add`, `put` and `remove` calls
//! keyed by record identity.

pub mod memory;

// Re-exports
pub use memory::MemoryStore;

use rq_core::{Identity, Record};

/// Capability satisfied by any keyed downstream store.
///
/// Implementations index records by identity value alone; ordering is the
/// reconciler's concern, not the store's.
pub trait KeyedStore: Send + Sync {
    /// Insert a record that was not previously present.
    fn add(&self, id: Identity, record: Record);

    /// Insert or replace the record for an identity.
    fn put(&self, id: Identity, record: Record);

    /// Remove the record for an identity, if present.
    fn remove(&self, id: &Identity);
}
