//! Core data model for requery
//!
//! This crate provides:
//! - Keyed record handling (identity extraction, structural equality)
//! - Identity -> position index maps for ordered sequences
//! - Result snapshots (sequence + index map)
//! - The ordered diff algorithm producing add/update/delete changes
//!
//! Everything here is pure data manipulation; fetching and change dispatch
//! live in the `reconciler` crate.

pub mod change;
pub mod diff;
pub mod index_map;
pub mod record;
pub mod snapshot;

// Re-exports
pub use change::Change;
pub use diff::{diff_snapshots, DiffOutcome};
pub use index_map::IndexMap;
pub use record::{identity_of, Identity, Record, RecordError};
pub use snapshot::Snapshot;
