//! Result-set reconciliation for requery
//!
//! This crate provides:
//! - The `QueryProvider` capability for ordered, keyed query sources
//! - Single-flight fetch orchestration (one pass in flight, extra triggers
//!   dropped)
//! - Seed and diff processing over `rq_core` snapshots
//! - Change dispatch to a keyed store or an event listener channel
//! - A periodic polling driver for daemon-style consumers

pub mod poll;
pub mod provider;
pub mod reconciler;
pub mod sink;

// Re-exports
pub use poll::PeriodicUpdater;
pub use provider::{QueryKind, QueryProvider, QueryResult, RangeArgs};
pub use reconciler::Reconciler;
pub use sink::{ChangeSink, PassSummary};
