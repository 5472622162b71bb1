//! Query provider interface

use anyhow::Result;
use async_trait::async_trait;
use rq_core::Record;
use serde::{Deserialize, Serialize};

/// Paging window for a ranged fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeArgs {
    /// Absolute index of the first row in the range
    pub start: usize,
    /// Maximum number of rows to return
    pub count: usize,
}

/// A fully-materialized ordered result set.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Rows returned by the fetch, in collection order
    pub rows: Vec<Record>,
    /// Length of the whole virtual collection; exceeds `rows.len()` when
    /// the fetch covered a sub-range
    pub total: usize,
}

/// Which fetch shape produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Whole-collection fetch
    All,
    /// Paged fetch over a sub-range
    Range,
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKind::All => write!(f, "all"),
            QueryKind::Range => write!(f, "range"),
        }
    }
}

/// Source of ordered, keyed result sets.
///
/// Implementations resolve with a fully-materialized sequence; streaming
/// and partial results are out of scope. Any ordered/keyed query source can
/// satisfy this by delegation or composition.
#[async_trait]
pub trait QueryProvider: Send + Sync {
    /// Fetch the whole collection.
    async fn fetch_all(&self) -> Result<QueryResult>;

    /// Fetch a sub-range of the collection.
    async fn fetch_range(&self, args: RangeArgs) -> Result<QueryResult>;
}
