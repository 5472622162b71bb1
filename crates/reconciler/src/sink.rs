//! Change dispatch to downstream consumers

use crate::provider::{QueryKind, RangeArgs};
use anyhow::Result;
use rq_core::{identity_of, Change, Record};
use std::sync::Arc;
use store::KeyedStore;
use tokio::sync::mpsc;
use tracing::warn;

/// Downstream consumer of reconciliation changes: either a keyed store the
/// changes are applied to, or a listener channel the events are sent over.
pub enum ChangeSink {
    /// Apply changes directly to a keyed store.
    Store(Arc<dyn KeyedStore>),
    /// Send each change to a listener channel.
    Events(mpsc::Sender<Change>),
}

impl ChangeSink {
    /// Dispatch one change.
    ///
    /// Store targets translate add/update/delete into add/put/remove keyed
    /// by identity; the match is exhaustive, so an unhandled change kind is
    /// a compile error rather than a runtime surprise. A dropped event
    /// listener is logged and otherwise ignored.
    pub(crate) async fn apply(&self, change: Change, id_field: &str) -> Result<()> {
        match self {
            ChangeSink::Store(target) => match change {
                Change::Add { record, .. } => {
                    let id = identity_of(&record, id_field)?;
                    target.add(id, record);
                }
                Change::Update { record, .. } => {
                    let id = identity_of(&record, id_field)?;
                    target.put(id, record);
                }
                Change::Delete { record, .. } => {
                    let id = identity_of(&record, id_field)?;
                    target.remove(&id);
                }
            },
            ChangeSink::Events(tx) => {
                if tx.send(change).await.is_err() {
                    warn!("Change listener dropped; event discarded");
                }
            }
        }
        Ok(())
    }
}

/// Emitted once per reconciliation pass, whether or not any changes were
/// detected. Consumers use this to know a pass finished.
#[derive(Debug, Clone)]
pub struct PassSummary {
    /// Fetch shape that drove the pass
    pub kind: QueryKind,
    /// Range arguments the pass repeated, for ranged fetches
    pub args: Option<RangeArgs>,
    /// Rows returned by the fetch
    pub rows: Vec<Record>,
    /// Total length of the virtual collection
    pub total: usize,
}
