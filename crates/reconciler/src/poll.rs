//! Periodic reconciliation driver
//!
//! Re-triggers reconciliation on a fixed cadence. Triggers that land while
//! a pass is still in flight are dropped by the reconciler itself, so a
//! slow fetch never stacks up passes.

use crate::provider::QueryKind;
use crate::reconciler::Reconciler;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Periodic update driver
///
/// Owns a shared reconciler and triggers one pass per tick. A failed pass
/// is logged and the loop keeps going; the next tick tries again.
pub struct PeriodicUpdater {
    reconciler: Arc<Reconciler>,

    /// Polling cadence
    interval: Duration,

    /// Which trigger to repeat: whole-collection or captured range
    kind: QueryKind,
}

impl PeriodicUpdater {
    pub fn new(reconciler: Arc<Reconciler>, interval: Duration, kind: QueryKind) -> Self {
        Self {
            reconciler,
            interval,
            kind,
        }
    }

    /// Run the polling loop indefinitely.
    ///
    /// Spawn as a background task; select against a shutdown signal to stop.
    pub async fn run(self) -> Result<()> {
        let mut timer = interval(self.interval);

        info!("Starting periodic reconciliation (interval: {:?}, kind: {})", self.interval, self.kind);

        loop {
            timer.tick().await;

            let pass = match self.kind {
                QueryKind::All => self.reconciler.update().await,
                QueryKind::Range => self.reconciler.update_range().await,
            };

            match pass {
                Ok(Some(result)) => {
                    debug!("Reconciliation pass completed ({} rows, {} total)", result.rows.len(), result.total);
                }
                Ok(None) => {
                    debug!("Trigger dropped; previous pass still in flight");
                }
                Err(e) => {
                    warn!("Reconciliation pass failed: {:#}", e);
                }
            }
        }
    }
}
