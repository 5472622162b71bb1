//! Single-flight reconciliation orchestration
//!
//! One reconciler owns one snapshot and guarantees at most one
//! fetch-diff-notify pass is in flight at a time. Triggers that arrive
//! while a pass is outstanding are dropped, not queued; callers re-trigger
//! on their own cadence.

use crate::provider::{QueryKind, QueryProvider, QueryResult, RangeArgs};
use crate::sink::{ChangeSink, PassSummary};
use anyhow::Result;
use parking_lot::Mutex;
use rq_core::{diff_snapshots, Record, Snapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Mutable reconciliation state, owned by one reconciler instance.
///
/// The snapshot mutex is only held for synchronous work, never across an
/// await point. The updating flag is the Idle/Fetching state machine:
/// acquired by compare-and-swap when a pass begins, cleared when it ends.
#[derive(Default)]
struct ReconcilerState {
    snapshot: Mutex<Option<Snapshot>>,
    captured_range: Mutex<Option<RangeArgs>>,
    updating: AtomicBool,
}

/// Restores Idle when a pass ends, however it ends.
struct PassGuard<'a> {
    updating: &'a AtomicBool,
}

impl<'a> PassGuard<'a> {
    /// Try to move Idle -> Fetching; `None` means a pass is already in
    /// flight and the trigger must be dropped.
    fn acquire(updating: &'a AtomicBool) -> Option<Self> {
        updating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { updating })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.updating.store(false, Ordering::Release);
    }
}

/// Fetches ordered result sets, diffs them against the last delivered
/// snapshot, and dispatches the resulting changes to a sink.
pub struct Reconciler {
    provider: Arc<dyn QueryProvider>,
    sink: ChangeSink,
    completion_tx: Option<mpsc::Sender<PassSummary>>,
    id_field: String,
    state: ReconcilerState,
}

impl Reconciler {
    pub fn new(
        provider: Arc<dyn QueryProvider>,
        sink: ChangeSink,
        id_field: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            sink,
            completion_tx: None,
            id_field: id_field.into(),
            state: ReconcilerState::default(),
        }
    }

    /// Attach a completion channel; one summary is sent per update pass,
    /// whether or not the pass detected any changes.
    pub fn with_completion(mut self, tx: mpsc::Sender<PassSummary>) -> Self {
        self.completion_tx = Some(tx);
        self
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Whether a reconciliation pass is currently in flight.
    pub fn is_updating(&self) -> bool {
        self.state.updating.load(Ordering::Acquire)
    }

    pub fn has_snapshot(&self) -> bool {
        self.state.snapshot.lock().is_some()
    }

    /// Rows of the current snapshot, copied. Useful for status displays and
    /// tests; change consumers should watch the sink instead.
    pub fn snapshot_rows(&self) -> Vec<Record> {
        self.state
            .snapshot
            .lock()
            .as_ref()
            .map(|snapshot| snapshot.rows().to_vec())
            .unwrap_or_default()
    }

    /// Fetch the whole collection and process the result: seed outside an
    /// update pass, diff inside one.
    pub async fn fetch(&self) -> Result<QueryResult> {
        let data = self.provider.fetch_all().await?;
        self.process(&data, QueryKind::All, None).await?;
        Ok(data)
    }

    /// Fetch a sub-range and process the result, capturing `args` so
    /// `update_range` can repeat the identical query shape later.
    pub async fn fetch_range(&self, args: RangeArgs) -> Result<QueryResult> {
        let data = self.provider.fetch_range(args).await?;
        self.process(&data, QueryKind::Range, Some(args)).await?;
        Ok(data)
    }

    /// Trigger a whole-collection reconciliation pass.
    ///
    /// Returns `Ok(None)` without fetching when a pass is already in
    /// flight: overlapping triggers are dropped, not queued.
    pub async fn update(&self) -> Result<Option<QueryResult>> {
        let Some(_guard) = PassGuard::acquire(&self.state.updating) else {
            debug!("Update trigger dropped; a pass is already in flight");
            return Ok(None);
        };
        let data = self.fetch().await?;
        Ok(Some(data))
    }

    /// Trigger a reconciliation pass repeating the captured range fetch.
    ///
    /// A no-op returning `Ok(None)` when no ranged fetch has been captured
    /// yet, or when a pass is already in flight.
    pub async fn update_range(&self) -> Result<Option<QueryResult>> {
        let Some(args) = *self.state.captured_range.lock() else {
            debug!("Ranged update trigger dropped; no ranged fetch captured yet");
            return Ok(None);
        };
        let Some(_guard) = PassGuard::acquire(&self.state.updating) else {
            debug!("Ranged update trigger dropped; a pass is already in flight");
            return Ok(None);
        };
        let data = self.fetch_range(args).await?;
        Ok(Some(data))
    }

    async fn process(
        &self,
        data: &QueryResult,
        kind: QueryKind,
        args: Option<RangeArgs>,
    ) -> Result<()> {
        if self.is_updating() {
            let outcome = self.detect_and_notify(data, args).await;
            // Idle is restored before the completion notification goes out,
            // and the notification fires whether or not detection
            // succeeded; only then does any error surface to the caller.
            self.state.updating.store(false, Ordering::Release);
            self.emit_completion(data, kind, args).await;
            outcome.map(|_| ())
        } else {
            let snapshot = Snapshot::build(data.rows.clone(), &self.id_field)?;
            *self.state.snapshot.lock() = Some(snapshot);
            if let Some(args) = args {
                *self.state.captured_range.lock() = Some(args);
            }
            debug!("Seeded snapshot from {} fetch ({} rows)", kind, data.rows.len());
            Ok(())
        }
    }

    async fn detect_and_notify(
        &self,
        data: &QueryResult,
        args: Option<RangeArgs>,
    ) -> Result<usize> {
        let offset = args.map(|a| a.start).unwrap_or(0);
        let prior = self.state.snapshot.lock().clone();

        let Some(prior) = prior else {
            // Nothing observed yet: an update pass seeds instead of diffing.
            let snapshot = Snapshot::build(data.rows.clone(), &self.id_field)?;
            *self.state.snapshot.lock() = Some(snapshot);
            debug!("Update pass found no prior snapshot; seeded {} rows", data.rows.len());
            return Ok(0);
        };

        let outcome = diff_snapshots(&prior, &data.rows, &self.id_field, offset)?;
        let detected = outcome.changes.len();
        for change in outcome.changes {
            self.sink.apply(change, &self.id_field).await?;
        }
        *self.state.snapshot.lock() = Some(outcome.snapshot);

        if detected > 0 {
            info!("Reconciliation pass applied {} changes", detected);
        } else {
            debug!("Reconciliation pass found no changes");
        }
        Ok(detected)
    }

    async fn emit_completion(&self, data: &QueryResult, kind: QueryKind, args: Option<RangeArgs>) {
        let Some(tx) = &self.completion_tx else { return };
        let summary = PassSummary {
            kind,
            args,
            rows: data.rows.clone(),
            total: data.total,
        };
        if tx.send(summary).await.is_err() {
            warn!("Completion listener dropped; pass summary discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rq_core::Change;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::time::Duration;
    use store::{KeyedStore, MemoryStore};
    use tokio::sync::Semaphore;

    fn row(id: u64, v: &str) -> Record {
        json!({ "id": id, "v": v }).as_object().cloned().unwrap()
    }

    fn bad_row(v: &str) -> Record {
        json!({ "v": v }).as_object().cloned().unwrap()
    }

    /// Serves a scripted sequence of snapshots; the last one repeats.
    struct SequenceProvider {
        snapshots: Mutex<VecDeque<Vec<Record>>>,
    }

    impl SequenceProvider {
        fn new(snapshots: Vec<Vec<Record>>) -> Arc<Self> {
            Arc::new(Self {
                snapshots: Mutex::new(snapshots.into()),
            })
        }

        fn next_rows(&self) -> Vec<Record> {
            let mut snapshots = self.snapshots.lock();
            if snapshots.len() > 1 {
                snapshots.pop_front().unwrap()
            } else {
                snapshots.front().cloned().unwrap_or_default()
            }
        }
    }

    #[async_trait]
    impl QueryProvider for SequenceProvider {
        async fn fetch_all(&self) -> Result<QueryResult> {
            let rows = self.next_rows();
            let total = rows.len();
            Ok(QueryResult { rows, total })
        }

        async fn fetch_range(&self, args: RangeArgs) -> Result<QueryResult> {
            let rows = self.next_rows();
            let total = rows.len();
            let end = (args.start + args.count).min(rows.len());
            let page = rows[args.start.min(rows.len())..end].to_vec();
            Ok(QueryResult { rows: page, total })
        }
    }

    /// Blocks every fetch on a semaphore permit, so tests can hold a fetch
    /// outstanding and release it deliberately.
    struct GatedProvider {
        gate: Semaphore,
        rows: Vec<Record>,
    }

    impl GatedProvider {
        fn new(rows: Vec<Record>) -> Arc<Self> {
            Arc::new(Self {
                gate: Semaphore::new(0),
                rows,
            })
        }
    }

    #[async_trait]
    impl QueryProvider for GatedProvider {
        async fn fetch_all(&self) -> Result<QueryResult> {
            self.gate.acquire().await.unwrap().forget();
            Ok(QueryResult {
                rows: self.rows.clone(),
                total: self.rows.len(),
            })
        }

        async fn fetch_range(&self, args: RangeArgs) -> Result<QueryResult> {
            self.gate.acquire().await.unwrap().forget();
            let end = (args.start + args.count).min(self.rows.len());
            Ok(QueryResult {
                rows: self.rows[args.start..end].to_vec(),
                total: self.rows.len(),
            })
        }
    }

    fn events_reconciler(
        provider: Arc<dyn QueryProvider>,
        id_field: &str,
    ) -> (Arc<Reconciler>, mpsc::Receiver<Change>) {
        let (tx, rx) = mpsc::channel(64);
        let reconciler = Arc::new(Reconciler::new(provider, ChangeSink::Events(tx), id_field));
        (reconciler, rx)
    }

    async fn wait_until_updating(reconciler: &Reconciler) {
        for _ in 0..200 {
            if reconciler.is_updating() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("reconciler never entered the fetching state");
    }

    #[tokio::test]
    async fn test_seed_emits_no_changes() {
        let rows = vec![row(1, "a"), row(2, "b")];
        let provider = SequenceProvider::new(vec![rows.clone()]);
        let (reconciler, mut changes) = events_reconciler(provider, "id");

        let result = reconciler.fetch().await.unwrap();

        assert_eq!(result.rows, rows);
        assert_eq!(result.total, 2);
        assert!(changes.try_recv().is_err());
        assert_eq!(reconciler.snapshot_rows(), rows);
    }

    #[tokio::test]
    async fn test_update_diffs_against_seeded_snapshot() {
        let provider = SequenceProvider::new(vec![
            vec![row(1, "a"), row(2, "b")],
            vec![row(1, "a"), row(2, "b"), row(3, "c")],
        ]);
        let (reconciler, mut changes) = events_reconciler(provider, "id");

        reconciler.fetch().await.unwrap();
        let pass = reconciler.update().await.unwrap();

        assert!(pass.is_some());
        assert_eq!(
            changes.try_recv().unwrap(),
            Change::Add { record: row(3, "c"), index: 2 }
        );
        assert!(changes.try_recv().is_err());
        assert_eq!(reconciler.snapshot_rows().len(), 3);
    }

    #[tokio::test]
    async fn test_update_without_prior_snapshot_seeds_silently() {
        let provider = SequenceProvider::new(vec![vec![row(1, "a")]]);
        let (tx, mut completions) = mpsc::channel(8);
        let (reconciler, mut changes) = {
            let (ctx, crx) = mpsc::channel(64);
            let reconciler = Arc::new(
                Reconciler::new(provider, ChangeSink::Events(ctx), "id").with_completion(tx),
            );
            (reconciler, crx)
        };

        let pass = reconciler.update().await.unwrap();

        assert!(pass.is_some());
        assert!(changes.try_recv().is_err());
        assert!(reconciler.has_snapshot());
        // The pass still completed, so the notification still fires.
        let summary = completions.recv().await.unwrap();
        assert_eq!(summary.kind, QueryKind::All);
        assert_eq!(summary.total, 1);
    }

    #[tokio::test]
    async fn test_completion_fires_even_when_nothing_changed() {
        let rows = vec![row(1, "a")];
        let provider = SequenceProvider::new(vec![rows.clone()]);
        let (tx, mut completions) = mpsc::channel(8);
        let (ctx, mut changes) = mpsc::channel(64);
        let reconciler =
            Reconciler::new(provider, ChangeSink::Events(ctx), "id").with_completion(tx);

        reconciler.fetch().await.unwrap();
        reconciler.update().await.unwrap();

        let summary = completions.recv().await.unwrap();
        assert_eq!(summary.rows, rows);
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_second_trigger_while_fetch_outstanding_is_dropped() {
        let provider = GatedProvider::new(vec![row(1, "a")]);
        let (reconciler, _changes) = events_reconciler(provider.clone(), "id");

        let first = tokio::spawn({
            let reconciler = reconciler.clone();
            async move { reconciler.update().await }
        });
        wait_until_updating(&reconciler).await;

        // Trigger while the first fetch is still parked on the gate.
        assert!(reconciler.update().await.unwrap().is_none());

        provider.gate.add_permits(1);
        let outcome = first.await.unwrap().unwrap();
        assert!(outcome.is_some());
        assert!(!reconciler.is_updating());

        // After the first pass resolves, a new trigger starts a new pass.
        provider.gate.add_permits(1);
        assert!(reconciler.update().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_pass_restores_idle_and_still_notifies() {
        let provider = SequenceProvider::new(vec![
            vec![row(1, "a")],
            vec![row(1, "a"), bad_row("no identity")],
            vec![row(1, "a"), row(2, "b")],
        ]);
        let (tx, mut completions) = mpsc::channel(8);
        let (ctx, mut changes) = mpsc::channel(64);
        let reconciler =
            Reconciler::new(provider, ChangeSink::Events(ctx), "id").with_completion(tx);

        reconciler.fetch().await.unwrap();

        let failed = reconciler.update().await;
        assert!(failed.is_err());
        assert!(!reconciler.is_updating());
        assert!(changes.try_recv().is_err());
        // Completion is guaranteed even for the failed pass.
        assert_eq!(completions.recv().await.unwrap().kind, QueryKind::All);
        // The snapshot survives the failed pass untouched.
        assert_eq!(reconciler.snapshot_rows(), vec![row(1, "a")]);

        // The next trigger runs a normal pass.
        let pass = reconciler.update().await.unwrap();
        assert!(pass.is_some());
        assert_eq!(
            changes.try_recv().unwrap(),
            Change::Add { record: row(2, "b"), index: 1 }
        );
    }

    #[tokio::test]
    async fn test_store_sink_converges_on_new_sequence() {
        let provider = SequenceProvider::new(vec![
            vec![row(1, "a"), row(2, "b")],
            vec![row(2, "x"), row(3, "c")],
        ]);
        let target = Arc::new(MemoryStore::new());
        let reconciler = Reconciler::new(
            provider,
            ChangeSink::Store(target.clone() as Arc<dyn KeyedStore>),
            "id",
        );

        reconciler.fetch().await.unwrap();
        reconciler.update().await.unwrap();

        // Delete(1) is a no-op on the unseeded store; update(2) and add(3)
        // land the surviving rows.
        assert_eq!(target.len(), 2);
        assert_eq!(target.get(&"2".into()), Some(row(2, "x")));
        assert_eq!(target.get(&"3".into()), Some(row(3, "c")));
        assert!(!target.contains(&"1".into()));
    }

    #[tokio::test]
    async fn test_update_range_without_capture_is_noop() {
        let provider = SequenceProvider::new(vec![vec![row(1, "a")]]);
        let (reconciler, _changes) = events_reconciler(provider, "id");

        assert!(reconciler.update_range().await.unwrap().is_none());
        assert!(!reconciler.has_snapshot());
    }

    #[tokio::test]
    async fn test_ranged_update_repeats_capture_and_offsets_indices() {
        let full = vec![row(0, "a"), row(1, "b"), row(2, "c"), row(3, "d")];
        let mut changed = full.clone();
        changed[2] = row(2, "CHANGED");
        let provider = SequenceProvider::new(vec![full, changed]);
        let (reconciler, mut changes) = events_reconciler(provider, "id");

        let args = RangeArgs { start: 1, count: 2 };
        let page = reconciler.fetch_range(args).await.unwrap();
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.total, 4);

        let pass = reconciler.update_range().await.unwrap();
        assert!(pass.is_some());

        // Row 2 sits at page position 1; the event index is absolute.
        assert_eq!(
            changes.try_recv().unwrap(),
            Change::Update {
                record: row(2, "CHANGED"),
                index: 2,
                previous_index: 2,
            }
        );
        assert!(changes.try_recv().is_err());
    }
}
