//! # Sync Agent
//!
//! Main orchestrator for the sync engine. Runs the per-kind workers
//! concurrently, isolates their failures, and owns the periodic loop.
//!
//! ## Agent Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SyncAgent Architecture                           │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                         SyncAgent                                │  │
//! │  │                                                                  │  │
//! │  │  start_periodic_sync()   PeriodicTask ─► cycle every interval    │  │
//! │  │  sync_all_pending_data() one push cycle now                      │  │
//! │  │  force_sync(family)      push + refresh of refreshable kinds     │  │
//! │  │  stop_sync()             cancel loop + in-flight cycle           │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │ connectivity? no → zero-work success    │
//! │                               │ JoinSet: one child task per worker      │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ ledger_entry   │  │ budget         │  │ category               │    │
//! │  │ push           │  │ push → refresh │  │ push → refresh         │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  A failing worker never stops the others; its failure is reported in   │
//! │  SyncError::CycleFailed together with everything that did succeed.     │
//! │                                                                         │
//! │  EVENTS (SyncEventEmitter):                                            │
//! │  emit_status - status snapshot changed                                 │
//! │  emit_cycle  - a cycle finished (report)                               │
//! │  emit_error  - a cycle failed (message, retryable)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use famledger_core::{Budget, Category, EntityKind, LedgerEntry};
use famledger_db::Database;

use crate::claims::PushClaims;
use crate::config::{SyncConfig, SyncMode};
use crate::connectivity::{AlwaysOnline, Connectivity};
use crate::error::{SyncError, SyncResult};
use crate::http::ApiClient;
use crate::report::{
    CycleOutcome, CycleReport, PushReport, RefreshReport, SyncTrigger, WorkerFailure, WorkerPhase,
};
use crate::schedule::PeriodicTask;
use crate::worker::{EntitySyncWorker, SyncWorker};

// =============================================================================
// Sync Status
// =============================================================================

/// Current sync status for external queries.
#[derive(Debug, Clone)]
pub struct SyncStatus {
    /// Configured sync mode.
    pub mode: SyncMode,

    /// Whether the periodic loop is running.
    pub periodic_running: bool,

    /// Whether a cycle is in flight right now.
    pub is_syncing: bool,

    /// End of the last cycle in which every worker completed.
    pub last_sync: Option<DateTime<Utc>>,

    pub last_outcome: Option<CycleOutcome>,

    /// Last error message (if any).
    pub last_error: Option<String>,

    /// Cycles that actually ran (offline skips excluded).
    pub cycles_completed: u64,

    /// Dirty records per kind, as of the last cycle.
    pub pending: BTreeMap<EntityKind, i64>,
}

impl SyncStatus {
    fn new(mode: SyncMode) -> Self {
        SyncStatus {
            mode,
            periodic_running: false,
            is_syncing: false,
            last_sync: None,
            last_outcome: None,
            last_error: None,
            cycles_completed: 0,
            pending: BTreeMap::new(),
        }
    }

    pub fn pending_total(&self) -> i64 {
        self.pending.values().sum()
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::new(SyncMode::default())
    }
}

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Receives sync notifications (a UI bridge, a metrics sink, ...).
pub trait SyncEventEmitter: Send + Sync {
    /// Emits a sync status change event.
    fn emit_status(&self, status: &SyncStatus);

    /// Emits the report of a finished cycle.
    fn emit_cycle(&self, report: &CycleReport);

    /// Emits a sync error event.
    fn emit_error(&self, message: &str, retryable: bool);
}

/// No-op event emitter.
pub struct NoOpEmitter;

impl SyncEventEmitter for NoOpEmitter {
    fn emit_status(&self, _status: &SyncStatus) {}
    fn emit_cycle(&self, _report: &CycleReport) {}
    fn emit_error(&self, _message: &str, _retryable: bool) {}
}

// =============================================================================
// Worker Run
// =============================================================================

/// What one worker's child task produced within a cycle.
struct WorkerRun {
    push: Option<PushReport>,
    refresh: Option<RefreshReport>,
    failures: Vec<WorkerFailure>,
}

impl WorkerRun {
    fn panicked(kind: EntityKind) -> Self {
        WorkerRun {
            push: None,
            refresh: None,
            failures: vec![WorkerFailure {
                kind,
                phase: WorkerPhase::Push,
                error: SyncError::Internal(format!("{} worker panicked", kind)),
            }],
        }
    }
}

/// Push, then (for force syncs of refreshable kinds) refresh.
///
/// The refresh waits for the push so local edits reach the server before
/// the listing overwrites them. It is skipped when the push could not run.
async fn run_worker(worker: Arc<dyn SyncWorker>, refresh_family: Option<String>) -> WorkerRun {
    let kind = worker.kind();
    let mut run = WorkerRun {
        push: None,
        refresh: None,
        failures: Vec::new(),
    };

    match worker.sync_pending_records().await {
        Ok(report) => run.push = Some(report),
        Err(error) => {
            error!(kind = %kind, error = %error, "Push failed for worker");
            if refresh_family.is_some() {
                warn!(kind = %kind, "Skipping refresh after failed push");
            }
            run.failures.push(WorkerFailure {
                kind,
                phase: WorkerPhase::Push,
                error,
            });
            return run;
        }
    }

    if let Some(family_id) = refresh_family {
        if let Some(push) = &run.push {
            if push.is_partial() {
                warn!(
                    kind = %kind,
                    unsynced = push.failed.len(),
                    "Refreshing over records whose push failed"
                );
            }
        }

        match worker.refresh_from_remote(&family_id).await {
            Ok(report) => run.refresh = Some(report),
            Err(error) => {
                error!(kind = %kind, family_id = %family_id, error = %error, "Refresh failed for worker");
                run.failures.push(WorkerFailure {
                    kind,
                    phase: WorkerPhase::Refresh,
                    error,
                });
            }
        }
    }

    run
}

/// Marks a cycle in flight for as long as it lives, cancellation included.
struct ActiveCycle<'a>(&'a AtomicUsize);

impl<'a> ActiveCycle<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        ActiveCycle(counter)
    }
}

impl Drop for ActiveCycle<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Agent Internals
// =============================================================================

/// State shared between the agent and its periodic task.
struct AgentInner {
    family_id: String,
    mode: SyncMode,
    interval: Duration,
    connectivity: Arc<dyn Connectivity>,
    workers: Vec<Arc<dyn SyncWorker>>,
    status: RwLock<SyncStatus>,
    emitter: Arc<dyn SyncEventEmitter>,
    /// Serialises cycles so a manual sync never overlaps a periodic one.
    cycle_gate: Mutex<()>,
    active_cycles: AtomicUsize,
}

impl AgentInner {
    async fn run_cycle(
        &self,
        trigger: SyncTrigger,
        refresh_family: Option<&str>,
    ) -> SyncResult<CycleReport> {
        if !self.mode.is_sync_enabled() {
            debug!(trigger = %trigger, "Sync disabled (mode: offline), skipping cycle");
            let report = CycleReport::offline(trigger);
            self.record_cycle(&report).await;
            return Ok(report);
        }

        if !self.connectivity.is_connected() {
            info!(trigger = %trigger, "No connectivity, skipping sync cycle");
            let report = CycleReport::offline(trigger);
            self.record_cycle(&report).await;
            return Ok(report);
        }

        let _gate = self.cycle_gate.lock().await;
        let _active = ActiveCycle::enter(&self.active_cycles);

        let mut report = CycleReport::begin(trigger);
        info!(
            trigger = %trigger,
            workers = self.workers.len(),
            refresh = refresh_family.is_some(),
            "Starting sync cycle"
        );

        // Dropping the set (e.g. on stop_sync) aborts every child task.
        let mut tasks = JoinSet::new();
        for worker in &self.workers {
            let worker = Arc::clone(worker);
            let kind = worker.kind();
            let family = refresh_family
                .filter(|_| kind.is_refreshable())
                .map(str::to_string);

            tasks.spawn(async move {
                match AssertUnwindSafe(run_worker(worker, family)).catch_unwind().await {
                    Ok(run) => run,
                    Err(_) => {
                        error!(kind = %kind, "Worker panicked during sync cycle");
                        WorkerRun::panicked(kind)
                    }
                }
            });
        }

        let mut cancelled = false;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(run) => {
                    report.pushes.extend(run.push);
                    report.refreshes.extend(run.refresh);
                    report.failures.extend(run.failures);
                }
                Err(e) => {
                    // Only reachable if a child was aborted from outside,
                    // i.e. the runtime is going away.
                    warn!(error = %e, "Sync worker task did not complete");
                    cancelled |= e.is_cancelled();
                }
            }
        }

        if cancelled {
            return Err(SyncError::ShuttingDown);
        }

        report.pushes.sort_by_key(|p| p.kind);
        report.refreshes.sort_by_key(|r| r.kind);
        report.failures.sort_by_key(|f| f.kind);
        report.finished_at = Utc::now();

        self.update_pending().await;
        self.record_cycle(&report).await;

        match report.outcome() {
            CycleOutcome::Failed => {
                let failures = report.failures.clone();
                let error = SyncError::CycleFailed { failures, report };
                error!(error = %error, "Sync cycle failed");
                self.emitter.emit_error(&error.to_string(), error.is_retryable());
                Err(error)
            }
            CycleOutcome::Partial => {
                warn!(
                    trigger = %trigger,
                    confirmed = report.total_confirmed(),
                    failed = report.total_failed_records(),
                    "Sync cycle finished with record failures"
                );
                Ok(report)
            }
            _ => {
                info!(
                    trigger = %trigger,
                    pushed = report.total_confirmed(),
                    refreshed = report.total_refreshed(),
                    "Sync cycle complete"
                );
                Ok(report)
            }
        }
    }

    async fn update_pending(&self) {
        let mut pending = BTreeMap::new();
        for worker in &self.workers {
            match worker.pending_count().await {
                Ok(count) => {
                    pending.insert(worker.kind(), count);
                }
                Err(e) => debug!(kind = %worker.kind(), error = %e, "Could not count pending records"),
            }
        }
        self.status.write().await.pending = pending;
    }

    async fn record_cycle(&self, report: &CycleReport) {
        let snapshot = {
            let mut status = self.status.write().await;
            let outcome = report.outcome();
            status.last_outcome = Some(outcome);

            match outcome {
                CycleOutcome::Skipped => {}
                CycleOutcome::Failed => {
                    status.cycles_completed += 1;
                    status.last_error = report
                        .failures
                        .iter()
                        .map(|f| format!("{} {}: {}", f.kind, f.phase, f.error))
                        .reduce(|a, b| format!("{}; {}", a, b));
                }
                CycleOutcome::Partial | CycleOutcome::Success => {
                    status.cycles_completed += 1;
                    status.last_sync = Some(report.finished_at);
                    status.last_error = report
                        .pushes
                        .iter()
                        .flat_map(|p| p.failed.iter())
                        .map(|f| format!("{}: {}", f.id, f.error))
                        .next();
                }
            }
            status.clone()
        };

        self.emitter.emit_cycle(report);
        self.emitter.emit_status(&self.decorate(snapshot));
    }

    fn decorate(&self, mut status: SyncStatus) -> SyncStatus {
        status.is_syncing = self.active_cycles.load(Ordering::SeqCst) > 0;
        status
    }
}

// =============================================================================
// Sync Agent
// =============================================================================

/// Main sync agent.
///
/// Created once by the composition root and stopped at shutdown; there is
/// no global instance.
pub struct SyncAgent {
    inner: Arc<AgentInner>,
    periodic: Mutex<Option<PeriodicTask>>,
    claims: PushClaims,
}

impl SyncAgent {
    fn new(
        config: &SyncConfig,
        connectivity: Arc<dyn Connectivity>,
        workers: Vec<Arc<dyn SyncWorker>>,
        emitter: Arc<dyn SyncEventEmitter>,
        claims: PushClaims,
    ) -> Self {
        SyncAgent {
            inner: Arc::new(AgentInner {
                family_id: config.family_id().to_string(),
                mode: config.mode(),
                interval: config.interval(),
                connectivity,
                workers,
                status: RwLock::new(SyncStatus::new(config.mode())),
                emitter,
                cycle_gate: Mutex::new(()),
                active_cycles: AtomicUsize::new(0),
            }),
            periodic: Mutex::new(None),
            claims,
        }
    }

    /// Returns the current sync status.
    pub async fn status(&self) -> SyncStatus {
        let status = self.inner.status.read().await.clone();
        self.inner.decorate(status)
    }

    /// The family this agent refreshes by default.
    pub fn family_id(&self) -> &str {
        &self.inner.family_id
    }

    /// Claims the workers take before pushing. Hand them to every
    /// [`OfflineRepository`](crate::OfflineRepository) over the same store.
    pub fn push_claims(&self) -> PushClaims {
        self.claims.clone()
    }

    pub fn kinds(&self) -> Vec<EntityKind> {
        self.inner.workers.iter().map(|w| w.kind()).collect()
    }

    /// Starts the background loop: a cycle right away, then one every
    /// configured interval after the previous cycle ends.
    ///
    /// Idempotent while running. Does nothing in `manual` or `offline` mode.
    /// A failed iteration is logged and reported; the loop keeps going.
    pub async fn start_periodic_sync(&self) {
        if !self.inner.mode.runs_periodically() {
            info!(mode = %self.inner.mode, "Periodic sync disabled for this mode");
            return;
        }

        let mut periodic = self.periodic.lock().await;
        if periodic.as_ref().is_some_and(PeriodicTask::is_running) {
            debug!("Periodic sync already running");
            return;
        }

        let inner = Arc::clone(&self.inner);
        let task = PeriodicTask::spawn("sync", self.inner.interval, move || {
            let inner = Arc::clone(&inner);
            async move {
                // Failures were already logged and emitted by run_cycle.
                let _ = inner.run_cycle(SyncTrigger::Periodic, None).await;
            }
        });
        *periodic = Some(task);
        drop(periodic);

        info!(
            family_id = %self.inner.family_id,
            interval_secs = self.inner.interval.as_secs(),
            "Periodic sync started"
        );
        self.set_periodic_running(true).await;
    }

    /// Pushes every kind's dirty records now.
    ///
    /// ## Returns
    /// * `Ok(report)` - every worker completed; record failures make the
    ///   report `Partial`. Disconnected gives a `Skipped` zero-work report.
    /// * `Err(SyncError::CycleFailed)` - at least one worker failed as a
    ///   whole; the error carries the full report.
    pub async fn sync_all_pending_data(&self) -> SyncResult<CycleReport> {
        self.inner.run_cycle(SyncTrigger::Manual, None).await
    }

    /// Pushes everything, then refreshes budgets and categories of
    /// `family_id` from the server. Same failure policy as
    /// [`sync_all_pending_data`](Self::sync_all_pending_data).
    pub async fn force_sync(&self, family_id: &str) -> SyncResult<CycleReport> {
        self.inner.run_cycle(SyncTrigger::Force, Some(family_id)).await
    }

    /// Cancels the periodic loop, including a cycle in flight.
    ///
    /// Idempotent; the agent can be started again afterwards. On-demand
    /// syncs running in the caller's own task are not affected.
    pub async fn stop_sync(&self) {
        let task = self.periodic.lock().await.take();
        match task {
            Some(task) => {
                task.shutdown().await;
                info!("Periodic sync stopped");
            }
            None => debug!("Periodic sync not running"),
        }
        self.set_periodic_running(false).await;
    }

    /// Re-reads pending counts from every worker into the status.
    pub async fn refresh_pending_counts(&self) -> SyncStatus {
        self.inner.update_pending().await;
        self.status().await
    }

    async fn set_periodic_running(&self, running: bool) {
        let snapshot = {
            let mut status = self.inner.status.write().await;
            status.periodic_running = running;
            status.clone()
        };
        self.inner.emitter.emit_status(&self.inner.decorate(snapshot));
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for creating SyncAgent with options.
pub struct SyncAgentBuilder {
    config: SyncConfig,
    connectivity: Option<Arc<dyn Connectivity>>,
    workers: Vec<Arc<dyn SyncWorker>>,
    emitter: Option<Arc<dyn SyncEventEmitter>>,
    claims: PushClaims,
}

impl SyncAgentBuilder {
    /// Creates a new builder with the given config.
    pub fn new(config: SyncConfig) -> Self {
        SyncAgentBuilder {
            config,
            connectivity: None,
            workers: Vec::new(),
            emitter: None,
            claims: PushClaims::new(),
        }
    }

    /// Sets the connectivity oracle (default: always online).
    pub fn with_connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Sets the push claims shared with the offline write path.
    ///
    /// Call before [`with_standard_workers`](Self::with_standard_workers);
    /// workers added through [`with_worker`](Self::with_worker) bring their own.
    pub fn with_claims(mut self, claims: PushClaims) -> Self {
        self.claims = claims;
        self
    }

    /// Adds a worker. One worker per kind.
    pub fn with_worker(mut self, worker: Arc<dyn SyncWorker>) -> Self {
        self.workers.push(worker);
        self
    }

    /// Adds the SQLite-backed workers for every kind, talking HTTP.
    pub fn with_standard_workers(self, db: &Database, api: Arc<ApiClient>) -> Self {
        let concurrency = self.config.sync.push_concurrency;
        let policy = self.config.sync.refresh_policy;
        let claims = self.claims.clone();

        let ledger = EntitySyncWorker::<LedgerEntry>::new(Arc::new(db.ledger_entries()), api.clone())
            .with_push_concurrency(concurrency)
            .with_refresh_policy(policy)
            .with_claims(claims.clone());
        let budgets = EntitySyncWorker::<Budget>::new(Arc::new(db.budgets()), api.clone())
            .with_push_concurrency(concurrency)
            .with_refresh_policy(policy)
            .with_claims(claims.clone());
        let categories = EntitySyncWorker::<Category>::new(Arc::new(db.categories()), api)
            .with_push_concurrency(concurrency)
            .with_refresh_policy(policy)
            .with_claims(claims);

        self.with_worker(Arc::new(ledger))
            .with_worker(Arc::new(budgets))
            .with_worker(Arc::new(categories))
    }

    /// Sets the event emitter.
    pub fn with_emitter(mut self, emitter: Arc<dyn SyncEventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Builds the SyncAgent.
    pub fn build(self) -> SyncResult<SyncAgent> {
        self.config.validate()?;

        if self.workers.is_empty() {
            return Err(SyncError::InvalidConfig("At least one sync worker required".into()));
        }

        let mut seen = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            let kind = worker.kind();
            if seen.contains(&kind) {
                return Err(SyncError::InvalidConfig(format!(
                    "Duplicate sync worker for {}",
                    kind
                )));
            }
            seen.push(kind);
        }

        let connectivity = self.connectivity.unwrap_or_else(|| Arc::new(AlwaysOnline));
        let emitter = self.emitter.unwrap_or_else(|| Arc::new(NoOpEmitter));

        Ok(SyncAgent::new(
            &self.config,
            connectivity,
            self.workers,
            emitter,
            self.claims,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::ConnectivityFlag;
    use crate::memory::MemoryStore;
    use crate::store::LocalStore;
    use crate::worker::testing::{BrokenStore, FakeRemote};
    use famledger_core::{PeriodType, SyncRecord, TransactionType};
    use famledger_db::DbConfig;
    use std::sync::Mutex as StdMutex;

    const FAMILY: &str = "fam-1";

    #[derive(Default)]
    struct RecordingEmitter {
        cycles: StdMutex<Vec<CycleOutcome>>,
        errors: StdMutex<Vec<String>>,
    }

    impl SyncEventEmitter for RecordingEmitter {
        fn emit_status(&self, _status: &SyncStatus) {}
        fn emit_cycle(&self, report: &CycleReport) {
            self.cycles.lock().unwrap().push(report.outcome());
        }
        fn emit_error(&self, message: &str, _retryable: bool) {
            self.errors.lock().unwrap().push(message.to_string());
        }
    }

    fn entry(amount: i64) -> LedgerEntry {
        LedgerEntry::new_local(
            FAMILY,
            "member-1",
            TransactionType::Expense,
            amount,
            "USD",
            "cat-food",
            Utc::now(),
            None,
        )
    }

    fn category(name: &str) -> Category {
        Category::new_local(FAMILY, name, "tag", "#778899", TransactionType::Expense)
    }

    fn budget(name: &str) -> Budget {
        Budget::new_local(
            FAMILY,
            name,
            50_000,
            "USD",
            PeriodType::Monthly,
            chrono::NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2026, 10, 31).unwrap(),
        )
    }

    fn worker<T: SyncRecord>(
        store: Arc<dyn LocalStore<T>>,
        remote: Arc<FakeRemote<T>>,
    ) -> Arc<dyn SyncWorker> {
        Arc::new(EntitySyncWorker::new(store, remote))
    }

    fn config(mode: SyncMode) -> SyncConfig {
        let mut config = SyncConfig::default();
        config.account.family_id = FAMILY.to_string();
        config.sync.mode = mode;
        config.sync.interval_secs = 300;
        config
    }

    struct Fixture {
        ledger_store: Arc<MemoryStore<LedgerEntry>>,
        ledger_remote: Arc<FakeRemote<LedgerEntry>>,
        category_store: Arc<MemoryStore<Category>>,
        category_remote: Arc<FakeRemote<Category>>,
        budget_store: Arc<MemoryStore<Budget>>,
        budget_remote: Arc<FakeRemote<Budget>>,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                ledger_store: Arc::new(MemoryStore::new()),
                ledger_remote: Arc::new(FakeRemote::new()),
                category_store: Arc::new(MemoryStore::new()),
                category_remote: Arc::new(FakeRemote::new()),
                budget_store: Arc::new(MemoryStore::new()),
                budget_remote: Arc::new(FakeRemote::new()),
            }
        }

        fn builder(&self, mode: SyncMode) -> SyncAgentBuilder {
            SyncAgentBuilder::new(config(mode))
                .with_worker(worker::<LedgerEntry>(self.ledger_store.clone(), self.ledger_remote.clone()))
                .with_worker(worker::<Budget>(self.budget_store.clone(), self.budget_remote.clone()))
                .with_worker(worker::<Category>(self.category_store.clone(), self.category_remote.clone()))
        }

        fn remote_calls(&self) -> usize {
            self.ledger_remote.calls() + self.category_remote.calls() + self.budget_remote.calls()
        }
    }

    #[test]
    fn test_sync_status_default() {
        let status = SyncStatus::default();
        assert!(!status.periodic_running);
        assert!(!status.is_syncing);
        assert_eq!(status.pending_total(), 0);
    }

    #[test]
    fn test_builder_requires_workers() {
        assert!(SyncAgentBuilder::new(config(SyncMode::Manual)).build().is_err());
    }

    #[test]
    fn test_builder_rejects_duplicate_kinds() {
        let f = Fixture::new();
        let result = f
            .builder(SyncMode::Manual)
            .with_worker(worker::<Category>(f.category_store.clone(), f.category_remote.clone()))
            .build();
        assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_disconnected_sync_is_zero_work_success() {
        let f = Fixture::new();
        f.ledger_store.upsert(&entry(100)).await.unwrap();
        let flag = ConnectivityFlag::new(false);
        let agent = f
            .builder(SyncMode::Manual)
            .with_connectivity(Arc::new(flag.clone()))
            .build()
            .unwrap();

        let report = agent.sync_all_pending_data().await.unwrap();
        assert_eq!(report.outcome(), CycleOutcome::Skipped);
        assert_eq!(f.remote_calls(), 0);
        assert_eq!(f.ledger_store.count_dirty().await.unwrap(), 1);

        let forced = agent.force_sync(FAMILY).await.unwrap();
        assert_eq!(forced.outcome(), CycleOutcome::Skipped);
        assert_eq!(f.remote_calls(), 0);

        flag.set_connected(true);
        let report = agent.sync_all_pending_data().await.unwrap();
        assert_eq!(report.total_confirmed(), 1);
        assert_eq!(f.ledger_store.count_dirty().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offline_mode_never_touches_the_network() {
        let f = Fixture::new();
        f.category_store.upsert(&category("Rent")).await.unwrap();
        let agent = f.builder(SyncMode::Offline).build().unwrap();

        let report = agent.sync_all_pending_data().await.unwrap();
        assert_eq!(report.outcome(), CycleOutcome::Skipped);
        assert_eq!(f.remote_calls(), 0);
    }

    #[tokio::test]
    async fn test_record_failure_makes_cycle_partial() {
        let f = Fixture::new();
        let (a, b, c) = (entry(100), entry(200), entry(300));
        f.ledger_store.upsert_many(&[a.clone(), b.clone(), c.clone()]).await.unwrap();
        f.ledger_remote.reject(&b.id);
        let agent = f.builder(SyncMode::Manual).build().unwrap();

        let report = agent.sync_all_pending_data().await.unwrap();

        assert_eq!(report.outcome(), CycleOutcome::Partial);
        let ledger = report.push_for(EntityKind::LedgerEntry).unwrap();
        assert_eq!(ledger.confirmed, 2);
        assert_eq!(ledger.failed_ids(), vec![b.id.as_str()]);
        assert!(f.ledger_store.get(&b.id).await.unwrap().unwrap().needs_sync);

        let status = agent.status().await;
        assert_eq!(status.last_outcome, Some(CycleOutcome::Partial));
        assert_eq!(status.pending.get(&EntityKind::LedgerEntry), Some(&1));
        assert!(status.last_sync.is_some());
    }

    #[tokio::test]
    async fn test_failing_worker_does_not_affect_others() {
        let f = Fixture::new();
        f.category_store.upsert(&category("Groceries")).await.unwrap();
        let emitter = Arc::new(RecordingEmitter::default());

        let broken: Arc<dyn LocalStore<LedgerEntry>> = Arc::new(BrokenStore);
        let agent = SyncAgentBuilder::new(config(SyncMode::Manual))
            .with_worker(worker::<LedgerEntry>(broken, f.ledger_remote.clone()))
            .with_worker(worker::<Category>(f.category_store.clone(), f.category_remote.clone()))
            .with_emitter(emitter.clone())
            .build()
            .unwrap();

        let err = agent.sync_all_pending_data().await.unwrap_err();
        match err {
            SyncError::CycleFailed { failures, report } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].kind, EntityKind::LedgerEntry);
                assert_eq!(failures[0].phase, WorkerPhase::Push);
                assert_eq!(report.push_for(EntityKind::Category).unwrap().confirmed, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(f.category_store.count_dirty().await.unwrap(), 0);
        assert_eq!(f.category_remote.stored().len(), 1);
        assert_eq!(emitter.errors.lock().unwrap().len(), 1);

        let status = agent.status().await;
        assert_eq!(status.last_outcome, Some(CycleOutcome::Failed));
        assert!(status.last_error.unwrap().contains("ledger_entry push"));
    }

    #[tokio::test]
    async fn test_force_sync_pushes_then_refreshes_refreshable_kinds() {
        let f = Fixture::new();
        let local = category("Made offline");
        f.category_store.upsert(&local).await.unwrap();
        let stale = category("Deleted on server").into_synced();
        f.category_store.upsert(&stale).await.unwrap();
        f.ledger_store.upsert(&entry(900)).await.unwrap();

        let server_budget = budget("Household").into_synced();
        let budget_remote = Arc::new(FakeRemote::new().with_records([server_budget.clone()]));
        let category_remote = Arc::new(FakeRemote::new().with_records([category("From web")]));

        let agent = SyncAgentBuilder::new(config(SyncMode::Manual))
            .with_worker(worker::<LedgerEntry>(f.ledger_store.clone(), f.ledger_remote.clone()))
            .with_worker(worker::<Budget>(f.budget_store.clone(), budget_remote.clone()))
            .with_worker(worker::<Category>(f.category_store.clone(), category_remote.clone()))
            .build()
            .unwrap();

        let report = agent.force_sync(FAMILY).await.unwrap();

        assert_eq!(report.outcome(), CycleOutcome::Success);
        assert!(report.refresh_for(EntityKind::LedgerEntry).is_none());
        assert_eq!(report.refresh_for(EntityKind::Budget).unwrap().stored, 1);
        assert_eq!(report.refresh_for(EntityKind::Category).unwrap().stored, 2);
        assert_eq!(f.ledger_remote.lists.load(Ordering::SeqCst), 0);

        // the offline-made category reached the server before the refresh
        let categories = f.category_store.all().await;
        assert_eq!(categories.len(), 2);
        assert!(categories.iter().any(|c| c.id == local.id && !c.needs_sync));
        assert!(categories.iter().all(|c| c.id != stale.id));
        assert_eq!(f.budget_store.all().await, vec![server_budget]);
    }

    #[tokio::test]
    async fn test_refresh_failure_is_reported_per_kind() {
        let f = Fixture::new();
        f.budget_remote.set_unreachable(true);
        let agent = f.builder(SyncMode::Manual).build().unwrap();

        let err = agent.force_sync(FAMILY).await.unwrap_err();
        let SyncError::CycleFailed { failures, report } = err else {
            panic!("expected CycleFailed");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, EntityKind::Budget);
        assert_eq!(failures[0].phase, WorkerPhase::Refresh);
        assert!(report.refresh_for(EntityKind::Category).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_sync_runs_every_interval() {
        let f = Fixture::new();
        f.ledger_store.upsert(&entry(100)).await.unwrap();
        let agent = f.builder(SyncMode::Periodic).build().unwrap();

        agent.start_periodic_sync().await;
        agent.start_periodic_sync().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(f.ledger_store.count_dirty().await.unwrap(), 0);
        assert_eq!(f.ledger_remote.creates.load(Ordering::SeqCst), 1);
        assert!(agent.status().await.periodic_running);

        f.ledger_store.upsert(&entry(200)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(299)).await;
        assert_eq!(f.ledger_store.count_dirty().await.unwrap(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(f.ledger_store.count_dirty().await.unwrap(), 0);
        assert_eq!(agent.status().await.cycles_completed, 2);

        agent.stop_sync().await;
        agent.stop_sync().await;
        assert!(!agent.status().await.periodic_running);

        f.ledger_store.upsert(&entry(300)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(900)).await;
        assert_eq!(f.ledger_store.count_dirty().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_failures_do_not_end_the_loop() {
        let f = Fixture::new();
        let emitter = Arc::new(RecordingEmitter::default());
        let broken: Arc<dyn LocalStore<Category>> = Arc::new(BrokenStore);
        let agent = SyncAgentBuilder::new(config(SyncMode::Periodic))
            .with_worker(worker::<Category>(broken, f.category_remote.clone()))
            .with_emitter(emitter.clone())
            .build()
            .unwrap();

        agent.start_periodic_sync().await;
        tokio::time::sleep(Duration::from_secs(601)).await;

        assert_eq!(emitter.errors.lock().unwrap().len(), 3);
        assert!(agent.status().await.periodic_running);
        agent.stop_sync().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_in_flight_cycle() {
        let store = Arc::new(MemoryStore::with_records([entry(100), entry(200)]));
        let remote = Arc::new(FakeRemote::new().with_latency(Duration::from_secs(30)));
        let agent = SyncAgentBuilder::new(config(SyncMode::Periodic))
            .with_worker(worker::<LedgerEntry>(store.clone(), remote.clone()))
            .build()
            .unwrap();

        agent.start_periodic_sync().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(agent.status().await.is_syncing);

        agent.stop_sync().await;
        tokio::time::sleep(Duration::from_secs(120)).await;

        // both records are still dirty: nothing half-confirmed
        assert_eq!(store.count_dirty().await.unwrap(), 2);
        assert!(remote.stored().is_empty());
        let status = agent.status().await;
        assert!(!status.is_syncing);
        assert!(!status.periodic_running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_agent_restarts_after_stop() {
        let f = Fixture::new();
        let agent = f.builder(SyncMode::Periodic).build().unwrap();

        agent.start_periodic_sync().await;
        agent.stop_sync().await;

        f.category_store.upsert(&category("Late")).await.unwrap();
        agent.start_periodic_sync().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(f.category_store.count_dirty().await.unwrap(), 0);
        agent.stop_sync().await;
    }

    #[tokio::test]
    async fn test_manual_mode_has_no_periodic_loop() {
        let f = Fixture::new();
        let agent = f.builder(SyncMode::Manual).build().unwrap();

        agent.start_periodic_sync().await;
        assert!(!agent.status().await.periodic_running);
    }

    #[tokio::test]
    async fn test_offline_entries_reach_server_once_online() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let flag = ConnectivityFlag::new(false);
        let remote = Arc::new(FakeRemote::<LedgerEntry>::new().assigning_ids());
        let agent = SyncAgentBuilder::new(config(SyncMode::Manual))
            .with_connectivity(Arc::new(flag.clone()))
            .with_worker(worker::<LedgerEntry>(Arc::new(db.ledger_entries()), remote.clone()))
            .build()
            .unwrap();

        let entries = [entry(1_000), entry(2_000), entry(3_000)];
        for e in &entries {
            db.ledger_entries().upsert(e).await.unwrap();
        }

        agent.sync_all_pending_data().await.unwrap();
        assert_eq!(db.ledger_entries().count_dirty().await.unwrap(), 3);

        flag.set_connected(true);
        let report = agent.sync_all_pending_data().await.unwrap();

        assert_eq!(report.total_confirmed(), 3);
        assert_eq!(db.ledger_entries().count_dirty().await.unwrap(), 0);
        assert_eq!(remote.stored().len(), 3);
        for e in &entries {
            assert!(db.ledger_entries().get_by_id(&e.id).await.unwrap().is_none());
        }
        assert_eq!(db.ledger_entries().count_for_family(FAMILY).await.unwrap(), 3);

        let again = agent.sync_all_pending_data().await.unwrap();
        assert_eq!(again.total_attempted(), 0);
        assert_eq!(remote.creates.load(Ordering::SeqCst), 3);
    }
}
