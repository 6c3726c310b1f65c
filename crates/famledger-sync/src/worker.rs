//! # Entity Sync Worker
//!
//! One worker per record type: pushes that type's dirty set and, on a
//! force sync, refreshes it from the server.
//!
//! ## Push Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     sync_pending_records()                              │
//! │                                                                         │
//! │  store.list_dirty() ──► [r1, r2, r3]        (failure = worker failure)  │
//! │                            │                                            │
//! │              buffer_unordered(push_concurrency)                         │
//! │                 ┌──────────┼──────────┐                                 │
//! │                 ▼          ▼          ▼                                 │
//! │          claim(id)? ── taken ──► deferred (offline path is pushing it)  │
//! │                 │                                                       │
//! │            is_online?  create / update  (one remote call each)          │
//! │                 │                                                       │
//! │        ok ──────┴──► store.confirm_push(pushed, server copy)            │
//! │                        true  → confirmed                                │
//! │                        false → superseded (edited/deleted meanwhile)    │
//! │        err ─────────► failed[id]  (marker untouched, retried next cycle)│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Refresh Flow
//! ```text
//! remote.list(family) ──► drop foreign ──► into_synced()
//!      │                                        │
//!      │ (failure = worker failure)   replace: store.replace_family
//!      │                              merge:   store.upsert_many, skipping
//!      │                                       ids with unpushed local edits
//! ```

use async_trait::async_trait;
use famledger_core::{EntityKind, SyncRecord};
use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::claims::PushClaims;
use crate::config::RefreshPolicy;
use crate::error::SyncResult;
use crate::remote::RemoteApi;
use crate::report::{PushReport, RecordFailure, RefreshReport};
use crate::store::LocalStore;

/// Type-erased worker the agent schedules.
#[async_trait]
pub trait SyncWorker: Send + Sync {
    fn kind(&self) -> EntityKind;

    /// Pushes every dirty record of this kind.
    ///
    /// Per-record failures land in the report; `Err` means the dirty set
    /// could not be read at all.
    async fn sync_pending_records(&self) -> SyncResult<PushReport>;

    /// Overwrites this kind's local records for `family_id` with clean
    /// server copies.
    async fn refresh_from_remote(&self, family_id: &str) -> SyncResult<RefreshReport>;

    async fn pending_count(&self) -> SyncResult<i64>;
}

/// Outcome of pushing a single record.
enum PushOutcome {
    Confirmed,
    Superseded,
    Deferred,
    Failed(RecordFailure),
}

/// The [`SyncWorker`] for record type `T`.
pub struct EntitySyncWorker<T: SyncRecord> {
    store: Arc<dyn LocalStore<T>>,
    remote: Arc<dyn RemoteApi<T>>,
    claims: PushClaims,
    push_concurrency: usize,
    refresh_policy: RefreshPolicy,
}

impl<T: SyncRecord> EntitySyncWorker<T> {
    pub fn new(store: Arc<dyn LocalStore<T>>, remote: Arc<dyn RemoteApi<T>>) -> Self {
        EntitySyncWorker {
            store,
            remote,
            claims: PushClaims::new(),
            push_concurrency: 4,
            refresh_policy: RefreshPolicy::default(),
        }
    }

    pub fn with_push_concurrency(mut self, concurrency: usize) -> Self {
        self.push_concurrency = concurrency.max(1);
        self
    }

    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    /// Shares push claims with the offline write path over the same store.
    pub fn with_claims(mut self, claims: PushClaims) -> Self {
        self.claims = claims;
        self
    }

    async fn push_one(&self, record: T) -> PushOutcome {
        let Some(_claim) = self.claims.try_claim(T::KIND, record.id()) else {
            debug!(kind = %T::KIND, id = %record.id(), "Push already in flight, deferred");
            return PushOutcome::Deferred;
        };

        let sent = if record.is_online() {
            self.remote.update(&record).await
        } else {
            self.remote.create(&record).await
        };

        let confirmed = match sent {
            Ok(confirmed) => confirmed,
            Err(error) => {
                warn!(kind = %T::KIND, id = %record.id(), error = %error, "Push failed, record stays dirty");
                return PushOutcome::Failed(RecordFailure {
                    id: record.id().to_string(),
                    error,
                });
            }
        };

        match self.store.confirm_push(&record, &confirmed).await {
            Ok(true) => {
                debug!(kind = %T::KIND, id = %confirmed.id(), "Push confirmed");
                PushOutcome::Confirmed
            }
            Ok(false) => {
                debug!(kind = %T::KIND, id = %record.id(), "Push superseded by local change");
                PushOutcome::Superseded
            }
            Err(error) => {
                warn!(kind = %T::KIND, id = %record.id(), error = %error, "Could not record push confirmation");
                PushOutcome::Failed(RecordFailure {
                    id: record.id().to_string(),
                    error,
                })
            }
        }
    }
}

#[async_trait]
impl<T: SyncRecord> SyncWorker for EntitySyncWorker<T> {
    fn kind(&self) -> EntityKind {
        T::KIND
    }

    async fn sync_pending_records(&self) -> SyncResult<PushReport> {
        let dirty = self.store.list_dirty().await?;
        let mut report = PushReport::empty(T::KIND);
        report.attempted = dirty.len();

        if dirty.is_empty() {
            debug!(kind = %T::KIND, "Nothing to push");
            return Ok(report);
        }

        let outcomes: Vec<PushOutcome> = stream::iter(dirty)
            .map(|record| self.push_one(record))
            .buffer_unordered(self.push_concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                PushOutcome::Confirmed => report.confirmed += 1,
                PushOutcome::Superseded => report.superseded += 1,
                PushOutcome::Deferred => report.deferred += 1,
                PushOutcome::Failed(failure) => report.failed.push(failure),
            }
        }

        info!(
            kind = %T::KIND,
            attempted = report.attempted,
            confirmed = report.confirmed,
            superseded = report.superseded,
            deferred = report.deferred,
            failed = report.failed.len(),
            "Push complete"
        );
        Ok(report)
    }

    async fn refresh_from_remote(&self, family_id: &str) -> SyncResult<RefreshReport> {
        let listed = self.remote.list(family_id).await?;
        let fetched = listed.len();

        let records: Vec<T> = listed
            .into_iter()
            .filter(|r| r.family_id() == family_id)
            .map(SyncRecord::into_synced)
            .collect();
        let skipped_foreign = fetched - records.len();

        let mut report = RefreshReport {
            kind: T::KIND,
            fetched,
            stored: 0,
            skipped_foreign,
            skipped_dirty: 0,
            policy: self.refresh_policy,
        };

        match self.refresh_policy {
            RefreshPolicy::Replace => {
                self.store.replace_family(family_id, &records).await?;
                report.stored = records.len();
            }
            RefreshPolicy::Merge => {
                let dirty: HashSet<String> = self
                    .store
                    .list_dirty()
                    .await?
                    .into_iter()
                    .map(|r| r.id().to_string())
                    .collect();
                let (kept, writable): (Vec<T>, Vec<T>) =
                    records.into_iter().partition(|r| dirty.contains(r.id()));

                self.store.upsert_many(&writable).await?;
                report.stored = writable.len();
                report.skipped_dirty = kept.len();
            }
        }

        info!(
            kind = %T::KIND,
            family_id = %family_id,
            policy = %self.refresh_policy,
            fetched = report.fetched,
            stored = report.stored,
            "Refresh complete"
        );
        Ok(report)
    }

    async fn pending_count(&self) -> SyncResult<i64> {
        self.store.count_dirty().await
    }
}

// =============================================================================
// Test Fakes
// =============================================================================


#[cfg(test)]
mod tests {
    use super::testing::{BrokenStore, FakeRemote};
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::Utc;
    use famledger_core::{Category, LedgerEntry, TransactionType};
    use std::sync::atomic::Ordering;

    fn entry(family: &str, amount: i64) -> LedgerEntry {
        LedgerEntry::new_local(
            family,
            "member-1",
            TransactionType::Expense,
            amount,
            "USD",
            "cat-food",
            Utc::now(),
            None,
        )
    }

    fn category(family: &str, name: &str) -> Category {
        Category::new_local(family, name, "tag", "#445566", TransactionType::Expense)
    }

    fn worker_for<T: SyncRecord, S: LocalStore<T> + 'static>(
        store: Arc<S>,
        remote: Arc<FakeRemote<T>>,
    ) -> EntitySyncWorker<T> {
        EntitySyncWorker::new(store, remote)
    }

    #[tokio::test]
    async fn test_push_confirms_every_record() {
        let records = vec![entry("fam-1", 100), entry("fam-1", 200), entry("fam-1", 300)];
        let store = Arc::new(MemoryStore::with_records(records));
        let remote = Arc::new(FakeRemote::new());
        let worker = worker_for(store.clone(), remote.clone());

        let report = worker.sync_pending_records().await.unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.confirmed, 3);
        assert!(report.is_clean());
        assert_eq!(store.count_dirty().await.unwrap(), 0);
        assert!(store.all().await.iter().all(|e| e.is_online));
        assert_eq!(remote.stored().len(), 3);
        assert_eq!(remote.creates.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_second_push_is_a_no_op() {
        let store = Arc::new(MemoryStore::with_records([entry("fam-1", 100)]));
        let remote = Arc::new(FakeRemote::new());
        let worker = worker_for(store.clone(), remote.clone());

        worker.sync_pending_records().await.unwrap();
        let second = worker.sync_pending_records().await.unwrap();

        assert_eq!(second.attempted, 0);
        assert_eq!(remote.calls(), 1);
        assert_eq!(remote.stored().len(), 1);
    }

    #[tokio::test]
    async fn test_one_rejected_record_does_not_block_others() {
        let a = entry("fam-1", 100);
        let b = entry("fam-1", 200);
        let c = entry("fam-1", 300);
        let store = Arc::new(MemoryStore::with_records([a.clone(), b.clone(), c.clone()]));
        let remote = Arc::new(FakeRemote::new());
        remote.reject(&b.id);
        let worker = worker_for(store.clone(), remote.clone());

        let report = worker.sync_pending_records().await.unwrap();

        assert!(report.is_partial());
        assert_eq!(report.confirmed, 2);
        assert_eq!(report.failed_ids(), vec![b.id.as_str()]);
        assert!(!store.get(&a.id).await.unwrap().unwrap().needs_sync);
        assert!(store.get(&b.id).await.unwrap().unwrap().needs_sync);
        assert!(!store.get(&c.id).await.unwrap().unwrap().needs_sync);
    }

    #[tokio::test]
    async fn test_online_records_are_updated_not_created() {
        let mut known = category("fam-1", "Rent").into_synced();
        known.mark_dirty(Utc::now());
        let store = Arc::new(MemoryStore::with_records([known]));
        let remote = Arc::new(FakeRemote::new());
        let worker = worker_for(store, remote.clone());

        worker.sync_pending_records().await.unwrap();

        assert_eq!(remote.updates.load(Ordering::SeqCst), 1);
        assert_eq!(remote.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_server_assigned_ids_replace_local_ids() {
        let local = category("fam-1", "Fuel");
        let store = Arc::new(MemoryStore::with_records([local.clone()]));
        let remote = Arc::new(FakeRemote::new().assigning_ids());
        let worker = worker_for(store.clone(), remote);

        worker.sync_pending_records().await.unwrap();

        assert!(store.get(&local.id).await.unwrap().is_none());
        let synced = store.get("srv-1").await.unwrap().unwrap();
        assert!(!synced.needs_sync);
        assert_eq!(synced.name, "Fuel");
    }

    #[tokio::test]
    async fn test_unreadable_store_fails_the_worker() {
        let worker = worker_for(Arc::new(BrokenStore), Arc::new(FakeRemote::<Category>::new()));

        assert!(worker.sync_pending_records().await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_replaces_family_records() {
        let stale = category("fam-1", "Stale").into_synced();
        let other_family = category("fam-2", "Other");
        let store = Arc::new(MemoryStore::with_records([stale.clone(), other_family.clone()]));

        let server: Vec<Category> = (0..5).map(|i| category("fam-1", &format!("Server {i}"))).collect();
        let remote = Arc::new(FakeRemote::new().with_records(server.clone()));
        let worker = worker_for(store.clone(), remote);

        let report = worker.refresh_from_remote("fam-1").await.unwrap();

        assert_eq!(report.fetched, 5);
        assert_eq!(report.stored, 5);
        let fam1: Vec<_> = store
            .all()
            .await
            .into_iter()
            .filter(|c| c.family_id == "fam-1")
            .collect();
        assert_eq!(fam1.len(), 5);
        assert!(fam1.iter().all(|c| !c.needs_sync && c.is_online));
        assert!(store.get(&stale.id).await.unwrap().is_none());
        assert!(store.get(&other_family.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_merge_refresh_keeps_unpushed_edits() {
        let shared = category("fam-1", "Shared").into_synced();
        let mut edited = shared.clone();
        edited.name = "Edited locally".into();
        edited.mark_dirty(Utc::now());
        let local_only = category("fam-1", "Local only");

        let store = Arc::new(MemoryStore::with_records([edited, local_only.clone()]));
        let fresh = category("fam-1", "New on server");
        let remote = Arc::new(FakeRemote::new().with_records([shared.clone(), fresh.clone()]));
        let worker = worker_for(store.clone(), remote)
            .with_refresh_policy(RefreshPolicy::Merge);

        let report = worker.refresh_from_remote("fam-1").await.unwrap();

        assert_eq!(report.stored, 1);
        assert_eq!(report.skipped_dirty, 1);
        assert_eq!(store.get(&shared.id).await.unwrap().unwrap().name, "Edited locally");
        assert!(store.get(&local_only.id).await.unwrap().is_some());
        assert!(!store.get(&fresh.id).await.unwrap().unwrap().needs_sync);
    }

    #[tokio::test]
    async fn test_refresh_listing_failure_leaves_store_untouched() {
        let kept = category("fam-1", "Kept").into_synced();
        let store = Arc::new(MemoryStore::with_records([kept.clone()]));
        let remote = Arc::new(FakeRemote::new());
        remote.set_unreachable(true);
        let worker = worker_for(store.clone(), remote);

        assert!(worker.refresh_from_remote("fam-1").await.is_err());
        assert!(store.get(&kept.id).await.unwrap().is_some());
    }

    /// Remote whose listing ignores the family scope.
    struct UnscopedListing(Vec<Category>);

    #[async_trait]
    impl RemoteApi<Category> for UnscopedListing {
        async fn create(&self, record: &Category) -> SyncResult<Category> {
            Ok(record.clone())
        }
        async fn update(&self, record: &Category) -> SyncResult<Category> {
            Ok(record.clone())
        }
        async fn delete(&self, _id: &str) -> SyncResult<()> {
            Ok(())
        }
        async fn list(&self, _family_id: &str) -> SyncResult<Vec<Category>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_refresh_drops_records_of_other_families() {
        let ours = category("fam-1", "Ours");
        let theirs = category("fam-2", "Theirs");
        let store = Arc::new(MemoryStore::<Category>::new());
        let worker = EntitySyncWorker::<Category>::new(
            store.clone(),
            Arc::new(UnscopedListing(vec![ours.clone(), theirs.clone()])),
        );

        let report = worker.refresh_from_remote("fam-1").await.unwrap();

        assert_eq!(report.fetched, 2);
        assert_eq!(report.stored, 1);
        assert_eq!(report.skipped_foreign, 1);
        assert!(store.get(&ours.id).await.unwrap().is_some());
        assert!(store.get(&theirs.id).await.unwrap().is_none());
    }
}
