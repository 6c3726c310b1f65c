//! # Offline-First Writes
//!
//! The write path the application uses for user edits. Every write lands in
//! the local store first; the network is attempted only when connected and
//! its failure never loses the edit.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create / update(record)                                                │
//! │     validate ─► mark dirty ─► store.upsert          (always)            │
//! │                                   │                                     │
//! │                      connected? ──┤ no  → done, pushed by next cycle    │
//! │                                   │ yes                                 │
//! │                      claimed by a worker? ── yes → stays dirty          │
//! │                                   │ no                                  │
//! │                                   ▼                                     │
//! │                  remote.create (never acknowledged) / remote.update     │
//! │                     ok  → store.confirm_push → clean copy               │
//! │                     err → stays dirty, logged                           │
//! │                                                                         │
//! │  delete(id)                                                             │
//! │     connected + known to server → remote.delete first (errors returned) │
//! │     otherwise                   → local delete only                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use famledger_core::SyncRecord;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::claims::PushClaims;
use crate::connectivity::Connectivity;
use crate::error::SyncResult;
use crate::remote::RemoteApi;
use crate::store::LocalStore;

/// Repository facade combining a local store with the remote service.
pub struct OfflineRepository<T: SyncRecord> {
    store: Arc<dyn LocalStore<T>>,
    remote: Arc<dyn RemoteApi<T>>,
    connectivity: Arc<dyn Connectivity>,
    claims: PushClaims,
}

impl<T: SyncRecord> Clone for OfflineRepository<T> {
    fn clone(&self) -> Self {
        OfflineRepository {
            store: Arc::clone(&self.store),
            remote: Arc::clone(&self.remote),
            connectivity: Arc::clone(&self.connectivity),
            claims: self.claims.clone(),
        }
    }
}

impl<T: SyncRecord> OfflineRepository<T> {
    pub fn new(
        store: Arc<dyn LocalStore<T>>,
        remote: Arc<dyn RemoteApi<T>>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        OfflineRepository {
            store,
            remote,
            connectivity,
            claims: PushClaims::new(),
        }
    }

    /// Shares push claims with the sync workers over the same store, so a
    /// record is never created twice by a write racing a sync cycle.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let categories = OfflineRepository::new(store, api, connectivity)
    ///     .with_claims(agent.push_claims());
    /// ```
    pub fn with_claims(mut self, claims: PushClaims) -> Self {
        self.claims = claims;
        self
    }

    /// Stores a new record and, when online, creates it remotely.
    ///
    /// ## Returns
    /// The record as now stored: clean (possibly under a server id) if the
    /// server accepted it, dirty otherwise. Only validation and local store
    /// failures are errors.
    pub async fn create(&self, mut record: T) -> SyncResult<T> {
        record.validate()?;
        record.mark_dirty(Utc::now());
        self.store.upsert(&record).await?;
        self.try_push(record).await
    }

    /// Stores an edit and, when online, pushes it.
    ///
    /// Bumps `updated_at` and sets the dirty marker before anything else.
    pub async fn update(&self, mut record: T) -> SyncResult<T> {
        record.validate()?;
        record.mark_dirty(Utc::now());
        self.store.upsert(&record).await?;
        self.try_push(record).await
    }

    /// Deletes a record.
    ///
    /// When connected and the server knows the record, the remote delete
    /// runs first and its failure is returned with the local copy intact.
    /// Offline deletes are local only and are not replayed later.
    pub async fn delete(&self, id: &str) -> SyncResult<bool> {
        let Some(existing) = self.store.get(id).await? else {
            return Ok(false);
        };

        if existing.is_online() {
            if self.connectivity.is_connected() {
                self.remote.delete(id).await?;
            } else {
                warn!(kind = %T::KIND, id = %id, "Deleting offline; server copy will remain");
            }
        }

        self.store.delete(id).await
    }

    pub async fn get(&self, id: &str) -> SyncResult<Option<T>> {
        self.store.get(id).await
    }

    pub async fn pending(&self) -> SyncResult<Vec<T>> {
        self.store.list_dirty().await
    }

    async fn try_push(&self, record: T) -> SyncResult<T> {
        if !self.connectivity.is_connected() {
            debug!(kind = %T::KIND, id = %record.id(), "Offline, record queued for sync");
            return Ok(record);
        }

        let Some(_claim) = self.claims.try_claim(T::KIND, record.id()) else {
            debug!(kind = %T::KIND, id = %record.id(), "Sync cycle is pushing this record, left dirty");
            return Ok(record);
        };

        let sent = if record.is_online() {
            self.remote.update(&record).await
        } else {
            self.remote.create(&record).await
        };

        match sent {
            Ok(confirmed) => {
                if self.store.confirm_push(&record, &confirmed).await? {
                    Ok(confirmed.into_synced())
                } else {
                    Ok(self.store.get(confirmed.id()).await?.unwrap_or(record))
                }
            }
            Err(e) => {
                warn!(kind = %T::KIND, id = %record.id(), error = %e, "Remote write failed, record queued for sync");
                Ok(record)
            }
        }
    }
}
