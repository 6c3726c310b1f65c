//! # Local Store Contract
//!
//! What the sync engine needs from local persistence, per record type.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         LocalStore<T>                                   │
//! │                                                                         │
//! │   EntitySyncWorker ──► list_dirty ─► push ─► confirm_push               │
//! │                    └─► replace_family / upsert_many   (refresh)         │
//! │                                                                         │
//! │   OfflineRepository ─► upsert / get / delete                            │
//! │                                                                         │
//! │   Implementations:                                                     │
//! │   • RecordRepository<T>  (famledger-db, SQLite)                        │
//! │   • MemoryStore<T>       (memory.rs, tests and demos)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use famledger_core::SyncRecord;
use famledger_db::{RecordRepository, SyncTable};

use crate::error::SyncResult;

/// Local persistence for one record type.
///
/// Callers never hold records across cycles: every cycle reads a fresh
/// snapshot through this trait.
#[async_trait]
pub trait LocalStore<T: SyncRecord>: Send + Sync {
    /// All records with the dirty marker set.
    async fn list_dirty(&self) -> SyncResult<Vec<T>>;

    async fn count_dirty(&self) -> SyncResult<i64>;

    async fn get(&self, id: &str) -> SyncResult<Option<T>>;

    /// Insert-or-replace by id, flags as given.
    async fn upsert(&self, record: &T) -> SyncResult<()>;

    async fn upsert_many(&self, records: &[T]) -> SyncResult<()>;

    /// Clears the dirty marker of a pushed record by writing the server's
    /// copy clean, unless the local row changed or vanished meanwhile.
    ///
    /// Returns whether the marker was cleared.
    async fn confirm_push(&self, pushed: &T, confirmed: &T) -> SyncResult<bool>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: &str) -> SyncResult<bool>;

    async fn delete_all_for_family(&self, family_id: &str) -> SyncResult<u64>;

    /// Atomically makes `records` the family's complete set.
    async fn replace_family(&self, family_id: &str, records: &[T]) -> SyncResult<()>;
}

#[async_trait]
impl<T: SyncTable> LocalStore<T> for RecordRepository<T> {
    async fn list_dirty(&self) -> SyncResult<Vec<T>> {
        Ok(RecordRepository::list_dirty(self).await?)
    }

    async fn count_dirty(&self) -> SyncResult<i64> {
        Ok(RecordRepository::count_dirty(self).await?)
    }

    async fn get(&self, id: &str) -> SyncResult<Option<T>> {
        Ok(self.get_by_id(id).await?)
    }

    async fn upsert(&self, record: &T) -> SyncResult<()> {
        Ok(RecordRepository::upsert(self, record).await?)
    }

    async fn upsert_many(&self, records: &[T]) -> SyncResult<()> {
        Ok(RecordRepository::upsert_many(self, records).await?)
    }

    async fn confirm_push(&self, pushed: &T, confirmed: &T) -> SyncResult<bool> {
        Ok(RecordRepository::confirm_push(self, pushed, confirmed).await?)
    }

    async fn delete(&self, id: &str) -> SyncResult<bool> {
        Ok(RecordRepository::delete(self, id).await?)
    }

    async fn delete_all_for_family(&self, family_id: &str) -> SyncResult<u64> {
        Ok(RecordRepository::delete_all_for_family(self, family_id).await?)
    }

    async fn replace_family(&self, family_id: &str, records: &[T]) -> SyncResult<()> {
        Ok(RecordRepository::replace_family(self, family_id, records).await?)
    }
}
