//! # Repository Module
//!
//! Database repositories for the three synced record types.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Sync worker / offline write path                                      │
//! │       │                                                                 │
//! │       │  db.budgets().list_dirty()                                     │
//! │       ▼                                                                 │
//! │  RecordRepository<T>            (this file: shared sync operations)    │
//! │  ├── list_dirty / count_dirty                                          │
//! │  ├── get_by_id / list_by_family                                        │
//! │  ├── upsert / upsert_many                                              │
//! │  ├── confirm_push        ← one transaction, race-aware                 │
//! │  ├── delete / delete_all_for_family                                    │
//! │  └── replace_family      ← one transaction                             │
//! │       │                                                                 │
//! │       │  T: SyncTable  (ledger.rs, budget.rs, category.rs)             │
//! │       │  table name + INSERT OR REPLACE binding                        │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`LedgerEntryRepository`] - Ledger entries (push-only)
//! - [`BudgetRepository`] - Budgets
//! - [`CategoryRepository`] - Categories

pub mod budget;
pub mod category;
pub mod ledger;

use std::marker::PhantomData;

use famledger_core::SyncRecord;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

pub use budget::BudgetRepository;
pub use category::CategoryRepository;
pub use ledger::LedgerEntryRepository;

// =============================================================================
// SyncTable
// =============================================================================

/// A record type with a backing table.
///
/// Implemented once per record type; everything else in
/// [`RecordRepository`] is written against this trait.
pub trait SyncTable: SyncRecord + for<'r> FromRow<'r, SqliteRow> + Send + Unpin {
    /// Table name. Never user input.
    const TABLE: &'static str;

    /// `INSERT OR REPLACE` of every column, bound from `self`.
    fn upsert_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>>;
}

// =============================================================================
// RecordRepository
// =============================================================================

/// Repository for one synced record type.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.categories();
///
/// repo.upsert(&category).await?;
/// let dirty = repo.list_dirty().await?;
/// ```
#[derive(Debug)]
pub struct RecordRepository<T> {
    pool: SqlitePool,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for RecordRepository<T> {
    fn clone(&self) -> Self {
        RecordRepository {
            pool: self.pool.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: SyncTable> RecordRepository<T> {
    pub fn new(pool: SqlitePool) -> Self {
        RecordRepository {
            pool,
            _record: PhantomData,
        }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns every record with `needs_sync = 1`, oldest edit first.
    pub async fn list_dirty(&self) -> DbResult<Vec<T>> {
        let sql = format!(
            "SELECT * FROM {} WHERE needs_sync = 1 ORDER BY updated_at",
            T::TABLE
        );
        let records = sqlx::query_as::<_, T>(&sql).fetch_all(&self.pool).await?;

        debug!(kind = %T::KIND, count = records.len(), "Loaded dirty records");
        Ok(records)
    }

    pub async fn count_dirty(&self) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE needs_sync = 1", T::TABLE);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Gets a record by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(record))` - Record found
    /// * `Ok(None)` - Record not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<T>> {
        let sql = format!("SELECT * FROM {} WHERE id = ?1", T::TABLE);
        let record = sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// Counts all records of this type for a family.
    pub async fn count_for_family(&self, family_id: &str) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE family_id = ?1", T::TABLE);
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(family_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Inserts or replaces a record by id, flags included as given.
    pub async fn upsert(&self, record: &T) -> DbResult<()> {
        record.upsert_query().execute(&self.pool).await?;
        debug!(kind = %T::KIND, id = %record.id(), dirty = record.needs_sync(), "Upserted record");
        Ok(())
    }

    /// Upserts a batch in one transaction.
    pub async fn upsert_many(&self, records: &[T]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            record.upsert_query().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!(kind = %T::KIND, count = records.len(), "Upserted records");
        Ok(())
    }

    /// Records the server's confirmation of a push.
    ///
    /// `pushed` is the snapshot that was sent, `confirmed` what the server
    /// returned. Runs in one transaction:
    ///
    /// ```text
    /// local row gone?                 → write nothing             → false
    /// local updated_at != pushed's?   → keep dirty, rekey to the
    ///                                   server id, set is_online  → false
    /// otherwise                       → write confirmed copy clean,
    ///                                   drop the old-id row        → true
    /// ```
    ///
    /// ## Returns
    /// Whether the dirty marker was cleared.
    pub async fn confirm_push(&self, pushed: &T, confirmed: &T) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let select = format!("SELECT * FROM {} WHERE id = ?1", T::TABLE);
        let current = sqlx::query_as::<_, T>(&select)
            .bind(pushed.id())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(current) = current else {
            tx.rollback().await?;
            debug!(kind = %T::KIND, id = %pushed.id(), "Pushed record deleted locally, nothing to confirm");
            return Ok(false);
        };

        let delete = format!("DELETE FROM {} WHERE id = ?1", T::TABLE);
        let rekeyed = confirmed.id() != pushed.id();

        if current.updated_at() != pushed.updated_at() {
            // Edited while the push was in flight: the edit still has to go out.
            let current = current.into_rekeyed(confirmed.id());
            if rekeyed {
                sqlx::query(&delete)
                    .bind(pushed.id())
                    .execute(&mut *tx)
                    .await?;
            }
            current.upsert_query().execute(&mut *tx).await?;
            tx.commit().await?;

            debug!(
                kind = %T::KIND,
                id = %current.id(),
                "Record edited during push, keeping dirty marker"
            );
            return Ok(false);
        }

        if rekeyed {
            sqlx::query(&delete)
                .bind(pushed.id())
                .execute(&mut *tx)
                .await?;
        }
        let clean = confirmed.clone().into_synced();
        clean.upsert_query().execute(&mut *tx).await?;
        tx.commit().await?;

        debug!(kind = %T::KIND, id = %clean.id(), rekeyed, "Confirmed push");
        Ok(true)
    }

    /// Deletes a record by id. Returns whether a row was removed.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", T::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deletes every record of this type for a family.
    pub async fn delete_all_for_family(&self, family_id: &str) -> DbResult<u64> {
        let sql = format!("DELETE FROM {} WHERE family_id = ?1", T::TABLE);
        let result = sqlx::query(&sql)
            .bind(family_id)
            .execute(&self.pool)
            .await?;

        debug!(kind = %T::KIND, family_id = %family_id, deleted = result.rows_affected(), "Deleted family records");
        Ok(result.rows_affected())
    }

    /// Atomically swaps a family's records for `records`.
    ///
    /// After commit the table holds exactly `records` for `family_id`, as
    /// given. Readers never observe the intermediate empty state.
    pub async fn replace_family(&self, family_id: &str, records: &[T]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let delete = format!("DELETE FROM {} WHERE family_id = ?1", T::TABLE);
        let removed = sqlx::query(&delete)
            .bind(family_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for record in records {
            record.upsert_query().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!(
            kind = %T::KIND,
            family_id = %family_id,
            removed,
            inserted = records.len(),
            "Replaced family records"
        );
        Ok(())
    }
}

// =============================================================================
// Shared Test Helpers
// =============================================================================
