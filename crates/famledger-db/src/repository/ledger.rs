//! # Ledger Entry Repository
//!
//! Storage for income and expense entries. Entries are push-only: the
//! sync engine never refreshes this table from the server, so it can hold
//! dirty entries for as long as the device stays offline.

use chrono::{DateTime, Utc};
use famledger_core::{LedgerEntry, Money, TransactionType};
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::Sqlite;

use super::{RecordRepository, SyncTable};
use crate::error::DbResult;

/// Repository for ledger entries.
pub type LedgerEntryRepository = RecordRepository<LedgerEntry>;

impl SyncTable for LedgerEntry {
    const TABLE: &'static str = "ledger_entries";

    fn upsert_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO ledger_entries (
                id, family_id, member_id, entry_type, amount_minor, currency,
                category_id, occurred_at, notes, is_online, needs_sync,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&self.id)
        .bind(&self.family_id)
        .bind(&self.member_id)
        .bind(self.entry_type)
        .bind(self.amount_minor)
        .bind(&self.currency)
        .bind(&self.category_id)
        .bind(self.occurred_at)
        .bind(&self.notes)
        .bind(self.is_online)
        .bind(self.needs_sync)
        .bind(self.created_at)
        .bind(self.updated_at)
    }
}

impl RecordRepository<LedgerEntry> {
    /// Lists a family's entries, most recent first.
    ///
    /// ## Arguments
    /// * `family_id` - Family scope
    /// * `limit` - Maximum rows to return
    pub async fn list_by_family(&self, family_id: &str, limit: u32) -> DbResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT * FROM ledger_entries
            WHERE family_id = ?1
            ORDER BY occurred_at DESC
            LIMIT ?2
            "#,
        )
        .bind(family_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(entries)
    }

    /// Sums a family's entries of one type in `[from, to)`.
    ///
    /// Used to check spending against a budget.
    pub async fn total_between(
        &self,
        family_id: &str,
        entry_type: TransactionType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Money> {
        // Compared in Rust: stored RFC 3339 strings are not guaranteed to
        // share a fractional-second width, so TEXT ordering is unreliable.
        let amounts: Vec<(i64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT amount_minor, occurred_at FROM ledger_entries
            WHERE family_id = ?1 AND entry_type = ?2
            "#,
        )
        .bind(family_id)
        .bind(entry_type)
        .fetch_all(self.pool())
        .await?;

        Ok(amounts
            .into_iter()
            .filter(|(_, at)| *at >= from && *at < to)
            .map(|(minor, _)| Money::from_minor(minor))
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;
    use chrono::{Duration, TimeZone};
    use famledger_core::SyncRecord;

    fn entry(family_id: &str, amount_minor: i64) -> LedgerEntry {
        LedgerEntry::new_local(
            family_id,
            "member-1",
            TransactionType::Expense,
            amount_minor,
            "USD",
            "cat-1",
            Utc.with_ymd_and_hms(2024, 3, 10, 9, 30, 0).unwrap(),
            None,
        )
    }

    #[tokio::test]
    async fn test_upsert_and_get_round_trips_flags() {
        let db = test_db().await;
        let repo = db.ledger_entries();

        let mut e = entry("fam-1", 2500);
        e.notes = Some("bakery".to_string());
        repo.upsert(&e).await.unwrap();

        let loaded = repo.get_by_id(&e.id).await.unwrap().unwrap();
        assert_eq!(loaded, e);
        assert!(loaded.needs_sync);
        assert!(!loaded.is_online);
    }

    #[tokio::test]
    async fn test_list_dirty_and_count() {
        let db = test_db().await;
        let repo = db.ledger_entries();

        let dirty = entry("fam-1", 100);
        let clean = entry("fam-1", 200).into_synced();
        repo.upsert_many(&[dirty.clone(), clean]).await.unwrap();

        let listed = repo.list_dirty().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, dirty.id);
        assert_eq!(repo.count_dirty().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_confirm_push_clears_marker() {
        let db = test_db().await;
        let repo = db.ledger_entries();

        let e = entry("fam-1", 100);
        repo.upsert(&e).await.unwrap();

        assert!(repo.confirm_push(&e, &e).await.unwrap());

        let loaded = repo.get_by_id(&e.id).await.unwrap().unwrap();
        assert!(!loaded.needs_sync());
        assert!(loaded.is_online());
        assert_eq!(repo.count_dirty().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_confirm_push_is_idempotent() {
        let db = test_db().await;
        let repo = db.ledger_entries();

        let e = entry("fam-1", 100);
        repo.upsert(&e).await.unwrap();

        assert!(repo.confirm_push(&e, &e).await.unwrap());
        // The same confirmation arriving twice leaves one clean row.
        let _ = repo.confirm_push(&e, &e).await.unwrap();

        assert_eq!(repo.count_for_family("fam-1").await.unwrap(), 1);
        assert_eq!(repo.count_dirty().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_confirm_push_adopts_server_id() {
        let db = test_db().await;
        let repo = db.ledger_entries();

        let e = entry("fam-1", 100);
        repo.upsert(&e).await.unwrap();

        let mut server = e.clone();
        server.id = "srv-1".to_string();
        assert!(repo.confirm_push(&e, &server).await.unwrap());

        assert!(repo.get_by_id(&e.id).await.unwrap().is_none());
        let stored = repo.get_by_id("srv-1").await.unwrap().unwrap();
        assert!(!stored.needs_sync);
        assert!(stored.is_online);
    }

    #[tokio::test]
    async fn test_confirm_push_after_local_delete_writes_nothing() {
        let db = test_db().await;
        let repo = db.ledger_entries();

        let e = entry("fam-1", 100);
        repo.upsert(&e).await.unwrap();
        assert!(repo.delete(&e.id).await.unwrap());

        assert!(!repo.confirm_push(&e, &e).await.unwrap());
        assert_eq!(repo.count_for_family("fam-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_confirm_push_keeps_concurrent_edit_dirty() {
        let db = test_db().await;
        let repo = db.ledger_entries();

        let pushed = entry("fam-1", 100);
        repo.upsert(&pushed).await.unwrap();

        // Edited locally while the create was in flight.
        let mut edited = pushed.clone();
        edited.amount_minor = 150;
        edited.mark_dirty(pushed.updated_at + Duration::seconds(1));
        repo.upsert(&edited).await.unwrap();

        let mut server = pushed.clone();
        server.id = "srv-9".to_string();
        assert!(!repo.confirm_push(&pushed, &server).await.unwrap());

        assert!(repo.get_by_id(&pushed.id).await.unwrap().is_none());
        let stored = repo.get_by_id("srv-9").await.unwrap().unwrap();
        assert_eq!(stored.amount_minor, 150);
        assert!(stored.needs_sync);
        // Next push must be an update against the server's id.
        assert!(stored.is_online);
    }

    #[tokio::test]
    async fn test_list_by_family_and_totals() {
        let db = test_db().await;
        let repo = db.ledger_entries();

        let mut early = entry("fam-1", 1_000);
        early.occurred_at = Utc.with_ymd_and_hms(2024, 2, 28, 8, 0, 0).unwrap();
        let march_a = entry("fam-1", 2_000);
        let march_b = entry("fam-1", 3_000);
        let other = entry("fam-2", 9_000);
        repo.upsert_many(&[early, march_a, march_b, other])
            .await
            .unwrap();

        assert_eq!(repo.list_by_family("fam-1", 10).await.unwrap().len(), 3);
        assert_eq!(repo.list_by_family("fam-1", 2).await.unwrap().len(), 2);

        let total = repo
            .total_between(
                "fam-1",
                TransactionType::Expense,
                Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(total.minor(), 5_000);
    }
}
