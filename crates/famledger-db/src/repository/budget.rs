//! # Budget Repository
//!
//! Storage for family budgets. Budgets are refreshable: a force sync
//! replaces a family's rows with the server's listing via
//! [`RecordRepository::replace_family`].

use chrono::NaiveDate;
use famledger_core::Budget;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::Sqlite;

use super::{RecordRepository, SyncTable};
use crate::error::DbResult;

/// Repository for budgets.
pub type BudgetRepository = RecordRepository<Budget>;

impl SyncTable for Budget {
    const TABLE: &'static str = "budgets";

    fn upsert_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO budgets (
                id, family_id, name, overall_limit_minor, currency, period_type,
                period_start, period_end, alert_threshold_pct, include_recurring,
                is_online, needs_sync, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&self.id)
        .bind(&self.family_id)
        .bind(&self.name)
        .bind(self.overall_limit_minor)
        .bind(&self.currency)
        .bind(self.period_type)
        .bind(self.period_start)
        .bind(self.period_end)
        .bind(self.alert_threshold_pct)
        .bind(self.include_recurring)
        .bind(self.is_online)
        .bind(self.needs_sync)
        .bind(self.created_at)
        .bind(self.updated_at)
    }
}

impl RecordRepository<Budget> {
    /// Lists a family's budgets, newest period first.
    pub async fn list_by_family(&self, family_id: &str) -> DbResult<Vec<Budget>> {
        let budgets = sqlx::query_as::<_, Budget>(
            "SELECT * FROM budgets WHERE family_id = ?1 ORDER BY period_start DESC, name",
        )
        .bind(family_id)
        .fetch_all(self.pool())
        .await?;

        Ok(budgets)
    }

    /// Budgets whose period covers `date`.
    pub async fn active_on(&self, family_id: &str, date: NaiveDate) -> DbResult<Vec<Budget>> {
        let budgets = sqlx::query_as::<_, Budget>(
            r#"
            SELECT * FROM budgets
            WHERE family_id = ?1 AND period_start <= ?2 AND period_end >= ?2
            ORDER BY name
            "#,
        )
        .bind(family_id)
        .bind(date)
        .fetch_all(self.pool())
        .await?;

        Ok(budgets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;
    use famledger_core::{PeriodType, SyncRecord};

    fn day(month: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, d).unwrap()
    }

    fn budget(family_id: &str, name: &str, month: u32) -> Budget {
        Budget::new_local(
            family_id,
            name,
            50_000,
            "USD",
            PeriodType::Monthly,
            day(month, 1),
            day(month, 28),
        )
    }

    #[tokio::test]
    async fn test_round_trip() {
        let db = test_db().await;
        let repo = db.budgets();

        let mut b = budget("fam-1", "Groceries", 3);
        b.alert_threshold_pct = 65;
        b.include_recurring = false;
        repo.upsert(&b).await.unwrap();

        assert_eq!(repo.get_by_id(&b.id).await.unwrap(), Some(b));
    }

    #[tokio::test]
    async fn test_every_period_type_is_storable() {
        let db = test_db().await;
        let repo = db.budgets();

        for period_type in [
            PeriodType::Monthly,
            PeriodType::Quarterly,
            PeriodType::Yearly,
            PeriodType::Custom,
        ] {
            let mut b = budget("fam-1", "Any", 1);
            b.period_type = period_type;
            repo.upsert(&b).await.unwrap();
            assert_eq!(repo.get_by_id(&b.id).await.unwrap().unwrap().period_type, period_type);
        }
    }

    #[tokio::test]
    async fn test_replace_family_overwrites_local_rows() {
        let db = test_db().await;
        let repo = db.budgets();

        let stale = budget("fam-1", "Stale", 1).into_synced();
        let local_only = budget("fam-1", "Local only", 2);
        let neighbour = budget("fam-2", "Other family", 3);
        repo.upsert_many(&[stale.clone(), local_only, neighbour.clone()])
            .await
            .unwrap();

        let listing: Vec<Budget> = (0..3)
            .map(|i| budget("fam-1", &format!("Server {i}"), 4).into_synced())
            .collect();
        repo.replace_family("fam-1", &listing).await.unwrap();

        let stored = repo.list_by_family("fam-1").await.unwrap();
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().all(|b| !b.needs_sync && b.is_online));
        assert!(repo.get_by_id(&stale.id).await.unwrap().is_none());
        // Other families are untouched.
        assert!(repo.get_by_id(&neighbour.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_all_for_family() {
        let db = test_db().await;
        let repo = db.budgets();

        repo.upsert_many(&[budget("fam-1", "A", 1), budget("fam-1", "B", 2), budget("fam-2", "C", 3)])
            .await
            .unwrap();

        assert_eq!(repo.delete_all_for_family("fam-1").await.unwrap(), 2);
        assert_eq!(repo.count_for_family("fam-2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_threshold_is_a_constraint_error() {
        let db = test_db().await;
        let repo = db.budgets();

        let mut b = budget("fam-1", "Broken", 3);
        b.alert_threshold_pct = 150;

        let err = repo.upsert(&b).await.unwrap_err();
        assert!(err.is_constraint());
        assert!(repo.get_by_id(&b.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_active_on() {
        let db = test_db().await;
        let repo = db.budgets();

        repo.upsert_many(&[budget("fam-1", "March", 3), budget("fam-1", "April", 4)])
            .await
            .unwrap();

        let active = repo.active_on("fam-1", day(3, 15)).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "March");
        assert!(repo.active_on("fam-1", day(3, 30)).await.unwrap().is_empty());
    }
}
