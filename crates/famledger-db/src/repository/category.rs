//! # Category Repository

use famledger_core::Category;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::Sqlite;

use super::{RecordRepository, SyncTable};
use crate::error::DbResult;

/// Repository for categories.
pub type CategoryRepository = RecordRepository<Category>;

impl SyncTable for Category {
    const TABLE: &'static str = "categories";

    fn upsert_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO categories (
                id, family_id, name, icon, color, category_type, archived,
                is_online, needs_sync, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&self.id)
        .bind(&self.family_id)
        .bind(&self.name)
        .bind(&self.icon)
        .bind(&self.color)
        .bind(self.category_type)
        .bind(self.archived)
        .bind(self.is_online)
        .bind(self.needs_sync)
        .bind(self.created_at)
        .bind(self.updated_at)
    }
}

impl RecordRepository<Category> {
    /// Lists a family's categories by name.
    ///
    /// ## Arguments
    /// * `include_archived` - Also return archived categories
    pub async fn list_by_family(
        &self,
        family_id: &str,
        include_archived: bool,
    ) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT * FROM categories
            WHERE family_id = ?1 AND (?2 OR archived = 0)
            ORDER BY name
            "#,
        )
        .bind(family_id)
        .bind(include_archived)
        .fetch_all(self.pool())
        .await?;

        Ok(categories)
    }
}
