//! # Database Pool
//!
//! Opening the local store and handing out repositories.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbConfig { location, pool sizes, timeouts, migrate }                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new ──► SqliteConnectOptions (WAL, busy timeout)             │
//! │       │       ──► SqlitePool                                            │
//! │       │       ──► embedded migrations                                   │
//! │       ▼                                                                 │
//! │  db.ledger_entries() / db.budgets() / db.categories()                   │
//! │       each repository holds a clone of the same pool                    │
//! │                                                                         │
//! │  The three sync workers and the offline write path use the pool at the  │
//! │  same time; WAL lets their reads proceed while one of them writes.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{BudgetRepository, CategoryRepository, LedgerEntryRepository};

// =============================================================================
// Configuration
// =============================================================================

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    /// A file on disk, created on first open.
    File(PathBuf),
    /// A private in-memory database, gone when the pool closes.
    Memory,
}

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new(data_dir.join("famledger.db"))
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub location: DbLocation,

    /// Upper bound on open connections. Default: 5, one per sync worker
    /// plus room for local writes.
    pub max_connections: u32,

    pub min_connections: u32,

    /// How long a caller waits for a free connection.
    pub acquire_timeout: Duration,

    /// How long SQLite waits on a locked file before reporting busy.
    pub busy_timeout: Duration,

    /// Applies embedded migrations on open. Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed configuration.
    ///
    /// ## Arguments
    /// * `path` - SQLite file; its parent directory must exist
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            location: DbLocation::File(path.into()),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Single-connection in-memory configuration for tests.
    pub fn in_memory() -> Self {
        DbConfig {
            location: DbLocation::Memory,
            // Every connection would otherwise see its own empty database.
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(1),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// The file path, or `None` for an in-memory database.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            DbLocation::File(path) => Some(path),
            DbLocation::Memory => None,
        }
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = match &self.location {
            DbLocation::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal),
            DbLocation::Memory => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::Open(e.to_string()))?,
        };
        Ok(options.busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the local store.
///
/// Clones share one pool. The composition root opens it once and hands
/// repositories to the sync workers.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database and applies migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        match config.path() {
            Some(path) => info!(path = %path.display(), "Opening local store"),
            None => debug!("Opening in-memory local store"),
        }

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout);
        if config.location == DbLocation::Memory {
            // Recycling the only connection would drop the data with it.
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::Open(e.to_string()))?;

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }

        debug!(max_connections = config.max_connections, "Local store ready");
        Ok(db)
    }

    /// Applies any embedded migrations not yet recorded in the database.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Ledger entries (push-only).
    ///
    /// ## Example
    /// ```rust,ignore
    /// let dirty = db.ledger_entries().list_dirty().await?;
    /// ```
    pub fn ledger_entries(&self) -> LedgerEntryRepository {
        LedgerEntryRepository::new(self.pool.clone())
    }

    pub fn budgets(&self) -> BudgetRepository {
        BudgetRepository::new(self.pool.clone())
    }

    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone())
    }

    /// Closes the pool. Later repository calls fail with [`DbError::Closed`].
    pub async fn close(&self) {
        info!("Closing local store");
        self.pool.close().await;
    }

    /// Whether a trivial query still succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
        assert!(total >= 1);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/famledger-test.db")
            .max_connections(10)
            .busy_timeout(Duration::from_secs(2))
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.busy_timeout, Duration::from_secs(2));
        assert!(!config.run_migrations);
        assert_eq!(config.path(), Some(Path::new("/tmp/famledger-test.db")));
        assert_eq!(DbConfig::in_memory().path(), None);
    }

    #[tokio::test]
    async fn test_file_database_persists_across_reopen() {
        let path = std::env::temp_dir().join(format!(
            "famledger-pool-{}.db",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        let category = famledger_core::Category::new_local(
            "fam-1",
            "Pets",
            "paw",
            "#AABBCC",
            famledger_core::TransactionType::Expense,
        );
        db.categories().upsert(&category).await.unwrap();
        db.close().await;

        let reopened = Database::new(DbConfig::new(&path)).await.unwrap();
        assert_eq!(reopened.categories().count_dirty().await.unwrap(), 1);
        reopened.close().await;

        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    #[tokio::test]
    async fn test_close_fails_later_queries() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;

        assert!(!db.health_check().await);
        let err = db.budgets().count_dirty().await.unwrap_err();
        assert!(matches!(err, DbError::Closed));
    }
}
