//! # Database Error Types
//!
//! ```text
//! sqlx::Error ──► DbError ──► SyncError (famledger-sync)
//!                    │
//!                    ├─ Constraint      row rejected by the schema; retrying won't help
//!                    ├─ Busy / Closed   pool or file contention, or shutdown
//!                    └─ Open / Migration startup failures
//! ```

use thiserror::Error;

/// Local store errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// The database file could not be opened or created.
    #[error("Cannot open database: {0}")]
    Open(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// A CHECK, NOT NULL or UNIQUE constraint rejected a row.
    ///
    /// The repositories upsert by id, so this means the record itself is
    /// malformed (negative amount, threshold above 100, ...).
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// No connection became available in time, or SQLite reported the file locked.
    #[error("Database busy: {0}")]
    Busy(String),

    /// The pool was closed.
    #[error("Database is closed")]
    Closed,

    #[error("Query failed: {0}")]
    Query(String),
}

impl DbError {
    /// Whether the same operation could succeed if tried again later.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Busy(_))
    }

    /// Whether the row content, not the database, is at fault.
    pub fn is_constraint(&self) -> bool {
        matches!(self, DbError::Constraint(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();
                if msg.contains("constraint failed") {
                    DbError::Constraint(msg)
                } else if msg.contains("database is locked") || msg.contains("database is busy") {
                    DbError::Busy(msg)
                } else {
                    DbError::Query(msg)
                }
            }
            sqlx::Error::PoolTimedOut => DbError::Busy("timed out waiting for a connection".into()),
            sqlx::Error::PoolClosed => DbError::Closed,
            other => DbError::Query(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
