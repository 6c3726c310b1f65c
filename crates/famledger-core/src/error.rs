//! # Error Types
//!
//! Errors raised by record rules. They never involve I/O; the storage and
//! sync crates wrap them (`SyncError::Validation`) when a caller tries to
//! store a record that breaks a rule.
//!
//! ```text
//! validate_* helpers ──► ValidationError ──┐
//!                                          ├──► CoreError ──► SyncError::Validation
//! cross-field checks (budget period) ──────┘
//! ```

use thiserror::Error;

/// Record rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Budget period is inverted.
    #[error("Budget period ends ({end}) before it starts ({start})")]
    InvalidPeriod { start: String, end: String },

    /// A single field failed its check.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Single-field validation failures.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Currency codes and colors.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
