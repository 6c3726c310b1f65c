//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  SerializationFailed    │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  DeserializationFailed  │ │
//! │  │  ConfigLoad/Save│  │  Unauthorized   │  │                         │ │
//! │  │                 │  │  Http{status}   │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Storage      │  │     Cycle       │  │      Lifecycle          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  DatabaseError  │  │  CycleFailed    │  │  ShuttingDown           │ │
//! │  │  Validation     │  │  {failures,     │  │  Internal               │ │
//! │  │                 │  │   report}       │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Connectivity loss has no variant: a sync attempted while offline
//! is a zero-work success, not an error.

use thiserror::Error;

use crate::report::{CycleReport, WorkerFailure};

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible sync failures.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Invalid remote service URL.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Could not reach the remote service.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request exceeded its timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The service rejected our credentials (401/403).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-2xx response.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Failed to serialize a request body.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Failed to decode a response body.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Local store operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A record failed domain validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    // =========================================================================
    // Cycle Errors
    // =========================================================================
    /// At least one worker failed as a whole during a sync cycle.
    ///
    /// Carries the full report: other workers' effects remain committed.
    #[error("Sync cycle failed for {}", describe_failures(.failures))]
    CycleFailed {
        failures: Vec<WorkerFailure>,
        report: CycleReport,
    },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal sync agent error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Agent is shutting down.
    #[error("Sync agent is shutting down")]
    ShuttingDown,
}

fn describe_failures(failures: &[WorkerFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} {} ({})", f.kind, f.phase, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<famledger_db::DbError> for SyncError {
    fn from(err: famledger_db::DbError) -> Self {
        if err.is_constraint() {
            SyncError::Validation(err.to_string())
        } else {
            SyncError::DatabaseError(err.to_string())
        }
    }
}

impl From<famledger_core::CoreError> for SyncError {
    fn from(err: famledger_core::CoreError) -> Self {
        SyncError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            SyncError::DeserializationFailed(err.to_string())
        } else {
            SyncError::SerializationFailed(err.to_string())
        }
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not report which timeout fired
            SyncError::Timeout(0)
        } else if err.is_decode() {
            SyncError::DeserializationFailed(err.to_string())
        } else if let Some(status) = err.status() {
            SyncError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            SyncError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if retrying the same operation later may succeed.
    ///
    /// ## Retryable Errors
    /// - Connection failures (network issues)
    /// - Timeouts
    /// - 5xx and 429 responses
    /// - Local store hiccups
    ///
    /// The sync engine never retries on its own: a failed record keeps its
    /// dirty marker and goes out again next cycle. This classification is
    /// for callers and the event emitter.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::ConnectionFailed(_) | SyncError::Timeout(_) | SyncError::DatabaseError(_) => {
                true
            }
            SyncError::Http { status, .. } => *status >= 500 || *status == 429,
            SyncError::CycleFailed { failures, .. } => {
                failures.iter().all(|f| f.error.is_retryable())
            }
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }

    /// Returns true if this error came back from the remote service.
    pub fn is_remote_rejection(&self) -> bool {
        matches!(self, SyncError::Unauthorized(_) | SyncError::Http { .. })
    }
}
