//! # Sync Reports
//!
//! What a worker or a whole cycle actually did.
//!
//! ## Report Nesting
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CycleReport (one per sync_all_pending_data / force_sync / tick)        │
//! │                                                                         │
//! │   trigger, started_at, finished_at, skipped_offline                     │
//! │                                                                         │
//! │   pushes:    [PushReport]     one per worker that finished its push     │
//! │                ├─ attempted / confirmed / superseded / deferred         │
//! │                └─ failed: [RecordFailure { id, error }]                 │
//! │                                                                         │
//! │   refreshes: [RefreshReport]  one per refreshable kind (force only)     │
//! │                                                                         │
//! │   failures:  [WorkerFailure]  whole-worker failures (kind + phase)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Record failures make a cycle `Partial`; worker failures make it `Failed`.

use chrono::{DateTime, Utc};
use famledger_core::EntityKind;
use std::fmt;

use crate::config::RefreshPolicy;
use crate::error::SyncError;

// =============================================================================
// Push
// =============================================================================

/// One record the remote service did not confirm.
#[derive(Debug, Clone)]
pub struct RecordFailure {
    pub id: String,
    pub error: SyncError,
}

/// Outcome of pushing one kind's dirty set.
#[derive(Debug, Clone)]
pub struct PushReport {
    pub kind: EntityKind,

    /// Dirty records read at the start of the push.
    pub attempted: usize,

    /// Records the server confirmed and the store wrote back clean.
    pub confirmed: usize,

    /// Records the server confirmed but which were edited or deleted
    /// locally while the request was in flight. They stay dirty (or gone).
    pub superseded: usize,

    /// Records skipped because the offline write path was already pushing
    /// them. They stay dirty until that push confirms them.
    pub deferred: usize,

    /// Records whose push failed; their dirty marker is untouched.
    pub failed: Vec<RecordFailure>,
}

impl PushReport {
    pub fn empty(kind: EntityKind) -> Self {
        PushReport {
            kind,
            attempted: 0,
            confirmed: 0,
            superseded: 0,
            deferred: 0,
            failed: Vec::new(),
        }
    }

    /// At least one record failed.
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Every attempted record ended confirmed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.superseded == 0 && self.deferred == 0
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.id.as_str()).collect()
    }
}

// =============================================================================
// Refresh
// =============================================================================

/// Outcome of pulling one kind's listing into the store.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub kind: EntityKind,

    /// Records in the server listing.
    pub fetched: usize,

    /// Records written to the store.
    pub stored: usize,

    /// Listed records that belonged to another family and were dropped.
    pub skipped_foreign: usize,

    /// Listed records kept out because a local edit has not been pushed yet
    /// (merge policy only).
    pub skipped_dirty: usize,

    pub policy: RefreshPolicy,
}

// =============================================================================
// Worker Failure
// =============================================================================

/// Which half of a worker's job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Push,
    Refresh,
}

impl fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerPhase::Push => write!(f, "push"),
            WorkerPhase::Refresh => write!(f, "refresh"),
        }
    }
}

/// A worker that could not do its job at all (e.g. the store or the
/// listing endpoint was unreachable).
#[derive(Debug, Clone)]
pub struct WorkerFailure {
    pub kind: EntityKind,
    pub phase: WorkerPhase,
    pub error: SyncError,
}

// =============================================================================
// Cycle
// =============================================================================

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncTrigger {
    #[default]
    Periodic,
    Manual,
    Force,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncTrigger::Periodic => write!(f, "periodic"),
            SyncTrigger::Manual => write!(f, "manual"),
            SyncTrigger::Force => write!(f, "force"),
        }
    }
}

/// Summary classification of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Disconnected: nothing was attempted.
    Skipped,
    Success,
    /// Some records failed; every worker completed.
    Partial,
    /// At least one worker failed as a whole.
    Failed,
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Skipped => write!(f, "skipped"),
            CycleOutcome::Success => write!(f, "success"),
            CycleOutcome::Partial => write!(f, "partial"),
            CycleOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Everything one cycle did.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub trigger: SyncTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub skipped_offline: bool,
    pub pushes: Vec<PushReport>,
    pub refreshes: Vec<RefreshReport>,
    pub failures: Vec<WorkerFailure>,
}

impl CycleReport {
    pub(crate) fn begin(trigger: SyncTrigger) -> Self {
        let now = Utc::now();
        CycleReport {
            trigger,
            started_at: now,
            finished_at: now,
            ..Default::default()
        }
    }

    /// Zero-work report for a cycle attempted while disconnected.
    pub(crate) fn offline(trigger: SyncTrigger) -> Self {
        CycleReport {
            skipped_offline: true,
            ..Self::begin(trigger)
        }
    }

    pub fn outcome(&self) -> CycleOutcome {
        if self.skipped_offline {
            CycleOutcome::Skipped
        } else if !self.failures.is_empty() {
            CycleOutcome::Failed
        } else if self.pushes.iter().any(PushReport::is_partial) {
            CycleOutcome::Partial
        } else {
            CycleOutcome::Success
        }
    }

    pub fn push_for(&self, kind: EntityKind) -> Option<&PushReport> {
        self.pushes.iter().find(|p| p.kind == kind)
    }

    pub fn refresh_for(&self, kind: EntityKind) -> Option<&RefreshReport> {
        self.refreshes.iter().find(|r| r.kind == kind)
    }

    pub fn total_attempted(&self) -> usize {
        self.pushes.iter().map(|p| p.attempted).sum()
    }

    pub fn total_confirmed(&self) -> usize {
        self.pushes.iter().map(|p| p.confirmed).sum()
    }

    pub fn total_failed_records(&self) -> usize {
        self.pushes.iter().map(|p| p.failed.len()).sum()
    }

    pub fn total_refreshed(&self) -> usize {
        self.refreshes.iter().map(|r| r.stored).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(kind: EntityKind, confirmed: usize, failed: &[&str]) -> PushReport {
        PushReport {
            kind,
            attempted: confirmed + failed.len(),
            confirmed,
            superseded: 0,
            deferred: 0,
            failed: failed
                .iter()
                .map(|id| RecordFailure {
                    id: id.to_string(),
                    error: SyncError::Http {
                        status: 422,
                        message: "rejected".into(),
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn test_outcome_classification() {
        let mut report = CycleReport::begin(SyncTrigger::Manual);
        assert_eq!(report.outcome(), CycleOutcome::Success);

        report.pushes.push(push(EntityKind::LedgerEntry, 2, &["b"]));
        assert_eq!(report.outcome(), CycleOutcome::Partial);
        assert_eq!(report.total_attempted(), 3);
        assert_eq!(report.total_confirmed(), 2);
        assert_eq!(report.total_failed_records(), 1);

        report.failures.push(WorkerFailure {
            kind: EntityKind::Budget,
            phase: WorkerPhase::Push,
            error: SyncError::DatabaseError("locked".into()),
        });
        assert_eq!(report.outcome(), CycleOutcome::Failed);
    }

    #[test]
    fn test_offline_report_is_zero_work() {
        let report = CycleReport::offline(SyncTrigger::Periodic);
        assert_eq!(report.outcome(), CycleOutcome::Skipped);
        assert_eq!(report.total_attempted(), 0);
        assert!(report.pushes.is_empty());
    }

    #[test]
    fn test_push_report_lookup() {
        let mut report = CycleReport::begin(SyncTrigger::Force);
        report.pushes.push(push(EntityKind::Category, 1, &[]));
        let category = report.push_for(EntityKind::Category).unwrap();
        assert!(category.is_clean());
        assert!(report.push_for(EntityKind::Budget).is_none());
    }

    #[test]
    fn test_failed_ids() {
        let report = push(EntityKind::LedgerEntry, 1, &["x", "y"]);
        assert_eq!(report.failed_ids(), vec!["x", "y"]);
    }
}
