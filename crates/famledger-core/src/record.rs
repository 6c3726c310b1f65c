//! # Sync Record Contract
//!
//! Every entity that the sync engine moves between the local store and the
//! remote ledger service implements [`SyncRecord`].
//!
//! ## Dirty Marker Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     needs_sync / is_online                              │
//! │                                                                         │
//! │   new_local()                 mark_dirty(now)                           │
//! │       │                            ▲                                    │
//! │       ▼                            │ local edit                         │
//! │  ┌──────────────────┐  push   ┌────┴─────────────┐                      │
//! │  │ needs_sync=true  │ ──────► │ needs_sync=false │ ◄── refresh (server  │
//! │  │ is_online=false  │ confirm │ is_online=true   │     copies, clean)   │
//! │  └──────────────────┘         └──────────────────┘                      │
//! │       │  push failed                                                    │
//! │       └──► stays dirty, retried next cycle                             │
//! │                                                                         │
//! │  is_online=false → push uses CREATE                                    │
//! │  is_online=true  → push uses UPDATE                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The two bookkeeping flags never leave the device: record JSON skips them
//! and the service request bodies do not carry them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::CoreResult;

// =============================================================================
// Entity Kind
// =============================================================================

/// The record types the sync engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    LedgerEntry,
    Budget,
    Category,
}

impl EntityKind {
    /// All kinds, in the order workers are registered by default.
    pub const ALL: [EntityKind; 3] = [
        EntityKind::LedgerEntry,
        EntityKind::Budget,
        EntityKind::Category,
    ];

    /// Stable lowercase name used in logs and reports.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityKind::LedgerEntry => "ledger_entry",
            EntityKind::Budget => "budget",
            EntityKind::Category => "category",
        }
    }

    /// Whether a force sync pulls the full listing for this kind.
    ///
    /// Ledger entries are push-only: the server holds far more history than
    /// a device keeps, so they are never refreshed wholesale.
    pub const fn is_refreshable(&self) -> bool {
        matches!(self, EntityKind::Budget | EntityKind::Category)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// SyncRecord
// =============================================================================

/// A family-scoped record carrying a dirty marker.
///
/// ## Contract
/// - `needs_sync() == true` iff the record was created or edited locally
///   since its last confirmed push.
/// - `into_synced()` is the only way the engine produces a clean copy.
/// - `updated_at()` changes on every local edit; the store compares it to
///   detect an edit that raced a push.
pub trait SyncRecord: Clone + Send + Sync + 'static {
    /// Which entity type this is.
    const KIND: EntityKind;

    fn id(&self) -> &str;

    fn family_id(&self) -> &str;

    fn needs_sync(&self) -> bool;

    /// Whether the server has acknowledged this record at least once.
    fn is_online(&self) -> bool;

    fn updated_at(&self) -> DateTime<Utc>;

    /// Flags the record as locally modified and bumps `updated_at`.
    fn mark_dirty(&mut self, now: DateTime<Utc>);

    /// Returns the confirmed copy: `needs_sync = false`, `is_online = true`.
    fn into_synced(self) -> Self;

    /// Returns this record under a server-assigned id, flagged `is_online`.
    ///
    /// The dirty marker is left as it is.
    fn into_rekeyed(self, id: &str) -> Self;

    /// Checks the record's fields before it is stored or pushed.
    fn validate(&self) -> CoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refreshable_kinds() {
        let refreshable: Vec<_> = EntityKind::ALL
            .iter()
            .filter(|k| k.is_refreshable())
            .collect();
        assert_eq!(refreshable, vec![&EntityKind::Budget, &EntityKind::Category]);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(EntityKind::LedgerEntry.to_string(), "ledger_entry");
        assert_eq!(
            serde_json::to_string(&EntityKind::Category).unwrap(),
            "\"category\""
        );
    }
}
