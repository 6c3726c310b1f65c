//! # Push Claims
//!
//! A record may be pushed from two places: the offline write path right
//! after a user edit, and a sync worker draining the dirty set. Both take a
//! claim on `(kind, id)` before calling the server; whoever finds the claim
//! taken leaves the record dirty for the next cycle.
//!
//! ```text
//! offline.create(r) ──► store.upsert(r, dirty) ──► claim(r) ─┬─ ok  → remote.create
//!                                                            └─ taken → stays dirty
//! worker push       ──► store.list_dirty()    ──► claim(r) ─┬─ ok  → remote.create
//!                                                            └─ taken → deferred
//! ```
//!
//! One [`PushClaims`] must be shared by every worker and offline repository
//! that writes the same store.

use famledger_core::EntityKind;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

type ClaimKey = (EntityKind, String);

/// Set of records with a push in flight. Clones share the set.
#[derive(Debug, Clone, Default)]
pub struct PushClaims {
    held: Arc<Mutex<HashSet<ClaimKey>>>,
}

impl PushClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `id` of `kind` for one push.
    ///
    /// Returns `None` when another push of the same record is in flight.
    /// The claim is released when the returned guard drops.
    pub fn try_claim(&self, kind: EntityKind, id: &str) -> Option<PushClaim> {
        let key = (kind, id.to_string());
        if !self.lock().insert(key.clone()) {
            return None;
        }
        Some(PushClaim {
            held: Arc::clone(&self.held),
            key,
        })
    }

    pub fn is_claimed(&self, kind: EntityKind, id: &str) -> bool {
        self.lock().contains(&(kind, id.to_string()))
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<ClaimKey>> {
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A held claim; dropping it releases the record.
#[derive(Debug)]
pub struct PushClaim {
    held: Arc<Mutex<HashSet<ClaimKey>>>,
    key: ClaimKey,
}

impl Drop for PushClaim {
    fn drop(&mut self) {
        let mut held = self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        held.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_waits_for_release() {
        let claims = PushClaims::new();

        let first = claims.try_claim(EntityKind::Category, "c-1");
        assert!(first.is_some());
        assert!(claims.try_claim(EntityKind::Category, "c-1").is_none());
        assert!(claims.is_claimed(EntityKind::Category, "c-1"));

        drop(first);
        assert!(!claims.is_claimed(EntityKind::Category, "c-1"));
        assert!(claims.try_claim(EntityKind::Category, "c-1").is_some());
    }

    #[test]
    fn test_claims_are_per_kind_and_shared_by_clones() {
        let claims = PushClaims::new();
        let shared = claims.clone();

        let _entry = claims.try_claim(EntityKind::LedgerEntry, "x").unwrap();
        assert!(shared.try_claim(EntityKind::LedgerEntry, "x").is_none());
        assert!(shared.try_claim(EntityKind::Budget, "x").is_some());
    }
}
