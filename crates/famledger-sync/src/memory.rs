//! In-memory [`LocalStore`], keyed by record id.
//!
//! Follows the same confirmation rules as the SQLite repositories so the
//! engine behaves identically on top of either.

use async_trait::async_trait;
use famledger_core::SyncRecord;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::error::SyncResult;
use crate::store::LocalStore;

/// A `LocalStore` that lives in process memory.
#[derive(Debug)]
pub struct MemoryStore<T> {
    records: Mutex<BTreeMap<String, T>>,
}

impl<T: SyncRecord> MemoryStore<T> {
    pub fn new() -> Self {
        MemoryStore {
            records: Mutex::new(BTreeMap::new()),
        }
    }

    /// Creates a store pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = T>) -> Self {
        let map = records
            .into_iter()
            .map(|r| (r.id().to_string(), r))
            .collect();
        MemoryStore {
            records: Mutex::new(map),
        }
    }

    /// Snapshot of every record, ordered by id.
    pub async fn all(&self) -> Vec<T> {
        self.records.lock().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

impl<T: SyncRecord> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: SyncRecord> LocalStore<T> for MemoryStore<T> {
    async fn list_dirty(&self) -> SyncResult<Vec<T>> {
        let records = self.records.lock().await;
        let mut dirty: Vec<T> = records.values().filter(|r| r.needs_sync()).cloned().collect();
        dirty.sort_by_key(|r| r.updated_at());
        Ok(dirty)
    }

    async fn count_dirty(&self) -> SyncResult<i64> {
        let records = self.records.lock().await;
        Ok(records.values().filter(|r| r.needs_sync()).count() as i64)
    }

    async fn get(&self, id: &str) -> SyncResult<Option<T>> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn upsert(&self, record: &T) -> SyncResult<()> {
        self.records
            .lock()
            .await
            .insert(record.id().to_string(), record.clone());
        Ok(())
    }

    async fn upsert_many(&self, records: &[T]) -> SyncResult<()> {
        let mut map = self.records.lock().await;
        for record in records {
            map.insert(record.id().to_string(), record.clone());
        }
        Ok(())
    }

    async fn confirm_push(&self, pushed: &T, confirmed: &T) -> SyncResult<bool> {
        let mut map = self.records.lock().await;

        let Some(current) = map.get(pushed.id()).cloned() else {
            return Ok(false);
        };

        let rekeyed = confirmed.id() != pushed.id();
        if rekeyed {
            map.remove(pushed.id());
        }

        if current.updated_at() != pushed.updated_at() {
            let current = current.into_rekeyed(confirmed.id());
            map.insert(current.id().to_string(), current);
            return Ok(false);
        }

        let clean = confirmed.clone().into_synced();
        map.insert(clean.id().to_string(), clean);
        Ok(true)
    }

    async fn delete(&self, id: &str) -> SyncResult<bool> {
        Ok(self.records.lock().await.remove(id).is_some())
    }

    async fn delete_all_for_family(&self, family_id: &str) -> SyncResult<u64> {
        let mut map = self.records.lock().await;
        let before = map.len();
        map.retain(|_, r| r.family_id() != family_id);
        Ok((before - map.len()) as u64)
    }

    async fn replace_family(&self, family_id: &str, records: &[T]) -> SyncResult<()> {
        let mut map = self.records.lock().await;
        map.retain(|_, r| r.family_id() != family_id);
        for record in records {
            map.insert(record.id().to_string(), record.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use famledger_core::{Category, TransactionType};

    fn category(family: &str, name: &str) -> Category {
        Category::new_local(family, name, "tag", "#336699", TransactionType::Expense)
    }

    #[tokio::test]
    async fn test_confirm_push_clears_marker() {
        let local = category("fam-1", "Rent");
        let store = MemoryStore::with_records([local.clone()]);

        assert!(store.confirm_push(&local, &local).await.unwrap());

        let stored = store.get(&local.id).await.unwrap().unwrap();
        assert!(!stored.needs_sync);
        assert!(stored.is_online);
    }

    #[tokio::test]
    async fn test_confirm_push_after_local_delete_writes_nothing() {
        let local = category("fam-1", "Rent");
        let store = MemoryStore::new();

        assert!(!store.confirm_push(&local, &local).await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_confirm_push_keeps_concurrent_edit_dirty() {
        let pushed = category("fam-1", "Rent");
        let mut edited = pushed.clone();
        edited.name = "Rent & Utilities".into();
        edited.mark_dirty(pushed.updated_at + Duration::seconds(1));

        let store = MemoryStore::with_records([edited]);
        let mut server = pushed.clone();
        server.id = "srv-9".into();

        assert!(!store.confirm_push(&pushed, &server).await.unwrap());

        assert!(store.get(&pushed.id).await.unwrap().is_none());
        let kept = store.get("srv-9").await.unwrap().unwrap();
        assert!(kept.needs_sync);
        assert!(kept.is_online);
        assert_eq!(kept.name, "Rent & Utilities");
    }

    #[tokio::test]
    async fn test_replace_family_leaves_other_families() {
        let store = MemoryStore::with_records([
            category("fam-1", "Old"),
            category("fam-2", "Untouched"),
        ]);

        let fresh = category("fam-1", "New").into_synced();
        store.replace_family("fam-1", &[fresh.clone()]).await.unwrap();

        let all = store.all().await;
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|c| c.id == fresh.id));
        assert!(all.iter().any(|c| c.family_id == "fam-2"));
        assert_eq!(store.count_dirty().await.unwrap(), 1);
    }
}
