use super::store::{InboxStore, RecordStore, ReminderStore};
use super::schema::index_name;
use crate::error::StoreError;
use crate::models::{InAppNotification, RecordKind, ReserveLedgerEntry, TransactionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use std::sync::Mutex;

/// 内存存储: 保持写入顺序, 可模拟缺少索引或后端故障
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<RecordKind, Vec<TransactionRecord>>,
    missing_indexes: DashSet<RecordKind>,
    failing_kinds: DashSet<RecordKind>,
    reserves: DashMap<(String, String), ReserveLedgerEntry>,
    next_due: Mutex<Option<DateTime<Utc>>>,
    notifications: Mutex<Vec<InAppNotification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟该类别的复合索引不存在
    pub fn drop_index(&self, kind: RecordKind) {
        self.missing_indexes.insert(kind);
    }

    /// 模拟该类别的任意查询都失败 (非索引原因)
    pub fn fail_kind(&self, kind: RecordKind) {
        self.failing_kinds.insert(kind);
    }

    pub fn restore_kind(&self, kind: RecordKind) {
        self.failing_kinds.remove(&kind);
        self.missing_indexes.remove(&kind);
    }

    pub fn count(&self, kind: RecordKind) -> usize {
        self.collections.get(&kind).map(|c| c.len()).unwrap_or(0)
    }

    pub fn notifications(&self) -> Vec<InAppNotification> {
        self.notifications.lock().map(|n| n.clone()).unwrap_or_default()
    }

    fn check_backend(&self, kind: RecordKind) -> Result<(), StoreError> {
        if self.failing_kinds.contains(&kind) {
            return Err(StoreError::Backend(format!("{} collection unreachable", kind.collection())));
        }
        Ok(())
    }

    fn check_index(&self, kind: RecordKind) -> Result<(), StoreError> {
        if self.missing_indexes.contains(&kind) {
            return Err(StoreError::IndexUnavailable {
                kind,
                index: index_name(kind),
            });
        }
        Ok(())
    }

    fn scan<F>(&self, kind: RecordKind, store_id: &str, pred: F) -> Vec<TransactionRecord>
    where
        F: Fn(&TransactionRecord) -> bool,
    {
        self.collections
            .get(&kind)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.store_id == store_id && pred(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lock_error<T>(_: T) -> StoreError {
        StoreError::Backend("memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn query_by_store_and_age(
        &self,
        kind: RecordKind,
        store_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        self.check_backend(kind)?;
        self.check_index(kind)?;
        Ok(self.scan(kind, store_id, |r| matches!(r.created_at, Some(ts) if ts < cutoff)))
    }

    async fn query_by_store_ordered(
        &self,
        kind: RecordKind,
        store_id: &str,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        self.check_backend(kind)?;
        self.check_index(kind)?;
        let mut records = self.scan(kind, store_id, |_| true);
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn query_by_store_unordered(
        &self,
        kind: RecordKind,
        store_id: &str,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        self.check_backend(kind)?;
        Ok(self.scan(kind, store_id, |_| true))
    }

    async fn delete_by_id(&self, kind: RecordKind, id: &str) -> Result<(), StoreError> {
        self.check_backend(kind)?;
        if let Some(mut records) = self.collections.get_mut(&kind) {
            records.retain(|r| r.id != id);
        }
        Ok(())
    }

    async fn insert(&self, record: &TransactionRecord) -> Result<(), StoreError> {
        let kind = record.kind();
        self.check_backend(kind)?;
        let mut records = self.collections.entry(kind).or_default();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    async fn get_reserve(
        &self,
        store_id: &str,
        reserve_type: &str,
    ) -> Result<Option<ReserveLedgerEntry>, StoreError> {
        let key = (store_id.to_string(), reserve_type.to_string());
        Ok(self.reserves.get(&key).map(|e| e.clone()))
    }

    async fn put_reserve(&self, entry: &ReserveLedgerEntry) -> Result<(), StoreError> {
        let key = (entry.store_id.clone(), entry.reserve_type.clone());
        self.reserves.insert(key, entry.clone());
        Ok(())
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn load_next_due(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let guard = self.next_due.lock().map_err(Self::lock_error)?;
        Ok(*guard)
    }

    async fn save_next_due(&self, next_due: DateTime<Utc>) -> Result<(), StoreError> {
        let mut guard = self.next_due.lock().map_err(Self::lock_error)?;
        *guard = Some(next_due);
        Ok(())
    }
}

#[async_trait]
impl InboxStore for MemoryStore {
    async fn insert_notification(&self, notification: &InAppNotification) -> Result<i64, StoreError> {
        let mut guard = self.notifications.lock().map_err(Self::lock_error)?;
        let id = guard.len() as i64 + 1;
        guard.push(InAppNotification {
            id: Some(id),
            ..notification.clone()
        });
        Ok(id)
    }

    async fn count_unseen(&self, store_id: &str) -> Result<i64, StoreError> {
        let guard = self.notifications.lock().map_err(Self::lock_error)?;
        Ok(guard.iter().filter(|n| n.store_id == store_id && !n.seen).count() as i64)
    }

    async fn mark_all_seen(&self, store_id: &str) -> Result<u64, StoreError> {
        let mut guard = self.notifications.lock().map_err(Self::lock_error)?;
        let mut changed = 0;
        for n in guard.iter_mut().filter(|n| n.store_id == store_id && !n.seen) {
            n.seen = true;
            changed += 1;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordPayload, SaleFields};
    use chrono::TimeZone;

    fn sale(id: &str, store: &str, created_day: Option<u32>) -> TransactionRecord {
        TransactionRecord {
            id: id.to_string(),
            store_id: store.to_string(),
            date: String::new(),
            created_at: created_day.map(|d| Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()),
            payload: RecordPayload::Sale(SaleFields::default()),
        }
    }

    #[tokio::test]
    async fn scopes_by_store_and_orders_newest_first() {
        let store = MemoryStore::new();
        store.insert(&sale("a", "s1", Some(1))).await.unwrap();
        store.insert(&sale("b", "s1", None)).await.unwrap();
        store.insert(&sale("c", "s1", Some(5))).await.unwrap();
        store.insert(&sale("d", "s2", Some(9))).await.unwrap();

        let ordered = store.query_by_store_ordered(RecordKind::Sale, "s1").await.unwrap();
        let ids: Vec<_> = ordered.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn simulated_missing_index_only_affects_indexed_queries() {
        let store = MemoryStore::new();
        store.insert(&sale("a", "s1", Some(1))).await.unwrap();
        store.drop_index(RecordKind::Sale);

        let err = store.query_by_store_ordered(RecordKind::Sale, "s1").await.unwrap_err();
        assert!(err.is_index_unavailable());
        assert_eq!(store.query_by_store_unordered(RecordKind::Sale, "s1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn insert_replaces_same_id() {
        let store = MemoryStore::new();
        store.insert(&sale("a", "s1", Some(1))).await.unwrap();
        store.insert(&sale("a", "s1", Some(2))).await.unwrap();
        assert_eq!(store.count(RecordKind::Sale), 1);
    }
}
