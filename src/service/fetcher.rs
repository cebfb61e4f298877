use crate::db::RecordStore;
use crate::error::StoreError;
use crate::models::{RecordKind, TransactionRecord};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// 记录获取: 优先走索引排序查询, 缺少索引时退化为不排序查询 + 内存排序
pub struct RecordFetcher {
    store: Arc<dyn RecordStore>,
    concurrency: usize,
}

impl RecordFetcher {
    pub fn new(store: Arc<dyn RecordStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// 获取单个类别, 按 createdAt 降序 (缺失 createdAt 的排在最后)
    pub async fn fetch(
        &self,
        kind: RecordKind,
        store_id: &str,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        match self.store.query_by_store_ordered(kind, store_id).await {
            Ok(records) => Ok(records),
            Err(StoreError::IndexUnavailable { index, .. }) => {
                tracing::warn!(
                    kind = %kind,
                    index = %index,
                    "缺少复合索引, 改为无序查询后内存排序"
                );
                let mut records = self.store.query_by_store_unordered(kind, store_id).await?;
                sort_newest_first(&mut records);
                Ok(records)
            }
            Err(e) => Err(e),
        }
    }

    /// 并发获取多个类别, 每个类别独立失败, 结果顺序与输入一致
    pub async fn fetch_many(
        &self,
        kinds: &[RecordKind],
        store_id: &str,
    ) -> Vec<(RecordKind, Result<Vec<TransactionRecord>, StoreError>)> {
        stream::iter(kinds.iter().copied())
            .map(|kind| async move { (kind, self.fetch(kind, store_id).await) })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// 稳定排序, createdAt 缺失视为纪元零点
pub fn sort_newest_first(records: &mut [TransactionRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{RecordPayload, TokenFields};
    use chrono::{TimeZone, Utc};

    fn token(id: &str, day: Option<u32>) -> TransactionRecord {
        TransactionRecord {
            id: id.to_string(),
            store_id: "s1".to_string(),
            date: String::new(),
            created_at: day.map(|d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()),
            payload: RecordPayload::Token(TokenFields::default()),
        }
    }

    async fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (id, day) in [("old", Some(2)), ("legacy", None), ("new", Some(20)), ("mid", Some(10))] {
            store.insert(&token(id, day)).await.unwrap();
        }
        store
    }

    fn ids(records: &[TransactionRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn fallback_sorts_in_memory_like_indexed_path() {
        let store = seeded().await;
        let fetcher = RecordFetcher::new(store.clone(), 2);
        let indexed = fetcher.fetch(RecordKind::Token, "s1").await.unwrap();

        store.drop_index(RecordKind::Token);
        let fallback = fetcher.fetch(RecordKind::Token, "s1").await.unwrap();

        assert_eq!(ids(&fallback), vec!["new", "mid", "old", "legacy"]);
        assert_eq!(ids(&indexed), ids(&fallback));
    }

    #[tokio::test]
    async fn other_errors_propagate() {
        let store = seeded().await;
        store.fail_kind(RecordKind::Token);
        let fetcher = RecordFetcher::new(store, 2);
        let err = fetcher.fetch(RecordKind::Token, "s1").await.unwrap_err();
        assert!(!err.is_index_unavailable());
    }

    #[tokio::test]
    async fn one_kind_failing_does_not_block_others() {
        let store = seeded().await;
        store.drop_index(RecordKind::Token);
        store.fail_kind(RecordKind::Sale);
        let fetcher = RecordFetcher::new(store, 2);

        let results = fetcher
            .fetch_many(&[RecordKind::Sale, RecordKind::Token, RecordKind::Exchange], "s1")
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, RecordKind::Sale);
        assert!(results[0].1.is_err());
        assert_eq!(results[1].1.as_ref().unwrap().len(), 4);
        assert!(results[2].1.as_ref().unwrap().is_empty());
    }
}
