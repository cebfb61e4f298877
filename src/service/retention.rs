use crate::db::RecordStore;
use crate::error::StoreError;
use crate::models::RecordKind;
use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

/// 参与清理的记录类别 (按此顺序处理)
pub const RETENTION_KINDS: [RecordKind; 4] = [
    RecordKind::Token,
    RecordKind::Sale,
    RecordKind::Purchase,
    RecordKind::Exchange,
];

/// 单个类别的清理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "deleted", rename_all = "lowercase")]
pub enum KindStatus {
    Deleted(usize),
    /// 缺少索引, 本类别跳过
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub deleted_count: usize,
    pub per_kind_status: IndexMap<RecordKind, KindStatus>,
    pub cutoff: DateTime<Utc>,
}

impl SweepReport {
    pub fn skipped_kinds(&self) -> Vec<RecordKind> {
        self.per_kind_status
            .iter()
            .filter(|(_, s)| **s == KindStatus::Skipped)
            .map(|(k, _)| *k)
            .collect()
    }
}

/// 数据清理: 删除超过保留期限的记录
///
/// 非事务: 中途失败会留下部分删除的状态, 重跑是安全的 (阈值基于时间)。
pub struct RetentionManager {
    store: Arc<dyn RecordStore>,
}

impl RetentionManager {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn sweep(
        &self,
        store_id: &str,
        age_threshold: Duration,
        now: DateTime<Utc>,
    ) -> Result<SweepReport, StoreError> {
        let cutoff = now - age_threshold;
        let mut per_kind_status = IndexMap::with_capacity(RETENTION_KINDS.len());
        let mut deleted_count = 0;

        tracing::info!(store_id = %store_id, cutoff = %cutoff, "开始清理过期记录");

        for kind in RETENTION_KINDS {
            let expired = match self.store.query_by_store_and_age(kind, store_id, cutoff).await {
                Ok(records) => records,
                Err(StoreError::IndexUnavailable { index, .. }) => {
                    tracing::warn!(kind = %kind, index = %index, "缺少索引, 跳过该类别清理");
                    per_kind_status.insert(kind, KindStatus::Skipped);
                    continue;
                }
                Err(e) => {
                    tracing::error!(kind = %kind, error = %e, "查询失败, 清理中止");
                    return Err(e);
                }
            };

            // 同一类别内并发删除
            let deletions = expired.iter().map(|r| self.store.delete_by_id(kind, &r.id));
            try_join_all(deletions).await.map_err(|e| {
                tracing::error!(kind = %kind, error = %e, "删除失败, 清理中止");
                e
            })?;

            deleted_count += expired.len();
            per_kind_status.insert(kind, KindStatus::Deleted(expired.len()));
            tracing::debug!(kind = %kind, deleted = expired.len(), "类别清理完成");
        }

        tracing::info!(
            store_id = %store_id,
            deleted = deleted_count,
            "清理完成: {:?}",
            per_kind_status
        );

        Ok(SweepReport {
            deleted_count,
            per_kind_status,
            cutoff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{
        ExchangeFields, PurchaseFields, RecordPayload, SaleFields, TokenFields, TransactionRecord,
    };
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn record(id: &str, payload: RecordPayload, days_old: Option<i64>) -> TransactionRecord {
        TransactionRecord {
            id: id.to_string(),
            store_id: "s1".to_string(),
            date: String::new(),
            created_at: days_old.map(|d| now() - Duration::days(d)),
            payload,
        }
    }

    async fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let rows = [
            record("t-old", RecordPayload::Token(TokenFields::default()), Some(45)),
            record("t-new", RecordPayload::Token(TokenFields::default()), Some(3)),
            record("s-old", RecordPayload::Sale(SaleFields::default()), Some(31)),
            record("s-edge", RecordPayload::Sale(SaleFields::default()), Some(30)),
            record("p-old", RecordPayload::Purchase(PurchaseFields::default()), Some(90)),
            record("e-legacy", RecordPayload::Exchange(ExchangeFields::default()), None),
        ];
        for r in &rows {
            store.insert(r).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn deletes_only_aged_records_and_is_idempotent() {
        let store = seeded().await;
        let manager = RetentionManager::new(store.clone());

        let report = manager.sweep("s1", Duration::days(30), now()).await.unwrap();
        assert_eq!(report.deleted_count, 3);
        assert_eq!(report.per_kind_status[&RecordKind::Token], KindStatus::Deleted(1));
        assert_eq!(report.per_kind_status[&RecordKind::Sale], KindStatus::Deleted(1));
        assert_eq!(report.per_kind_status[&RecordKind::Exchange], KindStatus::Deleted(0));

        // 恰好等于阈值的记录保留
        let sales = store.query_by_store_unordered(RecordKind::Sale, "s1").await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].id, "s-edge");
        assert_eq!(store.count(RecordKind::Exchange), 1);

        let again = manager.sweep("s1", Duration::days(30), now()).await.unwrap();
        assert_eq!(again.deleted_count, 0);
    }

    #[tokio::test]
    async fn missing_index_skips_kind_without_failing() {
        let store = seeded().await;
        store.drop_index(RecordKind::Sale);
        let manager = RetentionManager::new(store.clone());

        let report = manager.sweep("s1", Duration::days(30), now()).await.unwrap();
        assert_eq!(report.per_kind_status[&RecordKind::Sale], KindStatus::Skipped);
        assert_eq!(report.skipped_kinds(), vec![RecordKind::Sale]);
        assert_eq!(report.deleted_count, 2);
        assert_eq!(store.count(RecordKind::Sale), 2);
    }

    #[tokio::test]
    async fn other_errors_abort_the_sweep() {
        let store = seeded().await;
        store.fail_kind(RecordKind::Sale);
        let manager = RetentionManager::new(store.clone());

        let err = manager.sweep("s1", Duration::days(30), now()).await.unwrap_err();
        assert!(!err.is_index_unavailable());
        // Token 在 Sale 之前处理, 已删除; Purchase 在之后, 未处理
        assert_eq!(store.count(RecordKind::Token), 1);
        assert_eq!(store.count(RecordKind::Purchase), 1);
    }
}
