//! 存储边界: 报表引擎只依赖这些 trait, 不关心具体的文档存储技术

use crate::error::StoreError;
use crate::models::{InAppNotification, RecordKind, ReserveLedgerEntry, TransactionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// 交易记录存储 (按门店划分的集合服务)
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 查询门店中 createdAt 早于 cutoff 的记录 (需要 store+createdAt 复合索引)
    async fn query_by_store_and_age(
        &self,
        kind: RecordKind,
        store_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    /// 按 createdAt 降序查询 (需要复合索引, 否则返回 IndexUnavailable)
    async fn query_by_store_ordered(
        &self,
        kind: RecordKind,
        store_id: &str,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    /// 不排序查询 (无需索引)
    async fn query_by_store_unordered(
        &self,
        kind: RecordKind,
        store_id: &str,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    /// 删除单条记录, 不存在时视为成功
    async fn delete_by_id(&self, kind: RecordKind, id: &str) -> Result<(), StoreError>;

    /// 写入记录, 集合由记录类别决定
    async fn insert(&self, record: &TransactionRecord) -> Result<(), StoreError>;

    async fn get_reserve(
        &self,
        store_id: &str,
        reserve_type: &str,
    ) -> Result<Option<ReserveLedgerEntry>, StoreError>;

    /// 整行替换 (每个门店 + 类型只有一行)
    async fn put_reserve(&self, entry: &ReserveLedgerEntry) -> Result<(), StoreError>;
}

/// 提醒状态 (进程级单值)
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn load_next_due(&self) -> Result<Option<DateTime<Utc>>, StoreError>;
    async fn save_next_due(&self, next_due: DateTime<Utc>) -> Result<(), StoreError>;
}

/// 站内通知存储
#[async_trait]
pub trait InboxStore: Send + Sync {
    /// 写入并返回存储分配的 id
    async fn insert_notification(&self, notification: &InAppNotification) -> Result<i64, StoreError>;
    async fn count_unseen(&self, store_id: &str) -> Result<i64, StoreError>;
    async fn mark_all_seen(&self, store_id: &str) -> Result<u64, StoreError>;
}
