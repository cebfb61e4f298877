use super::schema::index_name;
use super::store::{InboxStore, RecordStore, ReminderStore};
use crate::error::StoreError;
use crate::models::{InAppNotification, RecordKind, ReserveLedgerEntry, TransactionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

const NEXT_DUE_KEY: &str = "reminder.next_due_at";

/// 文档行 (公共列 + JSONB 主体)
#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    store_id: String,
    created_at: Option<DateTime<Utc>>,
    body: Json<Value>,
}

impl DocumentRow {
    /// 以列值为准覆盖 body 中的公共字段后反序列化
    fn into_record(self) -> Result<TransactionRecord, StoreError> {
        let mut body = self.body.0;
        if let Some(obj) = body.as_object_mut() {
            obj.insert("id".to_string(), Value::String(self.id));
            obj.insert("storeId".to_string(), Value::String(self.store_id));
            obj.insert("createdAt".to_string(), serde_json::to_value(self.created_at)?);
        }
        Ok(serde_json::from_value(body)?)
    }
}

fn decode_rows(rows: Vec<DocumentRow>) -> Result<Vec<TransactionRecord>, StoreError> {
    rows.into_iter().map(DocumentRow::into_record).collect()
}

/// Postgres 实现: 每个记录类别一张表
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 排序/清理查询前确认复合索引存在
    async fn require_index(&self, kind: RecordKind) -> Result<(), StoreError> {
        let index = index_name(kind);
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM pg_indexes
                WHERE tablename = $1 AND indexname = $2
            )
            "#,
        )
        .bind(kind.collection())
        .bind(&index)
        .fetch_one(&self.pool)
        .await?;

        if !exists {
            return Err(StoreError::IndexUnavailable { kind, index });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn query_by_store_and_age(
        &self,
        kind: RecordKind,
        store_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        self.require_index(kind).await?;

        let sql = format!(
            r#"
            SELECT id, store_id, created_at, body
            FROM {table}
            WHERE store_id = $1
              AND created_at < $2
            "#,
            table = kind.collection()
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(store_id)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;
        decode_rows(rows)
    }

    async fn query_by_store_ordered(
        &self,
        kind: RecordKind,
        store_id: &str,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        self.require_index(kind).await?;

        let sql = format!(
            r#"
            SELECT id, store_id, created_at, body
            FROM {table}
            WHERE store_id = $1
            ORDER BY created_at DESC NULLS LAST
            "#,
            table = kind.collection()
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(store_id)
            .fetch_all(&self.pool)
            .await?;
        decode_rows(rows)
    }

    async fn query_by_store_unordered(
        &self,
        kind: RecordKind,
        store_id: &str,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let sql = format!(
            r#"
            SELECT id, store_id, created_at, body
            FROM {table}
            WHERE store_id = $1
            "#,
            table = kind.collection()
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(store_id)
            .fetch_all(&self.pool)
            .await?;
        decode_rows(rows)
    }

    async fn delete_by_id(&self, kind: RecordKind, id: &str) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {table} WHERE id = $1", table = kind.collection());
        sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert(&self, record: &TransactionRecord) -> Result<(), StoreError> {
        let body = serde_json::to_value(record)?;
        let sql = format!(
            r#"
            INSERT INTO {table} (id, store_id, created_at, body)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
               SET store_id = EXCLUDED.store_id,
                   created_at = EXCLUDED.created_at,
                   body = EXCLUDED.body
            "#,
            table = record.kind().collection()
        );
        sqlx::query(&sql)
            .bind(&record.id)
            .bind(&record.store_id)
            .bind(record.created_at)
            .bind(Json(body))
            .execute(&self.pool)
            .await?;

        tracing::debug!(kind = %record.kind(), id = %record.id, "Record stored");
        Ok(())
    }

    async fn get_reserve(
        &self,
        store_id: &str,
        reserve_type: &str,
    ) -> Result<Option<ReserveLedgerEntry>, StoreError> {
        let entry = sqlx::query_as::<_, ReserveLedgerEntry>(
            r#"
            SELECT store_id, reserve_type, available_in_grams, added_in_grams,
                   total_in_grams, updated_at
            FROM reserve_ledger
            WHERE store_id = $1 AND reserve_type = $2
            "#,
        )
        .bind(store_id)
        .bind(reserve_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn put_reserve(&self, entry: &ReserveLedgerEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO reserve_ledger (
                store_id, reserve_type, available_in_grams, added_in_grams,
                total_in_grams, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (store_id, reserve_type) DO UPDATE
               SET available_in_grams = EXCLUDED.available_in_grams,
                   added_in_grams = EXCLUDED.added_in_grams,
                   total_in_grams = EXCLUDED.total_in_grams,
                   updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&entry.store_id)
        .bind(&entry.reserve_type)
        .bind(&entry.available_in_grams)
        .bind(&entry.added_in_grams)
        .bind(&entry.total_in_grams)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ReminderStore for PgRecordStore {
    async fn load_next_due(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM app_settings WHERE key = $1")
            .bind(NEXT_DUE_KEY)
            .fetch_optional(&self.pool)
            .await?;

        match raw {
            None => Ok(None),
            Some(value) => DateTime::parse_from_rfc3339(&value)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|e| StoreError::Backend(format!("corrupt {}: {}", NEXT_DUE_KEY, e))),
        }
    }

    async fn save_next_due(&self, next_due: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO app_settings (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(NEXT_DUE_KEY)
        .bind(next_due.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl InboxStore for PgRecordStore {
    async fn insert_notification(&self, notification: &InAppNotification) -> Result<i64, StoreError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO notifications (store_id, title, message, priority, seen, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&notification.store_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.priority.as_str())
        .bind(notification.seen)
        .bind(notification.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn count_unseen(&self, store_id: &str) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM notifications WHERE store_id = $1 AND seen = FALSE",
        )
        .bind(store_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn mark_all_seen(&self, store_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE notifications SET seen = TRUE WHERE store_id = $1 AND seen = FALSE",
        )
        .bind(store_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, FieldValue};
    use bigdecimal::{BigDecimal, Zero};

    fn row(id: &str, body: Value) -> DocumentRow {
        DocumentRow {
            id: id.to_string(),
            store_id: "s1".to_string(),
            created_at: None,
            body: Json(body),
        }
    }

    #[test]
    fn legacy_documents_decode_alongside_clean_ones() {
        let rows = vec![
            row("t1", serde_json::json!({"kind": "Token", "date": "01/03/2024", "tokenNo": 12})),
            row("s1", serde_json::json!({"kind": "Sale", "date": "02/03/2024", "amount": true})),
            row("s2", serde_json::json!({"kind": "Sale", "date": "03/03/2024", "amount": "150"})),
        ];

        let records = decode_rows(rows).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].field(Field::TokenNo), Some(FieldValue::Text("12")));
        match records[1].field(Field::Amount) {
            Some(FieldValue::Number(n)) => assert_eq!(n.to_decimal(), BigDecimal::zero()),
            other => panic!("unexpected amount: {:?}", other),
        }
        assert_eq!(records[2].store_id, "s1");
    }
}
