use crate::models::RecordKind;
use sqlx::PgPool;

/// 复合索引名 (store_id, created_at DESC)
pub fn index_name(kind: RecordKind) -> String {
    format!("idx_{}_store_created", kind.collection())
}

/// 建表 (不含复合索引)
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for kind in RecordKind::ALL {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id          TEXT PRIMARY KEY,
                store_id    TEXT NOT NULL,
                created_at  TIMESTAMPTZ,
                body        JSONB NOT NULL
            )
            "#,
            table = kind.collection()
        );
        sqlx::query(&sql).execute(pool).await?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reserve_ledger (
            store_id            TEXT NOT NULL,
            reserve_type        TEXT NOT NULL,
            available_in_grams  NUMERIC NOT NULL DEFAULT 0,
            added_in_grams      NUMERIC NOT NULL DEFAULT 0,
            total_in_grams      NUMERIC NOT NULL DEFAULT 0,
            updated_at          TIMESTAMPTZ NOT NULL,
            PRIMARY KEY (store_id, reserve_type)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS app_settings (
            key    TEXT PRIMARY KEY,
            value  TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id          BIGSERIAL PRIMARY KEY,
            store_id    TEXT NOT NULL,
            title       TEXT NOT NULL,
            message     TEXT NOT NULL,
            priority    TEXT NOT NULL,
            seen        BOOLEAN NOT NULL DEFAULT FALSE,
            created_at  TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Schema ensured for {} collections", RecordKind::ALL.len());
    Ok(())
}

/// 创建排序/清理查询所需的复合索引
pub async fn ensure_indexes(pool: &PgPool) -> Result<(), sqlx::Error> {
    for kind in RecordKind::ALL {
        let sql = format!(
            "CREATE INDEX IF NOT EXISTS {index} ON {table} (store_id, created_at DESC)",
            index = index_name(kind),
            table = kind.collection()
        );
        sqlx::query(&sql).execute(pool).await?;
    }
    tracing::info!("Composite indexes ensured");
    Ok(())
}
