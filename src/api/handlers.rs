use crate::error::ConsoleError;
use crate::export::ExportFormat;
use crate::models::{FilterCriteria, RecordKind, StoreRef, TransactionRecord};
use crate::service::{ExportSource, ReportService};
use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bigdecimal::BigDecimal;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 请求体: 门店
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRequest {
    pub store_id: String,
    #[serde(default)]
    pub store_name: Option<String>,
}

impl StoreRequest {
    fn store_ref(&self) -> StoreRef {
        StoreRef::new(
            self.store_id.clone(),
            self.store_name.clone().unwrap_or_else(|| self.store_id.clone()),
        )
    }
}

/// 请求体: 单类别查询
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub store_id: String,
    pub kind: RecordKind,
    #[serde(default)]
    pub criteria: FilterCriteria,
}

/// 请求体: 合并视图
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedRequest {
    pub store_id: String,
    #[serde(default)]
    pub kinds: Option<(RecordKind, RecordKind)>,
    #[serde(default)]
    pub criteria: FilterCriteria,
}

/// 请求体: 导出 (kind 与 combined 二选一, 都缺省时导出默认合并视图)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub store_id: String,
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub kind: Option<RecordKind>,
    #[serde(default)]
    pub combined: Option<(RecordKind, RecordKind)>,
    #[serde(default)]
    pub criteria: FilterCriteria,
}

/// 请求体: 储备入库审批
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveRequest {
    pub store_id: String,
    pub reserve_type: String,
    pub grams: BigDecimal,
}

/// 响应体
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

fn ok<T: Serialize>(message: String, data: T) -> Response {
    let response = ApiResponse {
        success: true,
        message,
        data: Some(data),
    };
    (StatusCode::OK, Json(response)).into_response()
}

fn fail(e: ConsoleError) -> Response {
    let status = match e {
        ConsoleError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::error!("Request failed: {}", e);
    let response: ApiResponse<()> = ApiResponse {
        success: false,
        message: format!("Error: {}", e),
        data: None,
    };
    (status, Json(response)).into_response()
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 打开报表会话 (触发清理与提醒检查)
pub async fn open_session(
    State(service): State<Arc<ReportService>>,
    Json(req): Json<StoreRequest>,
) -> Response {
    let store = req.store_ref();
    let outcome = service.open_session(&store, Utc::now()).await;
    let message = match &outcome.sweep {
        Some(report) => format!(
            "Session opened, {} expired records removed{}",
            report.deleted_count,
            if outcome.reminder_fired { ", cleanup reminder sent" } else { "" }
        ),
        None => "Session opened, maintenance incomplete".to_string(),
    };
    ok(message, outcome)
}

/// 单类别报表
pub async fn query_report(
    State(service): State<Arc<ReportService>>,
    Json(req): Json<QueryRequest>,
) -> Response {
    let today = Utc::now().date_naive();
    match service.query(&req.store_id, req.kind, &req.criteria, today).await {
        Ok(page) => ok(format!("{} {} records", page.records.len(), req.kind.label()), page),
        Err(e) => fail(e),
    }
}

/// 合并视图
pub async fn combined_report(
    State(service): State<Arc<ReportService>>,
    Json(req): Json<CombinedRequest>,
) -> Response {
    let today = Utc::now().date_naive();
    match service.combined(&req.store_id, req.kinds, &req.criteria, today).await {
        Ok(view) => ok(format!("{} combined rows", view.rows.len()), view),
        Err(e) => fail(e),
    }
}

/// 导出报表
pub async fn export_report(
    State(service): State<Arc<ReportService>>,
    Path(format): Path<String>,
    Json(req): Json<ExportRequest>,
) -> Response {
    let format = match format.parse::<ExportFormat>() {
        Ok(f) => f,
        Err(e) => return fail(ConsoleError::InvalidRequest(e)),
    };
    let source = match (req.kind, req.combined) {
        (Some(kind), None) => ExportSource::Kind(kind),
        (None, Some((a, b))) => ExportSource::Combined(a, b),
        (None, None) => {
            let (a, b) = service.config().reporting.combined_kinds;
            ExportSource::Combined(a, b)
        }
        (Some(_), Some(_)) => {
            return fail(ConsoleError::InvalidRequest(
                "specify either kind or combined, not both".to_string(),
            ))
        }
    };

    let store = StoreRef::new(
        req.store_id.clone(),
        req.store_name.clone().unwrap_or_else(|| req.store_id.clone()),
    );
    let today = Utc::now().date_naive();
    match service.export(&store, source, format, &req.criteria, today).await {
        Ok(artifact) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, artifact.content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", artifact.file_name),
                ),
            ],
            artifact.bytes,
        )
            .into_response(),
        Err(e) => fail(e),
    }
}

/// 手动清理 (同时确认提醒)
pub async fn manual_cleanup(
    State(service): State<Arc<ReportService>>,
    Json(req): Json<StoreRequest>,
) -> Response {
    let store = req.store_ref();
    match service.run_manual_cleanup(&store, Utc::now()).await {
        Ok(report) => ok(format!("Removed {} expired records", report.deleted_count), report),
        Err(e) => fail(e),
    }
}

/// 录入交易记录
pub async fn create_record(
    State(service): State<Arc<ReportService>>,
    Json(record): Json<TransactionRecord>,
) -> Response {
    match service.record_transaction(record, Utc::now()).await {
        Ok(saved) => ok(format!("{} {} saved", saved.kind().label(), saved.id), saved),
        Err(e) => fail(e),
    }
}

/// 储备入库审批
pub async fn approve_reserve(
    State(service): State<Arc<ReportService>>,
    Json(req): Json<ReserveRequest>,
) -> Response {
    match service
        .approve_reserve_addition(&req.store_id, &req.reserve_type, req.grams.clone(), Utc::now())
        .await
    {
        Ok(entry) => ok(
            format!("Reserve {} now {} g", entry.reserve_type, entry.total_in_grams),
            entry,
        ),
        Err(e) => fail(e),
    }
}

/// 站内通知: 标记已读
pub async fn mark_notifications_seen(
    State(service): State<Arc<ReportService>>,
    Json(req): Json<StoreRequest>,
) -> Response {
    match service.mark_notifications_seen(&req.store_id).await {
        Ok(updated) => ok(format!("{} notifications marked seen", updated), updated),
        Err(e) => fail(e),
    }
}

/// 站内通知: 未读数量
pub async fn unseen_notifications(
    State(service): State<Arc<ReportService>>,
    Json(req): Json<StoreRequest>,
) -> Response {
    match service.unseen_notifications(&req.store_id).await {
        Ok(count) => ok(format!("{} unseen notifications", count), count),
        Err(e) => fail(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::{InboxStore, MemoryStore};
    use crate::models::{InAppNotification, Priority};
    use crate::service::{dispatch_queue, StoreNotificationChannel, WebhookMessenger};

    fn service(store: Arc<MemoryStore>) -> Arc<ReportService> {
        let channel = Arc::new(StoreNotificationChannel::new(WebhookMessenger::new(None), store.clone()));
        let (dispatcher, _worker, _rx) = dispatch_queue(channel, 8);
        Arc::new(ReportService::new(store.clone(), store.clone(), store, dispatcher, AppConfig::default()))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn store_request(store_id: &str) -> Json<StoreRequest> {
        Json(StoreRequest {
            store_id: store_id.to_string(),
            store_name: None,
        })
    }

    #[tokio::test]
    async fn unseen_count_then_mark_seen() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..2 {
            store
                .insert_notification(&InAppNotification {
                    id: None,
                    title: "Cleanup reminder".to_string(),
                    message: "m".to_string(),
                    store_id: "s1".to_string(),
                    priority: Priority::High,
                    seen: false,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        let service = service(store);

        let response = unseen_notifications(State(service.clone()), store_request("s1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], 2);

        let response = mark_notifications_seen(State(service.clone()), store_request("s1")).await;
        assert_eq!(body_json(response).await["data"], 2);

        let response = unseen_notifications(State(service), store_request("s1")).await;
        assert_eq!(body_json(response).await["data"], 0);
    }

    #[tokio::test]
    async fn non_positive_reserve_is_a_bad_request() {
        let service = service(Arc::new(MemoryStore::new()));
        let response = approve_reserve(
            State(service),
            Json(ReserveRequest {
                store_id: "s1".to_string(),
                reserve_type: "gold".to_string(),
                grams: BigDecimal::from(0),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["success"], false);
    }
}
