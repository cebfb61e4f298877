pub mod handlers;

pub use handlers::*;

use crate::service::ReportService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// 构建路由
pub fn router(service: Arc<ReportService>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/reports/session", post(open_session))
        .route("/api/reports/query", post(query_report))
        .route("/api/reports/combined", post(combined_report))
        .route("/api/reports/export/:format", post(export_report))
        .route("/api/records", post(create_record))
        .route("/api/maintenance/cleanup", post(manual_cleanup))
        .route("/api/reserves/approve", post(approve_reserve))
        .route("/api/notifications/seen", post(mark_notifications_seen))
        .route("/api/notifications/unseen", post(unseen_notifications))
        .with_state(service)
}
