use bullion_console::db::{ensure_indexes, ensure_schema};
use bullion_console::service::{dispatch_queue, StoreNotificationChannel, WebhookMessenger};
use bullion_console::{api, create_pool, AppConfig, PgRecordStore, ReportService};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    ensure_schema(&pool).await?;
    if config.database.create_indexes {
        ensure_indexes(&pool).await?;
    } else {
        info!("跳过索引创建, 排序查询将退化为内存排序");
    }

    let store = Arc::new(PgRecordStore::new(pool));

    // 通知分发 worker
    let channel = Arc::new(StoreNotificationChannel::new(
        WebhookMessenger::new(config.notifications.webhook_url.clone()),
        store.clone(),
    ));
    let (dispatcher, worker, rx) = dispatch_queue(channel, config.reporting.dispatch_queue_capacity);
    tokio::spawn(worker.run(rx));

    let service = Arc::new(ReportService::new(
        store.clone(),
        store.clone(),
        store,
        dispatcher,
        config.clone(),
    ));

    let app = api::router(service).layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/reports/session         - open session (retention + reminder)");
    info!("  POST /api/reports/query           - single kind report");
    info!("  POST /api/reports/combined        - combined two-kind view");
    info!("  POST /api/reports/export/:format  - xlsx / pdf / csv");
    info!("  POST /api/maintenance/cleanup     - manual cleanup");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
