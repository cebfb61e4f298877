use crate::models::RecordKind;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub retention: RetentionConfig,
    pub reminder: ReminderConfig,
    pub reporting: ReportingConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// 启动时创建 store+createdAt 复合索引
    pub create_indexes: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/bullion_console".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            create_indexes: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// 超过该天数的交易记录会被清理
    pub age_days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { age_days: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub interval_days: i64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self { interval_days: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub fetch_concurrency: usize,
    /// 合并视图默认的两个类别
    pub combined_kinds: (RecordKind, RecordKind),
    pub dispatch_queue_capacity: usize,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: 4,
            combined_kinds: (RecordKind::Token, RecordKind::Exchange),
            dispatch_queue_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// 外部消息 webhook, 未配置时只记录日志
    pub webhook_url: Option<String>,
}

impl AppConfig {
    /// 加载顺序: 默认值 -> console.toml (可选) -> CONSOLE__* 环境变量
    /// -> DATABASE_URL / SERVER_HOST / SERVER_PORT
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::with_name("console").required(false))
            .add_source(
                Environment::with_prefix("CONSOLE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }
        if let Ok(host) = std::env::var("SERVER_HOST") {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<i64>().ok()) {
            builder = builder.set_override("server.port", port)?;
        }

        builder.build()?.try_deserialize()
    }

    /// 从环境变量加载配置, 失败时使用默认值
    pub fn from_env() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load configuration ({}), using defaults", e);
            Self::default()
        })
    }

    pub fn retention_age(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention.age_days)
    }

    pub fn reminder_interval(&self) -> chrono::Duration {
        chrono::Duration::days(self.reminder.interval_days)
    }
}
