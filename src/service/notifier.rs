//! 通知分发
//!
//! 提醒触发的两个副作用 (外部消息 + 站内通知) 都是"发出即忘":
//! 请求进入 mpsc 队列, 由后台 worker 发送; 失败只记录日志和失败列表,
//! 不影响报表会话。

use crate::db::InboxStore;
use crate::error::DispatchError;
use crate::models::InAppNotification;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// 通知通道边界
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send_external_message(&self, text: &str) -> Result<(), DispatchError>;
    async fn record_in_app_notification(
        &self,
        notification: &InAppNotification,
    ) -> Result<(), DispatchError>;
}

/// 队列中的分发请求
#[derive(Debug, Clone)]
pub enum DispatchRequest {
    External { text: String },
    InApp(InAppNotification),
}

impl DispatchRequest {
    fn label(&self) -> &'static str {
        match self {
            DispatchRequest::External { .. } => "external",
            DispatchRequest::InApp(_) => "in_app",
        }
    }
}

/// 失败记录
#[derive(Debug, Clone, Serialize)]
pub struct DispatchFailure {
    pub channel: &'static str,
    pub error: String,
    pub at: DateTime<Utc>,
}

/// 失败日志 (旁路记录, 供诊断查询)
#[derive(Debug, Clone, Default)]
pub struct FailureLog {
    inner: Arc<Mutex<Vec<DispatchFailure>>>,
}

impl FailureLog {
    pub fn record(&self, channel: &'static str, error: &DispatchError) {
        tracing::error!(channel = channel, error = %error, "通知发送失败");
        if let Ok(mut guard) = self.inner.lock() {
            guard.push(DispatchFailure {
                channel,
                error: error.to_string(),
                at: Utc::now(),
            });
        }
    }

    pub fn entries(&self) -> Vec<DispatchFailure> {
        self.inner.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

/// 分发队列的发送端
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<DispatchRequest>,
    failures: FailureLog,
}

impl Dispatcher {
    /// 入队, 队列满或关闭时只记录失败
    pub fn enqueue(&self, request: DispatchRequest) {
        let channel = request.label();
        if let Err(e) = self.tx.try_send(request) {
            self.failures.record(channel, &DispatchError::Queue(e.to_string()));
        }
    }

    pub fn failures(&self) -> &FailureLog {
        &self.failures
    }
}

/// 后台分发 worker
pub struct DispatchWorker {
    channel: Arc<dyn NotificationChannel>,
    failures: FailureLog,
}

impl DispatchWorker {
    /// 运行 worker (直到所有发送端关闭)
    pub async fn run(self, mut rx: mpsc::Receiver<DispatchRequest>) {
        tracing::info!("通知发送任务已启动");

        while let Some(req) = rx.recv().await {
            let channel = req.label();
            let result = match &req {
                DispatchRequest::External { text } => self.channel.send_external_message(text).await,
                DispatchRequest::InApp(n) => self.channel.record_in_app_notification(n).await,
            };
            match result {
                Ok(()) => tracing::debug!(channel = channel, "通知已发送"),
                Err(e) => self.failures.record(channel, &e),
            }
        }

        tracing::info!("通知队列已关闭, 发送任务退出");
    }
}

/// 创建分发队列, 返回发送端和待 spawn 的 worker
pub fn dispatch_queue(
    channel: Arc<dyn NotificationChannel>,
    capacity: usize,
) -> (Dispatcher, DispatchWorker, mpsc::Receiver<DispatchRequest>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let failures = FailureLog::default();
    let dispatcher = Dispatcher {
        tx,
        failures: failures.clone(),
    };
    let worker = DispatchWorker { channel, failures };
    (dispatcher, worker, rx)
}

/// 外部消息: POST 到 webhook; 未配置时只记录日志
pub struct WebhookMessenger {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

impl WebhookMessenger {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    pub async fn send(&self, text: &str) -> Result<(), DispatchError> {
        let Some(url) = &self.webhook_url else {
            tracing::info!("外部通道未配置, 消息内容: {}", text);
            return Ok(());
        };

        let resp = self
            .client
            .post(url)
            .json(&WebhookPayload { text })
            .send()
            .await
            .map_err(|e| DispatchError::External(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(DispatchError::External(format!("webhook returned {}", resp.status())));
        }
        Ok(())
    }
}

/// 外部 webhook + 站内通知存储
pub struct StoreNotificationChannel {
    messenger: WebhookMessenger,
    inbox: Arc<dyn InboxStore>,
}

impl StoreNotificationChannel {
    pub fn new(messenger: WebhookMessenger, inbox: Arc<dyn InboxStore>) -> Self {
        Self { messenger, inbox }
    }
}

#[async_trait]
impl NotificationChannel for StoreNotificationChannel {
    async fn send_external_message(&self, text: &str) -> Result<(), DispatchError> {
        self.messenger.send(text).await
    }

    async fn record_in_app_notification(
        &self,
        notification: &InAppNotification,
    ) -> Result<(), DispatchError> {
        self.inbox
            .insert_notification(notification)
            .await
            .map(|_| ())
            .map_err(|e| DispatchError::InApp(e.to_string()))
    }
}
