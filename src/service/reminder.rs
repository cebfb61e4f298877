use super::notifier::{DispatchRequest, Dispatcher};
use crate::db::ReminderStore;
use crate::error::StoreError;
use crate::models::{InAppNotification, Priority, StoreRef};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

pub const REMINDER_TITLE: &str = "Data cleanup reminder";

/// 定期提醒: nextDueAt 持久化在外部状态存储中
///
/// 到期后每次检查都会再次触发, 直到操作员确认 (执行手动清理)。
pub struct ReminderScheduler {
    state: Arc<dyn ReminderStore>,
    dispatcher: Dispatcher,
    interval: Duration,
}

impl ReminderScheduler {
    pub fn new(state: Arc<dyn ReminderStore>, dispatcher: Dispatcher, interval: Duration) -> Self {
        Self {
            state,
            dispatcher,
            interval,
        }
    }

    /// 检查提醒是否到期, 到期时排队发送外部消息和站内通知
    ///
    /// 首次运行 (无 nextDueAt) 只记录下一次到期时间, 不触发。
    pub async fn check_and_fire(&self, store: &StoreRef, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let Some(next_due) = self.state.load_next_due().await? else {
            let next_due = now + self.interval;
            self.state.save_next_due(next_due).await?;
            tracing::info!(next_due = %next_due, "提醒状态已初始化");
            return Ok(false);
        };

        if now < next_due {
            return Ok(false);
        }

        let overdue_days = (now - next_due).num_days();
        tracing::info!(store_id = %store.id, overdue_days, "清理提醒已到期");

        let message = reminder_text(store, now, self.interval.num_days());
        self.dispatcher.enqueue(DispatchRequest::External {
            text: message.clone(),
        });
        self.dispatcher.enqueue(DispatchRequest::InApp(InAppNotification {
            id: None,
            title: REMINDER_TITLE.to_string(),
            message,
            store_id: store.id.clone(),
            priority: Priority::High,
            seen: false,
            created_at: now,
        }));

        Ok(true)
    }

    /// 操作员确认 (手动清理后), 重新计时
    pub async fn acknowledge(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, StoreError> {
        let next_due = now + self.interval;
        self.state.save_next_due(next_due).await?;
        tracing::info!(next_due = %next_due, "提醒已确认, 重新计时");
        Ok(next_due)
    }

    pub async fn next_due(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.state.load_next_due().await
    }
}

/// 外部消息文案
pub fn reminder_text(store: &StoreRef, now: DateTime<Utc>, retention_days: i64) -> String {
    format!(
        "Reminder for {}: monthly data cleanup is due as of {}. Please export the reports you need and clear records older than {} days.",
        store.name,
        now.format("%d/%m/%Y"),
        retention_days
    )
}
