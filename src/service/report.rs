use super::aggregator::{category_totals, combine, summarize, CombinedView, Summary};
use super::fetcher::RecordFetcher;
use super::filter::FilterEngine;
use super::notifier::Dispatcher;
use super::reminder::ReminderScheduler;
use super::retention::{RetentionManager, SweepReport};
use crate::config::AppConfig;
use crate::db::{InboxStore, RecordStore, ReminderStore};
use crate::error::{ConsoleError, Result};
use crate::export::{self, ExportFormat, TableLayout};
use crate::models::{
    Field, FilterCriteria, RecordKind, ReserveLedgerEntry, StoreRef, TransactionRecord,
};
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

/// 打开报表会话时的维护结果 (清理和提醒失败都不阻断会话)
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceOutcome {
    pub sweep: Option<SweepReport>,
    pub sweep_error: Option<String>,
    pub reminder_fired: bool,
    pub reminder_error: Option<String>,
}

/// 单类别报表
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPage {
    pub kind: RecordKind,
    pub columns: Vec<Field>,
    pub records: Vec<TransactionRecord>,
    pub summary: Summary,
    pub category_totals: IndexMap<String, BigDecimal>,
}

/// 导出的数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportSource {
    Kind(RecordKind),
    Combined(RecordKind, RecordKind),
}

/// 导出产物 (只返回字节, 不落盘)
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// 合并视图的列: A 的默认列中 B 也有的列
pub fn combined_columns(kind_a: RecordKind, kind_b: RecordKind) -> Vec<Field> {
    let b = kind_b.default_columns();
    kind_a
        .default_columns()
        .into_iter()
        .filter(|f| b.contains(f))
        .collect()
}

fn file_stem(title: &str) -> String {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// 报表服务: 获取 -> 过滤 -> 汇总 -> 导出, 以及会话维护
pub struct ReportService {
    store: Arc<dyn RecordStore>,
    inbox: Arc<dyn InboxStore>,
    fetcher: RecordFetcher,
    retention: RetentionManager,
    reminder: ReminderScheduler,
    config: AppConfig,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        reminder_state: Arc<dyn ReminderStore>,
        inbox: Arc<dyn InboxStore>,
        dispatcher: Dispatcher,
        config: AppConfig,
    ) -> Self {
        Self {
            fetcher: RecordFetcher::new(store.clone(), config.reporting.fetch_concurrency),
            retention: RetentionManager::new(store.clone()),
            reminder: ReminderScheduler::new(reminder_state, dispatcher, config.reminder_interval()),
            store,
            inbox,
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 打开报表会话: 先清理过期记录, 再检查提醒
    pub async fn open_session(&self, store: &StoreRef, now: DateTime<Utc>) -> MaintenanceOutcome {
        let mut outcome = MaintenanceOutcome::default();

        match self.retention.sweep(&store.id, self.config.retention_age(), now).await {
            Ok(report) => outcome.sweep = Some(report),
            Err(e) => {
                tracing::error!(store_id = %store.id, error = %e, "会话维护: 清理失败");
                outcome.sweep_error = Some(e.to_string());
            }
        }

        match self.reminder.check_and_fire(store, now).await {
            Ok(fired) => outcome.reminder_fired = fired,
            Err(e) => {
                tracing::error!(store_id = %store.id, error = %e, "会话维护: 提醒检查失败");
                outcome.reminder_error = Some(e.to_string());
            }
        }

        outcome
    }

    async fn filtered(
        &self,
        store_id: &str,
        kind: RecordKind,
        criteria: &FilterCriteria,
        today: NaiveDate,
    ) -> Result<Vec<TransactionRecord>> {
        let records = self.fetcher.fetch(kind, store_id).await?;
        let filtered = FilterEngine::new(today).apply(&records, criteria);
        tracing::debug!(kind = %kind, fetched = records.len(), kept = filtered.len(), "记录过滤完成");
        Ok(filtered)
    }

    pub async fn query(
        &self,
        store_id: &str,
        kind: RecordKind,
        criteria: &FilterCriteria,
        today: NaiveDate,
    ) -> Result<ReportPage> {
        let records = self.filtered(store_id, kind, criteria, today).await?;
        let columns = kind.default_columns();
        let summary = summarize(&records, &columns);
        let totals_field = if columns.contains(&Field::Amount) { Field::Amount } else { Field::Fine };
        let category_totals = category_totals(&records, totals_field);

        Ok(ReportPage {
            kind,
            columns,
            records,
            summary,
            category_totals,
        })
    }

    /// 合并两个类别; 未指定时使用配置中的默认组合
    pub async fn combined(
        &self,
        store_id: &str,
        kinds: Option<(RecordKind, RecordKind)>,
        criteria: &FilterCriteria,
        today: NaiveDate,
    ) -> Result<CombinedView> {
        let (kind_a, kind_b) = kinds.unwrap_or(self.config.reporting.combined_kinds);
        if kind_a == kind_b {
            return Err(ConsoleError::InvalidRequest(format!(
                "combined view needs two different kinds, got {} twice",
                kind_a
            )));
        }

        let mut fetched = self.fetcher.fetch_many(&[kind_a, kind_b], store_id).await.into_iter();
        let engine = FilterEngine::new(today);
        let mut next = || -> Result<Vec<TransactionRecord>> {
            match fetched.next() {
                Some((_, result)) => Ok(engine.apply(&result?, criteria)),
                None => Ok(Vec::new()),
            }
        };
        let set_a = next()?;
        let set_b = next()?;

        Ok(combine(
            (kind_a, &set_a),
            (kind_b, &set_b),
            &combined_columns(kind_a, kind_b),
        ))
    }

    pub async fn export(
        &self,
        store: &StoreRef,
        source: ExportSource,
        format: ExportFormat,
        criteria: &FilterCriteria,
        today: NaiveDate,
    ) -> Result<ExportArtifact> {
        let (layout, title) = match source {
            ExportSource::Kind(kind) => {
                let records = self.filtered(&store.id, kind, criteria, today).await?;
                let layout = TableLayout::for_records(&records, &kind.default_columns());
                (layout, format!("{} Report", kind.label()))
            }
            ExportSource::Combined(a, b) => {
                let view = self.combined(&store.id, Some((a, b)), criteria, today).await?;
                let layout = TableLayout::for_combined(&view, &combined_columns(a, b));
                (layout, format!("{} & {} Report", a.label(), b.label()))
            }
        };

        let bytes = match format {
            ExportFormat::Xlsx => export::xlsx::to_spreadsheet(&layout, &title, &format!("Store: {}", store.name))?,
            ExportFormat::Pdf => export::pdf::to_pdf(&layout, &title, &today.format("%d/%m/%Y").to_string())?,
            ExportFormat::Csv => export::csv::to_csv(&layout)?,
        };

        tracing::info!(
            store_id = %store.id,
            format = format.extension(),
            rows = layout.rows.len(),
            "导出报表 {}",
            title
        );

        Ok(ExportArtifact {
            file_name: format!(
                "{}_{}.{}",
                file_stem(&title),
                today.format("%Y%m%d"),
                format.extension()
            ),
            content_type: format.content_type(),
            bytes,
        })
    }

    /// 手动清理: 执行清理并确认提醒
    pub async fn run_manual_cleanup(&self, store: &StoreRef, now: DateTime<Utc>) -> Result<SweepReport> {
        let report = self.retention.sweep(&store.id, self.config.retention_age(), now).await?;
        self.reminder.acknowledge(now).await?;
        tracing::info!(store_id = %store.id, deleted = report.deleted_count, "手动清理完成");
        Ok(report)
    }

    /// 写入交易记录, createdAt 取服务端时间
    pub async fn record_transaction(
        &self,
        mut record: TransactionRecord,
        now: DateTime<Utc>,
    ) -> Result<TransactionRecord> {
        if record.store_id.trim().is_empty() {
            return Err(ConsoleError::InvalidRequest("storeId is required".to_string()));
        }
        record.created_at = Some(now);
        self.store.insert(&record).await?;
        Ok(record)
    }

    /// 审批通过的储备入库
    pub async fn approve_reserve_addition(
        &self,
        store_id: &str,
        reserve_type: &str,
        grams: BigDecimal,
        now: DateTime<Utc>,
    ) -> Result<ReserveLedgerEntry> {
        if grams <= BigDecimal::zero() {
            return Err(ConsoleError::InvalidRequest(format!(
                "reserve addition must be positive, got {}",
                grams
            )));
        }
        let existing = self.store.get_reserve(store_id, reserve_type).await?;
        let entry = ReserveLedgerEntry::merge_addition(existing.as_ref(), store_id, reserve_type, grams, now);
        self.store.put_reserve(&entry).await?;
        tracing::info!(
            store_id = %store_id,
            reserve_type = %reserve_type,
            total = %entry.total_in_grams,
            "储备入库已审批"
        );
        Ok(entry)
    }

    pub async fn unseen_notifications(&self, store_id: &str) -> Result<i64> {
        Ok(self.inbox.count_unseen(store_id).await?)
    }

    pub async fn mark_notifications_seen(&self, store_id: &str) -> Result<u64> {
        Ok(self.inbox.mark_all_seen(store_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::service::notifier::{dispatch_queue, StoreNotificationChannel, WebhookMessenger};

    fn service(store: Arc<MemoryStore>) -> ReportService {
        let channel = Arc::new(StoreNotificationChannel::new(WebhookMessenger::new(None), store.clone()));
        let (dispatcher, _worker, _rx) = dispatch_queue(channel, 8);
        ReportService::new(store.clone(), store.clone(), store, dispatcher, AppConfig::default())
    }

    #[test]
    fn file_stem_is_filesystem_friendly() {
        assert_eq!(file_stem("Token & Exchange Report"), "token_exchange_report");
    }

    #[test]
    fn combined_columns_keep_shared_fields_in_order() {
        let columns = combined_columns(RecordKind::Token, RecordKind::Exchange);
        assert_eq!(columns, RecordKind::Exchange.default_columns());
        assert!(!combined_columns(RecordKind::Sale, RecordKind::Purchase).contains(&Field::SaleType));
    }

    #[tokio::test]
    async fn reserve_additions_fold_previous_total() {
        let service = service(Arc::new(MemoryStore::new()));
        let now = Utc::now();

        let first = service
            .approve_reserve_addition("s1", "gold", BigDecimal::from(50), now)
            .await
            .unwrap();
        assert_eq!(first.available_in_grams, BigDecimal::zero());
        assert_eq!(first.total_in_grams, BigDecimal::from(50));

        let second = service
            .approve_reserve_addition("s1", "gold", BigDecimal::from(20), now)
            .await
            .unwrap();
        assert_eq!(second.available_in_grams, BigDecimal::from(50));
        assert_eq!(second.added_in_grams, BigDecimal::from(20));
        assert_eq!(second.total_in_grams, BigDecimal::from(70));

        assert!(service
            .approve_reserve_addition("s1", "gold", BigDecimal::zero(), now)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn combined_rejects_same_kind_twice() {
        let service = service(Arc::new(MemoryStore::new()));
        let today = Utc::now().date_naive();
        let err = service
            .combined("s1", Some((RecordKind::Sale, RecordKind::Sale)), &FilterCriteria::all(), today)
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidRequest(_)));
    }
}
