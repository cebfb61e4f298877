pub mod aggregator;
pub mod dates;
pub mod fetcher;
pub mod filter;
pub mod notifier;
pub mod reminder;
pub mod report;
pub mod retention;

pub use aggregator::{category_totals, combine, summarize, CombinedView, Summary};
pub use dates::parse_date;
pub use fetcher::RecordFetcher;
pub use filter::FilterEngine;
pub use notifier::{dispatch_queue, Dispatcher, DispatchWorker, NotificationChannel, StoreNotificationChannel, WebhookMessenger};
pub use reminder::ReminderScheduler;
pub use report::{ExportArtifact, ExportSource, MaintenanceOutcome, ReportPage, ReportService};
pub use retention::{KindStatus, RetentionManager, SweepReport};
