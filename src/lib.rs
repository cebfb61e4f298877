pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use db::{create_pool, MemoryStore, PgRecordStore};
pub use error::{ConsoleError, ExportError, StoreError};
pub use service::ReportService;
