//! 统一错误类型

use crate::models::RecordKind;
use thiserror::Error;

/// 存储层错误: 缺少索引与其他失败必须可区分
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("required index unavailable for {kind}: {index}")]
    IndexUnavailable { kind: RecordKind, index: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_index_unavailable(&self) -> bool {
        matches!(self, StoreError::IndexUnavailable { .. })
    }
}

/// 导出错误
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("xlsx error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("pdf error: {0}")]
    Pdf(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// 通知发送错误 (只记录, 不向上传播)
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("external message failed: {0}")]
    External(String),

    #[error("in-app notification failed: {0}")]
    InApp(String),

    #[error("dispatch queue rejected request: {0}")]
    Queue(String),
}

/// 服务层错误
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
