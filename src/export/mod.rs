//! 报表导出: xlsx / pdf / csv
//!
//! 三种格式都从同一个 `TableLayout` 渲染, 合计行在各格式间一致。
//! 每个渲染器先生成可检查的绘制计划, 再交给底层库输出字节。

pub mod csv;
pub mod layout;
pub mod pdf;
pub mod xlsx;

pub use layout::{total_column, Column, FooterRow, TableLayout, MAX_COLUMN_WIDTH, TOTAL_LABEL};

use serde::Deserialize;

/// 配色 (RGB)
pub mod palette {
    pub const DARK_BLUE: u32 = 0x1F4E78;
    pub const MEDIUM_BLUE: u32 = 0x4472C4;
    pub const LIGHT_GRAY: u32 = 0xF2F2F2;
    pub const LIGHT_BLUE: u32 = 0xDDEBF7;
    pub const WHITE: u32 = 0xFFFFFF;
    pub const BLACK: u32 = 0x000000;
}

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Xlsx,
    Pdf,
    Csv,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Csv => "csv",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" => Ok(ExportFormat::Xlsx),
            "pdf" => Ok(ExportFormat::Pdf),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unsupported export format: {}", other)),
        }
    }
}
