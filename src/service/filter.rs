use super::dates::parse_date;
use crate::models::{FilterCriteria, MonthFilter, TransactionRecord};
use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;

/// 纯过滤: 无 I/O, 相同输入 (含参考日期) 必得相同输出
#[derive(Debug, Clone, Copy)]
pub struct FilterEngine {
    today: NaiveDate,
}

impl FilterEngine {
    /// `today` 用于 LAST_YEAR 计算
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// 返回满足条件的记录, 保持原有顺序
    pub fn apply(&self, records: &[TransactionRecord], criteria: &FilterCriteria) -> Vec<TransactionRecord> {
        if criteria.is_default() {
            return records.to_vec();
        }

        let needle = criteria.search.trim().to_lowercase();
        records
            .par_iter()
            .filter(|r| self.matches(r, criteria, &needle))
            .cloned()
            .collect()
    }

    pub fn matches(&self, record: &TransactionRecord, criteria: &FilterCriteria, needle: &str) -> bool {
        if !needle.is_empty() && !record.search_text().to_lowercase().contains(needle) {
            return false;
        }
        if !criteria.type_filter.matches(record.type_category()) {
            return false;
        }
        if !criteria.source_filter.matches(record.source_category()) {
            return false;
        }

        // 日期无法解析时放行 (fail-open)
        let Some(date) = parse_date(&record.date) else {
            return true;
        };

        let month_ok = match criteria.month {
            MonthFilter::All => true,
            MonthFilter::LastYear => date.year() == self.today.year() - 1,
            MonthFilter::Month { month, year } => date.month() == month && date.year() == year,
        };

        month_ok
            && criteria.start_date.map_or(true, |start| date >= start)
            && criteria.end_date.map_or(true, |end| date <= end)
    }
}
