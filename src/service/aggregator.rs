use super::dates::parse_date;
use crate::models::{Field, FieldValue, RecordKind, TransactionRecord};
use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// 单个字段的数值和 (无法解析的按 0)
pub fn sum_field(records: &[TransactionRecord], field: Field) -> BigDecimal {
    records
        .iter()
        .filter_map(|r| match r.field(field) {
            Some(FieldValue::Number(n)) => Some(n.to_decimal()),
            _ => None,
        })
        .fold(BigDecimal::zero(), |acc, v| acc + v)
}

fn distinct_values<'a, I>(records: I, field: Field) -> HashSet<String>
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    records
        .into_iter()
        .filter_map(|r| r.field(field))
        .map(|v| v.display().trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// 字段去重计数 (忽略空值)
pub fn unique_count(records: &[TransactionRecord], field: Field) -> usize {
    distinct_values(records, field).len()
}

/// 汇总: 数值字段求和, 文本字段去重计数
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub record_count: usize,
    pub sums: BTreeMap<Field, BigDecimal>,
    pub unique_counts: BTreeMap<Field, usize>,
}

pub fn summarize(records: &[TransactionRecord], fields: &[Field]) -> Summary {
    let mut summary = Summary {
        record_count: records.len(),
        ..Summary::default()
    };
    for &field in fields {
        if field.is_numeric() {
            summary.sums.insert(field, sum_field(records, field));
        } else {
            summary.unique_counts.insert(field, unique_count(records, field));
        }
    }
    summary
}

/// 按类型分类汇总某数值字段 (按首次出现顺序)
pub fn category_totals(records: &[TransactionRecord], field: Field) -> IndexMap<String, BigDecimal> {
    let mut totals: IndexMap<String, BigDecimal> = IndexMap::new();
    for r in records {
        let category = r.type_category().unwrap_or("").trim();
        let category = if category.is_empty() { "Uncategorised" } else { category };
        let value = match r.field(field) {
            Some(FieldValue::Number(n)) => n.to_decimal(),
            _ => BigDecimal::zero(),
        };
        let entry = totals.entry(category.to_string()).or_insert_with(BigDecimal::zero);
        *entry = &*entry + &value;
    }
    totals
}

/// 合计行中的单元格
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TotalValue {
    Sum(BigDecimal),
    Distinct(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsRow {
    pub label: String,
    pub values: BTreeMap<Field, TotalValue>,
}

fn totals_row<'a, I>(label: String, records: I, fields: &[Field]) -> TotalsRow
where
    I: IntoIterator<Item = &'a TransactionRecord> + Clone,
{
    let values = fields
        .iter()
        .map(|&field| {
            let value = if field.is_numeric() {
                let sum = records
                    .clone()
                    .into_iter()
                    .filter_map(|r| match r.field(field) {
                        Some(FieldValue::Number(n)) => Some(n.to_decimal()),
                        _ => None,
                    })
                    .fold(BigDecimal::zero(), |acc, v| acc + v);
                TotalValue::Sum(sum)
            } else {
                TotalValue::Distinct(distinct_values(records.clone(), field).len())
            };
            (field, value)
        })
        .collect();
    TotalsRow { label, values }
}

/// 合并视图中的一行 (标记来源类别)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedRow {
    pub origin: RecordKind,
    pub record: TransactionRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedView {
    pub kind_a: RecordKind,
    pub kind_b: RecordKind,
    pub rows: Vec<CombinedRow>,
    pub totals_a: TotalsRow,
    pub totals_b: TotalsRow,
    pub grand_total: TotalsRow,
}

/// 合并两个类别: 按日期降序的稳定排序 (同日期时 A 在前, 各类别内保持原顺序;
/// 无法解析的日期排在最后), 并计算 A / B / 总计三行合计
pub fn combine(
    (kind_a, set_a): (RecordKind, &[TransactionRecord]),
    (kind_b, set_b): (RecordKind, &[TransactionRecord]),
    fields: &[Field],
) -> CombinedView {
    let mut keyed: Vec<(Option<chrono::NaiveDate>, CombinedRow)> = set_a
        .iter()
        .map(|r| (kind_a, r))
        .chain(set_b.iter().map(|r| (kind_b, r)))
        .map(|(origin, r)| {
            (
                parse_date(&r.date),
                CombinedRow {
                    origin,
                    record: r.clone(),
                },
            )
        })
        .collect();

    // Option 排序中 None 最小, 降序后自然落在最后
    keyed.sort_by(|(a, _), (b, _)| b.cmp(a));
    let rows = keyed.into_iter().map(|(_, row)| row).collect();

    CombinedView {
        kind_a,
        kind_b,
        rows,
        totals_a: totals_row(format!("{} Total", kind_a.label()), set_a.iter(), fields),
        totals_b: totals_row(format!("{} Total", kind_b.label()), set_b.iter(), fields),
        grand_total: totals_row("Grand Total".to_string(), set_a.iter().chain(set_b.iter()), fields),
    }
}
