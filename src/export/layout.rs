use crate::models::{format_2dp, Field, FieldValue, TransactionRecord};
use crate::service::aggregator::{CombinedView, TotalValue, TotalsRow};
use bigdecimal::{BigDecimal, Zero};
use serde::Serialize;

/// 列宽上限 (字符数)
pub const MAX_COLUMN_WIDTH: usize = 50;
pub const TOTAL_LABEL: &str = "TOTAL:";

/// 导出列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// 合并视图中的来源类别
    Origin,
    Field(Field),
}

impl Column {
    pub fn header(&self) -> &'static str {
        match self {
            Column::Origin => "Kind",
            Column::Field(f) => f.header(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Field(f) if f.is_numeric())
    }
}

/// 表尾合计行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FooterRow {
    pub cells: Vec<String>,
}

/// 两种导出格式共用的表格布局
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub columns: Vec<Column>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub footers: Vec<FooterRow>,
    /// 每列宽度 (字符数, 已封顶)
    pub widths: Vec<usize>,
    /// 金额合计 (合计列存在时)
    pub total: Option<BigDecimal>,
}

/// 合计列: 优先 amount, 其次 fine
pub fn total_column(fields: &[Field]) -> Option<usize> {
    [Field::Amount, Field::Fine]
        .iter()
        .find_map(|target| fields.iter().position(|f| f == target))
}

fn cell_text(record: &TransactionRecord, field: Field) -> String {
    record.field(field).map(|v| v.display()).unwrap_or_default()
}

fn numeric_value(record: &TransactionRecord, field: Field) -> BigDecimal {
    match record.field(field) {
        Some(FieldValue::Number(n)) => n.to_decimal(),
        _ => BigDecimal::zero(),
    }
}

fn column_widths(headers: &[String], rows: &[Vec<String>], footers: &[FooterRow]) -> Vec<usize> {
    (0..headers.len())
        .map(|col| {
            let longest = std::iter::once(&headers[col])
                .chain(rows.iter().map(|r| &r[col]))
                .chain(footers.iter().map(|f| &f.cells[col]))
                .map(|s| s.chars().count())
                .max()
                .unwrap_or(0);
            (longest + 2).min(MAX_COLUMN_WIDTH)
        })
        .collect()
}

impl TableLayout {
    /// 单类别报表: 末尾一行 "TOTAL:" + 两位小数合计
    pub fn for_records(records: &[TransactionRecord], fields: &[Field]) -> TableLayout {
        let columns: Vec<Column> = fields.iter().map(|f| Column::Field(*f)).collect();
        let headers = columns.iter().map(|c| c.header().to_string()).collect::<Vec<_>>();
        let rows: Vec<Vec<String>> = records
            .iter()
            .map(|r| fields.iter().map(|f| cell_text(r, *f)).collect())
            .collect();

        let mut footers = Vec::new();
        let mut total = None;
        if let Some(amount_col) = total_column(fields) {
            let sum = records
                .iter()
                .map(|r| numeric_value(r, fields[amount_col]))
                .fold(BigDecimal::zero(), |acc, v| acc + v);

            let mut cells = vec![String::new(); fields.len()];
            if amount_col > 0 {
                cells[amount_col - 1] = TOTAL_LABEL.to_string();
            }
            cells[amount_col] = format_2dp(&sum);
            footers.push(FooterRow { cells });
            total = Some(sum);
        }

        let widths = column_widths(&headers, &rows, &footers);
        TableLayout {
            columns,
            headers,
            rows,
            footers,
            widths,
            total,
        }
    }

    /// 合并视图: 首列为来源类别, 末尾三行合计 (A / B / 总计)
    pub fn for_combined(view: &CombinedView, fields: &[Field]) -> TableLayout {
        let mut columns = vec![Column::Origin];
        columns.extend(fields.iter().map(|f| Column::Field(*f)));
        let headers = columns.iter().map(|c| c.header().to_string()).collect::<Vec<_>>();

        let rows: Vec<Vec<String>> = view
            .rows
            .iter()
            .map(|row| {
                std::iter::once(row.origin.label().to_string())
                    .chain(fields.iter().map(|f| cell_text(&row.record, *f)))
                    .collect()
            })
            .collect();

        let footer = |totals: &TotalsRow| FooterRow {
            cells: std::iter::once(totals.label.clone())
                .chain(fields.iter().map(|f| match totals.values.get(f) {
                    Some(TotalValue::Sum(v)) => format_2dp(v),
                    Some(TotalValue::Distinct(n)) => n.to_string(),
                    None => String::new(),
                }))
                .collect(),
        };
        let footers = vec![
            footer(&view.totals_a),
            footer(&view.totals_b),
            footer(&view.grand_total),
        ];

        let total = total_column(fields).and_then(|col| match view.grand_total.values.get(&fields[col]) {
            Some(TotalValue::Sum(v)) => Some(v.clone()),
            _ => None,
        });

        let widths = column_widths(&headers, &rows, &footers);
        TableLayout {
            columns,
            headers,
            rows,
            footers,
            widths,
            total,
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}
