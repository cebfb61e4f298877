use super::layout::TableLayout;
use super::palette;
use crate::error::ExportError;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};

/// 数据起始行 (0 基: 标题, 门店, 表头之后)
pub const FIRST_DATA_ROW: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Title,
    StoreLabel,
    Header,
    Body { shaded: bool },
    Total,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    /// 两位小数合计, 写为数字并保留 0.00 格式
    Decimal(String),
    Blank,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCell {
    pub row: u32,
    pub col: u16,
    pub value: CellValue,
    pub style: CellStyle,
}

/// 工作表绘制计划
#[derive(Debug, Clone, PartialEq)]
pub struct SheetPlan {
    pub last_col: u16,
    pub title: String,
    pub cells: Vec<PlannedCell>,
    pub widths: Vec<f64>,
}

impl SheetPlan {
    pub fn cell(&self, row: u32, col: u16) -> Option<&PlannedCell> {
        self.cells.iter().find(|c| c.row == row && c.col == col)
    }
}

fn body_value(text: &str, numeric: bool) -> CellValue {
    if text.is_empty() {
        return CellValue::Blank;
    }
    match text.trim().parse::<f64>() {
        Ok(v) if numeric && v.is_finite() => CellValue::Number(v),
        _ => CellValue::Text(text.to_string()),
    }
}

pub fn plan(layout: &TableLayout, title: &str, store_label: &str) -> SheetPlan {
    let last_col = layout.column_count().saturating_sub(1) as u16;
    let mut cells = Vec::new();

    cells.push(PlannedCell {
        row: 1,
        col: 0,
        value: CellValue::Text(store_label.to_string()),
        style: CellStyle::StoreLabel,
    });

    for (col, header) in layout.headers.iter().enumerate() {
        cells.push(PlannedCell {
            row: 2,
            col: col as u16,
            value: CellValue::Text(header.clone()),
            style: CellStyle::Header,
        });
    }

    for (i, row) in layout.rows.iter().enumerate() {
        let style = CellStyle::Body { shaded: i % 2 == 1 };
        for (col, text) in row.iter().enumerate() {
            cells.push(PlannedCell {
                row: FIRST_DATA_ROW + i as u32,
                col: col as u16,
                value: body_value(text, layout.columns[col].is_numeric()),
                style,
            });
        }
    }

    let mut next_row = FIRST_DATA_ROW + layout.rows.len() as u32;
    for footer in &layout.footers {
        for (col, text) in footer.cells.iter().enumerate() {
            let value = if text.is_empty() {
                CellValue::Blank
            } else if layout.columns[col].is_numeric() && text.parse::<f64>().is_ok() {
                CellValue::Decimal(text.clone())
            } else {
                CellValue::Text(text.clone())
            };
            cells.push(PlannedCell {
                row: next_row,
                col: col as u16,
                value,
                style: CellStyle::Total,
            });
        }
        next_row += 1;
    }

    SheetPlan {
        last_col,
        title: title.to_string(),
        cells,
        widths: layout.widths.iter().map(|w| *w as f64).collect(),
    }
}

struct Formats {
    title: Format,
    store_label: Format,
    header: Format,
    body: Format,
    body_shaded: Format,
    total: Format,
    total_decimal: Format,
}

impl Formats {
    fn new() -> Self {
        let title = Format::new()
            .set_bold()
            .set_font_size(14)
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(palette::DARK_BLUE))
            .set_border(FormatBorder::Medium)
            .set_align(FormatAlign::Center);
        let store_label = Format::new().set_italic();
        let header = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(palette::MEDIUM_BLUE))
            .set_border(FormatBorder::Thin);
        let body = Format::new()
            .set_background_color(Color::RGB(palette::WHITE))
            .set_border(FormatBorder::Thin);
        let body_shaded = Format::new()
            .set_background_color(Color::RGB(palette::LIGHT_GRAY))
            .set_border(FormatBorder::Thin);
        let total = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(palette::LIGHT_BLUE))
            .set_border(FormatBorder::Thin);
        let total_decimal = total.clone().set_num_format("0.00");

        Self {
            title,
            store_label,
            header,
            body,
            body_shaded,
            total,
            total_decimal,
        }
    }

    fn for_cell(&self, cell: &PlannedCell) -> &Format {
        match (cell.style, &cell.value) {
            (CellStyle::Title, _) => &self.title,
            (CellStyle::StoreLabel, _) => &self.store_label,
            (CellStyle::Header, _) => &self.header,
            (CellStyle::Body { shaded: false }, _) => &self.body,
            (CellStyle::Body { shaded: true }, _) => &self.body_shaded,
            (CellStyle::Total, CellValue::Decimal(_)) => &self.total_decimal,
            (CellStyle::Total, _) => &self.total,
        }
    }
}

/// 渲染 xlsx 字节
pub fn to_spreadsheet(layout: &TableLayout, title: &str, store_label: &str) -> Result<Vec<u8>, ExportError> {
    let plan = plan(layout, title, store_label);
    let formats = Formats::new();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    if plan.last_col > 0 {
        sheet.merge_range(0, 0, 0, plan.last_col, &plan.title, &formats.title)?;
    } else {
        sheet.write_string_with_format(0, 0, &plan.title, &formats.title)?;
    }

    for cell in &plan.cells {
        let format = formats.for_cell(cell);
        match &cell.value {
            CellValue::Text(text) => {
                sheet.write_string_with_format(cell.row, cell.col, text, format)?;
            }
            CellValue::Number(v) => {
                sheet.write_number_with_format(cell.row, cell.col, *v, format)?;
            }
            CellValue::Decimal(text) => match text.parse::<f64>() {
                Ok(v) => {
                    sheet.write_number_with_format(cell.row, cell.col, v, format)?;
                }
                Err(_) => {
                    sheet.write_string_with_format(cell.row, cell.col, text, format)?;
                }
            },
            CellValue::Blank => {
                sheet.write_blank(cell.row, cell.col, format)?;
            }
        }
    }

    for (col, width) in plan.widths.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }

    let bytes = workbook.save_to_buffer()?;
    tracing::debug!(rows = layout.rows.len(), bytes = bytes.len(), "xlsx rendered");
    Ok(bytes)
}
