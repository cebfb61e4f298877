use super::layout::TableLayout;
use crate::error::ExportError;

/// CSV: 表头 + 数据 + 合计行
pub fn to_csv(layout: &TableLayout) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&layout.headers)?;
    for row in &layout.rows {
        writer.write_record(row)?;
    }
    for footer in &layout.footers {
        writer.write_record(&footer.cells)?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}
