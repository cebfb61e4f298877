use super::layout::TableLayout;
use super::palette;
use crate::error::ExportError;
use printpdf::{BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, Rect, Rgb};

// A4 横向, 单位 mm
pub const PAGE_WIDTH: f32 = 297.0;
pub const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 10.0;
const TITLE_Y: f32 = 195.0;
const SUBTITLE_Y: f32 = 187.0;
const TABLE_TOP_FIRST: f32 = 178.0;
const TABLE_TOP_NEXT: f32 = 198.0;
const TABLE_BOTTOM: f32 = 12.0;
pub const ROW_HEIGHT: f32 = 6.0;

pub const TITLE_SIZE: f32 = 18.0;
pub const SUBTITLE_SIZE: f32 = 12.0;
pub const BODY_SIZE: f32 = 8.0;

// 8pt Helvetica 平均字宽的保守估计
const CHAR_WIDTH: f32 = 1.6;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Fill {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: u32,
    },
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        color: u32,
        text: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfPage {
    pub ops: Vec<DrawOp>,
}

impl PdfPage {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            DrawOp::Fill { .. } => None,
        })
    }

    pub fn fills(&self) -> impl Iterator<Item = u32> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Fill { color, .. } => Some(*color),
            DrawOp::Text { .. } => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RowKind {
    Body { shaded: bool },
    Total,
}

fn column_extents(layout: &TableLayout) -> Vec<(f32, f32)> {
    let usable = PAGE_WIDTH - 2.0 * MARGIN;
    let total: usize = layout.widths.iter().sum::<usize>().max(1);
    let mut x = MARGIN;
    layout
        .widths
        .iter()
        .map(|w| {
            let width = usable * (*w as f32) / (total as f32);
            let extent = (x, width);
            x += width;
            extent
        })
        .collect()
}

fn fit(text: &str, width: f32) -> String {
    let capacity = (((width - 2.0) / CHAR_WIDTH).floor() as usize).max(1);
    if text.chars().count() <= capacity {
        return text.to_string();
    }
    let kept: String = text.chars().take(capacity.saturating_sub(2)).collect();
    format!("{}..", kept)
}

fn draw_row(page: &mut PdfPage, top: f32, extents: &[(f32, f32)], cells: &[String], fill: u32, bold: bool, color: u32) {
    page.ops.push(DrawOp::Fill {
        x: MARGIN,
        y: top - ROW_HEIGHT,
        width: PAGE_WIDTH - 2.0 * MARGIN,
        height: ROW_HEIGHT,
        color: fill,
    });
    for ((x, width), text) in extents.iter().zip(cells) {
        if text.is_empty() {
            continue;
        }
        page.ops.push(DrawOp::Text {
            x: x + 1.0,
            y: top - ROW_HEIGHT + 1.8,
            size: BODY_SIZE,
            bold,
            color,
            text: fit(text, *width),
        });
    }
}

/// 分页绘制计划: 每页重复表头色带; 有数据时末尾追加合计行
pub fn plan(layout: &TableLayout, title: &str, generated_on: &str) -> Vec<PdfPage> {
    let extents = column_extents(layout);

    let mut stream: Vec<(RowKind, &Vec<String>)> = layout
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| (RowKind::Body { shaded: i % 2 == 1 }, row))
        .collect();
    if !layout.rows.is_empty() {
        stream.extend(layout.footers.iter().map(|f| (RowKind::Total, &f.cells)));
    }

    let mut pages = Vec::new();
    let mut page = PdfPage::default();
    page.ops.push(DrawOp::Text {
        x: MARGIN,
        y: TITLE_Y,
        size: TITLE_SIZE,
        bold: true,
        color: palette::BLACK,
        text: title.to_string(),
    });
    page.ops.push(DrawOp::Text {
        x: MARGIN,
        y: SUBTITLE_Y,
        size: SUBTITLE_SIZE,
        bold: false,
        color: palette::BLACK,
        text: format!("Generated on: {}", generated_on),
    });

    let mut top = TABLE_TOP_FIRST;
    draw_row(&mut page, top, &extents, &layout.headers, palette::MEDIUM_BLUE, true, palette::WHITE);
    top -= ROW_HEIGHT;

    for (kind, cells) in stream {
        if top - ROW_HEIGHT < TABLE_BOTTOM {
            pages.push(std::mem::take(&mut page));
            top = TABLE_TOP_NEXT;
            draw_row(&mut page, top, &extents, &layout.headers, palette::MEDIUM_BLUE, true, palette::WHITE);
            top -= ROW_HEIGHT;
        }
        match kind {
            RowKind::Body { shaded } => {
                let fill = if shaded { palette::LIGHT_GRAY } else { palette::WHITE };
                draw_row(&mut page, top, &extents, cells, fill, false, palette::BLACK);
            }
            RowKind::Total => {
                draw_row(&mut page, top, &extents, cells, palette::LIGHT_BLUE, true, palette::BLACK);
            }
        }
        top -= ROW_HEIGHT;
    }
    pages.push(page);
    pages
}

fn rgb(hex: u32) -> Color {
    let channel = |shift: u32| ((hex >> shift) & 0xFF) as f32 / 255.0;
    Color::Rgb(Rgb::new(channel(16), channel(8), channel(0), None))
}

fn pdf_err(e: impl std::fmt::Display) -> ExportError {
    ExportError::Pdf(e.to_string())
}

/// 渲染 PDF 字节
pub fn to_pdf(layout: &TableLayout, title: &str, generated_on: &str) -> Result<Vec<u8>, ExportError> {
    let pages = plan(layout, title, generated_on);

    let (doc, first_page, first_layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let regular: IndirectFontRef = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
    let bold: IndirectFontRef = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;

    for (i, page) in pages.iter().enumerate() {
        let (page_idx, layer_idx) = if i == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Layer {}", i + 1))
        };
        let layer = doc.get_page(page_idx).get_layer(layer_idx);

        for op in &page.ops {
            match op {
                DrawOp::Fill {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => {
                    layer.set_fill_color(rgb(*color));
                    layer.add_rect(Rect::new(Mm(*x), Mm(*y), Mm(x + width), Mm(y + height)));
                }
                DrawOp::Text {
                    x,
                    y,
                    size,
                    bold: is_bold,
                    color,
                    text,
                } => {
                    layer.set_fill_color(rgb(*color));
                    let font = if *is_bold { &bold } else { &regular };
                    layer.use_text(text.clone(), *size, Mm(*x), Mm(*y), font);
                }
            }
        }
    }

    let bytes = doc.save_to_bytes().map_err(pdf_err)?;
    tracing::debug!(pages = pages.len(), bytes = bytes.len(), "pdf rendered");
    Ok(bytes)
}
