use chrono::{DateTime, Utc};
use printpdf::{
    BuiltinFont, Color, CustomPdfConformance, IndirectFontRef, Line, Mm, PdfConformance,
    PdfDocument, PdfDocumentReference, PdfLayerReference, Point, Rect, Rgb,
};

use crate::error::{AppError, AppResult};
use crate::models::InventoryRecord;

use super::{truncate_with_ellipsis, ExportSummary, ReportLocale, ELLIPSIS};

pub const REPORT_TITLE: &str = "Inventory Report";

/// Characters of the id kept in the table
pub const ID_CHARS: usize = 8;

/// Descriptions longer than this are cut
pub const DESCRIPTION_CHARS: usize = 35;

/// Header text and width in millimetres of each table column
pub const PDF_COLUMNS: [(&str, f32); 6] = [
    ("ID", 22.0),
    ("Description", 60.0),
    ("Status", 18.0),
    ("Warehouse", 38.0),
    ("Img", 12.0),
    ("Date", 24.0),
];

// A4 portrait
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 14.0;
const MARGIN_TOP: f32 = 15.0;
const MARGIN_BOTTOM: f32 = 15.0;
const TABLE_TOP: f32 = 52.0;
const ROW_HEIGHT: f32 = 7.0;
const TABLE_FONT_SIZE: f32 = 9.0;

const HEADER_FILL: (f32, f32, f32) = (59.0, 130.0, 246.0);
const STRIPE_FILL: (f32, f32, f32) = (249.0, 250.0, 251.0);
const CHECK_COLOR: (f32, f32, f32) = (22.0, 163.0, 74.0);
const CROSS_COLOR: (f32, f32, f32) = (220.0, 38.0, 38.0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfRow {
    pub id: String,
    pub description: String,
    pub status: &'static str,
    pub warehouse: &'static str,
    pub has_image: bool,
    pub created: String,
}

/// Text content of the PDF report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfReport {
    pub title: String,
    pub date_line: String,
    pub total_line: String,
    pub breakdown_line: String,
    pub rows: Vec<PdfRow>,
}

impl PdfReport {
    pub fn build(records: &[InventoryRecord], locale: &ReportLocale, now: DateTime<Utc>) -> Self {
        let summary = ExportSummary::from_records(records);

        let rows = records
            .iter()
            .map(|record| PdfRow {
                id: format!(
                    "{}{}",
                    record.id.chars().take(ID_CHARS).collect::<String>(),
                    ELLIPSIS
                ),
                description: truncate_with_ellipsis(&record.description, DESCRIPTION_CHARS),
                status: record.status.label(),
                warehouse: record.warehouse.label(),
                has_image: record.has_image(),
                created: locale.date(record.created_at),
            })
            .collect();

        Self {
            title: REPORT_TITLE.to_string(),
            date_line: format!("Date: {}", locale.date(now)),
            total_line: format!("Total: {} items", summary.total),
            breakdown_line: format!(
                "New: {} | Used: {} | With image: {}",
                summary.new, summary.used, summary.with_image
            ),
            rows,
        }
    }

    /// Draws the report on as many A4 pages as the table needs.
    pub fn render(&self) -> AppResult<Vec<u8>> {
        let (doc, page, layer) =
            PdfDocument::new(&self.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let doc = doc.with_conformance(PdfConformance::Custom(CustomPdfConformance {
            requires_icc_profile: false,
            requires_xmp_metadata: false,
            ..Default::default()
        }));

        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AppError::Export(format!("PDF font error: {:?}", e)))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| AppError::Export(format!("PDF font error: {:?}", e)))?;

        let mut canvas = Canvas {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            regular,
            bold,
            pages: 1,
        };

        canvas.text(&self.title, 20.0, MARGIN_LEFT, 22.0, true);
        canvas.text(&self.date_line, 12.0, MARGIN_LEFT, 32.0, false);
        canvas.text(&self.total_line, 12.0, MARGIN_LEFT, 39.0, false);
        canvas.text(&self.breakdown_line, 10.0, MARGIN_LEFT, 46.0, false);

        canvas.header_row(TABLE_TOP);
        let layout = row_layout(self.rows.len());
        for (i, (row, (page, top))) in self.rows.iter().zip(layout).enumerate() {
            if page >= canvas.pages {
                canvas.new_page();
                canvas.header_row(MARGIN_TOP);
            }
            canvas.data_row(row, top, i % 2 == 1);
        }

        tracing::debug!("PDF rendered: rows={}, pages={}", self.rows.len(), canvas.pages);

        doc.save_to_bytes()
            .map_err(|e| AppError::Export(format!("PDF write error: {:?}", e)))
    }
}

/// Zero-based page and top offset of each data row. Pages after the first
/// repeat the header at `MARGIN_TOP`.
fn row_layout(rows: usize) -> Vec<(usize, f32)> {
    let mut page = 0;
    let mut top = TABLE_TOP + ROW_HEIGHT;
    (0..rows)
        .map(|_| {
            if PAGE_HEIGHT - (top + ROW_HEIGHT) < MARGIN_BOTTOM {
                page += 1;
                top = MARGIN_TOP + ROW_HEIGHT;
            }
            let slot = (page, top);
            top += ROW_HEIGHT;
            slot
        })
        .collect()
}

fn rgb((r, g, b): (f32, f32, f32)) -> Color {
    Color::Rgb(Rgb::new(r / 255.0, g / 255.0, b / 255.0, None))
}

/// Drawing helpers. Positions are given from the top of the page in millimetres.
struct Canvas<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    pages: usize,
}

impl Canvas<'_> {
    fn new_page(&mut self) {
        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            format!("Layer {}", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
    }

    fn text(&self, text: &str, size: f32, x: f32, top: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer
            .use_text(text, size, Mm(x), Mm(PAGE_HEIGHT - top), font);
    }

    fn fill_row(&self, top: f32, color: (f32, f32, f32)) {
        let width: f32 = PDF_COLUMNS.iter().map(|(_, w)| w).sum();
        self.layer.set_fill_color(rgb(color));
        self.layer.add_rect(Rect::new(
            Mm(MARGIN_LEFT),
            Mm(PAGE_HEIGHT - top - ROW_HEIGHT),
            Mm(MARGIN_LEFT + width),
            Mm(PAGE_HEIGHT - top),
        ));
    }

    fn cells<'s>(&self, values: impl IntoIterator<Item = &'s str>, top: f32, bold: bool) {
        let baseline = top + ROW_HEIGHT - 2.2;
        let mut x = MARGIN_LEFT;
        for ((_, width), value) in PDF_COLUMNS.iter().zip(values) {
            if !value.is_empty() {
                self.text(value, TABLE_FONT_SIZE, x + 1.5, baseline, bold);
            }
            x += width;
        }
    }

    fn header_row(&self, top: f32) {
        self.fill_row(top, HEADER_FILL);
        self.layer.set_fill_color(rgb((255.0, 255.0, 255.0)));
        self.cells(PDF_COLUMNS.iter().map(|(title, _)| *title), top, true);
        self.layer.set_fill_color(rgb((0.0, 0.0, 0.0)));
    }

    fn data_row(&self, row: &PdfRow, top: f32, striped: bool) {
        if striped {
            self.fill_row(top, STRIPE_FILL);
            self.layer.set_fill_color(rgb((0.0, 0.0, 0.0)));
        }
        self.cells(
            [
                row.id.as_str(),
                row.description.as_str(),
                row.status,
                row.warehouse,
                "",
                row.created.as_str(),
            ],
            top,
            false,
        );

        let img_x: f32 = MARGIN_LEFT + PDF_COLUMNS.iter().take(4).map(|(_, w)| w).sum::<f32>();
        let center_x = img_x + PDF_COLUMNS[4].1 / 2.0;
        let center_y = PAGE_HEIGHT - top - ROW_HEIGHT / 2.0;
        if row.has_image {
            self.check_mark(center_x, center_y);
        } else {
            self.cross(center_x, center_y);
        }
    }

    fn stroke(&self, points: &[(f32, f32)], color: (f32, f32, f32)) {
        self.layer.set_outline_color(rgb(color));
        self.layer.set_outline_thickness(1.2);
        self.layer.add_line(Line {
            points: points
                .iter()
                .map(|(x, y)| (Point::new(Mm(*x), Mm(*y)), false))
                .collect(),
            is_closed: false,
        });
    }

    fn check_mark(&self, x: f32, y: f32) {
        self.stroke(&[(x - 1.6, y), (x - 0.4, y - 1.3), (x + 1.8, y + 1.5)], CHECK_COLOR);
    }

    fn cross(&self, x: f32, y: f32) {
        self.stroke(&[(x - 1.3, y - 1.3), (x + 1.3, y + 1.3)], CROSS_COLOR);
        self.stroke(&[(x - 1.3, y + 1.3), (x + 1.3, y - 1.3)], CROSS_COLOR);
    }
}
