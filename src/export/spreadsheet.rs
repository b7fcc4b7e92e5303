use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::error::AppResult;
use crate::models::InventoryRecord;

use super::{ExportSummary, ReportLocale, NO_IMAGE};

pub const INVENTORY_SHEET: &str = "Inventory";
pub const SUMMARY_SHEET: &str = "Summary";

/// Header text and column width (in characters) of the inventory sheet
pub const INVENTORY_COLUMNS: [(&str, f64); 7] = [
    ("ID", 20.0),
    ("Description", 40.0),
    ("Status", 15.0),
    ("Warehouse", 20.0),
    ("Image URL", 50.0),
    ("Created", 15.0),
    ("Updated", 15.0),
];

pub const SUMMARY_COLUMNS: [(&str, f64); 2] = [("Metric", 25.0), ("Value", 30.0)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryValue {
    Count(usize),
    Text(String),
}

/// Cell contents of the two-sheet workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetReport {
    pub rows: Vec<[String; 7]>,
    pub summary: Vec<(&'static str, SummaryValue)>,
}

impl SpreadsheetReport {
    pub fn build(records: &[InventoryRecord], locale: &ReportLocale, now: DateTime<Utc>) -> Self {
        let rows = records
            .iter()
            .map(|record| {
                [
                    record.id.clone(),
                    record.description.clone(),
                    record.status.label().to_string(),
                    record.warehouse.label().to_string(),
                    record.image_url().unwrap_or(NO_IMAGE).to_string(),
                    locale.date(record.created_at),
                    locale.date(record.updated_at),
                ]
            })
            .collect();

        let counts = ExportSummary::from_records(records);
        let summary = vec![
            ("Total items", SummaryValue::Count(counts.total)),
            ("New items", SummaryValue::Count(counts.new)),
            ("Used items", SummaryValue::Count(counts.used)),
            ("Items with image", SummaryValue::Count(counts.with_image)),
            ("Items without image", SummaryValue::Count(counts.without_image)),
            ("Export date", SummaryValue::Text(locale.datetime(now))),
        ];

        Self { rows, summary }
    }

    pub fn summary_count(&self, metric: &str) -> Option<usize> {
        self.summary.iter().find_map(|(name, value)| match value {
            SummaryValue::Count(n) if *name == metric => Some(*n),
            _ => None,
        })
    }

    /// Writes the `.xlsx` workbook into memory.
    pub fn render(&self) -> AppResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();

        let sheet = workbook.add_worksheet();
        sheet.set_name(INVENTORY_SHEET)?;
        write_header(sheet, &INVENTORY_COLUMNS, &header)?;
        for (i, row) in self.rows.iter().enumerate() {
            let row_num = (i + 1) as u32;
            for (col, value) in row.iter().enumerate() {
                sheet.write_string(row_num, col as u16, value.as_str())?;
            }
        }

        let sheet = workbook.add_worksheet();
        sheet.set_name(SUMMARY_SHEET)?;
        write_header(sheet, &SUMMARY_COLUMNS, &header)?;
        for (i, (metric, value)) in self.summary.iter().enumerate() {
            let row_num = (i + 1) as u32;
            sheet.write_string(row_num, 0, *metric)?;
            match value {
                SummaryValue::Count(n) => sheet.write_number(row_num, 1, *n as f64)?,
                SummaryValue::Text(text) => sheet.write_string(row_num, 1, text.as_str())?,
            };
        }

        Ok(workbook.save_to_buffer()?)
    }
}

fn write_header(sheet: &mut Worksheet, columns: &[(&str, f64)], format: &Format) -> AppResult<()> {
    for (col, (title, width)) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, format)?;
        sheet.set_column_width(col as u16, *width)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::{record, ts};
    use crate::models::ItemStatus;

    #[test]
    fn test_rows_use_labels_and_formatted_dates() {
        let records = vec![record("abc123", "Dell Monitor 24\"", ItemStatus::New, None)];
        let report = SpreadsheetReport::build(&records, &ReportLocale::default(), ts(1_700_000_000));
        assert_eq!(
            report.rows[0],
            [
                "abc123".to_string(),
                "Dell Monitor 24\"".to_string(),
                "New".to_string(),
                "Main Warehouse".to_string(),
                NO_IMAGE.to_string(),
                "14/11/2023".to_string(),
                "15/11/2023".to_string(),
            ]
        );
    }

    #[test]
    fn test_image_url_column() {
        let records = vec![
            record("a", "with photo", ItemStatus::New, Some("https://media.test/a.png")),
            record("b", "without photo", ItemStatus::Used, None),
        ];
        let report = SpreadsheetReport::build(&records, &ReportLocale::default(), ts(0));
        assert_eq!(report.rows[0][4], "https://media.test/a.png");
        assert_eq!(report.rows[1][4], "No image");
        assert_eq!(report.summary_count("Items with image"), Some(1));
        assert_eq!(report.summary_count("Items without image"), Some(1));
    }

    #[test]
    fn test_summary_sums_to_total() {
        let records = vec![
            record("a", "one", ItemStatus::New, None),
            record("b", "two", ItemStatus::Used, Some("https://media.test/b.png")),
            record("c", "three", ItemStatus::Used, None),
        ];
        let report = SpreadsheetReport::build(&records, &ReportLocale::default(), ts(0));
        let total = report.summary_count("Total items").unwrap();
        assert_eq!(total, report.rows.len());
        assert_eq!(
            report.summary_count("New items").unwrap() + report.summary_count("Used items").unwrap(),
            total
        );
        assert_eq!(
            report.summary_count("Items with image").unwrap()
                + report.summary_count("Items without image").unwrap(),
            total
        );
        assert_eq!(
            report.summary.last().unwrap().1,
            SummaryValue::Text("01/01/1970 00:00:00".to_string())
        );
    }

    #[test]
    fn test_empty_list_renders_valid_workbook() {
        let report = SpreadsheetReport::build(&[], &ReportLocale::default(), ts(0));
        assert!(report.rows.is_empty());
        for metric in ["Total items", "New items", "Used items", "Items with image", "Items without image"] {
            assert_eq!(report.summary_count(metric), Some(0));
        }
        let bytes = report.render().unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_same_input_same_report() {
        let records = vec![record("a", "one", ItemStatus::New, None)];
        let locale = ReportLocale::default();
        assert_eq!(
            SpreadsheetReport::build(&records, &locale, ts(5)),
            SpreadsheetReport::build(&records, &locale, ts(5))
        );
    }
}
