//! Spreadsheet and PDF reports over a list of records.
//!
//! Each renderer first builds a plain report model from the records, which
//! is what the content rules apply to, then draws that model with its
//! format library.

pub mod pdf;
pub mod spreadsheet;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

use crate::error::{AppError, AppResult};
use crate::models::{InventoryRecord, ItemStatus};

pub use pdf::PdfReport;
pub use spreadsheet::SpreadsheetReport;

/// Default file name prefix
pub const DEFAULT_BASE_NAME: &str = "inventory";

/// Shown instead of an image URL when a record has no photo
pub const NO_IMAGE: &str = "No image";

pub const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Spreadsheet,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Spreadsheet => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" | "excel" | "spreadsheet" => Ok(ExportFormat::Spreadsheet),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(AppError::Validation(format!(
                "export format must be 'xlsx' or 'pdf', got '{}'",
                s
            ))),
        }
    }
}

/// How dates are written into reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLocale {
    pub offset: FixedOffset,
    pub date_format: String,
    pub datetime_format: String,
}

impl Default for ReportLocale {
    fn default() -> Self {
        Self {
            offset: Utc.fix(),
            date_format: "%d/%m/%Y".to_string(),
            datetime_format: "%d/%m/%Y %H:%M:%S".to_string(),
        }
    }
}

impl ReportLocale {
    pub fn date(&self, ts: DateTime<Utc>) -> String {
        ts.with_timezone(&self.offset).format(&self.date_format).to_string()
    }

    pub fn datetime(&self, ts: DateTime<Utc>) -> String {
        ts.with_timezone(&self.offset)
            .format(&self.datetime_format)
            .to_string()
    }
}

/// `false` when `format` holds a specifier chrono cannot render; formatting
/// a date with such a pattern panics.
pub fn is_valid_date_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Counts shown in the summary sheet and the PDF header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub total: usize,
    pub new: usize,
    pub used: usize,
    pub with_image: usize,
    pub without_image: usize,
}

impl ExportSummary {
    pub fn from_records(records: &[InventoryRecord]) -> Self {
        records.iter().fold(Self::default(), |mut summary, record| {
            summary.total += 1;
            match record.status {
                ItemStatus::New => summary.new += 1,
                ItemStatus::Used => summary.used += 1,
            }
            if record.has_image() {
                summary.with_image += 1;
            } else {
                summary.without_image += 1;
            }
            summary
        })
    }
}

/// Keeps the first `max_chars` characters and appends an ellipsis when
/// anything was cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

/// `<base>_<YYYY-MM-DD>.<ext>`
pub fn export_file_name(base_name: &str, format: ExportFormat, date: NaiveDate) -> String {
    format!("{}_{}.{}", base_name, date.format("%Y-%m-%d"), format.extension())
}

/// A rendered report ready to be handed to the client or saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportFile {
    /// Writes the report into `dir` under its file name.
    pub fn write_to(&self, dir: &Path) -> AppResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        tracing::info!("Report written: path={}, size={}", path.display(), self.bytes.len());
        Ok(path)
    }
}

/// Renders `records` in `format`. `now` stamps both the report and the file name.
pub fn export(
    records: &[InventoryRecord],
    format: ExportFormat,
    base_name: &str,
    locale: &ReportLocale,
    now: DateTime<Utc>,
) -> AppResult<ExportFile> {
    let bytes = match format {
        ExportFormat::Spreadsheet => SpreadsheetReport::build(records, locale, now).render()?,
        ExportFormat::Pdf => PdfReport::build(records, locale, now).render()?,
    };

    tracing::info!(
        "Inventory exported: format={}, items={}, size={}",
        format,
        records.len(),
        bytes.len()
    );

    Ok(ExportFile {
        file_name: export_file_name(base_name, format, now.date_naive()),
        content_type: format.content_type(),
        bytes,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{ImageRef, Warehouse};
    use chrono::TimeZone;

    pub(crate) fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    pub(crate) fn record(id: &str, description: &str, status: ItemStatus, image: Option<&str>) -> InventoryRecord {
        InventoryRecord {
            id: id.to_string(),
            description: description.to_string(),
            status,
            warehouse: Warehouse::Main,
            image: image.map(|url| ImageRef::new(url, format!("inventory/{}", id))),
            created_at: ts(1_700_000_000),
            updated_at: ts(1_700_086_400),
        }
    }

    #[test]
    fn test_truncation_rule() {
        let exact = "a".repeat(35);
        assert_eq!(truncate_with_ellipsis(&exact, 35), exact);

        let long = "b".repeat(36);
        assert_eq!(truncate_with_ellipsis(&long, 35), format!("{}...", "b".repeat(35)));

        assert_eq!(truncate_with_ellipsis("short", 35), "short");
    }

    #[test]
    fn test_truncation_counts_characters() {
        let text = "ñ".repeat(40);
        let cut = truncate_with_ellipsis(&text, 35);
        assert_eq!(cut, format!("{}...", "ñ".repeat(35)));
    }

    #[test]
    fn test_file_name() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        assert_eq!(
            export_file_name("inventory", ExportFormat::Spreadsheet, date),
            "inventory_2026-10-15.xlsx"
        );
        assert_eq!(
            export_file_name("inventory", ExportFormat::Pdf, date),
            "inventory_2026-10-15.pdf"
        );
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Spreadsheet);
        assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Spreadsheet);
        assert_eq!("pdf".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert!("csv".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_summary_counts_add_up() {
        let records = vec![
            record("a", "one", ItemStatus::New, Some("https://media.test/a.png")),
            record("b", "two", ItemStatus::Used, None),
            record("c", "three", ItemStatus::Used, None),
        ];
        let summary = ExportSummary::from_records(&records);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.new + summary.used, summary.total);
        assert_eq!(summary.with_image + summary.without_image, summary.total);
        assert_eq!(summary.with_image, 1);
        assert_eq!(ExportSummary::from_records(&[]), ExportSummary::default());
    }

    #[test]
    fn test_locale_applies_offset() {
        let locale = ReportLocale {
            offset: FixedOffset::west_opt(5 * 3600).unwrap(),
            ..Default::default()
        };
        // 2023-11-14T22:13:20Z is still the 14th five hours west
        assert_eq!(locale.date(ts(1_700_000_000)), "14/11/2023");
        assert_eq!(ReportLocale::default().datetime(ts(1_700_000_000)), "14/11/2023 22:13:20");
    }

    #[test]
    fn test_date_format_validation() {
        assert!(is_valid_date_format("%d/%m/%Y"));
        assert!(is_valid_date_format("%Y-%m-%d %H:%M"));
        assert!(!is_valid_date_format("%Q"));
    }

    #[test]
    fn test_export_names_file_from_now() {
        let records = vec![record("a", "one", ItemStatus::New, None)];
        let file = export(
            &records,
            ExportFormat::Spreadsheet,
            "stock",
            &ReportLocale::default(),
            ts(1_700_000_000),
        )
        .unwrap();
        assert_eq!(file.file_name, "stock_2023-11-14.xlsx");
        assert_eq!(file.content_type, ExportFormat::Spreadsheet.content_type());
        assert!(file.bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_write_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = ExportFile {
            file_name: "inventory_2023-11-14.pdf".to_string(),
            content_type: ExportFormat::Pdf.content_type(),
            bytes: b"%PDF-1.3".to_vec(),
        };
        let path = file.write_to(&dir.path().join("downloads")).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.3");
    }
}
