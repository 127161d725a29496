//! Output sinks for a rendered `ReportDocument`.

pub mod csv;
pub mod xlsx;

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

use crate::render::{NumberFormat, ReportKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Pdf,
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown format '{other}' (use pdf, xlsx or csv)")),
        }
    }
}

/// `rapport_sales_2024-02-01.csv`
pub fn default_file_name(kind: ReportKind, format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "rapport_{}_{}.{}",
        kind.slug(),
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// `Généré le: 1 février 2024 à 09:00`
pub(crate) fn generated_line(fmt: &NumberFormat, at: NaiveDateTime) -> String {
    format!(
        "Généré le: {} à {}",
        fmt.date(at.date()),
        at.format("%H:%M")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_follow_kind_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(
            default_file_name(ReportKind::Monthly, ExportFormat::Xlsx, date),
            "rapport_monthly_2024-02-01.xlsx"
        );
    }

    #[test]
    fn formats_parse() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!("excel".parse::<ExportFormat>(), Ok(ExportFormat::Xlsx));
        assert!("docx".parse::<ExportFormat>().is_err());
    }
}
