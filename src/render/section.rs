use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;

use super::format::NumberFormat;

/// Shown in place of an empty table, chart or KPI
pub const PLACEHOLDER: &str = "Aucune donnée";

/// A typed value; sinks decide how to present it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Text(String),
    Integer(i64),
    /// Price or line amount
    Money(Decimal),
    /// Summary figure, shown with fewer decimals
    Amount(Decimal),
    Percent(Decimal),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Human-facing rendering, used by the PDF
    pub fn display(&self, fmt: &NumberFormat) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Integer(n) => fmt.integer(*n),
            Cell::Money(d) => fmt.money(*d),
            Cell::Amount(d) => fmt.summary_money(*d),
            Cell::Percent(d) => fmt.percent(*d),
            Cell::Date(d) => fmt.date(*d),
            Cell::DateTime(at) => format!("{} {}", fmt.date(at.date()), at.format("%H:%M")),
        }
    }

    /// Plain machine-readable rendering, used by CSV
    pub fn raw(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Integer(n) => n.to_string(),
            Cell::Money(d) | Cell::Amount(d) | Cell::Percent(d) => d.normalize().to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::DateTime(at) => at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Cell::Integer(n) => Some(Decimal::from(*n)),
            Cell::Money(d) | Cell::Amount(d) | Cell::Percent(d) => Some(*d),
            Cell::Text(_) | Cell::Date(_) | Cell::DateTime(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiTile {
    pub label: String,
    pub value: Cell,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiBlock {
    pub title: String,
    pub tiles: Vec<KpiTile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub title: String,
    /// Worksheet name in the workbook export
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Cap on rows laid out in the paged document; exports get all rows
    pub display_limit: Option<usize>,
}

impl Table {
    pub fn new(title: &str, sheet_name: &str, columns: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            sheet_name: sheet_name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            display_limit: None,
        }
    }

    pub fn limit(mut self, rows: usize) -> Self {
        self.display_limit = Some(rows);
        self
    }

    pub fn visible_rows(&self) -> &[Vec<Cell>] {
        let shown = self.display_limit.map_or(self.rows.len(), |n| n.min(self.rows.len()));
        &self.rows[..shown]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub title: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreeText {
    pub title: Option<String>,
    pub body: String,
    /// Larger type, used for the document heading
    pub heading: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Section {
    Kpis(KpiBlock),
    Table(Table),
    Bar(Series),
    Pie(Series),
    Text(FreeText),
}

impl Section {
    pub fn title(&self) -> Option<&str> {
        match self {
            Section::Kpis(k) => Some(&k.title),
            Section::Table(t) => Some(&t.title),
            Section::Bar(s) | Section::Pie(s) => Some(&s.title),
            Section::Text(t) => t.title.as_deref(),
        }
    }

    /// True when the section will draw its placeholder
    pub fn is_empty(&self) -> bool {
        match self {
            Section::Kpis(k) => k.tiles.is_empty(),
            Section::Table(t) => t.rows.is_empty(),
            Section::Bar(s) | Section::Pie(s) => s.points.is_empty(),
            Section::Text(t) => t.body.trim().is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_cells_are_plain() {
        assert_eq!(Cell::Money("40.50".parse().unwrap()).raw(), "40.5");
        assert_eq!(Cell::Amount("100".parse().unwrap()).raw(), "100");
        assert_eq!(
            Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()).raw(),
            "2024-01-05"
        );
        let at = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(Cell::DateTime(at).raw(), "2024-01-05 14:30");
        assert_eq!(Cell::DateTime(at).as_number(), None);
    }

    #[test]
    fn display_limit_caps_visible_rows_only() {
        let mut table = Table::new("Ventes", "Ventes", &["ID"]).limit(2);
        table.rows = (0..5).map(|i| vec![Cell::Integer(i)]).collect();

        assert_eq!(table.visible_rows().len(), 2);
        assert_eq!(table.rows.len(), 5);
    }
}
