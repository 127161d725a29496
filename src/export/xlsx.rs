use rust_decimal::prelude::ToPrimitive;
use std::collections::HashSet;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::error::{ReportError, Result};
use crate::render::{Cell, NumberFormat, ReportDocument, Table, PLACEHOLDER};

pub const SUMMARY_SHEET: &str = "Résumé";
const MAX_SHEET_NAME: usize = 31;

/// Build the workbook: a summary sheet with the KPIs, then one sheet per
/// table carrying every row.
pub fn build_workbook(doc: &ReportDocument, fmt: &NumberFormat) -> Result<Spreadsheet> {
    let mut book = umya_spreadsheet::new_file_empty_worksheet();
    let mut used: HashSet<String> = HashSet::new();

    let summary = add_sheet(&mut book, &mut used, SUMMARY_SHEET)?;
    write_summary(summary, doc, fmt);

    for table in doc.tables() {
        let sheet = add_sheet(&mut book, &mut used, &table.sheet_name)?;
        write_table(sheet, table);
    }
    Ok(book)
}

pub fn to_xlsx_bytes(doc: &ReportDocument, fmt: &NumberFormat) -> Result<Vec<u8>> {
    let book = build_workbook(doc, fmt)?;
    let mut out = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut out)
        .map_err(|e| ReportError::Workbook(e.to_string()))?;
    Ok(out.into_inner())
}

pub fn write_xlsx(doc: &ReportDocument, fmt: &NumberFormat, path: &Path) -> Result<()> {
    let bytes = to_xlsx_bytes(doc, fmt)?;
    fs::write(path, bytes)?;
    tracing::info!(path = %path.display(), "workbook written");
    Ok(())
}

fn add_sheet<'a>(
    book: &'a mut Spreadsheet,
    used: &mut HashSet<String>,
    wanted: &str,
) -> Result<&'a mut Worksheet> {
    let name = unique_sheet_name(used, wanted);
    used.insert(name.clone());
    book.new_sheet(&name)
        .map_err(|e| ReportError::Workbook(format!("sheet '{name}': {e}")))
}

fn write_summary(sheet: &mut Worksheet, doc: &ReportDocument, fmt: &NumberFormat) {
    put_text(sheet, 1, 1, &doc.title);
    bold(sheet, 1, 1);
    put_text(sheet, 1, 2, "Généré le:");
    put_text(sheet, 2, 2, &fmt.date(doc.generated_at.date()));
    put_text(sheet, 1, 4, "Métriques Clés");
    bold(sheet, 1, 4);

    let mut row: u32 = 5;
    for tile in doc.kpi_tiles() {
        put_text(sheet, 1, row, &format!("{}:", tile.label));
        set_cell(sheet, 2, row, &tile.value);
        row += 1;
    }
    if row == 5 {
        put_text(sheet, 1, row, PLACEHOLDER);
    }
}

fn write_table(sheet: &mut Worksheet, table: &Table) {
    for (i, column) in table.columns.iter().enumerate() {
        let col = i as u32 + 1;
        put_text(sheet, col, 1, column);
        bold(sheet, col, 1);
    }
    if table.rows.is_empty() {
        put_text(sheet, 1, 2, PLACEHOLDER);
        return;
    }
    for (r, cells) in table.rows.iter().enumerate() {
        let row = r as u32 + 2;
        for (c, cell) in cells.iter().enumerate() {
            set_cell(sheet, c as u32 + 1, row, cell);
        }
    }
}

fn put_text(sheet: &mut Worksheet, col: u32, row: u32, value: &str) {
    sheet.get_cell_mut((col, row)).set_value(value);
}

fn bold(sheet: &mut Worksheet, col: u32, row: u32) {
    sheet.get_style_mut((col, row)).get_font_mut().set_bold(true);
}

/// Numbers stay numeric so the sheet can sum them
fn set_cell(sheet: &mut Worksheet, col: u32, row: u32, cell: &Cell) {
    let target = sheet.get_cell_mut((col, row));
    match cell.as_number().and_then(|d| d.to_f64()) {
        Some(n) => {
            target.set_value_number(n);
        }
        None => {
            target.set_value(cell.raw());
        }
    }
}

/// Strip characters Excel rejects, cap at 31 chars and suffix duplicates
fn unique_sheet_name(used: &HashSet<String>, wanted: &str) -> String {
    let illegal = [':', '/', '\\', '?', '*', '[', ']'];
    let cleaned: String = wanted
        .chars()
        .map(|c| if illegal.contains(&c) { ' ' } else { c })
        .collect();
    let cleaned = match cleaned.trim() {
        "" => "Feuille",
        trimmed => trimmed,
    };
    let base: String = cleaned.chars().take(MAX_SHEET_NAME).collect();

    if !used.contains(&base) {
        return base;
    }
    (2..)
        .map(|n| {
            let suffix = format!(" ({n})");
            let keep = MAX_SHEET_NAME - suffix.chars().count();
            format!("{}{}", base.chars().take(keep).collect::<String>(), suffix)
        })
        .find(|candidate| !used.contains(candidate))
        .unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, AggregateOptions, Granularity};
    use crate::model::{RawLineItem, RawProduct, RawSale};
    use crate::render::{render, LayoutOptions, ReportKind};
    use chrono::NaiveDate;

    fn doc(kind: ReportKind, sale_count: i64) -> ReportDocument {
        let sales: Vec<RawSale> = (1..=sale_count)
            .map(|id| RawSale {
                id,
                timestamp: Some("2024-01-05T10:00:00".to_string()),
                total_amount: Some("12.5".parse().unwrap()),
                line_items: Some(vec![RawLineItem {
                    product_id: Some(1),
                    quantity: Some(1),
                    unit_price: Some("12.5".parse().unwrap()),
                    product_title: None,
                }]),
                ..Default::default()
            })
            .collect();
        let products = vec![RawProduct {
            id: 1,
            title: Some("Widget".to_string()),
            ..Default::default()
        }];
        let options = AggregateOptions {
            granularity: Granularity::Day,
            date_range: None,
            reference_time: NaiveDate::from_ymd_opt(2024, 2, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };
        let summary = aggregate(&sales, &products, &[], &options);
        render(kind, &summary, &LayoutOptions::default())
    }

    fn value(sheet: &Worksheet, col: u32, row: u32) -> String {
        sheet.get_value((col, row))
    }

    fn sheet_names(book: &Spreadsheet) -> Vec<String> {
        book.get_sheet_collection()
            .iter()
            .map(|ws| ws.get_name().to_string())
            .collect()
    }

    #[test]
    fn products_workbook_has_summary_and_table_sheets() {
        let book = build_workbook(&doc(ReportKind::Products, 2), &NumberFormat::default()).unwrap();
        assert_eq!(sheet_names(&book), ["Résumé", "Produits", "Meilleurs Vendeurs"]);

        let best = book.get_sheet_by_name("Meilleurs Vendeurs").unwrap();
        assert_eq!(value(best, 1, 1), "Rang");
        assert_eq!(value(best, 2, 2), "Widget");
    }

    #[test]
    fn table_sheets_are_not_capped() {
        let book = build_workbook(&doc(ReportKind::Sales, 60), &NumberFormat::default()).unwrap();
        let sales = book.get_sheet_by_name("Ventes").unwrap();
        assert_eq!(value(sales, 1, 2), "1");
        assert_eq!(value(sales, 1, 61), "60");
        assert_eq!(value(sales, 1, 62), "");
    }

    #[test]
    fn empty_tables_show_placeholder() {
        let book = build_workbook(&doc(ReportKind::Sales, 0), &NumberFormat::default()).unwrap();
        let sales = book.get_sheet_by_name("Ventes").unwrap();
        assert_eq!(value(sales, 1, 2), PLACEHOLDER);
    }

    #[test]
    fn serializes_to_zip_bytes() {
        let bytes = to_xlsx_bytes(&doc(ReportKind::Monthly, 3), &NumberFormat::default()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn sheet_names_are_sanitized_and_unique() {
        let mut used = HashSet::new();
        let first = unique_sheet_name(&used, "Ventes: 2024/01");
        assert_eq!(first, "Ventes  2024 01");
        used.insert(first);
        assert_eq!(unique_sheet_name(&used, "Ventes: 2024/01"), "Ventes  2024 01 (2)");

        let long = "x".repeat(40);
        let name = unique_sheet_name(&used, &long);
        assert_eq!(name.chars().count(), 31);
        used.insert(name);
        assert_eq!(unique_sheet_name(&used, &long).chars().count(), 31);
    }
}
