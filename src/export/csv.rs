use ::csv::{Terminator, WriterBuilder};
use std::fs;
use std::path::Path;

use super::generated_line;
use crate::error::{ReportError, Result};
use crate::render::{NumberFormat, ReportDocument, Table};

const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Render the document's flat tables as CSV text.
///
/// Output starts with a UTF-8 BOM and two `#` comment lines (title and
/// generation date) followed by a blank line. When a report holds several
/// tables, each gets its own `# <title>` line.
pub fn to_csv_bytes(doc: &ReportDocument, fmt: &NumberFormat) -> Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    buf.extend_from_slice(&BOM);
    buf.extend_from_slice(format!("# {}\n", doc.title).as_bytes());
    buf.extend_from_slice(format!("# {}\n", generated_line(fmt, doc.generated_at)).as_bytes());
    buf.push(b'\n');

    let titled = doc.flat_tables.len() > 1;
    for (i, table) in doc.flat_tables.iter().enumerate() {
        if titled {
            if i > 0 {
                buf.push(b'\n');
            }
            buf.extend_from_slice(format!("# {}\n", table.title).as_bytes());
        }
        buf.append(&mut table_records(table)?);
    }
    Ok(buf)
}

fn table_records(table: &Table) -> Result<Vec<u8>> {
    let mut wtr = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(vec![]);

    wtr.write_record(&table.columns)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(|cell| cell.raw()))?;
    }
    wtr.into_inner()
        .map_err(|e| ReportError::Io(e.into_error()))
}

pub fn write_csv(doc: &ReportDocument, fmt: &NumberFormat, path: &Path) -> Result<()> {
    let bytes = to_csv_bytes(doc, fmt)?;
    fs::write(path, bytes)?;
    tracing::info!(path = %path.display(), "csv written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, AggregateOptions, Granularity};
    use crate::model::{RawCategory, RawSale};
    use crate::render::{render, LayoutOptions, ReportKind};
    use chrono::NaiveDate;

    fn options() -> AggregateOptions {
        AggregateOptions {
            granularity: Granularity::Month,
            date_range: None,
            reference_time: NaiveDate::from_ymd_opt(2024, 2, 1)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
        }
    }

    fn csv_text(kind: ReportKind, sales: &[RawSale], categories: &[RawCategory]) -> String {
        let summary = aggregate(sales, &[], categories, &options());
        let doc = render(kind, &summary, &LayoutOptions::default());
        let bytes = to_csv_bytes(&doc, &NumberFormat::default()).unwrap();
        assert!(bytes.starts_with(&BOM));
        String::from_utf8(bytes[3..].to_vec()).unwrap()
    }

    #[test]
    fn sales_csv_has_metadata_header_and_quoting() {
        let sales = vec![RawSale {
            id: 7,
            sale_date: Some("2024-01-05T14:00:00".to_string()),
            total_amount: Some("1250.5".parse().unwrap()),
            username: Some("Dupont, \"Jean\"".to_string()),
            ..Default::default()
        }];

        let text = csv_text(ReportKind::Sales, &sales, &[]);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "# Rapport des Ventes");
        assert_eq!(lines[1], "# Généré le: 1 février 2024 à 09:30");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "ID,Date,Client,Montant,Statut");
        assert_eq!(
            lines[4],
            "7,2024-01-05 14:00,\"Dupont, \"\"Jean\"\"\",1250.5,CONFIRMED"
        );
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn categories_csv_lists_every_category() {
        let categories = vec![
            RawCategory {
                id: 1,
                name: Some("Outils".to_string()),
                description: Some("Outillage à main, électroportatif".to_string()),
            },
            RawCategory {
                id: 2,
                name: Some("Jardin".to_string()),
                description: None,
            },
        ];

        let text = csv_text(ReportKind::Categories, &[], &categories);

        assert!(text.contains(
            "ID,Nom,Description,Revenu,Unités Vendues,Nombre de Produits\n"
        ));
        assert!(text.contains("1,Outils,\"Outillage à main, électroportatif\",0,0,0\n"));
        assert!(text.contains("2,Jardin,,0,0,0\n"));
    }

    #[test]
    fn custom_csv_titles_each_table() {
        let text = csv_text(ReportKind::Custom, &[], &[]);
        let titles: Vec<&str> = text
            .lines()
            .filter(|l| l.starts_with("# ") && !l.starts_with("# Généré"))
            .collect();
        assert_eq!(
            titles,
            [
                "# Rapport Personnalisé",
                "# Évolution des Ventes",
                "# Revenu par Catégorie",
                "# Revenu par Produit"
            ]
        );
    }

    #[test]
    fn single_table_reports_skip_table_titles() {
        let text = csv_text(ReportKind::Investor, &[], &[]);
        assert!(!text.contains("# Ventes Mensuelles"));
        assert!(text.contains("Mois,Revenu,Commandes\n"));
    }
}
