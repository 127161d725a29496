//! Paged PDF output.
//!
//! The laid-out document is flattened into a JSON payload of absolutely
//! positioned blocks, which the Typst template draws page by page.

mod typst;

pub use typst::generate_pdf;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::CompanySettings;
use crate::render::layout::{
    self, CHART_HEIGHT, KPI_COLUMNS, KPI_ROW_HEIGHT, TABLE_HEADER_HEIGHT, TABLE_ROW_HEIGHT,
    TEXT_LINE_HEIGHT, TITLE_HEIGHT,
};
use crate::render::{NumberFormat, Placement, ReportDocument, Section, Series, PLACEHOLDER};

/// Slices shown in a share chart before the rest is folded into "Autres"
const MAX_SHARE_SLICES: usize = 8;

#[derive(Debug, Serialize)]
pub struct PdfPayload {
    pub title: String,
    pub footer: String,
    pub placeholder: &'static str,
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    pub content_width: f64,
    pub title_height: f64,
    pub text_line_height: f64,
    pub kpi_columns: usize,
    pub kpi_row_height: f64,
    pub chart_height: f64,
    pub table_header_height: f64,
    pub table_row_height: f64,
    pub pages: Vec<PdfPage>,
}

#[derive(Debug, Serialize)]
pub struct PdfPage {
    pub number: usize,
    pub total: usize,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Serialize)]
pub struct Tile {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: String,
    /// Height relative to the tallest bar, 0..=1
    pub ratio: f64,
}

#[derive(Debug, Serialize)]
pub struct Slice {
    pub label: String,
    pub value: String,
    pub percent: String,
    /// Share of the total, 0..=1
    pub ratio: f64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Text {
        y: f64,
        height: f64,
        title: Option<String>,
        lines: Vec<String>,
        heading: bool,
        subtitle: Option<String>,
    },
    Kpis {
        y: f64,
        height: f64,
        title: String,
        tiles: Vec<Tile>,
    },
    Bar {
        y: f64,
        height: f64,
        title: String,
        points: Vec<Bar>,
    },
    Pie {
        y: f64,
        height: f64,
        title: String,
        points: Vec<Slice>,
    },
    Table {
        y: f64,
        height: f64,
        /// `None` on continuation fragments
        title: Option<String>,
        continued: bool,
        columns: Vec<String>,
        numeric: Vec<bool>,
        rows: Vec<Vec<String>>,
    },
}

/// Flatten `doc` into the structure the Typst template reads
pub fn build_payload(
    doc: &ReportDocument,
    fmt: &NumberFormat,
    company: &CompanySettings,
) -> PdfPayload {
    let layout = &doc.layout;
    let generated = crate::export::generated_line(fmt, doc.generated_at);

    let pages = doc
        .pages
        .iter()
        .map(|page| PdfPage {
            number: page.number,
            total: page.total,
            blocks: page
                .placements
                .iter()
                .filter_map(|placement| {
                    let section = doc.sections.get(placement.section)?;
                    Some(block(section, placement, fmt, layout, &generated))
                })
                .collect(),
        })
        .collect();

    let footer = match company.email.as_deref() {
        Some(email) if !email.is_empty() => format!("{} · {}", company.name, email),
        _ => company.name.clone(),
    };

    PdfPayload {
        title: doc.title.clone(),
        footer,
        placeholder: PLACEHOLDER,
        page_width: layout.page_width,
        page_height: layout.page_height,
        margin: layout.margin,
        content_width: layout.content_width(),
        title_height: TITLE_HEIGHT,
        text_line_height: TEXT_LINE_HEIGHT,
        kpi_columns: KPI_COLUMNS,
        kpi_row_height: KPI_ROW_HEIGHT,
        chart_height: CHART_HEIGHT,
        table_header_height: TABLE_HEADER_HEIGHT,
        table_row_height: TABLE_ROW_HEIGHT,
        pages,
    }
}

fn block(
    section: &Section,
    placement: &Placement,
    fmt: &NumberFormat,
    layout: &layout::LayoutOptions,
    generated: &str,
) -> Block {
    let (y, height) = (placement.y, placement.height);
    match section {
        Section::Text(text) => {
            let mut lines = layout::wrap_text(&text.body, layout::chars_per_line(layout));
            if lines.iter().all(|l| l.trim().is_empty()) {
                lines = vec![PLACEHOLDER.to_string()];
            }
            Block::Text {
                y,
                height,
                title: text.title.clone(),
                lines,
                heading: text.heading,
                subtitle: text.heading.then(|| generated.to_string()),
            }
        }
        Section::Kpis(kpis) => Block::Kpis {
            y,
            height,
            title: kpis.title.clone(),
            tiles: kpis
                .tiles
                .iter()
                .map(|t| Tile {
                    label: t.label.clone(),
                    value: t.value.display(fmt),
                })
                .collect(),
        },
        Section::Bar(series) => Block::Bar {
            y,
            height,
            title: series.title.clone(),
            points: bars(series, fmt),
        },
        Section::Pie(series) => Block::Pie {
            y,
            height,
            title: series.title.clone(),
            points: slices(series, fmt),
        },
        Section::Table(table) => {
            let rows = placement
                .rows
                .clone()
                .and_then(|range| table.visible_rows().get(range))
                .unwrap_or_default();
            Block::Table {
                y,
                height,
                title: (!placement.continued).then(|| table.title.clone()),
                continued: placement.continued,
                columns: table.columns.clone(),
                numeric: (0..table.columns.len())
                    .map(|i| {
                        table
                            .rows
                            .first()
                            .and_then(|row| row.get(i))
                            .is_some_and(|cell| cell.as_number().is_some())
                    })
                    .collect(),
                rows: rows
                    .iter()
                    .map(|row| row.iter().map(|cell| cell.display(fmt)).collect())
                    .collect(),
            }
        }
    }
}

fn ratio(part: Decimal, whole: Decimal) -> f64 {
    if whole <= Decimal::ZERO || part <= Decimal::ZERO {
        return 0.0;
    }
    part.checked_div(whole)
        .and_then(|r| r.to_f64())
        .unwrap_or(0.0)
        .clamp(0.0, 1.0)
}

fn bars(series: &Series, fmt: &NumberFormat) -> Vec<Bar> {
    let max = series
        .points
        .iter()
        .map(|p| p.value)
        .max()
        .unwrap_or(Decimal::ZERO);
    series
        .points
        .iter()
        .map(|p| Bar {
            label: p.label.clone(),
            value: fmt.summary_money(p.value),
            ratio: ratio(p.value, max),
        })
        .collect()
}

fn slices(series: &Series, fmt: &NumberFormat) -> Vec<Slice> {
    let mut parts: Vec<(String, Decimal)> = series
        .points
        .iter()
        .map(|p| (p.label.clone(), p.value))
        .collect();
    if parts.len() > MAX_SHARE_SLICES {
        let rest = parts
            .drain(MAX_SHARE_SLICES - 1..)
            .fold(Decimal::ZERO, |acc, (_, value)| acc.saturating_add(value));
        parts.push(("Autres".to_string(), rest));
    }

    let total = parts
        .iter()
        .fold(Decimal::ZERO, |acc, (_, value)| acc.saturating_add(*value));
    parts
        .into_iter()
        .map(|(label, value)| {
            let share = value
                .checked_div(total)
                .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
                .filter(|_| total > Decimal::ZERO)
                .map_or(Decimal::ZERO, |s| s.round_dp(1));
            Slice {
                label,
                value: fmt.summary_money(value),
                percent: fmt.percent(share),
                ratio: ratio(value, total),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, AggregateOptions, Granularity};
    use crate::model::RawSale;
    use crate::render::{render, LayoutOptions, ReportKind, SeriesPoint};
    use chrono::NaiveDate;

    fn company() -> CompanySettings {
        CompanySettings {
            name: "Boutique Atlas".to_string(),
            email: Some("contact@atlas.ma".to_string()),
        }
    }

    fn sales_doc(count: i64) -> ReportDocument {
        let sales: Vec<RawSale> = (1..=count)
            .map(|id| RawSale {
                id,
                sale_date: Some(format!("2024-03-{:02}", id % 28 + 1)),
                total_amount: Some(Decimal::from(id)),
                ..Default::default()
            })
            .collect();
        let options = AggregateOptions {
            granularity: Granularity::Day,
            date_range: None,
            reference_time: NaiveDate::from_ymd_opt(2024, 4, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        };
        let summary = aggregate(&sales, &[], &[], &options);
        render(ReportKind::Sales, &summary, &LayoutOptions::default())
    }

    fn table_blocks(payload: &PdfPayload) -> Vec<(&Option<String>, bool, &Vec<String>, usize)> {
        payload
            .pages
            .iter()
            .flat_map(|p| &p.blocks)
            .filter_map(|b| match b {
                Block::Table {
                    title,
                    continued,
                    columns,
                    rows,
                    ..
                } => Some((title, *continued, columns, rows.len())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn continuation_fragments_repeat_the_header() {
        let layout = LayoutOptions {
            page_height: 120.0,
            ..LayoutOptions::default()
        };
        let mut doc = sales_doc(40);
        doc.pages = crate::render::paginate(&doc.sections, &layout);
        doc.layout = layout;

        let payload = build_payload(&doc, &NumberFormat::default(), &company());
        let fragments = table_blocks(&payload);

        assert!(fragments.len() > 1);
        for (i, (title, continued, columns, _)) in fragments.iter().enumerate() {
            assert_eq!(*continued, i > 0);
            assert_eq!(title.is_some(), i == 0);
            assert_eq!(columns.as_slice(), ["ID", "Date", "Client", "Montant", "Statut"]);
        }
        let rows: usize = fragments.iter().map(|f| f.3).sum();
        assert_eq!(rows, 40);
    }

    #[test]
    fn values_are_formatted_for_display() {
        let payload = build_payload(&sales_doc(2), &NumberFormat::default(), &company());
        let kpis = payload.pages[0]
            .blocks
            .iter()
            .find_map(|b| match b {
                Block::Kpis { tiles, .. } => Some(tiles),
                _ => None,
            })
            .unwrap();
        assert_eq!(kpis[0].label, "Revenu Total");
        assert_eq!(kpis[0].value, "3\u{a0}DH");
        assert_eq!(kpis[2].value, "1,50\u{a0}DH");
        assert_eq!(payload.footer, "Boutique Atlas · contact@atlas.ma");
    }

    #[test]
    fn heading_carries_generation_line() {
        let payload = build_payload(&sales_doc(1), &NumberFormat::default(), &company());
        match &payload.pages[0].blocks[0] {
            Block::Text {
                heading, subtitle, ..
            } => {
                assert!(*heading);
                assert_eq!(subtitle.as_deref(), Some("Généré le: 1 avril 2024 à 08:00"));
            }
            other => panic!("unexpected first block {other:?}"),
        }
    }

    #[test]
    fn share_chart_folds_small_slices() {
        let series = Series {
            title: "Parts".to_string(),
            points: (1..=10)
                .map(|i| SeriesPoint {
                    label: format!("C{i}"),
                    value: Decimal::from(10),
                })
                .collect(),
        };
        let slices = slices(&series, &NumberFormat::default());
        assert_eq!(slices.len(), MAX_SHARE_SLICES);
        assert_eq!(slices.last().unwrap().label, "Autres");
        assert_eq!(slices.last().unwrap().percent, "30\u{a0}%");
        assert!((slices[0].ratio - 0.1).abs() < 1e-9);
    }

    #[test]
    fn share_chart_survives_huge_values() {
        let series = Series {
            title: "Parts".to_string(),
            points: (1..=10)
                .map(|i| SeriesPoint {
                    label: format!("C{i}"),
                    value: Decimal::MAX,
                })
                .collect(),
        };
        let slices = slices(&series, &NumberFormat::default());
        assert_eq!(slices.len(), MAX_SHARE_SLICES);
        assert!(slices.iter().all(|s| (0.0..=1.0).contains(&s.ratio)));
    }

    #[test]
    fn bars_scale_to_the_tallest() {
        let series = Series {
            title: "CA".to_string(),
            points: vec![
                SeriesPoint {
                    label: "a".to_string(),
                    value: Decimal::from(50),
                },
                SeriesPoint {
                    label: "b".to_string(),
                    value: Decimal::from(200),
                },
            ],
        };
        let bars = bars(&series, &NumberFormat::default());
        assert_eq!(bars[0].ratio, 0.25);
        assert_eq!(bars[1].ratio, 1.0);
    }
}
