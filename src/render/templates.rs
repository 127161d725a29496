//! Fixed section lists, one per report kind.
//!
//! Every template emits all of its sections even when the summary is empty;
//! empty sections are drawn with a placeholder by the sinks.

use rust_decimal::Decimal;

use super::section::{Cell, FreeText, KpiBlock, KpiTile, Section, Series, SeriesPoint, Table};
use super::ReportKind;
use crate::aggregate::{
    CategoryRollup, ProductRollup, SaleRow, Summary, TimeBucket, LOW_STOCK_THRESHOLD,
};

pub const SALES_TABLE_LIMIT: usize = 50;
pub const PRODUCTS_TABLE_LIMIT: usize = 50;
pub const BEST_SELLERS: usize = 10;
pub const RECENT_SALES_LIMIT: usize = 15;
pub const RECENT_BUCKETS: usize = 14;
pub const PRODUCT_PERFORMANCE_LIMIT: usize = 15;

/// Sections laid out in the paged document
pub fn sections(kind: ReportKind, summary: &Summary) -> Vec<Section> {
    let mut sections = vec![Section::Text(FreeText {
        title: None,
        body: kind.title().to_string(),
        heading: true,
    })];

    match kind {
        ReportKind::Sales => {
            sections.push(kpis(
                "Indicateurs Clés",
                vec![
                    tile("Revenu Total", Cell::Amount(summary.kpis.total_revenue)),
                    tile("Nombre de Ventes", count(summary.kpis.order_count)),
                    tile("Panier Moyen", Cell::Money(summary.kpis.average_order_value)),
                    tile("Taux de Croissance", Cell::Percent(summary.kpis.growth_rate)),
                ],
            ));
            sections.push(Section::Bar(bucket_series(
                "Évolution du Chiffre d'Affaires",
                &summary.time_series,
            )));
            sections.push(Section::Table(
                sales_table(&summary.sales).limit(SALES_TABLE_LIMIT),
            ));
        }
        ReportKind::Products => {
            sections.push(kpis(
                "Statistiques Produits",
                vec![
                    tile("Total Produits", count(summary.product_total as u64)),
                    tile("Stock Faible", count(summary.low_stock_count as u64)),
                ],
            ));
            sections.push(Section::Table(
                product_list(summary, "Produit").limit(PRODUCTS_TABLE_LIMIT),
            ));
            sections.push(Section::Table(best_sellers(&summary.product_rollups)));
        }
        ReportKind::Categories => {
            let active = summary
                .category_rollups
                .iter()
                .filter(|c| c.units_sold > 0)
                .count();
            sections.push(kpis(
                "Statistiques Catégories",
                vec![
                    tile("Total Catégories", count(summary.category_total as u64)),
                    tile("Catégories Actives", count(active as u64)),
                ],
            ));
            sections.push(Section::Pie(category_share(&summary.category_rollups)));
            sections.push(Section::Table(category_list(
                &summary.category_rollups,
                &["ID", "Catégorie", "Description", "Revenu", "Unités Vendues", "Produits"],
            )));
        }
        ReportKind::Monthly => {
            sections.push(Section::Text(FreeText {
                title: Some("Résumé Exécutif".to_string()),
                body: format!(
                    "Ce rapport couvre {}, {} et {}.",
                    counted(summary.kpis.order_count, "vente", "ventes"),
                    counted(summary.product_total as u64, "produit", "produits"),
                    counted(summary.category_total as u64, "catégorie", "catégories"),
                ),
                heading: false,
            }));
            sections.push(kpis(
                "Indicateurs Clés",
                vec![
                    tile("Revenu Total", Cell::Amount(summary.kpis.total_revenue)),
                    tile("Ventes", count(summary.kpis.order_count)),
                    tile("Produits", count(summary.product_total as u64)),
                    tile("Catégories", count(summary.category_total as u64)),
                ],
            ));
            sections.push(Section::Bar(bucket_series("Ventes par Mois", &summary.monthly)));
            sections.push(Section::Table(bucket_table(
                "Ventes Mensuelles",
                "Mois",
                &summary.monthly,
            )));
            sections.push(Section::Table(
                recent_sales(&summary.sales).limit(RECENT_SALES_LIMIT),
            ));
        }
        ReportKind::Custom => {
            sections.push(kpis(
                "Indicateurs Clés",
                vec![
                    tile("Revenu Total", Cell::Amount(summary.kpis.total_revenue)),
                    tile("Nombre de Ventes", count(summary.kpis.order_count)),
                    tile("Panier Moyen", Cell::Money(summary.kpis.average_order_value)),
                    tile("Taux de Croissance", Cell::Percent(summary.kpis.growth_rate)),
                    tile("Produits Vendus", count(summary.kpis.distinct_product_count)),
                    tile("Catégories Vendues", count(summary.kpis.distinct_category_count)),
                ],
            ));
            sections.push(Section::Table(bucket_table(
                "Évolution des Ventes",
                "Période",
                &summary.time_series,
            )));
            sections.push(Section::Table(category_table(
                "Revenu par Catégorie",
                &summary.category_rollups,
                &["ID", "Catégorie", "Revenu", "Unités Vendues", "Produits"],
            )));
            sections.push(Section::Table(product_rollup_table(&summary.product_rollups)));
        }
        ReportKind::Admin => {
            sections.push(kpis(
                "Résumé Exécutif",
                vec![
                    tile("Chiffre d'Affaires", Cell::Amount(summary.kpis.total_revenue)),
                    tile("Total Ventes", count(summary.kpis.order_count)),
                    tile("Produits Actifs", count(summary.product_total as u64)),
                ],
            ));
            sections.push(Section::Bar(category_series(
                "Ventes par Catégorie",
                &summary.category_rollups,
            )));
            sections.push(Section::Table(top_products(
                "Top 10 Produits",
                &summary.product_rollups,
            )));
        }
        ReportKind::Analyst => {
            sections.push(kpis(
                "Indicateurs d'Analyse",
                vec![
                    tile("CA Total", Cell::Amount(summary.kpis.total_revenue)),
                    tile("Panier Moyen", Cell::Money(summary.kpis.average_order_value)),
                    tile("Taux de Croissance", Cell::Percent(summary.kpis.growth_rate)),
                ],
            ));
            let recent = summary.time_series.len().saturating_sub(RECENT_BUCKETS);
            sections.push(Section::Bar(bucket_series(
                "Ventes des 14 Dernières Périodes",
                &summary.time_series[recent..],
            )));
            sections.push(Section::Table(category_analysis(&summary.category_rollups)));
            sections.push(Section::Table(
                product_performance(summary).limit(PRODUCT_PERFORMANCE_LIMIT),
            ));
        }
        ReportKind::Seller => {
            sections.push(kpis(
                "Mes Performances",
                vec![
                    tile("Mes Ventes", count(summary.kpis.order_count)),
                    tile("Mon CA", Cell::Amount(summary.kpis.total_revenue)),
                    tile("Panier Moyen", Cell::Money(summary.kpis.average_order_value)),
                ],
            ));
            sections.push(Section::Bar(bucket_series(
                "Mes Ventes Quotidiennes",
                &summary.time_series,
            )));
            sections.push(Section::Table(top_products(
                "Mes Meilleurs Produits",
                &summary.product_rollups,
            )));
            let mut own_sales = sales_table(&summary.sales).limit(SALES_TABLE_LIMIT);
            own_sales.title = "Mes Ventes".to_string();
            sections.push(Section::Table(own_sales));
        }
        ReportKind::Investor => {
            sections.push(kpis(
                "Indicateurs Financiers",
                vec![
                    tile("Chiffre d'Affaires", Cell::Amount(summary.kpis.total_revenue)),
                    tile("Nombre de Ventes", count(summary.kpis.order_count)),
                    tile("Panier Moyen", Cell::Money(summary.kpis.average_order_value)),
                    tile("Taux de Croissance", Cell::Percent(summary.kpis.growth_rate)),
                ],
            ));
            sections.push(Section::Bar(bucket_series(
                "Évolution Mensuelle du CA",
                &summary.monthly,
            )));
            sections.push(Section::Table(bucket_table(
                "Ventes Mensuelles",
                "Mois",
                &summary.monthly,
            )));
        }
    }

    sections
}

/// Tables written to delimited-text exports, with every row
pub fn flat_tables(kind: ReportKind, summary: &Summary) -> Vec<Table> {
    match kind {
        ReportKind::Sales => vec![sales_table(&summary.sales)],
        ReportKind::Products => vec![product_list(summary, "Titre")],
        ReportKind::Categories => vec![category_list(
            &summary.category_rollups,
            &[
                "ID",
                "Nom",
                "Description",
                "Revenu",
                "Unités Vendues",
                "Nombre de Produits",
            ],
        )],
        ReportKind::Monthly => vec![bucket_table("Ventes Mensuelles", "Mois", &summary.monthly)],
        ReportKind::Custom
        | ReportKind::Admin
        | ReportKind::Analyst
        | ReportKind::Seller
        | ReportKind::Investor => sections(kind, summary)
            .into_iter()
            .filter_map(|section| match section {
                Section::Table(mut table) => {
                    table.display_limit = None;
                    Some(table)
                }
                _ => None,
            })
            .collect(),
    }
}

fn tile(label: &str, value: Cell) -> KpiTile {
    KpiTile {
        label: label.to_string(),
        value,
    }
}

fn kpis(title: &str, tiles: Vec<KpiTile>) -> Section {
    Section::Kpis(KpiBlock {
        title: title.to_string(),
        tiles,
    })
}

fn count(n: u64) -> Cell {
    Cell::Integer(i64::try_from(n).unwrap_or(i64::MAX))
}

/// French plural: 0 and 1 take the singular
fn counted(n: u64, singular: &str, plural: &str) -> String {
    if n <= 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

fn bucket_series(title: &str, buckets: &[TimeBucket]) -> Series {
    Series {
        title: title.to_string(),
        points: buckets
            .iter()
            .map(|b| SeriesPoint {
                label: b.period_key.clone(),
                value: b.revenue,
            })
            .collect(),
    }
}

fn category_share(rollups: &[CategoryRollup]) -> Series {
    Series {
        title: "Répartition du Revenu par Catégorie".to_string(),
        points: rollups
            .iter()
            .filter(|c| c.revenue > Decimal::ZERO)
            .map(|c| SeriesPoint {
                label: c.name.clone(),
                value: c.revenue,
            })
            .collect(),
    }
}

fn category_series(title: &str, rollups: &[CategoryRollup]) -> Series {
    Series {
        title: title.to_string(),
        points: rollups
            .iter()
            .map(|c| SeriesPoint {
                label: c.name.clone(),
                value: c.revenue,
            })
            .collect(),
    }
}

fn sales_table(sales: &[SaleRow]) -> Table {
    let mut table = Table::new(
        "Détail des Ventes",
        "Ventes",
        &["ID", "Date", "Client", "Montant", "Statut"],
    );
    table.rows = sales
        .iter()
        .map(|s| {
            vec![
                Cell::Integer(s.id),
                Cell::DateTime(s.date),
                Cell::text(&s.client),
                Cell::Money(s.amount),
                Cell::text(&s.status),
            ]
        })
        .collect();
    table
}

fn recent_sales(sales: &[SaleRow]) -> Table {
    let mut table = Table::new(
        "Ventes Récentes",
        "Ventes Récentes",
        &["Date", "Montant", "Client"],
    );
    table.rows = sales
        .iter()
        .map(|s| {
            vec![
                Cell::Date(s.date.date()),
                Cell::Money(s.amount),
                Cell::text(&s.client),
            ]
        })
        .collect();
    table
}

fn product_list(summary: &Summary, name_column: &str) -> Table {
    let mut table = Table::new(
        "Liste des Produits",
        "Produits",
        &["ID", name_column, "Prix", "Stock", "Catégorie"],
    );
    table.rows = summary
        .products
        .iter()
        .map(|p| {
            vec![
                Cell::Integer(p.id),
                Cell::text(&p.title),
                Cell::Money(p.price),
                Cell::Integer(p.stock),
                Cell::text(&p.category),
            ]
        })
        .collect();
    table
}

fn best_sellers(rollups: &[ProductRollup]) -> Table {
    let mut table = Table::new(
        "Meilleurs Vendeurs",
        "Meilleurs Vendeurs",
        &["Rang", "Produit", "Quantité Vendue", "Revenu"],
    );
    table.rows = rollups
        .iter()
        .take(BEST_SELLERS)
        .enumerate()
        .map(|(rank, p)| {
            vec![
                Cell::Integer(rank as i64 + 1),
                Cell::text(&p.name),
                count(p.units_sold),
                Cell::Money(p.revenue),
            ]
        })
        .collect();
    table
}

fn top_products(title: &str, rollups: &[ProductRollup]) -> Table {
    let mut table = Table::new(title, title, &["Produit", "Quantité", "Revenu"]);
    table.rows = rollups
        .iter()
        .take(BEST_SELLERS)
        .map(|p| {
            vec![
                Cell::text(&p.name),
                count(p.units_sold),
                Cell::Money(p.revenue),
            ]
        })
        .collect();
    table
}

/// Catalog products with their sales, best revenue first
fn product_performance(summary: &Summary) -> Table {
    let mut table = Table::new(
        "Performance Produits",
        "Performance",
        &["Produit", "Stock", "Vendu", "Revenu", "Statut"],
    );
    let mut rows: Vec<_> = summary
        .products
        .iter()
        .map(|p| {
            let sold = summary.product_rollups.iter().find(|r| r.product_id == p.id);
            let revenue = sold.map_or(Decimal::ZERO, |r| r.revenue);
            let units = sold.map_or(0, |r| r.units_sold);
            (p, units, revenue)
        })
        .collect();
    rows.sort_by(|a, b| b.2.cmp(&a.2));
    table.rows = rows
        .into_iter()
        .map(|(p, units, revenue)| {
            vec![
                Cell::text(&p.title),
                Cell::Integer(p.stock),
                count(units),
                Cell::Money(revenue),
                Cell::text(stock_status(p.stock)),
            ]
        })
        .collect();
    table
}

fn stock_status(stock: i64) -> &'static str {
    if stock <= 0 {
        "Rupture"
    } else if stock < LOW_STOCK_THRESHOLD {
        "Stock Faible"
    } else {
        "Normal"
    }
}

fn category_analysis(rollups: &[CategoryRollup]) -> Table {
    let mut table = Table::new(
        "Analyse par Catégorie",
        "Analyse Catégories",
        &["Catégorie", "Produits", "Ventes", "Revenu", "Part %"],
    );
    let total = rollups
        .iter()
        .fold(Decimal::ZERO, |sum, c| sum.saturating_add(c.revenue));
    table.rows = rollups
        .iter()
        .map(|c| {
            let share = c
                .revenue
                .checked_div(total)
                .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
                .filter(|_| total > Decimal::ZERO)
                .map_or(Decimal::ZERO, |s| s.round_dp(1));
            vec![
                Cell::text(&c.name),
                count(c.product_count),
                count(c.sale_count),
                Cell::Money(c.revenue),
                Cell::Percent(share),
            ]
        })
        .collect();
    table
}

fn product_rollup_table(rollups: &[ProductRollup]) -> Table {
    let mut table = Table::new(
        "Revenu par Produit",
        "Produits",
        &["ID", "Produit", "Unités Vendues", "Revenu"],
    );
    table.rows = rollups
        .iter()
        .map(|p| {
            vec![
                Cell::Integer(p.product_id),
                Cell::text(&p.name),
                count(p.units_sold),
                Cell::Money(p.revenue),
            ]
        })
        .collect();
    table
}

fn category_table(title: &str, rollups: &[CategoryRollup], columns: &[&str]) -> Table {
    let mut table = Table::new(title, "Catégories", columns);
    table.rows = rollups
        .iter()
        .map(|c| {
            vec![
                Cell::Integer(c.category_id),
                Cell::text(&c.name),
                Cell::Money(c.revenue),
                count(c.units_sold),
                count(c.product_count),
            ]
        })
        .collect();
    table
}

fn category_list(rollups: &[CategoryRollup], columns: &[&str]) -> Table {
    let mut table = Table::new("Liste des Catégories", "Catégories", columns);
    table.rows = rollups
        .iter()
        .map(|c| {
            vec![
                Cell::Integer(c.category_id),
                Cell::text(&c.name),
                Cell::text(&c.description),
                Cell::Money(c.revenue),
                count(c.units_sold),
                count(c.product_count),
            ]
        })
        .collect();
    table
}

fn bucket_table(title: &str, period_column: &str, buckets: &[TimeBucket]) -> Table {
    let mut table = Table::new(title, title, &[period_column, "Revenu", "Commandes"]);
    table.rows = buckets
        .iter()
        .map(|b| {
            vec![
                Cell::text(&b.period_key),
                Cell::Money(b.revenue),
                count(b.order_count),
            ]
        })
        .collect();
    table
}
