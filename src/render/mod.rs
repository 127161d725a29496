//! Turn a `Summary` into a paginated `ReportDocument`.

pub mod format;
pub mod layout;
pub mod section;
mod templates;

pub use format::NumberFormat;
pub use layout::{paginate, LayoutOptions, Page, Placement};
pub use section::{
    Cell, FreeText, KpiBlock, KpiTile, Section, Series, SeriesPoint, Table, PLACEHOLDER,
};

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::aggregate::Summary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportKind {
    Sales,
    Products,
    Categories,
    Monthly,
    Custom,
    Admin,
    Analyst,
    /// One seller's own sales, selected by `[source] user_id`
    #[serde(rename = "VENDEUR")]
    Seller,
    Investor,
}

impl ReportKind {
    pub const ALL: [ReportKind; 9] = [
        ReportKind::Sales,
        ReportKind::Products,
        ReportKind::Categories,
        ReportKind::Monthly,
        ReportKind::Custom,
        ReportKind::Admin,
        ReportKind::Analyst,
        ReportKind::Seller,
        ReportKind::Investor,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ReportKind::Sales => "Rapport des Ventes",
            ReportKind::Products => "Rapport des Produits",
            ReportKind::Categories => "Rapport des Catégories",
            ReportKind::Monthly => "Rapport Mensuel Complet",
            ReportKind::Custom => "Rapport Personnalisé",
            ReportKind::Admin => "Rapport Administrateur",
            ReportKind::Analyst => "Rapport Analyste",
            ReportKind::Seller => "Rapport Vendeur",
            ReportKind::Investor => "Rapport Investisseur",
        }
    }

    /// Used in file names: `rapport_<slug>_<date>.<ext>`
    pub fn slug(self) -> &'static str {
        match self {
            ReportKind::Sales => "sales",
            ReportKind::Products => "products",
            ReportKind::Categories => "categories",
            ReportKind::Monthly => "monthly",
            ReportKind::Custom => "custom",
            ReportKind::Admin => "admin",
            ReportKind::Analyst => "analyste",
            ReportKind::Seller => "vendeur",
            ReportKind::Investor => "investisseur",
        }
    }

    /// English spelling accepted on the command line next to the slug
    fn alias(self) -> Option<&'static str> {
        match self {
            ReportKind::Analyst => Some("analyst"),
            ReportKind::Seller => Some("seller"),
            ReportKind::Investor => Some("investor"),
            _ => None,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ReportKind::ALL
            .into_iter()
            .find(|kind| {
                kind.slug().eq_ignore_ascii_case(s)
                    || kind.alias().is_some_and(|alias| alias.eq_ignore_ascii_case(s))
            })
            .ok_or_else(|| {
                let known: Vec<&str> = ReportKind::ALL.iter().map(|kind| kind.slug()).collect();
                format!("unknown report kind '{s}' (use {})", known.join(", "))
            })
    }
}

/// A rendered report: sections plus their placement on pages
#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    pub kind: ReportKind,
    pub title: String,
    pub generated_at: NaiveDateTime,
    pub layout: LayoutOptions,
    pub sections: Vec<Section>,
    pub pages: Vec<Page>,
    /// Tables for delimited-text export, uncapped
    pub flat_tables: Vec<Table>,
}

impl ReportDocument {
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.sections.iter().filter_map(|s| match s {
            Section::Table(t) => Some(t),
            _ => None,
        })
    }

    pub fn kpi_tiles(&self) -> impl Iterator<Item = &KpiTile> {
        self.sections
            .iter()
            .filter_map(|s| match s {
                Section::Kpis(k) => Some(k.tiles.iter()),
                _ => None,
            })
            .flatten()
    }
}

/// Build the template for `kind` from `summary` and lay it out
pub fn render(kind: ReportKind, summary: &Summary, layout: &LayoutOptions) -> ReportDocument {
    let sections = templates::sections(kind, summary);
    let pages = paginate(&sections, layout);
    tracing::debug!(
        kind = %kind,
        sections = sections.len(),
        pages = pages.len(),
        "report laid out"
    );

    ReportDocument {
        kind,
        title: kind.title().to_string(),
        generated_at: summary.generated_at,
        layout: layout.clone(),
        flat_tables: templates::flat_tables(kind, summary),
        sections,
        pages,
    }
}
