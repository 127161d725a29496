use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Time granularity used to bucket sales into a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Month,
}

impl Granularity {
    /// Truncate a timestamp to its bucket key (`YYYY-MM-DD` or `YYYY-MM`)
    pub fn period_key(self, at: NaiveDateTime) -> String {
        match self {
            Granularity::Day => at.format("%Y-%m-%d").to_string(),
            Granularity::Month => at.format("%Y-%m").to_string(),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Day => write!(f, "day"),
            Granularity::Month => write!(f, "month"),
        }
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Granularity::Day),
            "month" | "monthly" => Ok(Granularity::Month),
            other => Err(format!("unknown granularity '{other}' (use 'day' or 'month')")),
        }
    }
}

/// Inclusive calendar-day range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let day = at.date();
        day >= self.from && day <= self.to
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBucket {
    pub period_key: String,
    pub revenue: Decimal,
    pub order_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRollup {
    pub category_id: i64,
    pub name: String,
    /// Empty when the backend sends none
    pub description: String,
    pub revenue: Decimal,
    pub units_sold: u64,
    /// Sales with at least one line item in this category
    pub sale_count: u64,
    /// Catalog products filed under this category, sold or not
    pub product_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRollup {
    pub product_id: i64,
    pub name: String,
    pub revenue: Decimal,
    pub units_sold: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct KpiSet {
    /// Sum of sale totals, which may include fees absent from line items
    pub total_revenue: Decimal,
    pub order_count: u64,
    pub average_order_value: Decimal,
    pub distinct_product_count: u64,
    pub distinct_category_count: u64,
    /// Percent change of the last bucket against the one before it
    pub growth_rate: Decimal,
}

/// A filtered sale, ready for tabular display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleRow {
    pub id: i64,
    pub date: NaiveDateTime,
    pub client: String,
    pub amount: Decimal,
    pub status: String,
    pub item_count: usize,
}

/// A catalog product with its resolved category name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRow {
    pub id: i64,
    pub title: String,
    pub price: Decimal,
    pub stock: i64,
    pub category: String,
}

/// Data-quality counters collected while aggregating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct DataQuality {
    /// Line items whose product id matched no product
    pub unresolved_line_items: u64,
    /// Sales without a usable timestamp, dated at the reference time
    pub undated_sales: u64,
    /// Amounts or sums that left the decimal range and were clamped
    pub clamped_amounts: u64,
}

/// Everything the report templates draw from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub generated_at: NaiveDateTime,
    pub granularity: Granularity,
    pub period: Option<DateRange>,
    pub time_series: Vec<TimeBucket>,
    pub monthly: Vec<TimeBucket>,
    pub category_rollups: Vec<CategoryRollup>,
    pub product_rollups: Vec<ProductRollup>,
    pub kpis: KpiSet,
    /// Filtered sales, newest first
    pub sales: Vec<SaleRow>,
    pub products: Vec<ProductRow>,
    pub product_total: usize,
    pub category_total: usize,
    pub low_stock_count: usize,
    pub quality: DataQuality,
}
