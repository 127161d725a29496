//! Reduce raw sales, products and categories into report-ready summaries.

mod summary;

pub use summary::{
    CategoryRollup, DataQuality, DateRange, Granularity, KpiSet, ProductRollup, ProductRow,
    SaleRow, Summary, TimeBucket,
};

use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::Result;
use crate::model::{RawCategory, RawProduct, RawSale};
use crate::source::decode_collection;

/// Products with fewer units in stock than this count as low stock
pub const LOW_STOCK_THRESHOLD: i64 = 10;

#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub granularity: Granularity,
    pub date_range: Option<DateRange>,
    /// Stand-in for "now": dates undated sales and stamps the summary
    pub reference_time: NaiveDateTime,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            granularity: Granularity::Day,
            date_range: None,
            reference_time: Local::now().naive_local(),
        }
    }
}

/// Aggregate untyped JSON collections.
///
/// Each argument must be a JSON array; anything else is rejected with
/// `ReportError::InvalidInput`. Malformed records inside an array are skipped.
pub fn aggregate_values(
    sales: &serde_json::Value,
    products: &serde_json::Value,
    categories: &serde_json::Value,
    options: &AggregateOptions,
) -> Result<Summary> {
    let sales: Vec<RawSale> = decode_collection("sales", sales)?;
    let products: Vec<RawProduct> = decode_collection("products", products)?;
    let categories: Vec<RawCategory> = decode_collection("categories", categories)?;
    Ok(aggregate(&sales, &products, &categories, options))
}

/// Aggregate typed collections into a `Summary`.
///
/// Line items referencing unknown products are skipped and counted in
/// `Summary::quality`. Category rollups are seeded from `categories`, so
/// every category appears even without sales; product rollups only list
/// products that sold.
pub fn aggregate(
    sales: &[RawSale],
    products: &[RawProduct],
    categories: &[RawCategory],
    options: &AggregateOptions,
) -> Summary {
    let mut quality = DataQuality::default();

    let mut product_index: HashMap<i64, &RawProduct> = HashMap::new();
    for product in products {
        product_index.entry(product.id).or_insert(product);
    }

    let mut category_rollups: Vec<CategoryRollup> = Vec::with_capacity(categories.len());
    let mut category_slot: HashMap<i64, usize> = HashMap::new();
    for category in categories {
        if category_slot.contains_key(&category.id) {
            continue;
        }
        category_slot.insert(category.id, category_rollups.len());
        category_rollups.push(CategoryRollup {
            category_id: category.id,
            name: category.display_name(),
            description: category.description.clone().unwrap_or_default(),
            revenue: Decimal::ZERO,
            units_sold: 0,
            sale_count: 0,
            product_count: 0,
        });
    }
    for product in product_index.values() {
        let slot = product.category_id.and_then(|id| category_slot.get(&id));
        if let Some(&slot) = slot {
            category_rollups[slot].product_count += 1;
        }
    }

    let mut product_rollups: Vec<ProductRollup> = Vec::new();
    let mut product_slot: HashMap<i64, usize> = HashMap::new();
    let mut sold_categories: HashSet<i64> = HashSet::new();

    let mut buckets: BTreeMap<String, TimeBucket> = BTreeMap::new();
    let mut months: BTreeMap<String, TimeBucket> = BTreeMap::new();
    let mut sale_rows: Vec<SaleRow> = Vec::new();
    let mut total_revenue = Decimal::ZERO;

    for sale in sales {
        let at = match sale.occurred_at() {
            Some(at) => at,
            None => {
                quality.undated_sales += 1;
                options.reference_time
            }
        };
        if let Some(range) = &options.date_range {
            if !range.contains(at) {
                continue;
            }
        }

        let amount = sale.total();
        add_money(&mut total_revenue, amount, &mut quality);
        let period = options.granularity.period_key(at);
        add_to_bucket(&mut buckets, period, amount, &mut quality);
        add_to_bucket(&mut months, Granularity::Month.period_key(at), amount, &mut quality);

        let mut touched: HashSet<usize> = HashSet::new();
        for line in sale.lines() {
            let Some(product) = line.product_id.and_then(|id| product_index.get(&id)) else {
                quality.unresolved_line_items += 1;
                tracing::debug!(
                    sale = sale.id,
                    product = ?line.product_id,
                    "skipping line item with unknown product"
                );
                continue;
            };

            let revenue = line.revenue().unwrap_or_else(|| {
                quality.clamped_amounts += 1;
                Decimal::from(line.units()).saturating_mul(line.price())
            });
            let units = line.units() as u64;

            let slot = *product_slot.entry(product.id).or_insert_with(|| {
                product_rollups.push(ProductRollup {
                    product_id: product.id,
                    name: product.display_name(),
                    revenue: Decimal::ZERO,
                    units_sold: 0,
                });
                product_rollups.len() - 1
            });
            let rollup = &mut product_rollups[slot];
            add_money(&mut rollup.revenue, revenue, &mut quality);
            rollup.units_sold = rollup.units_sold.saturating_add(units);

            if let Some(category_id) = product.category_id {
                sold_categories.insert(category_id);
                if let Some(&slot) = category_slot.get(&category_id) {
                    touched.insert(slot);
                    let rollup = &mut category_rollups[slot];
                    add_money(&mut rollup.revenue, revenue, &mut quality);
                    rollup.units_sold = rollup.units_sold.saturating_add(units);
                }
            }
        }

        for slot in touched {
            category_rollups[slot].sale_count += 1;
        }

        sale_rows.push(SaleRow {
            id: sale.id,
            date: at,
            client: sale.client(),
            amount,
            status: sale.status_label(),
            item_count: sale.lines().len(),
        });
    }

    // Vec::sort_by is stable, so ties keep first-appearance order
    category_rollups.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    product_rollups.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    sale_rows.sort_by(|a, b| b.date.cmp(&a.date));

    let time_series: Vec<TimeBucket> = buckets.into_values().collect();
    let order_count = sale_rows.len() as u64;
    let kpis = KpiSet {
        total_revenue,
        order_count,
        average_order_value: average(total_revenue, order_count),
        distinct_product_count: product_rollups.len() as u64,
        distinct_category_count: sold_categories.len() as u64,
        growth_rate: growth_rate(&time_series),
    };

    let category_names: HashMap<i64, String> = categories
        .iter()
        .map(|c| (c.id, c.display_name()))
        .collect();
    let product_rows: Vec<ProductRow> = products
        .iter()
        .map(|p| ProductRow {
            id: p.id,
            title: p.display_name(),
            price: p.unit_price(),
            stock: p.stock_level(),
            category: p
                .category_name
                .clone()
                .or_else(|| p.category_id.and_then(|id| category_names.get(&id).cloned()))
                .unwrap_or_else(|| "N/A".to_string()),
        })
        .collect();
    let low_stock_count = products
        .iter()
        .filter(|p| p.stock_level() < LOW_STOCK_THRESHOLD)
        .count();

    if quality.clamped_amounts > 0 {
        tracing::warn!(
            clamped = quality.clamped_amounts,
            "amounts outside the decimal range were clamped"
        );
    }
    if quality.unresolved_line_items > 0 {
        tracing::info!(
            skipped = quality.unresolved_line_items,
            "line items referencing unknown products were left out of rollups"
        );
    }

    Summary {
        generated_at: options.reference_time,
        granularity: options.granularity,
        period: options.date_range,
        time_series,
        monthly: months.into_values().collect(),
        category_rollups,
        product_rollups,
        kpis,
        sales: sale_rows,
        products: product_rows,
        product_total: products.len(),
        category_total: categories.len(),
        low_stock_count,
        quality,
    }
}

/// Saturating addition; a clamped sum is counted in `quality`
fn add_money(total: &mut Decimal, amount: Decimal, quality: &mut DataQuality) {
    *total = match total.checked_add(amount) {
        Some(sum) => sum,
        None => {
            quality.clamped_amounts += 1;
            total.saturating_add(amount)
        }
    };
}

fn add_to_bucket(
    buckets: &mut BTreeMap<String, TimeBucket>,
    key: String,
    amount: Decimal,
    quality: &mut DataQuality,
) {
    let bucket = buckets.entry(key.clone()).or_insert_with(|| TimeBucket {
        period_key: key,
        revenue: Decimal::ZERO,
        order_count: 0,
    });
    add_money(&mut bucket.revenue, amount, quality);
    bucket.order_count += 1;
}

fn average(total: Decimal, count: u64) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    total / Decimal::from(count)
}

/// Percent change between the last two buckets, one decimal place.
/// Zero when there is no previous bucket or it had no revenue.
fn growth_rate(series: &[TimeBucket]) -> Decimal {
    let [.., previous, current] = series else {
        return Decimal::ZERO;
    };
    if previous.revenue.is_zero() {
        return Decimal::ZERO;
    }
    let change = current
        .revenue
        .checked_sub(previous.revenue)
        .and_then(|delta| delta.checked_div(previous.revenue))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED));
    match change {
        Some(change) => change.round_dp(1),
        None if current.revenue >= previous.revenue => Decimal::MAX,
        None => Decimal::MIN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawLineItem;
    use chrono::NaiveDate;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn at(date: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn opts() -> AggregateOptions {
        AggregateOptions {
            granularity: Granularity::Day,
            date_range: None,
            reference_time: at("2024-06-30"),
        }
    }

    fn sale(id: i64, date: &str, total: &str, lines: &[(i64, i64, &str)]) -> RawSale {
        RawSale {
            id,
            sale_date: Some(date.to_string()),
            total_amount: Some(dec(total)),
            line_items: Some(
                lines
                    .iter()
                    .map(|(product, qty, price)| RawLineItem {
                        product_id: Some(*product),
                        quantity: Some(*qty),
                        unit_price: Some(dec(price)),
                        product_title: None,
                    })
                    .collect(),
            ),
            ..Default::default()
        }
    }

    fn product(id: i64, title: &str, category: i64) -> RawProduct {
        RawProduct {
            id,
            title: Some(title.to_string()),
            price: Some(dec("10")),
            stock_quantity: Some(25),
            category_id: Some(category),
            ..Default::default()
        }
    }

    fn category(id: i64, name: &str) -> RawCategory {
        RawCategory {
            id,
            name: Some(name.to_string()),
            description: None,
        }
    }

    #[test]
    fn single_sale_example() {
        let sales = vec![sale(1, "2024-01-05", "100", &[(1, 2, "40")])];
        let products = vec![product(1, "Widget", 9)];
        let categories = vec![category(9, "Tools")];

        let summary = aggregate(&sales, &products, &categories, &opts());

        assert_eq!(summary.kpis.total_revenue, dec("100"));
        assert_eq!(summary.kpis.order_count, 1);
        assert_eq!(summary.kpis.average_order_value, dec("100"));
        assert_eq!(summary.kpis.distinct_product_count, 1);
        assert_eq!(summary.kpis.distinct_category_count, 1);
        assert_eq!(
            summary.category_rollups,
            vec![CategoryRollup {
                category_id: 9,
                name: "Tools".to_string(),
                description: String::new(),
                revenue: dec("80"),
                units_sold: 2,
                sale_count: 1,
                product_count: 1,
            }]
        );
        assert_eq!(summary.time_series.len(), 1);
        assert_eq!(summary.time_series[0].period_key, "2024-01-05");
    }

    #[test]
    fn empty_sales_have_zero_average() {
        let summary = aggregate(&[], &[product(1, "Widget", 9)], &[category(9, "Tools")], &opts());
        assert_eq!(summary.kpis.average_order_value, Decimal::ZERO);
        assert_eq!(summary.kpis.order_count, 0);
        assert!(summary.time_series.is_empty());
    }

    #[test]
    fn every_category_appears_once() {
        let categories = vec![category(1, "A"), category(2, "B"), category(3, "C")];
        let products = vec![product(10, "P", 2)];
        let sales = vec![sale(1, "2024-02-01", "30", &[(10, 3, "10")])];

        let summary = aggregate(&sales, &products, &categories, &opts());

        let mut ids: Vec<i64> = summary.category_rollups.iter().map(|c| c.category_id).collect();
        assert_eq!(ids[0], 2);
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(summary.category_rollups[1].revenue, Decimal::ZERO);
    }

    #[test]
    fn product_count_is_catalog_size() {
        let products = vec![product(1, "Hammer", 9), product(2, "Saw", 9), product(3, "Rake", 8)];
        let categories = vec![category(9, "Tools"), category(8, "Garden"), category(7, "Empty")];
        let sales = vec![sale(1, "2024-02-01", "10", &[(1, 1, "10")])];

        let summary = aggregate(&sales, &products, &categories, &opts());

        let counts: Vec<(&str, u64)> = summary
            .category_rollups
            .iter()
            .map(|c| (c.name.as_str(), c.product_count))
            .collect();
        assert_eq!(counts, vec![("Tools", 2), ("Garden", 1), ("Empty", 0)]);
        assert_eq!(summary.category_rollups[0].sale_count, 1);
        assert_eq!(summary.category_rollups[1].sale_count, 0);
    }

    #[test]
    fn oversized_amounts_are_clamped_not_fatal() {
        let summary = aggregate_values(
            &json!([
                {"id": 1, "saleDate": "2024-01-05", "totalAmount": "70000000000000000000000000000"},
                {"id": 2, "saleDate": "2024-01-05", "totalAmount": "70000000000000000000000000000"},
                {"id": 3, "saleDate": "2024-01-06", "totalAmount": 1,
                 "lignes": [{"productId": 1, "quantity": 9000000000000000000_i64,
                             "unitPrice": "100000000000000000"}]}
            ]),
            &json!([{"id": 1, "title": "Widget", "categoryId": 9}]),
            &json!([{"id": 9, "name": "Tools"}]),
            &opts(),
        )
        .unwrap();

        assert_eq!(summary.kpis.order_count, 3);
        assert_eq!(summary.kpis.total_revenue, Decimal::MAX);
        assert_eq!(summary.product_rollups[0].revenue, Decimal::MAX);
        assert_eq!(summary.category_rollups[0].units_sold, 9_000_000_000_000_000_000);
        assert!(summary.quality.clamped_amounts >= 3);
    }

    #[test]
    fn unsold_products_are_absent() {
        let products = vec![product(1, "Sold", 1), product(2, "Unsold", 1)];
        let sales = vec![sale(1, "2024-02-01", "10", &[(1, 1, "10")])];

        let summary = aggregate(&sales, &products, &[category(1, "A")], &opts());

        assert_eq!(summary.product_rollups.len(), 1);
        assert_eq!(summary.product_rollups[0].product_id, 1);
    }

    #[test]
    fn unknown_products_are_skipped_and_counted() {
        let sales = vec![sale(1, "2024-02-01", "50", &[(1, 1, "10"), (99, 4, "10")])];
        let summary = aggregate(&sales, &[product(1, "P", 1)], &[category(1, "A")], &opts());

        assert_eq!(summary.quality.unresolved_line_items, 1);
        assert_eq!(summary.product_rollups.len(), 1);
        assert_eq!(summary.category_rollups[0].revenue, dec("10"));
        assert_eq!(summary.kpis.total_revenue, dec("50"));
    }

    #[test]
    fn revenue_is_conserved_across_buckets() {
        let sales = vec![
            sale(1, "2024-01-01", "10.10", &[]),
            sale(2, "2024-01-01", "20.20", &[]),
            sale(3, "2024-01-15", "0.05", &[]),
            sale(4, "2024-02-03", "99.99", &[]),
        ];
        let mut options = opts();
        options.date_range = Some(DateRange {
            from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        });

        let summary = aggregate(&sales, &[], &[], &options);

        let bucketed: Decimal = summary.time_series.iter().map(|b| b.revenue).sum();
        assert_eq!(bucketed, dec("30.35"));
        assert_eq!(summary.kpis.total_revenue, bucketed);
        assert_eq!(summary.kpis.order_count, 3);
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let sales = vec![
            sale(1, "2024-03-01T00:00:00", "1", &[]),
            sale(2, "2024-03-31T23:59:59", "2", &[]),
            sale(3, "2024-04-01", "4", &[]),
        ];
        let mut options = opts();
        options.date_range = Some(DateRange {
            from: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        });

        let summary = aggregate(&sales, &[], &[], &options);
        assert_eq!(summary.kpis.total_revenue, dec("3"));
    }

    #[test]
    fn monthly_buckets_sorted_ascending() {
        let sales = vec![
            sale(1, "2024-03-10", "5", &[]),
            sale(2, "2023-12-01", "1", &[]),
            sale(3, "2024-01-20", "2", &[]),
            sale(4, "2024-03-11", "5", &[]),
        ];
        let mut options = opts();
        options.granularity = Granularity::Month;

        let summary = aggregate(&sales, &[], &[], &options);

        let keys: Vec<&str> = summary
            .time_series
            .iter()
            .map(|b| b.period_key.as_str())
            .collect();
        assert_eq!(keys, vec!["2023-12", "2024-01", "2024-03"]);
        assert_eq!(summary.time_series[2].order_count, 2);
        assert_eq!(summary.time_series, summary.monthly);
    }

    #[test]
    fn undated_sales_use_reference_time() {
        let mut undated = sale(1, "", "7", &[]);
        undated.sale_date = None;

        let summary = aggregate(&[undated], &[], &[], &opts());

        assert_eq!(summary.quality.undated_sales, 1);
        assert_eq!(summary.time_series[0].period_key, "2024-06-30");
    }

    #[test]
    fn rollup_ties_keep_first_appearance() {
        let products = vec![product(1, "First", 1), product(2, "Second", 1), product(3, "Top", 1)];
        let sales = vec![
            sale(1, "2024-01-01", "0", &[(2, 1, "5")]),
            sale(2, "2024-01-02", "0", &[(1, 1, "5"), (3, 1, "9")]),
        ];

        let summary = aggregate(&sales, &products, &[category(1, "A")], &opts());

        let order: Vec<i64> = summary.product_rollups.iter().map(|p| p.product_id).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let products = vec![product(1, "A", 1), product(2, "B", 2)];
        let categories = vec![category(1, "X"), category(2, "Y")];
        let sales = vec![
            sale(1, "2024-01-01", "12", &[(1, 1, "6"), (2, 1, "6")]),
            sale(2, "2024-01-03", "8", &[(2, 2, "4")]),
        ];

        let first = aggregate(&sales, &products, &categories, &opts());
        let second = aggregate(&sales, &products, &categories, &opts());
        assert_eq!(first, second);
    }

    #[test]
    fn growth_compares_last_two_buckets() {
        let sales = vec![sale(1, "2024-01-01", "200", &[]), sale(2, "2024-01-02", "250", &[])];
        let summary = aggregate(&sales, &[], &[], &opts());
        assert_eq!(summary.kpis.growth_rate, dec("25.0"));
    }

    #[test]
    fn non_array_input_is_rejected() {
        let err = aggregate_values(&json!({"sales": []}), &json!([]), &json!([]), &opts())
            .unwrap_err();
        assert!(err.to_string().contains("'sales' must be a JSON array"));
    }

    #[test]
    fn json_entry_point_matches_typed() {
        let summary = aggregate_values(
            &json!([{"id": 1, "saleDate": "2024-01-05", "totalAmount": 100,
                     "lignes": [{"productId": 1, "quantity": 2, "unitPrice": 40}]}]),
            &json!([{"id": 1, "title": "Widget", "price": 40, "categoryId": 9}]),
            &json!([{"id": 9, "name": "Tools"}]),
            &opts(),
        )
        .unwrap();

        assert_eq!(summary.kpis.total_revenue, dec("100"));
        assert_eq!(summary.category_rollups[0].revenue, dec("80"));
    }
}
