//! Raw records as served by the sales-management backend.
//!
//! Every field is optional on the wire: missing numbers read as zero and
//! missing references are resolved (or skipped) during aggregation.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single sale with its line items
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSale {
    #[serde(default)]
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,
    #[serde(default, alias = "lignes", skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<RawLineItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLineItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProduct {
    #[serde(default)]
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCategory {
    #[serde(default)]
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RawSale {
    /// Sale time, from the first date field that parses
    pub fn occurred_at(&self) -> Option<NaiveDateTime> {
        [&self.timestamp, &self.sale_date, &self.created_at]
            .into_iter()
            .flatten()
            .find_map(|raw| parse_timestamp(raw))
    }

    pub fn total(&self) -> Decimal {
        self.total_amount.unwrap_or_default()
    }

    pub fn lines(&self) -> &[RawLineItem] {
        self.line_items.as_deref().unwrap_or(&[])
    }

    pub fn client(&self) -> String {
        match (&self.username, self.user_id) {
            (Some(name), _) if !name.trim().is_empty() => name.clone(),
            (_, Some(id)) => format!("Client #{id}"),
            _ => "N/A".to_string(),
        }
    }

    pub fn status_label(&self) -> String {
        self.status
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "CONFIRMED".to_string())
    }
}

impl RawLineItem {
    pub fn units(&self) -> i64 {
        self.quantity.unwrap_or(0).max(0)
    }

    pub fn price(&self) -> Decimal {
        self.unit_price.unwrap_or_default().max(Decimal::ZERO)
    }

    /// `units × price`, or `None` when the product leaves the decimal range
    pub fn revenue(&self) -> Option<Decimal> {
        Decimal::from(self.units()).checked_mul(self.price())
    }
}

impl RawProduct {
    pub fn display_name(&self) -> String {
        self.title
            .as_ref()
            .or(self.name.as_ref())
            .cloned()
            .unwrap_or_else(|| "N/A".to_string())
    }

    pub fn stock_level(&self) -> i64 {
        self.stock_quantity.or(self.stock).unwrap_or(0)
    }

    pub fn unit_price(&self) -> Decimal {
        self.price.unwrap_or_default()
    }
}

impl RawCategory {
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "N/A".to_string())
    }
}

/// Parse the date formats the backend emits: RFC 3339, naive ISO date-times
/// and plain dates (taken as midnight).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
