//! Ingestion: pull the three raw collections from a data source.

mod http;
mod snapshot;

pub use http::HttpSource;
pub use snapshot::{Snapshot, SnapshotSource};

use serde::de::DeserializeOwned;
use std::fmt;
use std::thread;

use crate::error::{ReportError, Result};
use crate::model::{RawCategory, RawProduct, RawSale};

/// Read side of the sales backend
pub trait DataSource: Sync {
    fn fetch_sales(&self) -> Result<Vec<RawSale>>;
    fn fetch_products(&self) -> Result<Vec<RawProduct>>;
    fn fetch_categories(&self) -> Result<Vec<RawCategory>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Sales,
    Products,
    Categories,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Sales => write!(f, "sales"),
            Collection::Products => write!(f, "products"),
            Collection::Categories => write!(f, "categories"),
        }
    }
}

/// The three collections of one report request
#[derive(Debug, Default)]
pub struct Dataset {
    pub sales: Vec<RawSale>,
    pub products: Vec<RawProduct>,
    pub categories: Vec<RawCategory>,
    /// Collections that failed to load and were replaced by an empty one
    pub failed: Vec<Collection>,
}

impl Dataset {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Keep only the sales recorded by `user_id`
    pub fn retain_seller(&mut self, user_id: i64) {
        self.sales.retain(|sale| sale.user_id == Some(user_id));
    }
}

/// Fetch all three collections in parallel and wait for all of them.
///
/// A failing fetch never aborts the request: it is logged as partial data
/// and its collection comes back empty.
pub fn ingest(source: &dyn DataSource) -> Dataset {
    let (sales, products, categories) = thread::scope(|s| {
        let sales = s.spawn(|| source.fetch_sales());
        let products = s.spawn(|| source.fetch_products());
        let categories = s.spawn(|| source.fetch_categories());
        (
            joined(sales.join(), Collection::Sales),
            joined(products.join(), Collection::Products),
            joined(categories.join(), Collection::Categories),
        )
    });

    let mut failed = Vec::new();
    let dataset = Dataset {
        sales: or_empty(sales, Collection::Sales, &mut failed),
        products: or_empty(products, Collection::Products, &mut failed),
        categories: or_empty(categories, Collection::Categories, &mut failed),
        failed,
    };

    tracing::debug!(
        sales = dataset.sales.len(),
        products = dataset.products.len(),
        categories = dataset.categories.len(),
        "ingested dataset"
    );
    dataset
}

fn joined<T>(outcome: thread::Result<Result<Vec<T>>>, collection: Collection) -> Result<Vec<T>> {
    outcome.unwrap_or_else(|_| {
        Err(ReportError::Fetch {
            collection: collection.to_string(),
            reason: "fetch worker panicked".to_string(),
        })
    })
}

fn or_empty<T>(
    fetched: Result<Vec<T>>,
    collection: Collection,
    failed: &mut Vec<Collection>,
) -> Vec<T> {
    match fetched {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(
                %collection,
                error = %e,
                "partial data: continuing with an empty collection"
            );
            failed.push(collection);
            Vec::new()
        }
    }
}

/// Decode a JSON array into records, skipping elements that do not fit.
///
/// Anything other than an array is `ReportError::InvalidInput`.
pub fn decode_collection<T: DeserializeOwned>(
    name: &str,
    value: &serde_json::Value,
) -> Result<Vec<T>> {
    let items = value
        .as_array()
        .ok_or_else(|| ReportError::InvalidInput(name.to_string()))?;

    let mut decoded = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match T::deserialize(item) {
            Ok(record) => decoded.push(record),
            Err(e) => {
                tracing::warn!(collection = name, index, error = %e, "skipping malformed record")
            }
        }
    }
    Ok(decoded)
}
