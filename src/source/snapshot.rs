use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::{decode_collection, DataSource, Dataset};
use crate::error::{ReportError, Result};
use crate::model::{RawCategory, RawProduct, RawSale};

/// A saved copy of the three collections, written by `salesreport fetch`
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<NaiveDateTime>,
    pub sales: Vec<RawSale>,
    pub products: Vec<RawProduct>,
    pub categories: Vec<RawCategory>,
}

impl Snapshot {
    pub fn from_dataset(dataset: Dataset, fetched_at: NaiveDateTime) -> Self {
        Self {
            fetched_at: Some(fetched_at),
            sales: dataset.sales,
            products: dataset.products,
            categories: dataset.categories,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Serves collections from a snapshot file instead of the backend.
///
/// The file is read once; a missing or non-array key fails only that
/// collection, like a failed request would.
pub struct SnapshotSource {
    path: PathBuf,
    document: serde_json::Value,
}

impl SnapshotSource {
    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ReportError::Snapshot {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let document = serde_json::from_str(&content).map_err(|e| ReportError::Snapshot {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    fn collection(&self, key: &str) -> Result<&serde_json::Value> {
        self.document.get(key).ok_or_else(|| ReportError::Snapshot {
            path: self.path.clone(),
            reason: format!("missing '{key}'"),
        })
    }
}

impl DataSource for SnapshotSource {
    fn fetch_sales(&self) -> Result<Vec<RawSale>> {
        decode_collection("sales", self.collection("sales")?)
    }

    fn fetch_products(&self) -> Result<Vec<RawProduct>> {
        decode_collection("products", self.collection("products")?)
    }

    fn fetch_categories(&self) -> Result<Vec<RawCategory>> {
        decode_collection("categories", self.collection("categories")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ingest, Collection};
    use tempfile::TempDir;

    #[test]
    fn missing_key_fails_only_that_collection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        fs::write(
            &path,
            r#"{"sales": [{"id": 1, "totalAmount": 5}], "products": "oops"}"#,
        )
        .unwrap();

        let source = SnapshotSource::open(&path).unwrap();
        let dataset = ingest(&source);

        assert_eq!(dataset.sales.len(), 1);
        assert_eq!(
            dataset.failed,
            vec![Collection::Products, Collection::Categories]
        );
    }

    #[test]
    fn saved_snapshot_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        let dataset = Dataset {
            sales: vec![RawSale {
                id: 4,
                sale_date: Some("2024-05-01".to_string()),
                ..Default::default()
            }],
            products: vec![],
            categories: vec![RawCategory {
                id: 2,
                name: Some("Garden".to_string()),
                description: None,
            }],
            failed: vec![],
        };
        let fetched_at = chrono::NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();

        Snapshot::from_dataset(dataset, fetched_at).save(&path).unwrap();
        let reread = ingest(&SnapshotSource::open(&path).unwrap());

        assert!(!reread.is_partial());
        assert_eq!(reread.sales[0].id, 4);
        assert_eq!(reread.categories[0].display_name(), "Garden");
    }

    #[test]
    fn unreadable_file_is_reported() {
        let err = SnapshotSource::open(Path::new("/nonexistent/snapshot.json"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("Failed to read snapshot"));
    }
}
