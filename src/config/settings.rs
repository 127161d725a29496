use serde::{Deserialize, Serialize};

use crate::render::{LayoutOptions, NumberFormat};

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub company: CompanySettings,
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub format: NumberFormat,
    #[serde(default)]
    pub layout: LayoutOptions,
    #[serde(default)]
    pub output: OutputSettings,
}

/// Printed in the report footer
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CompanySettings {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Where the sales, products and categories collections come from
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SourceSettings {
    pub base_url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Sent as `X-User-Id`
    pub user_id: Option<i64>,
    /// Sent as `X-User-Role`
    pub role: Option<String>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_secs: 10,
            user_id: None,
            role: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSettings {
    pub dir: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
        }
    }
}
