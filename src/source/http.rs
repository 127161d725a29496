use std::time::Duration;
use ureq::Agent;

use super::{decode_collection, DataSource};
use crate::config::SourceSettings;
use crate::error::{ReportError, Result};
use crate::model::{RawCategory, RawProduct, RawSale};

/// REST backend exposing `/sales`, `/products` and `/categories`
pub struct HttpSource {
    agent: Agent,
    base_url: String,
    user_id: Option<i64>,
    role: Option<String>,
}

impl HttpSource {
    pub fn new(settings: &SourceSettings) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .build()
            .into();

        Self {
            agent,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            user_id: settings.user_id,
            role: settings.role.clone(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get_json(&self, collection: &str) -> Result<serde_json::Value> {
        let url = self.url(collection);
        tracing::debug!(%url, "fetching collection");

        let fetch_err = |reason: String| ReportError::Fetch {
            collection: collection.to_string(),
            reason,
        };

        // Same identity headers the dashboard sends with every request
        let mut request = self.agent.get(&url);
        if let Some(id) = self.user_id {
            request = request.header("X-User-Id", id.to_string());
        }
        if let Some(role) = &self.role {
            request = request.header("X-User-Role", role.as_str());
        }

        let body: String = request
            .call()
            .map_err(|e| fetch_err(e.to_string()))?
            .body_mut()
            .read_to_string()
            .map_err(|e| fetch_err(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| fetch_err(e.to_string()))
    }
}

impl DataSource for HttpSource {
    fn fetch_sales(&self) -> Result<Vec<RawSale>> {
        decode_collection("sales", &self.get_json("sales")?)
    }

    fn fetch_products(&self) -> Result<Vec<RawProduct>> {
        decode_collection("products", &self.get_json("products")?)
    }

    fn fetch_categories(&self) -> Result<Vec<RawCategory>> {
        decode_collection("categories", &self.get_json("categories")?)
    }
}
