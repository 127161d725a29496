use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReportError, Result};

/// Key the widget list is stored under
pub const WORKSPACE_KEY: &str = "workspace-widgets";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetSize {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct WidgetType {
    pub id: &'static str,
    pub name: &'static str,
    pub size: WidgetSize,
}

/// Widgets the analytics workspace knows how to draw
pub const WIDGET_TYPES: [WidgetType; 8] = [
    WidgetType {
        id: "revenue-trend",
        name: "Revenue Trend",
        size: WidgetSize::Large,
    },
    WidgetType {
        id: "sales-pie",
        name: "Sales by Category",
        size: WidgetSize::Medium,
    },
    WidgetType {
        id: "top-products",
        name: "Top Products",
        size: WidgetSize::Medium,
    },
    WidgetType {
        id: "kpi-revenue",
        name: "KPI: Revenue",
        size: WidgetSize::Small,
    },
    WidgetType {
        id: "kpi-sales",
        name: "KPI: Sales Count",
        size: WidgetSize::Small,
    },
    WidgetType {
        id: "kpi-products",
        name: "KPI: Products",
        size: WidgetSize::Small,
    },
    WidgetType {
        id: "kpi-categories",
        name: "KPI: Categories",
        size: WidgetSize::Small,
    },
    WidgetType {
        id: "daily-bar",
        name: "Daily Sales Bar",
        size: WidgetSize::Large,
    },
];

const DEFAULT_WIDGETS: [&str; 7] = [
    "kpi-revenue",
    "kpi-sales",
    "kpi-products",
    "kpi-categories",
    "revenue-trend",
    "sales-pie",
    "top-products",
];

pub fn widget_type(id: &str) -> Option<&'static WidgetType> {
    WIDGET_TYPES.iter().find(|w| w.id == id)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WidgetState {
    pub id: String,
    pub visible: bool,
}

/// Ordered widget list of the dashboard workspace
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct WorkspaceConfig {
    pub widgets: Vec<WidgetState>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            widgets: DEFAULT_WIDGETS
                .iter()
                .map(|id| WidgetState {
                    id: id.to_string(),
                    visible: true,
                })
                .collect(),
        }
    }
}

impl WorkspaceConfig {
    /// Read the widget list from `store`; a missing or unreadable entry
    /// falls back to the default layout.
    pub fn load(store: &dyn PreferenceStore) -> Result<Self> {
        let Some(raw) = store.get(WORKSPACE_KEY)? else {
            return Ok(Self::default());
        };
        match serde_json::from_str(&raw) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable workspace preferences");
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, store: &mut dyn PreferenceStore) -> Result<()> {
        let raw = serde_json::to_string(self)?;
        store.set(WORKSPACE_KEY, &raw)
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.widgets.iter().any(|w| w.id == id && w.visible)
    }

    pub fn visible_ids(&self) -> Vec<&str> {
        self.widgets
            .iter()
            .filter(|w| w.visible)
            .map(|w| w.id.as_str())
            .collect()
    }

    /// Make a widget visible, appending it if it is not in the list yet
    pub fn show(&mut self, id: &str) -> Result<()> {
        self.set_visible(id, true)
    }

    pub fn hide(&mut self, id: &str) -> Result<()> {
        self.set_visible(id, false)
    }

    /// Drop a widget from the list entirely
    pub fn remove(&mut self, id: &str) -> Result<()> {
        let known = widget_type(id).ok_or_else(|| ReportError::UnknownWidget(id.to_string()))?;
        self.widgets.retain(|w| w.id != known.id);
        Ok(())
    }

    fn set_visible(&mut self, id: &str, visible: bool) -> Result<()> {
        let known = widget_type(id).ok_or_else(|| ReportError::UnknownWidget(id.to_string()))?;
        match self.widgets.iter_mut().find(|w| w.id == known.id) {
            Some(widget) => widget.visible = visible,
            None => self.widgets.push(WidgetState {
                id: known.id.to_string(),
                visible,
            }),
        }
        Ok(())
    }
}

/// Key-value storage for user preferences
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Preferences kept as string values in a TOML file
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        toml::from_str(&content).map_err(|e| ReportError::ConfigParse {
            path: self.path.clone(),
            source: e,
        })
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let content = toml::to_string_pretty(entries).map_err(|e| {
            ReportError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            ))
        })?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read()?;
        entries.insert(key.to_string(), value.to_string());
        self.write(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut entries = self.read()?;
        if entries.remove(key).is_some() {
            self.write(&entries)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_nothing_is_stored() {
        let store = MemoryStore::default();
        let config = WorkspaceConfig::load(&store).unwrap();
        assert_eq!(config.visible_ids().len(), 7);
        assert!(!config.is_visible("daily-bar"));
    }

    #[test]
    fn hide_show_and_persist() {
        let mut store = MemoryStore::default();
        let mut config = WorkspaceConfig::default();

        config.hide("sales-pie").unwrap();
        config.show("daily-bar").unwrap();
        config.save(&mut store).unwrap();

        let reloaded = WorkspaceConfig::load(&store).unwrap();
        assert!(!reloaded.is_visible("sales-pie"));
        assert!(reloaded.is_visible("daily-bar"));
        assert_eq!(reloaded.widgets.last().unwrap().id, "daily-bar");
    }

    #[test]
    fn stored_shape_is_a_plain_widget_array() {
        let mut store = MemoryStore::default();
        WorkspaceConfig::default().save(&mut store).unwrap();
        let raw = store.get(WORKSPACE_KEY).unwrap().unwrap();
        assert!(raw.starts_with(r#"[{"id":"kpi-revenue","visible":true}"#));
    }

    #[test]
    fn unknown_widget_is_rejected() {
        let mut config = WorkspaceConfig::default();
        let err = config.show("weather").unwrap_err();
        assert!(matches!(err, ReportError::UnknownWidget(ref id) if id == "weather"));
        assert_eq!(config, WorkspaceConfig::default());
    }

    #[test]
    fn corrupt_entry_falls_back_to_default() {
        let mut store = MemoryStore::default();
        store.set(WORKSPACE_KEY, "{not json").unwrap();
        assert_eq!(WorkspaceConfig::load(&store).unwrap(), WorkspaceConfig::default());
    }

    #[test]
    fn file_store_round_trips_through_toml() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path().join("workspace.toml"));

        assert_eq!(store.get(WORKSPACE_KEY).unwrap(), None);
        store.set(WORKSPACE_KEY, r#"[{"id":"daily-bar","visible":true}]"#).unwrap();
        store.set("theme", "dark").unwrap();

        let reopened = FileStore::new(dir.path().join("workspace.toml"));
        let config = WorkspaceConfig::load(&reopened).unwrap();
        assert_eq!(config.visible_ids(), ["daily-bar"]);
        assert_eq!(reopened.get("theme").unwrap().as_deref(), Some("dark"));

        store.remove("theme").unwrap();
        assert_eq!(reopened.get("theme").unwrap(), None);
    }
}
