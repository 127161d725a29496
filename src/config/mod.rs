mod settings;
pub mod workspace;

pub use settings::{CompanySettings, Config, OutputSettings, SourceSettings};
pub use workspace::{FileStore, MemoryStore, PreferenceStore, WorkspaceConfig};

use crate::error::{ReportError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.toml";
pub const WORKSPACE_FILE: &str = "workspace.toml";

/// Get the config directory path (~/.salesreport/)
pub fn config_dir() -> Result<PathBuf> {
    // First try XDG-style directories
    if let Some(proj_dirs) = ProjectDirs::from("", "", "salesreport") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.salesreport/
    let home = dirs_home().ok_or_else(|| {
        ReportError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".salesreport"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Resolve the configured output directory; relative paths are taken from
/// the config directory
pub fn resolve_output_dir(dir: &str, config_dir: &Path) -> PathBuf {
    let path = expand_path(dir);
    if path.is_absolute() {
        path
    } else {
        config_dir.join(path)
    }
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let path = config_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Err(ReportError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| ReportError::ConfigParse { path, source: e })
}

/// Preference store backing the dashboard workspace
pub fn workspace_store(config_dir: &Path) -> FileStore {
    FileStore::new(config_dir.join(WORKSPACE_FILE))
}

/// Write the config template into a fresh directory
pub fn init_config_dir(config_dir: &Path) -> Result<()> {
    if config_dir.join(CONFIG_FILE).exists() {
        return Err(ReportError::AlreadyInitialized(config_dir.to_path_buf()));
    }
    fs::create_dir_all(config_dir)?;
    fs::write(config_dir.join(CONFIG_FILE), CONFIG_TEMPLATE)?;
    Ok(())
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[company]
name = "Your Company Name"
email = "contact@yourcompany.com"   # optional, shown in report footers

[source]
base_url = "http://localhost:8080/api"
timeout_secs = 10
# user_id = 1          # optional, sent as X-User-Id and used by vendeur reports
# role = "ADMIN"       # optional, sent as X-User-Role

[format]
locale = "fr-MA"
currency_code = "MAD"
minor_unit_digits = 2   # prices and line amounts
summary_digits = 0      # totals and KPIs

[layout]
page_width = 210.0      # millimetres (A4)
page_height = 297.0
margin = 15.0
section_spacing = 6.0

[output]
dir = "output"           # relative to this directory; ~/ is expanded
"#;
