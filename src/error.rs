use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Config directory not found at {0}. Run 'salesreport init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Invalid input: '{0}' must be a JSON array")]
    InvalidInput(String),

    #[error("Failed to fetch {collection}: {reason}")]
    Fetch { collection: String, reason: String },

    #[error("Failed to read snapshot {path}: {reason}")]
    Snapshot { path: PathBuf, reason: String },

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD (e.g., '2024-01-31')")]
    InvalidDate(String),

    #[error("Invalid date range: {from} is after {to}")]
    InvalidRange { from: String, to: String },

    #[error("Seller reports need a seller: set user_id under [source] in config.toml")]
    SellerNotConfigured,

    #[error("Unknown widget '{0}'. Use 'salesreport widgets list' to see available widgets.")]
    UnknownWidget(String),

    #[error("Typst not found. Install it from https://typst.app/ or run: cargo install typst-cli")]
    TypstNotFound,

    #[error("Failed to generate PDF: {0}")]
    PdfGeneration(String),

    #[error("Failed to write workbook: {0}")]
    Workbook(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
