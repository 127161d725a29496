pub mod aggregate;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod pdf;
pub mod render;
pub mod source;

pub use aggregate::{aggregate, aggregate_values, AggregateOptions, Summary};
pub use config::{Config, WorkspaceConfig};
pub use error::{ReportError, Result};
pub use render::{render, LayoutOptions, NumberFormat, ReportDocument, ReportKind};
pub use source::{ingest, DataSource, Dataset};
