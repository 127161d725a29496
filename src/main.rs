use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use salesreport::aggregate::{aggregate, AggregateOptions, DateRange, Granularity, Summary};
use salesreport::config::{
    self, config_dir, init_config_dir, load_config, workspace::WIDGET_TYPES, workspace_store,
    Config, WorkspaceConfig, CONFIG_FILE,
};
use salesreport::error::{ReportError, Result};
use salesreport::export::{self, default_file_name, ExportFormat};
use salesreport::pdf::generate_pdf;
use salesreport::render::{render, NumberFormat, ReportKind};
use salesreport::source::{ingest, Dataset, HttpSource, Snapshot, SnapshotSource};

#[derive(Parser)]
#[command(name = "salesreport")]
#[command(
    version,
    about = "Sales, product and category reports from a sales-management backend",
    long_about = None
)]
struct Cli {
    /// Path to config directory (default: ~/.salesreport or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a template config.toml
    Init,

    /// Show configuration and workspace status
    Status,

    /// Download sales, products and categories into a snapshot file
    Fetch {
        /// Snapshot path (default: <config dir>/snapshot.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save even when some collections could not be fetched
        #[arg(long)]
        force: bool,
    },

    /// Print KPIs and rollups for the visible dashboard widgets
    Summary {
        #[command(flatten)]
        filter: DataArgs,
    },

    /// Generate a report as PDF, XLSX or CSV
    Report {
        /// Report kind: sales, products, categories, monthly, custom,
        /// admin, analyste, vendeur or investisseur
        kind: ReportKind,

        /// Output format: pdf, xlsx or csv
        #[arg(short, long, default_value = "pdf")]
        format: ExportFormat,

        #[command(flatten)]
        filter: DataArgs,

        /// Custom output file path (default: output dir/rapport_<kind>_<date>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Open the generated file with the system default viewer
        #[arg(long)]
        open: bool,
    },

    /// Manage dashboard workspace widgets
    Widgets {
        #[command(subcommand)]
        action: WidgetCommand,
    },
}

#[derive(clap::Args)]
struct DataArgs {
    /// Only include sales from this date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// Only include sales up to this date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,

    /// Time series bucket: day or month
    #[arg(short, long, default_value = "day")]
    granularity: Granularity,

    /// Read collections from a snapshot file instead of the backend
    #[arg(short, long)]
    input: Option<PathBuf>,
}

#[derive(Subcommand)]
enum WidgetCommand {
    /// List available widgets and their visibility
    List,
    /// Show a widget
    Show { id: String },
    /// Hide a widget
    Hide { id: String },
    /// Remove a widget from the workspace
    Remove { id: String },
    /// Restore the default widget layout
    Reset,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(env_filter),
        )
        .init();
}

fn run(cli: Cli) -> Result<()> {
    // Determine config directory
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Status => cmd_status(&cfg_dir),
        Commands::Fetch { output, force } => cmd_fetch(&cfg_dir, output, force),
        Commands::Summary { filter } => cmd_summary(&cfg_dir, &filter),
        Commands::Report {
            kind,
            format,
            filter,
            output,
            open,
        } => cmd_report(&cfg_dir, kind, format, &filter, output, open),
        Commands::Widgets { action } => cmd_widgets(&cfg_dir, action),
    }
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    init_config_dir(cfg_dir)?;

    println!("Initialized salesreport config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Set your company and backend:  $EDITOR {}/{CONFIG_FILE}",
        cfg_dir.display()
    );
    println!("  2. Check the connection:          salesreport fetch");
    println!();
    println!("Then generate your first report:");
    println!("  salesreport report sales --format pdf");

    Ok(())
}

fn require_config(cfg_dir: &Path) -> Result<Config> {
    if !cfg_dir.exists() {
        return Err(ReportError::ConfigNotFound(cfg_dir.to_path_buf()));
    }
    load_config(cfg_dir)
}

fn cmd_status(cfg_dir: &Path) -> Result<()> {
    let config = require_config(cfg_dir)?;
    let store = workspace_store(cfg_dir);
    let workspace = WorkspaceConfig::load(&store)?;
    let output_dir = config::resolve_output_dir(&config.output.dir, cfg_dir);

    println!("Sales Report Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("Company:          {}", config.company.name);
    println!("Backend:          {}", config.source.base_url);
    println!(
        "Format:           {} / {}",
        config.format.locale, config.format.currency_code
    );
    println!(
        "Page:             {} x {} mm, margin {} mm",
        config.layout.page_width, config.layout.page_height, config.layout.margin
    );
    println!("Output directory: {}", output_dir.display());
    println!(
        "Widgets:          {} of {} visible",
        workspace.visible_ids().len(),
        WIDGET_TYPES.len()
    );

    let snapshot = cfg_dir.join("snapshot.json");
    if snapshot.exists() {
        println!("Snapshot:         {}", snapshot.display());
    }

    Ok(())
}

fn cmd_fetch(cfg_dir: &Path, output: Option<PathBuf>, force: bool) -> Result<()> {
    let config = require_config(cfg_dir)?;
    let source = HttpSource::new(&config.source);
    let dataset = ingest(&source);

    if dataset.is_partial() {
        let failed: Vec<String> = dataset.failed.iter().map(|c| c.to_string()).collect();
        if !force {
            return Err(ReportError::Fetch {
                collection: failed.join(", "),
                reason: "snapshot left unchanged (use --force to save partial data)".to_string(),
            });
        }
        println!("Warning: could not fetch {}", failed.join(", "));
    }

    let (sales, products, categories) = (
        dataset.sales.len(),
        dataset.products.len(),
        dataset.categories.len(),
    );
    let path = output.unwrap_or_else(|| cfg_dir.join("snapshot.json"));
    Snapshot::from_dataset(dataset, Local::now().naive_local()).save(&path)?;

    println!("Fetched from {}", config.source.base_url);
    println!("  Sales:      {sales}");
    println!("  Products:   {products}");
    println!("  Categories: {categories}");
    println!("  Saved:      {}", path.display());

    Ok(())
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ReportError::InvalidDate(value.to_string()))
}

fn date_range(from: Option<&str>, to: Option<&str>) -> Result<Option<DateRange>> {
    let from = from.map(parse_date).transpose()?;
    let to = to.map(parse_date).transpose()?;
    if from.is_none() && to.is_none() {
        return Ok(None);
    }

    let range = DateRange {
        from: from.unwrap_or(NaiveDate::MIN),
        to: to.unwrap_or(NaiveDate::MAX),
    };
    if range.from > range.to {
        return Err(ReportError::InvalidRange {
            from: range.from.to_string(),
            to: range.to.to_string(),
        });
    }
    Ok(Some(range))
}

fn load_dataset(config: &Config, input: Option<&Path>) -> Result<Dataset> {
    let dataset = match input {
        Some(path) => ingest(&SnapshotSource::open(path)?),
        None => ingest(&HttpSource::new(&config.source)),
    };
    Ok(dataset)
}

/// Load, filter and aggregate. With `seller` set, only the sales of the
/// configured `[source] user_id` are kept.
fn build_summary(cfg_dir: &Path, filter: &DataArgs, seller: bool) -> Result<(Config, Summary)> {
    let config = require_config(cfg_dir)?;
    let date_range = date_range(filter.from.as_deref(), filter.to.as_deref())?;
    let seller_id = if seller {
        Some(config.source.user_id.ok_or(ReportError::SellerNotConfigured)?)
    } else {
        None
    };
    let mut dataset = load_dataset(&config, filter.input.as_deref())?;
    if let Some(user_id) = seller_id {
        let before = dataset.sales.len();
        dataset.retain_seller(user_id);
        tracing::debug!(user_id, before, kept = dataset.sales.len(), "filtered seller sales");
    }

    let options = AggregateOptions {
        granularity: filter.granularity,
        date_range,
        reference_time: Local::now().naive_local(),
    };
    let summary = aggregate(
        &dataset.sales,
        &dataset.products,
        &dataset.categories,
        &options,
    );
    Ok((config, summary))
}

// Table row structs for tabled
#[derive(Tabled)]
struct KpiRow {
    #[tabled(rename = "KPI")]
    label: String,
    #[tabled(rename = "VALUE")]
    value: String,
}

#[derive(Tabled)]
struct BucketRow {
    #[tabled(rename = "PERIOD")]
    period: String,
    #[tabled(rename = "REVENUE")]
    revenue: String,
    #[tabled(rename = "ORDERS")]
    orders: u64,
}

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "CATEGORY")]
    name: String,
    #[tabled(rename = "REVENUE")]
    revenue: String,
    #[tabled(rename = "UNITS")]
    units: u64,
    #[tabled(rename = "PRODUCTS")]
    products: u64,
}

#[derive(Tabled)]
struct ProductRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "PRODUCT")]
    name: String,
    #[tabled(rename = "UNITS")]
    units: u64,
    #[tabled(rename = "REVENUE")]
    revenue: String,
}

fn print_table<T: Tabled>(title: &str, rows: Vec<T>) {
    println!();
    println!("{title}");
    if rows.is_empty() {
        println!("  (no data)");
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn kpi_rows(summary: &Summary, fmt: &NumberFormat, workspace: &WorkspaceConfig) -> Vec<KpiRow> {
    let kpis = &summary.kpis;
    let mut rows = Vec::new();
    let mut push = |label: &str, value: String| {
        rows.push(KpiRow {
            label: label.to_string(),
            value,
        })
    };

    if workspace.is_visible("kpi-revenue") {
        push("Revenue", fmt.summary_money(kpis.total_revenue));
        push("Average order", fmt.money(kpis.average_order_value));
        push("Growth", fmt.percent(kpis.growth_rate));
    }
    if workspace.is_visible("kpi-sales") {
        push("Sales", fmt.integer(kpis.order_count as i64));
    }
    if workspace.is_visible("kpi-products") {
        push("Products", fmt.integer(summary.product_total as i64));
        push("Low stock", fmt.integer(summary.low_stock_count as i64));
    }
    if workspace.is_visible("kpi-categories") {
        push("Categories", fmt.integer(summary.category_total as i64));
    }
    rows
}

fn bucket_rows(
    buckets: &[salesreport::aggregate::TimeBucket],
    fmt: &NumberFormat,
) -> Vec<BucketRow> {
    buckets
        .iter()
        .map(|b| BucketRow {
            period: b.period_key.clone(),
            revenue: fmt.summary_money(b.revenue),
            orders: b.order_count,
        })
        .collect()
}

fn cmd_summary(cfg_dir: &Path, filter: &DataArgs) -> Result<()> {
    let (config, summary) = build_summary(cfg_dir, filter, false)?;
    let workspace = WorkspaceConfig::load(&workspace_store(cfg_dir))?;
    let fmt = &config.format;

    println!("Sales Summary ({})", config.company.name);
    if let Some(range) = &summary.period {
        println!("Period: {} to {}", range.from, range.to);
    }

    let kpis = kpi_rows(&summary, fmt, &workspace);
    if !kpis.is_empty() {
        print_table("Key figures", kpis);
    }

    if workspace.is_visible("revenue-trend") {
        print_table("Revenue trend (monthly)", bucket_rows(&summary.monthly, fmt));
    }

    if workspace.is_visible("daily-bar") {
        print_table(
            &format!("Sales by {}", summary.granularity),
            bucket_rows(&summary.time_series, fmt),
        );
    }

    if workspace.is_visible("sales-pie") {
        let rows: Vec<CategoryRow> = summary
            .category_rollups
            .iter()
            .map(|c| CategoryRow {
                name: c.name.clone(),
                revenue: fmt.summary_money(c.revenue),
                units: c.units_sold,
                products: c.product_count,
            })
            .collect();
        print_table("Sales by category", rows);
    }

    if workspace.is_visible("top-products") {
        let rows: Vec<ProductRow> = summary
            .product_rollups
            .iter()
            .take(10)
            .enumerate()
            .map(|(i, p)| ProductRow {
                rank: i + 1,
                name: p.name.clone(),
                units: p.units_sold,
                revenue: fmt.money(p.revenue),
            })
            .collect();
        print_table("Top products", rows);
    }

    if summary.quality.unresolved_line_items > 0 {
        println!();
        println!(
            "Note: {} line item(s) referenced unknown products and were skipped.",
            summary.quality.unresolved_line_items
        );
    }

    Ok(())
}

fn cmd_report(
    cfg_dir: &Path,
    kind: ReportKind,
    format: ExportFormat,
    filter: &DataArgs,
    output: Option<PathBuf>,
    open: bool,
) -> Result<()> {
    let (config, summary) = build_summary(cfg_dir, filter, kind == ReportKind::Seller)?;
    let doc = render(kind, &summary, &config.layout);

    // Determine output path
    let path = match output {
        Some(path) => path,
        None => {
            let output_dir = config::resolve_output_dir(&config.output.dir, cfg_dir);
            std::fs::create_dir_all(&output_dir)?;
            output_dir.join(default_file_name(kind, format, summary.generated_at.date()))
        }
    };

    match format {
        ExportFormat::Pdf => generate_pdf(&doc, &config.format, &config.company, &path)?,
        ExportFormat::Xlsx => export::xlsx::write_xlsx(&doc, &config.format, &path)?,
        ExportFormat::Csv => export::csv::write_csv(&doc, &config.format, &path)?,
    }

    println!("Generated {} ({})", doc.title, format);
    println!("  Sales:   {}", summary.kpis.order_count);
    println!("  Revenue: {}", config.format.summary_money(summary.kpis.total_revenue));
    if format == ExportFormat::Pdf {
        println!("  Pages:   {}", doc.pages.len());
    }
    println!("  Saved:   {}", path.display());

    if open {
        open_path(&path)?;
    }

    Ok(())
}

fn cmd_widgets(cfg_dir: &Path, action: WidgetCommand) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(ReportError::ConfigNotFound(cfg_dir.to_path_buf()));
    }
    let mut store = workspace_store(cfg_dir);
    let mut workspace = WorkspaceConfig::load(&store)?;

    match action {
        WidgetCommand::List => {
            print_widgets(&workspace);
            return Ok(());
        }
        WidgetCommand::Show { id } => {
            workspace.show(&id)?;
            println!("Widget '{id}' is now visible");
        }
        WidgetCommand::Hide { id } => {
            workspace.hide(&id)?;
            println!("Widget '{id}' is now hidden");
        }
        WidgetCommand::Remove { id } => {
            workspace.remove(&id)?;
            println!("Widget '{id}' removed from the workspace");
        }
        WidgetCommand::Reset => {
            workspace = WorkspaceConfig::default();
            println!("Workspace widgets reset to defaults");
        }
    }

    workspace.save(&mut store)
}

#[derive(Tabled)]
struct WidgetRow {
    #[tabled(rename = "ID")]
    id: &'static str,
    #[tabled(rename = "NAME")]
    name: &'static str,
    #[tabled(rename = "SIZE")]
    size: String,
    #[tabled(rename = "VISIBLE")]
    visible: &'static str,
}

fn print_widgets(workspace: &WorkspaceConfig) {
    let rows: Vec<WidgetRow> = WIDGET_TYPES
        .iter()
        .map(|w| WidgetRow {
            id: w.id,
            name: w.name,
            size: format!("{:?}", w.size).to_lowercase(),
            visible: if workspace.is_visible(w.id) { "yes" } else { "no" },
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn open_path(path: &Path) -> Result<()> {
    // Open with system default viewer
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(path).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(path).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", ""])
            .arg(path)
            .spawn()?;
    }
    Ok(())
}
