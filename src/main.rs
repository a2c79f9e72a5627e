use anyhow::{Context, Result};
use clap::Parser;
use fact_sales::persist::{PartitionedParquetPersister, TableCatalog};
use fact_sales::source::CsvEntityReader;
use fact_sales::{FactSalesPipeline, PipelineConfig, PipelineContext, ReviewPolicy};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fact-sales")]
#[command(about = "Build the denormalized e-commerce sales fact table")]
struct Args {
    /// Path to a JSON config file (or set FACT_SALES_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the raw CSV extracts
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// Directory receiving table versions and the catalog
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Name the fact table is registered under
    #[arg(long)]
    table_name: Option<String>,

    /// Keep only the latest review per order instead of one row per review
    #[arg(long)]
    latest_review_only: bool,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let config_path = args
        .config
        .clone()
        .or_else(|| std::env::var("FACT_SALES_CONFIG").ok().map(PathBuf::from));

    let mut config = match config_path {
        Some(path) => PipelineConfig::load(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(dir) = &args.input_dir {
        config.input_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(name) = &args.table_name {
        config.table_name = name.clone();
    }
    if args.latest_review_only {
        config.review_policy = ReviewPolicy::LatestPerOrder;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    info!("Fact sales pipeline starting...");
    info!("Input: {}", config.input_dir.display());
    info!("Output: {}", config.output_dir.display());

    let ctx = PipelineContext::new(config);
    let run_ctx = ctx.clone();
    let report = tokio::task::spawn_blocking(move || {
        let reader = CsvEntityReader::new(&run_ctx.config);
        let persister = PartitionedParquetPersister::new(&run_ctx);
        FactSalesPipeline::new(&run_ctx).run(&reader, &persister)
    })
    .await
    .context("pipeline task panicked")?;

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            return Err(e.into());
        }
    };

    if let Some(path) = &args.report {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("writing report to {}", path.display()))?;
    }

    let catalog = TableCatalog::in_dir(&ctx.config.output_dir);
    let entry = catalog
        .lookup(&report.table_name)?
        .context("table missing from catalog after write")?;

    println!("\n=== Fact table created: {} ===", entry.name);
    println!("Location: {}", entry.location.display());
    println!("Rows: {} in {} partitions", entry.row_count, entry.partitions.len());
    println!("Schema:");
    for column in &entry.columns {
        println!("  {}: {}", column.name, column.data_type);
    }

    Ok(())
}
