use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use catalog_ingest::config;
use catalog_ingest::db::{self, SqliteCatalog};
use catalog_ingest::ingest::{ingest, IngestRequest};
use catalog_ingest::source;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Bulk-upload a vendor's products from a CSV or JSON file"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Vendor that owns the uploaded products
    #[arg(long)]
    vendor: String,

    /// Product file (`.csv` spreadsheet export or `.json` array)
    #[arg(long)]
    file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = cfg.database_url();
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let products = source::load_rows(&args.file)?;
    info!(file = %args.file.display(), rows = products.len(), "loaded product file");

    let request = IngestRequest {
        vendor_id: args.vendor,
        products,
    };
    let catalog = SqliteCatalog::new(pool);
    let response = ingest(&catalog, &request, &cfg.ingest_settings()).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&response).context("failed to encode response")?
    );
    if !response.success() {
        warn!("upload did not save any products");
        std::process::exit(1);
    }
    Ok(())
}
