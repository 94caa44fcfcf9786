use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use catalog_ingest::config;
use catalog_ingest::db;

#[derive(Debug, Parser)]
#[command(author, version, about = "Print a vendor's stored products")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Vendor whose catalog is printed
    #[arg(long)]
    vendor: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    if db::find_vendor(&pool, &args.vendor).await?.is_none() {
        return Err(anyhow!("vendor {} not found", args.vendor));
    }

    let products = db::list_products_for_vendor(&pool, &args.vendor).await?;
    println!("{:<24} {:<36} {:>10} {:>6}  {:<8} NAME", "SKU", "ID", "PRICE", "STOCK", "STATUS");
    for p in &products {
        println!(
            "{:<24} {:<36} {:>10.2} {:>6}  {:<8} {}",
            p.sku,
            p.id,
            p.price,
            p.stock_quantity,
            p.approval_status.as_str(),
            p.name
        );
    }
    println!("{} products", products.len());
    Ok(())
}
