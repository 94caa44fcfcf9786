use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

use catalog_ingest::config;
use catalog_ingest::db;
use catalog_ingest::model::Vendor;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Load vendors and categories from a YAML seed file"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Seed file with `vendors` and `categories` lists
    #[arg(long)]
    seed: PathBuf,
}

#[derive(Debug, Deserialize)]
struct Seed {
    #[serde(default)]
    vendors: Vec<SeedVendor>,
    #[serde(default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SeedVendor {
    id: String,
    name: String,
    #[serde(default = "default_status")]
    status: String,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_status() -> String {
    "pending".to_string()
}

fn default_active() -> bool {
    true
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
    cfg.ensure_dirs()?;

    let content = std::fs::read_to_string(&args.seed)
        .with_context(|| format!("failed to read {}", args.seed.display()))?;
    let seed: Seed = serde_yaml::from_str(&content).context("invalid seed file")?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    for v in &seed.vendors {
        db::upsert_vendor(
            &pool,
            &Vendor {
                id: v.id.clone(),
                name: v.name.clone(),
                status: v.status.clone(),
                is_active: v.is_active,
            },
        )
        .await?;
    }
    for name in &seed.categories {
        db::upsert_category(&pool, name).await?;
    }

    info!(
        vendors = seed.vendors.len(),
        categories = seed.categories.len(),
        "seed applied"
    );
    Ok(())
}
