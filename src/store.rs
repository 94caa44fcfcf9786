//! Storage collaborator seam used by the ingestion pipeline.
use async_trait::async_trait;
use std::any::Any;
use thiserror::Error;
use tracing::instrument;

use crate::category::CategoryTable;
use crate::model::{ExistingProductRef, NewProduct, SkuIndex, ValidatedProduct, Vendor};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A write hit the global unique constraint on `sku`. Carries the
    /// database's constraint message; the offending SKU is not reported.
    #[error("SKU uniqueness violated: {0}")]
    SkuTaken(String),
    #[error("product {0} not found for vendor")]
    NotFound(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait CatalogStore: Send + Sync + Any {
    async fn find_vendor(&self, vendor_id: &str) -> Result<Option<Vendor>, StoreError>;

    async fn category_table(&self) -> Result<CategoryTable, StoreError>;

    /// Products whose SKU is one of `skus`, optionally restricted to one vendor.
    async fn existing_by_sku(
        &self,
        skus: &[String],
        vendor_id: Option<&str>,
    ) -> Result<Vec<ExistingProductRef>, StoreError>;

    /// Products whose SKU starts with any of `prefixes` (all vendors).
    async fn sku_prefix_matches(
        &self,
        prefixes: &[String],
    ) -> Result<Vec<ExistingProductRef>, StoreError>;

    /// Creates every row in one operation; either all rows land or none do.
    async fn insert_products(&self, rows: &[NewProduct]) -> Result<(), StoreError>;

    /// Overwrites the payload fields of product `id` owned by `vendor_id`.
    async fn update_product(
        &self,
        id: &str,
        vendor_id: &str,
        product: &ValidatedProduct,
    ) -> Result<(), StoreError>;
}

/// Point-in-time views used for classification.
#[derive(Debug, Clone, Default)]
pub struct SkuViews {
    pub vendor_scoped: SkuIndex,
    pub global: SkuIndex,
}

/// Prefix every rename candidate for `sku` starts with.
pub fn rename_prefix(sku: &str) -> String {
    format!("{sku}-V")
}

/// Fetch both SKU views for a batch. The global view also carries every
/// stored SKU that could collide with a rename candidate, so renames are
/// checked against real data rather than only the uploaded SKUs.
#[instrument(skip_all, fields(vendor_id = %vendor_id, skus = skus.len()))]
pub async fn fetch_views(
    store: &dyn CatalogStore,
    vendor_id: &str,
    skus: &[String],
) -> Result<SkuViews, StoreError> {
    let mut unique: Vec<String> = skus.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let scoped = store.existing_by_sku(&unique, Some(vendor_id)).await?;
    let mut global = store.existing_by_sku(&unique, None).await?;
    let prefixes: Vec<String> = unique.iter().map(|s| rename_prefix(s)).collect();
    global.extend(store.sku_prefix_matches(&prefixes).await?);

    Ok(SkuViews {
        vendor_scoped: SkuIndex::new(scoped),
        global: SkuIndex::new(global),
    })
}
