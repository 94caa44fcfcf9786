use anyhow::anyhow;
use async_trait::async_trait;

use super::repo::{self, Pool};
use crate::category::CategoryTable;
use crate::model::{ExistingProductRef, NewProduct, ValidatedProduct, Vendor};
use crate::store::{CatalogStore, StoreError};

/// `CatalogStore` backed by the SQLite schema in `migrations/`.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    pool: Pool,
}

impl SqliteCatalog {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

/// Maps unique-constraint violations on `products.sku` to `SkuTaken`.
fn write_error(err: anyhow::Error) -> StoreError {
    if let Some(sqlx::Error::Database(db)) = err.downcast_ref::<sqlx::Error>() {
        if db.is_unique_violation() && db.message().contains("products.sku") {
            return StoreError::SkuTaken(db.message().to_string());
        }
    }
    StoreError::Other(err)
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn find_vendor(&self, vendor_id: &str) -> Result<Option<Vendor>, StoreError> {
        Ok(repo::find_vendor(&self.pool, vendor_id).await?)
    }

    async fn category_table(&self) -> Result<CategoryTable, StoreError> {
        Ok(CategoryTable::new(repo::list_categories(&self.pool).await?))
    }

    async fn existing_by_sku(
        &self,
        skus: &[String],
        vendor_id: Option<&str>,
    ) -> Result<Vec<ExistingProductRef>, StoreError> {
        Ok(repo::find_existing_by_sku(&self.pool, skus, vendor_id).await?)
    }

    async fn sku_prefix_matches(
        &self,
        prefixes: &[String],
    ) -> Result<Vec<ExistingProductRef>, StoreError> {
        Ok(repo::find_by_sku_prefix(&self.pool, prefixes).await?)
    }

    async fn insert_products(&self, rows: &[NewProduct]) -> Result<(), StoreError> {
        repo::insert_products(&self.pool, rows)
            .await
            .map_err(write_error)
    }

    async fn update_product(
        &self,
        id: &str,
        vendor_id: &str,
        product: &ValidatedProduct,
    ) -> Result<(), StoreError> {
        let changed = repo::update_product(&self.pool, id, vendor_id, product)
            .await
            .map_err(write_error)?;
        match changed {
            0 => Err(StoreError::NotFound(id.to_string())),
            1 => Ok(()),
            n => Err(StoreError::Other(anyhow!("update of {id} touched {n} rows"))),
        }
    }
}
