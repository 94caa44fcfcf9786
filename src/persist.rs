//! Persistence of a classified batch.
//!
//! Inserts go out as one all-or-nothing batch; updates are attempted one row
//! at a time and a failed row never stops the rows after it.
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::classify::classify;
use crate::model::{
    ApprovalStatus, ClassifiedBatch, ConflictResolution, InsertCandidate, NewProduct,
    ProductOutcome, RowAction, UpdateCandidate, ValidatedProduct,
};
use crate::store::{fetch_views, CatalogStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistOptions {
    /// Updates in flight at once; 1 keeps the loop strictly sequential.
    pub update_concurrency: usize,
    /// How often the insert set is re-classified after a unique-SKU violation.
    pub max_rename_retries: u32,
}

impl Default for PersistOptions {
    fn default() -> Self {
        Self {
            update_concurrency: 1,
            max_rename_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceReport {
    pub total_submitted: usize,
    pub created: Vec<ProductOutcome>,
    pub updated: Vec<ProductOutcome>,
    pub conflicts: Vec<ConflictResolution>,
    pub errors: Vec<String>,
}

impl PersistenceReport {
    pub fn inserted_count(&self) -> usize {
        self.created.len()
    }

    pub fn updated_count(&self) -> usize {
        self.updated.len()
    }

    pub fn conflicts_resolved(&self) -> usize {
        self.conflicts.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// The call only counts as failed when no row at all was written.
    pub fn succeeded(&self) -> bool {
        self.inserted_count() + self.updated_count() > 0
    }
}

#[instrument(skip_all, fields(vendor_id = %vendor_id, inserts = batch.to_insert.len(), updates = batch.to_update.len()))]
pub async fn persist(
    store: &dyn CatalogStore,
    vendor_id: &str,
    batch: ClassifiedBatch,
    opts: &PersistOptions,
) -> PersistenceReport {
    let mut report = PersistenceReport {
        total_submitted: batch.len(),
        ..Default::default()
    };

    let ClassifiedBatch {
        mut to_insert,
        mut to_update,
        mut conflicts,
    } = batch;

    let mut attempt = 0;
    loop {
        match insert_all(store, vendor_id, &to_insert).await {
            Ok(created) => {
                report.created = created;
                report.conflicts = conflicts;
                break;
            }
            Err(StoreError::SkuTaken(detail)) if attempt < opts.max_rename_retries => {
                attempt += 1;
                warn!(%detail, attempt, "batch insert hit a taken SKU; re-classifying inserts");
                match reclassify(store, vendor_id, to_insert).await {
                    Ok(fresh) => {
                        to_insert = fresh.to_insert;
                        to_update.extend(fresh.to_update);
                        conflicts = fresh.conflicts;
                    }
                    Err(err) => {
                        warn!(?err, "failed to refresh SKU snapshot");
                        report.errors.push(format!("Batch insert failed: {err}"));
                        break;
                    }
                }
            }
            Err(err) => {
                warn!(?err, rows = to_insert.len(), "batch insert failed");
                report.errors.push(format!("Batch insert failed: {err}"));
                break;
            }
        }
    }

    for (candidate, result) in update_each(store, &to_update, opts.update_concurrency).await {
        match result {
            Ok(()) => report.updated.push(ProductOutcome {
                id: candidate.existing_id.clone(),
                name: candidate.product.name.clone(),
                sku: candidate.product.sku.clone(),
                action: RowAction::Updated,
            }),
            Err(err) => {
                warn!(?err, id = %candidate.existing_id, "product update failed");
                report.errors.push(format!(
                    "Update failed for {}: {}",
                    candidate.product.name, err
                ));
            }
        }
    }

    info!(
        inserted = report.inserted_count(),
        updated = report.updated_count(),
        conflicts = report.conflicts_resolved(),
        errors = report.error_count(),
        "batch persisted"
    );
    report
}

/// Submits every insert candidate as a single batch create. New rows always
/// start in `pending` approval.
#[instrument(skip_all, fields(rows = candidates.len()))]
pub async fn insert_all(
    store: &dyn CatalogStore,
    vendor_id: &str,
    candidates: &[InsertCandidate],
) -> Result<Vec<ProductOutcome>, StoreError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<NewProduct> = candidates
        .iter()
        .map(|c| NewProduct {
            id: Uuid::new_v4().to_string(),
            vendor_id: vendor_id.to_string(),
            approval_status: ApprovalStatus::Pending,
            product: c.product.clone(),
        })
        .collect();
    store.insert_products(&rows).await?;
    Ok(rows
        .into_iter()
        .map(|row| ProductOutcome {
            id: row.id,
            name: row.product.name,
            sku: row.product.sku,
            action: RowAction::Created,
        })
        .collect())
}

/// Runs every update independently and pairs each candidate with its result,
/// in input order.
pub async fn update_each<'a>(
    store: &dyn CatalogStore,
    candidates: &'a [UpdateCandidate],
    concurrency: usize,
) -> Vec<(&'a UpdateCandidate, Result<(), StoreError>)> {
    stream::iter(candidates.iter().map(|candidate| async move {
        let result = store
            .update_product(&candidate.existing_id, &candidate.vendor_id, &candidate.product)
            .await;
        (candidate, result)
    }))
    .buffered(concurrency.max(1))
    .collect()
    .await
}

async fn reclassify(
    store: &dyn CatalogStore,
    vendor_id: &str,
    candidates: Vec<InsertCandidate>,
) -> Result<ClassifiedBatch, StoreError> {
    let products: Vec<ValidatedProduct> = candidates
        .into_iter()
        .map(|c| {
            let mut product = c.product;
            if let Some(original) = c.renamed_from {
                product.sku = original;
            }
            product
        })
        .collect();
    let skus: Vec<String> = products.iter().map(|p| p.sku.clone()).collect();
    let views = fetch_views(store, vendor_id, &skus).await?;
    Ok(classify(products, vendor_id, &views.vendor_scoped, &views.global))
}
