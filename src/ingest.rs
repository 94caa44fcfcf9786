//! Bulk ingestion pipeline: validate, classify, persist, report.
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::classify::classify;
use crate::error::IngestError;
use crate::model::{CandidateRow, ConflictResolution, ProductOutcome};
use crate::persist::{persist, PersistOptions, PersistenceReport};
use crate::store::{fetch_views, CatalogStore};
use crate::validate::{validate, FlagDefaults, ValidateOptions, DEFAULT_HEADER_ROWS};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub vendor_id: String,
    pub products: Vec<CandidateRow>,
}

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub header_rows: usize,
    pub placeholder_prefix: String,
    pub defaults: FlagDefaults,
    pub persist: PersistOptions,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            header_rows: DEFAULT_HEADER_ROWS,
            placeholder_prefix: "SKU".to_string(),
            defaults: FlagDefaults::default(),
            persist: PersistOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum IngestResponse {
    Completed(CompletedResponse),
    Rejected(RejectedResponse),
}

impl IngestResponse {
    pub fn success(&self) -> bool {
        match self {
            IngestResponse::Completed(c) => c.success,
            IngestResponse::Rejected(r) => r.success,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedResponse {
    pub success: bool,
    pub message: String,
    pub summary: Summary,
    pub data: ResultData,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_uploaded: usize,
    pub total_processed: usize,
    pub inserted: usize,
    pub updated: usize,
    pub sku_conflicts_resolved: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultData {
    pub inserted: Vec<ProductOutcome>,
    pub updated: Vec<ProductOutcome>,
    pub sku_conflicts: Vec<ConflictResolution>,
    pub errors: Vec<String>,
}

/// Validation-gate rejection: nothing was written.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RejectedResponse {
    pub success: bool,
    pub error: String,
    pub errors: Vec<String>,
    pub processed_count: usize,
    pub total_count: usize,
}

impl CompletedResponse {
    pub fn from_report(total_uploaded: usize, report: PersistenceReport) -> Self {
        let summary = Summary {
            total_uploaded,
            total_processed: report.inserted_count() + report.updated_count(),
            inserted: report.inserted_count(),
            updated: report.updated_count(),
            sku_conflicts_resolved: report.conflicts_resolved(),
            errors: report.error_count(),
        };
        let success = report.succeeded();
        let message = if success {
            format!(
                "Bulk upload completed: {} created, {} updated, {} errors",
                summary.inserted, summary.updated, summary.errors
            )
        } else {
            "Bulk upload failed: no products were saved".to_string()
        };
        Self {
            success,
            message,
            summary,
            data: ResultData {
                inserted: report.created,
                updated: report.updated,
                sku_conflicts: report.conflicts,
                errors: report.errors,
            },
        }
    }
}

#[instrument(skip_all, fields(vendor_id = %req.vendor_id, rows = req.products.len()))]
pub async fn ingest(
    store: &dyn CatalogStore,
    req: &IngestRequest,
    settings: &IngestSettings,
) -> Result<IngestResponse, IngestError> {
    let vendor_id = req.vendor_id.trim();
    if vendor_id.is_empty() {
        return Err(IngestError::Input("vendor id is required"));
    }
    if req.products.is_empty() {
        return Err(IngestError::Input("product list must not be empty"));
    }

    let vendor = store
        .find_vendor(vendor_id)
        .await?
        .ok_or_else(|| IngestError::VendorNotFound(vendor_id.to_string()))?;
    debug!(status = %vendor.status, is_active = vendor.is_active, "vendor loaded");

    let categories = store.category_table().await?;
    let opts = ValidateOptions {
        header_rows: settings.header_rows,
        placeholder_prefix: settings.placeholder_prefix.clone(),
        batch_stamp: chrono::Utc::now().timestamp_millis(),
        defaults: settings.defaults,
    };
    let validation = validate(&req.products, &categories, &opts);
    if !validation.passed() {
        warn!(
            invalid = validation.errors.len(),
            "validation failed; nothing persisted"
        );
        return Ok(IngestResponse::Rejected(RejectedResponse {
            success: false,
            error: "Validation failed".to_string(),
            errors: validation.errors.iter().map(ToString::to_string).collect(),
            processed_count: 0,
            total_count: req.products.len(),
        }));
    }

    let skus: Vec<String> = validation.products.iter().map(|p| p.sku.clone()).collect();
    let views = fetch_views(store, vendor_id, &skus).await?;
    let batch = classify(
        validation.products,
        vendor_id,
        &views.vendor_scoped,
        &views.global,
    );
    info!(
        inserts = batch.to_insert.len(),
        updates = batch.to_update.len(),
        renamed = batch.conflicts.len(),
        "batch classified"
    );

    let report = persist(store, vendor_id, batch, &settings.persist).await;
    Ok(IngestResponse::Completed(CompletedResponse::from_report(
        req.products.len(),
        report,
    )))
}
