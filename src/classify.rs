//! SKU conflict resolution.
//!
//! Splits validated rows into inserts and updates against two read-only
//! snapshots of existing products, renaming SKUs owned by other vendors.
//! Pure: the same rows and snapshots always produce the same batch.
use std::collections::HashSet;

use crate::model::{
    ClassifiedBatch, ConflictResolution, InsertCandidate, SkuIndex, UpdateCandidate,
    ValidatedProduct,
};

pub const REASON_OTHER_VENDOR: &str = "SKU exists with different vendor";
pub const REASON_DUPLICATE_IN_UPLOAD: &str = "SKU duplicated within upload";

/// Last four characters of the vendor id (the whole id when shorter).
pub fn vendor_suffix(vendor_id: &str) -> String {
    let chars: Vec<char> = vendor_id.chars().collect();
    let start = chars.len().saturating_sub(4);
    chars[start..].iter().collect()
}

/// `{sku}-V{suffix}`, then `{sku}-V{suffix}-1`, `-2`, ... until `is_taken` says no.
pub fn rename_sku(original: &str, vendor_id: &str, is_taken: impl Fn(&str) -> bool) -> String {
    let base = format!("{}-V{}", original, vendor_suffix(vendor_id));
    if !is_taken(&base) {
        return base;
    }
    let mut counter: u64 = 1;
    loop {
        let candidate = format!("{base}-{counter}");
        if !is_taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

pub fn classify(
    validated: Vec<ValidatedProduct>,
    vendor_id: &str,
    vendor_scoped: &SkuIndex,
    global: &SkuIndex,
) -> ClassifiedBatch {
    let mut batch = ClassifiedBatch::default();
    // SKUs this pass has already handed to an insert.
    let mut claimed: HashSet<String> = HashSet::new();

    for mut product in validated {
        if let Some(existing) = vendor_scoped.get(&product.sku) {
            debug_assert_eq!(existing.vendor_id, vendor_id);
            batch.to_update.push(UpdateCandidate {
                existing_id: existing.id.clone(),
                vendor_id: existing.vendor_id.clone(),
                product,
            });
            continue;
        }

        let reason = if global.contains(&product.sku) {
            Some(REASON_OTHER_VENDOR)
        } else if claimed.contains(&product.sku) {
            Some(REASON_DUPLICATE_IN_UPLOAD)
        } else {
            None
        };

        let renamed_from = match reason {
            Some(reason) => {
                let final_sku = rename_sku(&product.sku, vendor_id, |sku| {
                    global.contains(sku) || claimed.contains(sku)
                });
                let original = std::mem::replace(&mut product.sku, final_sku);
                batch.conflicts.push(ConflictResolution {
                    original_sku: original.clone(),
                    final_sku: product.sku.clone(),
                    product_name: product.name.clone(),
                    reason: reason.to_string(),
                });
                Some(original)
            }
            None => None,
        };

        claimed.insert(product.sku.clone());
        batch.to_insert.push(InsertCandidate {
            product,
            renamed_from,
        });
    }

    batch
}
