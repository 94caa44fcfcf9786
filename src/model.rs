use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub fn parse_status(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ApprovalStatus::Pending),
            "approved" => Some(ApprovalStatus::Approved),
            "rejected" => Some(ApprovalStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vendor {
    pub id: String,
    pub name: String,
    pub status: String,
    pub is_active: bool,
}

/// One raw spreadsheet row. Every cell is kept as text until validation.
///
/// Deserializes from any JSON object through [`CandidateRow::from_cells`], so
/// numbers and booleans keep their textual form and spreadsheet-style keys
/// are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "Map<String, Value>")]
pub struct CandidateRow {
    /// Spreadsheet row the record was read from, when the reader knows it.
    #[serde(skip)]
    pub line: Option<usize>,
    pub name: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub brand: Option<String>,
    pub stock_quantity: Option<String>,
    pub discount_price: Option<String>,
    pub min_order_quantity: Option<String>,
    pub weight: Option<String>,
    pub dimensions: Option<String>,
    pub material: Option<String>,
    pub warranty: Option<String>,
    pub country_of_origin: Option<String>,
    pub sizes: Option<String>,
    pub colors: Option<String>,
    pub tags: Option<String>,
    pub box_contents: Option<String>,
    pub usage_instructions: Option<String>,
    pub care_instructions: Option<String>,
    pub safety_notes: Option<String>,
    pub is_active: Option<String>,
    pub is_featured: Option<String>,
    pub free_shipping: Option<String>,
    pub returnable: Option<String>,
}

impl CandidateRow {
    /// Build a row from `(column, value)` pairs. Column names are matched after
    /// lowercasing and turning spaces/dashes into underscores, so spreadsheet
    /// headers like "Short Description" land on `short_description`.
    /// Unknown columns are ignored.
    pub fn from_cells<I, K, V>(cells: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut row = CandidateRow::default();
        for (key, value) in cells {
            let value: String = value.into();
            if value.trim().is_empty() {
                continue;
            }
            let column = normalize_column(key.as_ref());
            if let Some(slot) = row.slot_mut(&column) {
                *slot = Some(value);
            }
        }
        row
    }

    fn slot_mut(&mut self, column: &str) -> Option<&mut Option<String>> {
        let slot = match column {
            "name" | "product_name" => &mut self.name,
            "price" => &mut self.price,
            "category" | "category_name" => &mut self.category,
            "sku" => &mut self.sku,
            "description" => &mut self.description,
            "short_description" => &mut self.short_description,
            "brand" => &mut self.brand,
            "stock_quantity" | "stock" => &mut self.stock_quantity,
            "discount_price" => &mut self.discount_price,
            "min_order_quantity" => &mut self.min_order_quantity,
            "weight" => &mut self.weight,
            "dimensions" => &mut self.dimensions,
            "material" => &mut self.material,
            "warranty" => &mut self.warranty,
            "country_of_origin" => &mut self.country_of_origin,
            "sizes" => &mut self.sizes,
            "colors" => &mut self.colors,
            "tags" => &mut self.tags,
            "box_contents" => &mut self.box_contents,
            "usage_instructions" => &mut self.usage_instructions,
            "care_instructions" => &mut self.care_instructions,
            "safety_notes" => &mut self.safety_notes,
            "is_active" => &mut self.is_active,
            "is_featured" => &mut self.is_featured,
            "free_shipping" => &mut self.free_shipping,
            "returnable" => &mut self.returnable,
            _ => return None,
        };
        Some(slot)
    }
}

impl From<Map<String, Value>> for CandidateRow {
    fn from(obj: Map<String, Value>) -> Self {
        CandidateRow::from_cells(
            obj.into_iter()
                .filter_map(|(key, value)| cell_text(value).map(|text| (key, text))),
        )
    }
}

/// Text form of a JSON cell. Arrays become pipe-delimited lists.
fn cell_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(cell_text)
                .collect::<Vec<_>>()
                .join("|"),
        ),
        other => Some(other.to_string()),
    }
}

fn normalize_column(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// A row that passed validation, with coerced types and defaults applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidatedProduct {
    /// Zero-based position in the uploaded batch.
    pub row_index: usize,
    pub name: String,
    pub price: f64,
    pub category_id: Option<i64>,
    pub sku: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub brand: Option<String>,
    pub stock_quantity: i64,
    pub discount_price: Option<f64>,
    pub min_order_quantity: i64,
    pub weight: Option<String>,
    pub dimensions: Option<String>,
    pub material: Option<String>,
    pub warranty: Option<String>,
    pub country_of_origin: Option<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub tags: Vec<String>,
    pub box_contents: Vec<String>,
    pub usage_instructions: Vec<String>,
    pub care_instructions: Vec<String>,
    pub safety_notes: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub free_shipping: bool,
    pub returnable: bool,
}

/// Minimal projection of an already stored product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct ExistingProductRef {
    pub id: String,
    pub sku: String,
    pub vendor_id: String,
    pub name: String,
}

/// Read-only SKU lookup view over existing products.
#[derive(Debug, Clone, Default)]
pub struct SkuIndex {
    by_sku: HashMap<String, ExistingProductRef>,
}

impl SkuIndex {
    pub fn new(refs: impl IntoIterator<Item = ExistingProductRef>) -> Self {
        let by_sku = refs.into_iter().map(|r| (r.sku.clone(), r)).collect();
        Self { by_sku }
    }

    pub fn get(&self, sku: &str) -> Option<&ExistingProductRef> {
        self.by_sku.get(sku)
    }

    pub fn contains(&self, sku: &str) -> bool {
        self.by_sku.contains_key(sku)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResolution {
    pub original_sku: String,
    pub final_sku: String,
    pub product_name: String,
    pub reason: String,
}

/// A row headed for the batch insert. `product.sku` already holds the final SKU.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertCandidate {
    pub product: ValidatedProduct,
    /// Set when the SKU was rewritten during classification.
    pub renamed_from: Option<String>,
}

/// A row that overwrites an existing product owned by the same vendor.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCandidate {
    pub existing_id: String,
    pub vendor_id: String,
    pub product: ValidatedProduct,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedBatch {
    pub to_insert: Vec<InsertCandidate>,
    pub to_update: Vec<UpdateCandidate>,
    pub conflicts: Vec<ConflictResolution>,
}

impl ClassifiedBatch {
    pub fn len(&self) -> usize {
        self.to_insert.len() + self.to_update.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Payload for one row of the batch insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub id: String,
    pub vendor_id: String,
    pub approval_status: ApprovalStatus,
    pub product: ValidatedProduct,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RowAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductOutcome {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub action: RowAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_cells_maps_spreadsheet_headers() {
        let row = CandidateRow::from_cells(vec![
            ("Name", "Mug"),
            ("Short Description", "A mug"),
            ("stock", "4"),
            ("Is-Featured", "yes"),
            ("unknown column", "ignored"),
            ("sku", "   "),
        ]);
        assert_eq!(row.name.as_deref(), Some("Mug"));
        assert_eq!(row.short_description.as_deref(), Some("A mug"));
        assert_eq!(row.stock_quantity.as_deref(), Some("4"));
        assert_eq!(row.is_featured.as_deref(), Some("yes"));
        assert!(row.sku.is_none());
    }

    #[test]
    fn approval_status_round_trips_text() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Rejected,
        ] {
            assert_eq!(ApprovalStatus::parse_status(status.as_str()), Some(status));
        }
        assert_eq!(ApprovalStatus::parse_status("PENDING"), None);
    }

    #[test]
    fn sku_index_keys_by_sku() {
        let index = SkuIndex::new(vec![ExistingProductRef {
            id: "p1".into(),
            sku: "X1".into(),
            vendor_id: "v1".into(),
            name: "Mug".into(),
        }]);
        assert!(index.contains("X1"));
        assert_eq!(index.get("X1").map(|r| r.vendor_id.as_str()), Some("v1"));
        assert!(!index.contains("X2"));
    }

    #[test]
    fn json_rows_keep_numbers_and_headers_as_text() {
        let row: CandidateRow = serde_json::from_str(
            r#"{"Name":"Mug","price":12.5,"Short Description":"Tall","stock":4,
                "is_featured":true,"colors":["red","blue"],"sku":null,"extra":1}"#,
        )
        .unwrap();
        assert_eq!(row.name.as_deref(), Some("Mug"));
        assert_eq!(row.price.as_deref(), Some("12.5"));
        assert_eq!(row.short_description.as_deref(), Some("Tall"));
        assert_eq!(row.stock_quantity.as_deref(), Some("4"));
        assert_eq!(row.is_featured.as_deref(), Some("true"));
        assert_eq!(row.colors.as_deref(), Some("red|blue"));
        assert!(row.sku.is_none());
        assert!(row.line.is_none());

        assert!(serde_json::from_str::<CandidateRow>("[1]").is_err());
    }
}
