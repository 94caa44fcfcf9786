//! Row validation: the all-or-nothing gate in front of classification.
//!
//! Every row is checked; errors are collected across the whole batch and the
//! caller aborts the ingestion if any were found. Nothing here touches storage.
use serde::{Deserialize, Serialize};

use crate::category::CategoryTable;
use crate::model::{CandidateRow, ValidatedProduct};

/// Spreadsheet header rows preceding the first data row.
pub const DEFAULT_HEADER_ROWS: usize = 1;

/// Values used for boolean columns that are absent from a row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FlagDefaults {
    pub is_active: bool,
    pub is_featured: bool,
    pub free_shipping: bool,
    pub returnable: bool,
}

impl Default for FlagDefaults {
    fn default() -> Self {
        Self {
            is_active: true,
            is_featured: false,
            free_shipping: false,
            returnable: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidateOptions {
    pub header_rows: usize,
    pub placeholder_prefix: String,
    /// Epoch milliseconds of the ingestion call; part of placeholder SKUs.
    pub batch_stamp: i64,
    pub defaults: FlagDefaults,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            header_rows: DEFAULT_HEADER_ROWS,
            placeholder_prefix: "SKU".to_string(),
            batch_stamp: chrono::Utc::now().timestamp_millis(),
            defaults: FlagDefaults::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub row_number: usize,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row {}: {}", self.row_number, self.message)
    }
}

#[derive(Debug, Default)]
pub struct Validation {
    pub products: Vec<ValidatedProduct>,
    pub errors: Vec<ValidationError>,
}

impl Validation {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate(
    rows: &[CandidateRow],
    categories: &CategoryTable,
    opts: &ValidateOptions,
) -> Validation {
    let mut out = Validation::default();
    for (index, row) in rows.iter().enumerate() {
        let row_number = row.line.unwrap_or(index + 1 + opts.header_rows);
        match validate_row(index, row, categories, opts) {
            Ok(product) => out.products.push(product),
            Err(message) => out.errors.push(ValidationError {
                row_number,
                message,
            }),
        }
    }
    out
}

fn validate_row(
    index: usize,
    row: &CandidateRow,
    categories: &CategoryTable,
    opts: &ValidateOptions,
) -> Result<ValidatedProduct, String> {
    let name = text(&row.name).ok_or_else(|| "Product name is required".to_string())?;
    let price = row
        .price
        .as_deref()
        .and_then(parse_positive)
        .ok_or_else(|| "Valid price is required".to_string())?;

    let category_id = match text(&row.category) {
        Some(category) => Some(categories.resolve(&category).ok_or_else(|| {
            format!(
                "Category \"{}\" not found. Available categories: {}",
                category,
                categories.names().join(", ")
            )
        })?),
        None => None,
    };

    let sku = text(&row.sku)
        .unwrap_or_else(|| format!("{}-{}-{}", opts.placeholder_prefix, opts.batch_stamp, index));

    let d = &opts.defaults;
    Ok(ValidatedProduct {
        row_index: index,
        name,
        price,
        category_id,
        sku,
        description: text(&row.description),
        short_description: text(&row.short_description),
        brand: text(&row.brand),
        stock_quantity: parse_int(&row.stock_quantity).map_or(0, |n| n.max(0)),
        discount_price: row.discount_price.as_deref().and_then(parse_positive),
        min_order_quantity: parse_int(&row.min_order_quantity).map_or(1, |n| n.max(1)),
        weight: text(&row.weight),
        dimensions: text(&row.dimensions),
        material: text(&row.material),
        warranty: text(&row.warranty),
        country_of_origin: text(&row.country_of_origin),
        sizes: split_pipes(&row.sizes),
        colors: split_pipes(&row.colors),
        tags: split_pipes(&row.tags),
        box_contents: split_pipes(&row.box_contents),
        usage_instructions: split_pipes(&row.usage_instructions),
        care_instructions: split_pipes(&row.care_instructions),
        safety_notes: split_pipes(&row.safety_notes),
        is_active: parse_flag(&row.is_active, d.is_active),
        is_featured: parse_flag(&row.is_featured, d.is_featured),
        free_shipping: parse_flag(&row.free_shipping, d.free_shipping),
        returnable: parse_flag(&row.returnable, d.returnable),
    })
}

fn text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_positive(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

fn parse_int(value: &Option<String>) -> Option<i64> {
    let raw = value.as_deref()?.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
}

/// Splits `"a| b ||c"` into `["a", "b", "c"]`, keeping order and duplicates.
pub fn split_pipes(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .map(|raw| {
            raw.split('|')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `true`, `1` and `yes` (any case) are true; anything else present is false.
pub fn parse_flag(value: &Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::trim) {
        None | Some("") => default,
        Some(raw) => {
            let raw = raw.to_ascii_lowercase();
            raw == "true" || raw == "1" || raw == "yes"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> CategoryTable {
        CategoryTable::new(vec![("Kitchen".to_string(), 7), ("Toys".to_string(), 9)])
    }

    fn opts() -> ValidateOptions {
        ValidateOptions {
            batch_stamp: 1_700_000_000_000,
            ..Default::default()
        }
    }

    fn row(name: &str, price: &str) -> CandidateRow {
        CandidateRow {
            name: Some(name.into()),
            price: Some(price.into()),
            ..Default::default()
        }
    }

    #[test]
    fn collects_every_invalid_row() {
        let rows = vec![
            row("Mug", "12.5"),
            row("Plate", "3"),
            row("Bowl", "abc"),
            row("  ", "4"),
        ];
        let v = validate(&rows, &categories(), &opts());
        assert!(!v.passed());
        assert_eq!(v.products.len(), 2);
        let messages: Vec<String> = v.errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "Row 4: Valid price is required".to_string(),
                "Row 5: Product name is required".to_string(),
            ]
        );
    }

    #[test]
    fn one_error_per_row_even_when_several_fields_fail() {
        let rows = vec![row("", "-1")];
        let v = validate(&rows, &categories(), &opts());
        assert_eq!(v.errors.len(), 1);
        assert_eq!(v.errors[0].message, "Product name is required");
    }

    #[test]
    fn rejects_zero_and_negative_prices() {
        for price in ["0", "-3", "NaN", "inf", ""] {
            let v = validate(&[row("Mug", price)], &categories(), &opts());
            assert_eq!(v.errors.len(), 1, "price {price:?} should be rejected");
        }
    }

    #[test]
    fn unknown_category_lists_known_names() {
        let mut r = row("Mug", "5");
        r.category = Some("Garden".into());
        let v = validate(&[r], &categories(), &opts());
        assert_eq!(
            v.errors[0].to_string(),
            "Row 2: Category \"Garden\" not found. Available categories: Kitchen, Toys"
        );
    }

    #[test]
    fn resolves_category_and_defaults_sku() {
        let mut r = row("Mug", "5");
        r.category = Some("kitchen".into());
        let v = validate(&[row("Plate", "2"), r], &categories(), &opts());
        assert!(v.passed());
        let mug = &v.products[1];
        assert_eq!(mug.category_id, Some(7));
        assert_eq!(mug.sku, "SKU-1700000000000-1");
        assert_eq!(v.products[0].category_id, None);
    }

    #[test]
    fn splits_lists_and_parses_flags() {
        let mut r = row("Shirt", "20");
        r.sizes = Some("S| M ||L|M".into());
        r.is_featured = Some("YES".into());
        r.returnable = Some("no".into());
        r.stock_quantity = Some("-4".into());
        r.min_order_quantity = Some("2.9".into());
        r.discount_price = Some("oops".into());
        let v = validate(&[r], &categories(), &opts());
        let p = &v.products[0];
        assert_eq!(p.sizes, vec!["S", "M", "L", "M"]);
        assert!(p.colors.is_empty());
        assert!(p.is_featured);
        assert!(!p.returnable);
        assert!(p.is_active);
        assert!(!p.free_shipping);
        assert_eq!(p.stock_quantity, 0);
        assert_eq!(p.min_order_quantity, 2);
        assert_eq!(p.discount_price, None);
    }

    #[test]
    fn honours_custom_header_rows_and_flag_defaults() {
        let o = ValidateOptions {
            header_rows: 3,
            defaults: FlagDefaults {
                is_active: false,
                ..FlagDefaults::default()
            },
            ..opts()
        };
        let v = validate(&[row("Mug", "x"), row("Cup", "1")], &categories(), &o);
        assert_eq!(v.errors[0].row_number, 4);
        assert!(!v.products[0].is_active);
    }
}
