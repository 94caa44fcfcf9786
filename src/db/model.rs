//! Row models returned by repository queries.

use crate::model::ApprovalStatus;

/// Stored product as shown by catalog listings. List columns are decoded
/// from their JSON representation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub id: String,
    pub vendor_id: String,
    pub category_id: Option<i64>,
    pub name: String,
    pub sku: String,
    pub price: f64,
    pub discount_price: Option<f64>,
    pub stock_quantity: i64,
    pub description: Option<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub approval_status: ApprovalStatus,
}
