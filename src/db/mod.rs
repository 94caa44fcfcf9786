//! SQLite storage for vendors, categories and products.
//!
//! - `model`: row structs returned by listing queries.
//! - `repo`: SQL-only functions over a `Pool`.
//! - `catalog`: `SqliteCatalog`, the `CatalogStore` used by the ingestion pipeline.

pub mod catalog;
pub mod model;
pub mod repo;

pub use catalog::SqliteCatalog;
pub use model::ProductRow;
pub use repo::*;
