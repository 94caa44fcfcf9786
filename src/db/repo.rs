use super::model::ProductRow;
use crate::model::{ApprovalStatus, ExistingProductRef, NewProduct, ValidatedProduct, Vendor};
use anyhow::{anyhow, Context, Result};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::instrument;

pub type Pool = SqlitePool;

/// Bind parameters per lookup statement, well under SQLite's variable limit.
const LOOKUP_CHUNK: usize = 500;
/// Rows per multi-row INSERT statement.
const INSERT_CHUNK: usize = 200;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys=ON;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// For file-backed SQLite URLs, expand a leading `~/`, make sure the parent
/// directory exists and ask sqlx to create the file. In-memory and non-sqlite
/// URLs pass through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }

    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let query = match query_part {
        Some(q) if q.contains("mode=") => q.to_string(),
        Some(q) => format!("{q}&mode=rwc"),
        None => "mode=rwc".to_string(),
    };
    format!("sqlite://{expanded_path}?{query}")
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn upsert_vendor(pool: &Pool, vendor: &Vendor) -> Result<()> {
    sqlx::query(
        "INSERT INTO vendors (id, name, status, is_active) VALUES (?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, status = excluded.status, is_active = excluded.is_active",
    )
    .bind(&vendor.id)
    .bind(&vendor.name)
    .bind(&vendor.status)
    .bind(vendor.is_active)
    .execute(pool)
    .await
    .with_context(|| format!("failed to upsert vendor {}", vendor.id))?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn find_vendor(pool: &Pool, vendor_id: &str) -> Result<Option<Vendor>> {
    let row = sqlx::query("SELECT id, name, status, is_active FROM vendors WHERE id = ?")
        .bind(vendor_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| Vendor {
        id: row.get("id"),
        name: row.get("name"),
        status: row.get("status"),
        is_active: row.get("is_active"),
    }))
}

#[instrument(skip_all)]
pub async fn upsert_category(pool: &Pool, name: &str) -> Result<i64> {
    let id: i64 = sqlx::query(
        "INSERT INTO categories (name) VALUES (?) \
         ON CONFLICT(name) DO UPDATE SET name = excluded.name RETURNING id",
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to upsert category {name}"))?
    .get("id");
    Ok(id)
}

#[instrument(skip_all)]
pub async fn list_categories(pool: &Pool) -> Result<Vec<(String, i64)>> {
    let rows: Vec<(String, i64)> = sqlx::query_as("SELECT name, id FROM categories ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Existing products whose SKU is in `skus`, optionally limited to one vendor.
#[instrument(skip_all, fields(skus = skus.len()))]
pub async fn find_existing_by_sku(
    pool: &Pool,
    skus: &[String],
    vendor_id: Option<&str>,
) -> Result<Vec<ExistingProductRef>> {
    let mut found = Vec::new();
    for chunk in skus.chunks(LOOKUP_CHUNK) {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, sku, vendor_id, name FROM products WHERE sku IN (");
        let mut list = qb.separated(", ");
        for sku in chunk {
            list.push_bind(sku);
        }
        list.push_unseparated(")");
        if let Some(vendor_id) = vendor_id {
            qb.push(" AND vendor_id = ").push_bind(vendor_id);
        }
        let rows = qb
            .build_query_as::<ExistingProductRef>()
            .fetch_all(pool)
            .await?;
        found.extend(rows);
    }
    Ok(found)
}

/// Existing products (any vendor) whose SKU starts with one of `prefixes`.
/// Matching is exact and case-sensitive.
#[instrument(skip_all, fields(prefixes = prefixes.len()))]
pub async fn find_by_sku_prefix(pool: &Pool, prefixes: &[String]) -> Result<Vec<ExistingProductRef>> {
    let mut found = Vec::new();
    // Two binds per prefix.
    for chunk in prefixes.chunks(LOOKUP_CHUNK / 2) {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, sku, vendor_id, name FROM products WHERE ");
        for (i, prefix) in chunk.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push("substr(sku, 1, ")
                .push_bind(prefix.chars().count() as i64)
                .push(") = ")
                .push_bind(prefix);
        }
        let rows = qb
            .build_query_as::<ExistingProductRef>()
            .fetch_all(pool)
            .await?;
        found.extend(rows);
    }
    Ok(found)
}

fn list_json(values: &[String]) -> Result<String> {
    serde_json::to_string(values).context("failed to encode list column")
}

fn list_from_json(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).with_context(|| format!("invalid list column {raw:?}"))
}

/// Insert every row in a single transaction; any failure rolls back all of them.
#[instrument(skip_all, fields(rows = rows.len()))]
pub async fn insert_products(pool: &Pool, rows: &[NewProduct]) -> Result<()> {
    let mut encoded = Vec::with_capacity(rows.len());
    for row in rows {
        let p = &row.product;
        encoded.push([
            list_json(&p.sizes)?,
            list_json(&p.colors)?,
            list_json(&p.tags)?,
            list_json(&p.box_contents)?,
            list_json(&p.usage_instructions)?,
            list_json(&p.care_instructions)?,
            list_json(&p.safety_notes)?,
        ]);
    }

    let mut tx = pool.begin().await?;
    for (chunk, lists) in rows.chunks(INSERT_CHUNK).zip(encoded.chunks(INSERT_CHUNK)) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO products (id, vendor_id, category_id, name, sku, price, discount_price, \
             stock_quantity, min_order_quantity, description, short_description, brand, weight, \
             dimensions, material, warranty, country_of_origin, sizes, colors, tags, box_contents, \
             usage_instructions, care_instructions, safety_notes, is_active, is_featured, \
             free_shipping, returnable, approval_status) ",
        );
        qb.push_values(chunk.iter().zip(lists), |mut b, (row, lists)| {
            let p = &row.product;
            b.push_bind(&row.id)
                .push_bind(&row.vendor_id)
                .push_bind(p.category_id)
                .push_bind(&p.name)
                .push_bind(&p.sku)
                .push_bind(p.price)
                .push_bind(p.discount_price)
                .push_bind(p.stock_quantity)
                .push_bind(p.min_order_quantity)
                .push_bind(&p.description)
                .push_bind(&p.short_description)
                .push_bind(&p.brand)
                .push_bind(&p.weight)
                .push_bind(&p.dimensions)
                .push_bind(&p.material)
                .push_bind(&p.warranty)
                .push_bind(&p.country_of_origin);
            for list in lists {
                b.push_bind(list);
            }
            b.push_bind(p.is_active)
                .push_bind(p.is_featured)
                .push_bind(p.free_shipping)
                .push_bind(p.returnable)
                .push_bind(row.approval_status.as_str());
        });
        qb.build().execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Overwrite the payload columns of one product. `vendor_id`, `sku` and
/// `approval_status` are left untouched. Returns the number of rows changed.
#[instrument(skip_all)]
pub async fn update_product(
    pool: &Pool,
    id: &str,
    vendor_id: &str,
    p: &ValidatedProduct,
) -> Result<u64> {
    let res = sqlx::query(
        "UPDATE products SET category_id = ?, name = ?, price = ?, discount_price = ?, \
         stock_quantity = ?, min_order_quantity = ?, description = ?, short_description = ?, \
         brand = ?, weight = ?, dimensions = ?, material = ?, warranty = ?, country_of_origin = ?, \
         sizes = ?, colors = ?, tags = ?, box_contents = ?, usage_instructions = ?, \
         care_instructions = ?, safety_notes = ?, is_active = ?, is_featured = ?, \
         free_shipping = ?, returnable = ?, updated_at = CURRENT_TIMESTAMP \
         WHERE id = ? AND vendor_id = ?",
    )
    .bind(p.category_id)
    .bind(&p.name)
    .bind(p.price)
    .bind(p.discount_price)
    .bind(p.stock_quantity)
    .bind(p.min_order_quantity)
    .bind(&p.description)
    .bind(&p.short_description)
    .bind(&p.brand)
    .bind(&p.weight)
    .bind(&p.dimensions)
    .bind(&p.material)
    .bind(&p.warranty)
    .bind(&p.country_of_origin)
    .bind(list_json(&p.sizes)?)
    .bind(list_json(&p.colors)?)
    .bind(list_json(&p.tags)?)
    .bind(list_json(&p.box_contents)?)
    .bind(list_json(&p.usage_instructions)?)
    .bind(list_json(&p.care_instructions)?)
    .bind(list_json(&p.safety_notes)?)
    .bind(p.is_active)
    .bind(p.is_featured)
    .bind(p.free_shipping)
    .bind(p.returnable)
    .bind(id)
    .bind(vendor_id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

#[instrument(skip_all)]
pub async fn list_products_for_vendor(pool: &Pool, vendor_id: &str) -> Result<Vec<ProductRow>> {
    let rows = sqlx::query(
        "SELECT id, vendor_id, category_id, name, sku, price, discount_price, stock_quantity, \
                description, sizes, colors, tags, is_active, is_featured, approval_status \
         FROM products WHERE vendor_id = ? ORDER BY sku",
    )
    .bind(vendor_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let status: String = row.get("approval_status");
            let approval_status = ApprovalStatus::parse_status(&status)
                .ok_or_else(|| anyhow!("product has unknown approval status {}", status))?;
            Ok(ProductRow {
                id: row.get("id"),
                vendor_id: row.get("vendor_id"),
                category_id: row.get("category_id"),
                name: row.get("name"),
                sku: row.get("sku"),
                price: row.get("price"),
                discount_price: row.get("discount_price"),
                stock_quantity: row.get("stock_quantity"),
                description: row.get("description"),
                sizes: list_from_json(row.get("sizes"))?,
                colors: list_from_json(row.get("colors"))?,
                tags: list_from_json(row.get("tags"))?,
                is_active: row.get("is_active"),
                is_featured: row.get("is_featured"),
                approval_status,
            })
        })
        .collect()
}

#[instrument(skip_all)]
pub async fn count_products(pool: &Pool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_pool() -> Pool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn vendor(id: &str) -> Vendor {
        Vendor {
            id: id.into(),
            name: format!("Vendor {id}"),
            status: "approved".into(),
            is_active: true,
        }
    }

    #[test]
    fn prepare_sqlite_url_variants() {
        assert_eq!(prepare_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(prepare_sqlite_url("postgres://x"), "postgres://x");
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("nested/catalog.db");
        let url = prepare_sqlite_url(&format!("sqlite://{}", path.display()));
        assert_eq!(url, format!("sqlite://{}?mode=rwc", path.display()));
        assert!(path.parent().unwrap().exists());
    }

    #[tokio::test]
    async fn vendor_and_category_round_trip() {
        let pool = setup_pool().await;
        upsert_vendor(&pool, &vendor("v1")).await.unwrap();
        let found = find_vendor(&pool, "v1").await.unwrap().unwrap();
        assert_eq!(found, vendor("v1"));
        assert!(find_vendor(&pool, "missing").await.unwrap().is_none());

        let a = upsert_category(&pool, "Kitchen").await.unwrap();
        let again = upsert_category(&pool, "Kitchen").await.unwrap();
        assert_eq!(a, again);
        upsert_category(&pool, "Toys").await.unwrap();
        let names: Vec<String> = list_categories(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["Kitchen", "Toys"]);
    }

    #[tokio::test]
    async fn prefix_lookup_is_case_sensitive() {
        let pool = setup_pool().await;
        upsert_vendor(&pool, &vendor("v1")).await.unwrap();
        for (id, sku) in [("a", "X1-V1234"), ("b", "x1-v1234"), ("c", "X1")] {
            sqlx::query("INSERT INTO products (id, vendor_id, name, sku, price) VALUES (?, 'v1', 'n', ?, 1.0)")
                .bind(id)
                .bind(sku)
                .execute(&pool)
                .await
                .unwrap();
        }
        let found = find_by_sku_prefix(&pool, &["X1-V".to_string()]).await.unwrap();
        let skus: Vec<&str> = found.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(skus, vec!["X1-V1234"]);

        let exact = find_existing_by_sku(&pool, &["X1".to_string()], Some("v1"))
            .await
            .unwrap();
        assert_eq!(exact.len(), 1);
        let other_vendor = find_existing_by_sku(&pool, &["X1".to_string()], Some("v2"))
            .await
            .unwrap();
        assert!(other_vendor.is_empty());
    }
}
