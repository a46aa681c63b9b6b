//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - CRUD operations with validation
//! - Soft delete (`deleted_at`): hidden from listing, search, reports, carts
//! - Case-insensitive name lookup for chat restock flows
//!
//! ## Soft Delete
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DELETE /api/products/{id}                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE products SET deleted_at = now                                  │
//! │       │                                                                 │
//! │       ├── transaction_details still reference the row (history kept)  │
//! │       └── every read path filters `deleted_at IS NULL`                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{generate_id, PRODUCT_COLUMNS};
use crate::error::{DbError, DbResult};
use kasir_core::validation::{validate_new_product, validate_product_update};
use kasir_core::{NewProduct, Product, ProductUpdate, StockChangeType};

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let product = repo.create(&input, Some(&user_id)).await?;
/// let matches = repo.find_by_name("pocari", 10).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products that are not soft-deleted, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE deleted_at IS NULL ORDER BY name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found or soft-deleted
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND deleted_at IS NULL"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Like [`get_by_id`](Self::get_by_id) but a missing product is an error.
    pub async fn require(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Finds products whose name contains `name` (case-insensitive).
    ///
    /// An exact (case-insensitive) name match is returned alone so that
    /// "aqua" does not become ambiguous when "Aqua" and "Aqua 1500ml" exist.
    pub async fn find_by_name(&self, name: &str, limit: i64) -> DbResult<Vec<Product>> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE deleted_at IS NULL AND LOWER(name) LIKE ?1 \
             ORDER BY name LIMIT ?2"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(format!("%{}%", name))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        if let Some(exact) = products.iter().find(|p| p.name.to_lowercase() == name) {
            return Ok(vec![exact.clone()]);
        }

        debug!(query = %name, count = products.len(), "Product name lookup");
        Ok(products)
    }

    /// Creates a product.
    ///
    /// A positive initial stock is recorded in the stock ledger in the same
    /// transaction so the ledger always explains the current stock.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The inserted product
    /// * `Err(DbError::Business)` - Validation failed
    pub async fn create(&self, input: &NewProduct, user_id: Option<&str>) -> DbResult<Product> {
        validate_new_product(input)?;

        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            name: input.name.trim().to_string(),
            sku: input.sku.trim().to_string(),
            price_cents: input.price_cents,
            current_stock: Some(input.current_stock),
            total_sold: 0,
            description: input.description.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, sku, price_cents, current_stock, total_sold,
                description, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?7)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.price_cents)
        .bind(product.current_stock)
        .bind(&product.description)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if input.current_stock > 0 {
            sqlx::query(
                r#"
                INSERT INTO stock_histories (id, product_id, user_id, type, quantity, notes, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, 'Initial stock', ?6)
                "#,
            )
            .bind(generate_id())
            .bind(&product.id)
            .bind(user_id)
            .bind(StockChangeType::Increase)
            .bind(input.current_stock)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    /// Updates a product's catalog fields.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The updated product
    /// * `Err(DbError::NotFound)` - Product doesn't exist or is deleted
    pub async fn update(&self, id: &str, input: &ProductUpdate) -> DbResult<Product> {
        validate_product_update(input)?;
        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                sku = ?3,
                price_cents = ?4,
                description = ?5,
                updated_at = ?6
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(input.sku.trim())
        .bind(input.price_cents)
        .bind(&input.description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.require(id).await
    }

    /// Soft-deletes a product by setting `deleted_at`.
    ///
    /// Its cart rows are removed as well; they could never be checked out.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE products SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        sqlx::query("DELETE FROM cart_items WHERE product_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Counts products that are not soft-deleted.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

/// Builds a SKU from a product name: up to three word prefixes plus a short
/// random suffix, e.g. `"Kopi Susu Gula Aren"` → `"KOP-SUS-GUL-4F2A"`.
pub fn sku_from_name(name: &str) -> String {
    let mut parts: Vec<String> = name
        .split_whitespace()
        .filter_map(|word| {
            let prefix: String = word
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .take(3)
                .collect();
            (!prefix.is_empty()).then(|| prefix.to_uppercase())
        })
        .take(3)
        .collect();

    if parts.is_empty() {
        parts.push("PRD".to_string());
    }

    let suffix: String = generate_id()
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .take(4)
        .collect::<String>()
        .to_uppercase();
    parts.push(suffix);
    parts.join("-")
}

// =============================================================================
// Unit Tests
// =============================================================================
