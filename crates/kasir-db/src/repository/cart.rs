//! # Cart Repository
//!
//! One cart per user, one row per (user, product).
//!
//! ## Upsert
//! ```text
//! add(user, Pocari Sweat, 2)
//!   no row  → INSERT quantity = 2, price = product price
//!   row(3)  → UPDATE quantity = max(3 + 2, 1), price refreshed
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::generate_id;
use crate::error::{DbError, DbResult};
use kasir_core::validation::validate_quantity;
use kasir_core::{CartItem, CartLine, CartView, CoreError, ValidationError, MAX_ITEM_QUANTITY};

const CART_ITEM_COLUMNS: &str =
    "id, user_id, product_id, quantity, price_cents, created_at, updated_at";

/// Repository for cart operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Adds `quantity` units of a product to the user's cart.
    ///
    /// The stored price is refreshed to the product's current price.
    ///
    /// ## Returns
    /// * `Ok(CartItem)` - The row after the upsert
    /// * `Err(DbError::NotFound)` - Product doesn't exist or is deleted
    pub async fn add(&self, user_id: &str, product_id: &str, quantity: i64) -> DbResult<CartItem> {
        validate_quantity(quantity)?;

        let price_cents: Option<i64> = sqlx::query_scalar(
            "SELECT price_cents FROM products WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        let price_cents = price_cents.ok_or_else(|| DbError::not_found("Product", product_id))?;

        let now = Utc::now();
        // The merged quantity obeys the same cap as a single add.
        let upserted = sqlx::query(
            r#"
            INSERT INTO cart_items (id, user_id, product_id, quantity, price_cents, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT (user_id, product_id) DO UPDATE SET
                quantity = cart_items.quantity + excluded.quantity,
                price_cents = excluded.price_cents,
                updated_at = excluded.updated_at
            WHERE cart_items.quantity + excluded.quantity <= ?7
            "#,
        )
        .bind(generate_id())
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(price_cents)
        .bind(now)
        .bind(MAX_ITEM_QUANTITY)
        .execute(&self.pool)
        .await?;
        if upserted.rows_affected() == 0 {
            debug!(user_id = %user_id, product_id = %product_id, quantity, "Cart line over quantity cap");
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: MAX_ITEM_QUANTITY,
            }
            .into());
        }

        debug!(user_id = %user_id, product_id = %product_id, quantity, "Added to cart");

        let sql = format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE user_id = ?1 AND product_id = ?2"
        );
        let item = sqlx::query_as::<_, CartItem>(&sql)
            .bind(user_id)
            .bind(product_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(item)
    }

    /// Sets the quantity of a cart row owned by `user_id`.
    pub async fn update_quantity(
        &self,
        user_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> DbResult<CartItem> {
        validate_quantity(quantity)?;
        let mut item = self.owned_item(user_id, item_id).await?;

        let now = Utc::now();
        sqlx::query("UPDATE cart_items SET quantity = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(item_id)
            .bind(quantity)
            .bind(now)
            .execute(&self.pool)
            .await?;

        item.quantity = quantity;
        item.updated_at = now;
        Ok(item)
    }

    /// Removes one cart row owned by `user_id`.
    pub async fn remove(&self, user_id: &str, item_id: &str) -> DbResult<()> {
        self.owned_item(user_id, item_id).await?;

        sqlx::query("DELETE FROM cart_items WHERE id = ?1")
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Empties the user's cart. Returns the number of rows removed.
    pub async fn clear(&self, user_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Cart rows of a user in insertion order.
    pub async fn items(&self, user_id: &str) -> DbResult<Vec<CartItem>> {
        let sql = format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE user_id = ?1 ORDER BY created_at, rowid"
        );
        let items = sqlx::query_as::<_, CartItem>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// The user's cart with product names, line totals and the exact total.
    pub async fn view(&self, user_id: &str) -> DbResult<CartView> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT c.id, c.product_id, p.name AS product_name, c.quantity, c.price_cents,
                   c.quantity * c.price_cents AS line_total_cents
            FROM cart_items c
            JOIN products p ON p.id = c.product_id
            WHERE c.user_id = ?1
            ORDER BY c.created_at, c.rowid
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(CartView::new(lines)?)
    }

    async fn owned_item(&self, user_id: &str, item_id: &str) -> DbResult<CartItem> {
        let sql = format!("SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE id = ?1");
        let item = sqlx::query_as::<_, CartItem>(&sql)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Cart item", item_id))?;

        if item.user_id != user_id {
            return Err(CoreError::Forbidden("cart item belongs to another user".into()).into());
        }

        Ok(item)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
