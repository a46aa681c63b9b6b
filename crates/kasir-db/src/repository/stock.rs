//! # Stock Repository
//!
//! Manual stock adjustments and the append-only stock ledger.
//!
//! ## Adjustment Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  update_stock(Pocari Sweat, decrease, 5)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE                                                        │
//! │       │                                                                 │
//! │       ├── read effective stock (column, or ledger sum when unset)      │
//! │       ├── new = stock ± quantity; new < 0 → StockUnderflow, ROLLBACK   │
//! │       ├── UPDATE products SET current_stock = new                      │
//! │       └── INSERT INTO stock_histories (type, quantity, notes, user)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{begin_immediate, finish_write, generate_id, EFFECTIVE_STOCK_SQL, PRODUCT_COLUMNS};
use crate::error::{DbError, DbResult};
use kasir_core::validation::validate_quantity;
use kasir_core::{
    CoreError, Product, StockAdjustment, StockHistory, ValidationError, MAX_STOCK_LEVEL,
};

/// Repository for stock adjustments and history.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Applies a manual stock adjustment and records it in the ledger.
    ///
    /// ## Arguments
    /// * `adjustment` - Product, direction, quantity (≥1) and notes
    /// * `user_id` - Who performed the change
    ///
    /// ## Returns
    /// * `Ok((Product, StockHistory))` - Product with its new stock and the ledger entry
    /// * `Err(DbError::NotFound)` - Product doesn't exist or is deleted
    /// * `Err(DbError::Business(StockUnderflow))` - Decrease would go below zero
    pub async fn update_stock(
        &self,
        adjustment: &StockAdjustment,
        user_id: Option<&str>,
    ) -> DbResult<(Product, StockHistory)> {
        validate_quantity(adjustment.quantity)?;

        let pool = self.pool.clone();
        let adjustment = adjustment.clone();
        let user_id = user_id.map(str::to_string);

        tokio::spawn(async move {
            let mut conn = pool.acquire().await?;
            begin_immediate(&mut conn).await?;
            let result = apply_adjustment(&mut conn, &adjustment, user_id.as_deref()).await;
            finish_write(&mut conn, result).await
        })
        .await
        .map_err(|e| DbError::Internal(format!("Stock update task failed: {}", e)))?
    }

    /// Ledger entries of a product, newest first.
    pub async fn history(&self, product_id: &str, limit: i64) -> DbResult<Vec<StockHistory>> {
        let entries = sqlx::query_as::<_, StockHistory>(
            r#"
            SELECT id, product_id, user_id, type, quantity, notes, created_at
            FROM stock_histories
            WHERE product_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Stock of a product with an unset column resolved from the ledger.
    pub async fn effective_stock(&self, product_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        read_effective_stock(&mut conn, product_id).await
    }
}

async fn read_effective_stock(conn: &mut SqliteConnection, product_id: &str) -> DbResult<i64> {
    let sql = format!(
        "SELECT {EFFECTIVE_STOCK_SQL} FROM products p WHERE p.id = ?1 AND p.deleted_at IS NULL"
    );
    let stock: Option<i64> = sqlx::query_scalar(&sql)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

    stock.ok_or_else(|| DbError::not_found("Product", product_id))
}

/// Runs one adjustment on a connection that already holds the write lock.
async fn apply_adjustment(
    conn: &mut SqliteConnection,
    adjustment: &StockAdjustment,
    user_id: Option<&str>,
) -> DbResult<(Product, StockHistory)> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND deleted_at IS NULL");
    let mut product = sqlx::query_as::<_, Product>(&sql)
        .bind(&adjustment.product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Product", &adjustment.product_id))?;

    let current = read_effective_stock(conn, &product.id).await?;
    let new_stock = current
        .checked_add(adjustment.change_type.signed(adjustment.quantity))
        .filter(|stock| *stock <= MAX_STOCK_LEVEL)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "current_stock".to_string(),
            min: 0,
            max: MAX_STOCK_LEVEL,
        })?;
    if new_stock < 0 {
        debug!(
            product_id = %product.id,
            current,
            requested = adjustment.quantity,
            "Stock decrease rejected"
        );
        return Err(CoreError::StockUnderflow { current }.into());
    }

    let now = Utc::now();
    sqlx::query("UPDATE products SET current_stock = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(&product.id)
        .bind(new_stock)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    let entry = StockHistory {
        id: generate_id(),
        product_id: product.id.clone(),
        user_id: user_id.map(str::to_string),
        change_type: adjustment.change_type,
        quantity: adjustment.quantity,
        notes: adjustment.notes.clone(),
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO stock_histories (id, product_id, user_id, type, quantity, notes, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.product_id)
    .bind(&entry.user_id)
    .bind(entry.change_type)
    .bind(entry.quantity)
    .bind(&entry.notes)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    info!(
        product_id = %product.id,
        change = ?entry.change_type,
        quantity = entry.quantity,
        stock = new_stock,
        "Stock updated"
    );

    product.current_stock = Some(new_stock);
    product.updated_at = now;
    Ok((product, entry))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use kasir_core::{NewProduct, StockChangeType};

    async fn seed(db: &Database, stock: i64) -> Product {
        db.products()
            .create(
                &NewProduct {
                    name: "Pocari Sweat".into(),
                    sku: "BEV-PS-005".into(),
                    price_cents: 800_000,
                    description: Some("Minuman isotonik 350ml".into()),
                    current_stock: stock,
                },
                None,
            )
            .await
            .unwrap()
    }

    fn adjustment(product_id: &str, change_type: StockChangeType, quantity: i64) -> StockAdjustment {
        StockAdjustment {
            product_id: product_id.to_string(),
            change_type,
            quantity,
            notes: Some("Manual count".into()),
        }
    }

    #[tokio::test]
    async fn test_increase_past_stock_ceiling_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = seed(&db, MAX_STOCK_LEVEL - 1).await;

        let result = db
            .stock()
            .update_stock(&adjustment(&product.id, StockChangeType::Increase, 2), None)
            .await;
        assert!(matches!(
            result,
            Err(DbError::Business(CoreError::Validation(ValidationError::OutOfRange { .. })))
        ));

        let product = db.products().require(&product.id).await.unwrap();
        assert_eq!(product.current_stock, Some(MAX_STOCK_LEVEL - 1));
        assert_eq!(db.stock().history(&product.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_increase_and_decrease_write_ledger() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = seed(&db, 10).await;

        let (after, entry) = db
            .stock()
            .update_stock(&adjustment(&product.id, StockChangeType::Increase, 24), None)
            .await
            .unwrap();
        assert_eq!(after.current_stock, Some(34));
        assert_eq!(entry.quantity, 24);

        let (after, _) = db
            .stock()
            .update_stock(&adjustment(&product.id, StockChangeType::Decrease, 4), None)
            .await
            .unwrap();
        assert_eq!(after.current_stock, Some(30));

        let history = db.stock().history(&product.id, 10).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].change_type, StockChangeType::Decrease);
        assert_eq!(history[0].notes.as_deref(), Some("Manual count"));
    }

    #[tokio::test]
    async fn test_decrease_below_zero_writes_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = seed(&db, 3).await;

        let result = db
            .stock()
            .update_stock(&adjustment(&product.id, StockChangeType::Decrease, 5), None)
            .await;
        assert!(matches!(
            result,
            Err(DbError::Business(CoreError::StockUnderflow { current: 3 }))
        ));

        let product = db.products().require(&product.id).await.unwrap();
        assert_eq!(product.current_stock, Some(3));
        assert_eq!(db.stock().history(&product.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unset_stock_falls_back_to_ledger() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = seed(&db, 12).await;
        db.stock()
            .update_stock(&adjustment(&product.id, StockChangeType::Decrease, 2), None)
            .await
            .unwrap();

        sqlx::query("UPDATE products SET current_stock = NULL WHERE id = ?1")
            .bind(&product.id)
            .execute(db.pool())
            .await
            .unwrap();
        assert_eq!(db.stock().effective_stock(&product.id).await.unwrap(), 10);

        let (after, _) = db
            .stock()
            .update_stock(&adjustment(&product.id, StockChangeType::Increase, 5), None)
            .await
            .unwrap();
        assert_eq!(after.current_stock, Some(15));
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let result = db
            .stock()
            .update_stock(&adjustment("missing", StockChangeType::Increase, 1), None)
            .await;
        assert!(matches!(result, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_rejects_non_positive_quantity() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = seed(&db, 3).await;
        let result = db
            .stock()
            .update_stock(&adjustment(&product.id, StockChangeType::Increase, 0), None)
            .await;
        assert!(matches!(result, Err(DbError::Business(CoreError::Validation(_)))));
    }

    #[tokio::test]
    async fn test_concurrent_decreases_never_oversell() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = seed(&db, 5).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo = db.stock();
            let adj = adjustment(&product.id, StockChangeType::Decrease, 1);
            handles.push(tokio::spawn(async move { repo.update_stock(&adj, None).await }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 5);
        let product = db.products().require(&product.id).await.unwrap();
        assert_eq!(product.current_stock, Some(0));
    }
}
