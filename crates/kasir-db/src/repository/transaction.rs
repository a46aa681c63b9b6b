//! # Transaction Repository
//!
//! The checkout engine and receipt queries.
//!
//! ## Checkout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Checkout (atomic)                               │
//! │                                                                         │
//! │  BEGIN IMMEDIATE ← write lock held until COMMIT/ROLLBACK               │
//! │       │                                                                 │
//! │       ├── collect lines (cart rows, or one product at its price)       │
//! │       │     empty → EmptyCart                                           │
//! │       ├── total = Σ price × quantity (exact; overflow → no writes)     │
//! │       ├── INSERT transactions                                           │
//! │       ├── for each line:                                                │
//! │       │     stock < quantity → InsufficientStock(name)                 │
//! │       │     INSERT transaction_details                                  │
//! │       │     UPDATE products: stock -= qty, total_sold += qty           │
//! │       └── cart checkout: DELETE cart_items of the user                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT (any error above → ROLLBACK, nothing persisted)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{begin_immediate, finish_write, generate_id, EFFECTIVE_STOCK_SQL};
use crate::error::{DbError, DbResult};
use kasir_core::validation::validate_quantity;
use kasir_core::{
    CheckoutLine, CoreError, Money, Receipt, Transaction, TransactionDetail,
    TRANSACTION_STATUS_COMPLETED,
};

/// Where the lines of a checkout come from.
#[derive(Debug, Clone)]
enum CheckoutSource {
    /// Every row of the user's cart, at the cart's price snapshot.
    Cart,
    /// One product at its current price.
    Single { product_id: String, quantity: i64 },
}

/// Repository for transactions and checkout.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Checks out the whole cart of `user_id`.
    ///
    /// ## Returns
    /// * `Ok(Receipt)` - Transaction with its details; the cart is now empty
    /// * `Err(DbError::Business(EmptyCart))` - Nothing to check out
    /// * `Err(DbError::Business(InsufficientStock))` - Nothing was written
    pub async fn checkout_cart(&self, user_id: &str) -> DbResult<Receipt> {
        self.checkout(user_id, CheckoutSource::Cart).await
    }

    /// Sells `quantity` units of one product immediately (POS quick sale).
    pub async fn checkout_single(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<Receipt> {
        validate_quantity(quantity)?;
        self.checkout(
            user_id,
            CheckoutSource::Single {
                product_id: product_id.to_string(),
                quantity,
            },
        )
        .await
    }

    async fn checkout(&self, user_id: &str, source: CheckoutSource) -> DbResult<Receipt> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();

        tokio::spawn(async move {
            let mut conn = pool.acquire().await?;
            begin_immediate(&mut conn).await?;
            let result = run_checkout(&mut conn, &user_id, &source).await;
            finish_write(&mut conn, result).await
        })
        .await
        .map_err(|e| DbError::Internal(format!("Checkout task failed: {}", e)))?
    }

    /// Gets a transaction with its details.
    pub async fn get_receipt(&self, id: &str) -> DbResult<Option<Receipt>> {
        let transaction = sqlx::query_as::<_, Transaction>(
            "SELECT id, user_id, total_cents, status, created_at FROM transactions WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(transaction) = transaction else {
            return Ok(None);
        };

        let details = sqlx::query_as::<_, TransactionDetail>(
            r#"
            SELECT id, transaction_id, product_id, quantity, price_cents, total_cents, created_at
            FROM transaction_details
            WHERE transaction_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Receipt {
            transaction,
            details,
        }))
    }

    /// Most recent transactions, newest first.
    pub async fn recent(&self, limit: i64) -> DbResult<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, total_cents, status, created_at
            FROM transactions
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }
}

// =============================================================================
// Checkout Engine
// =============================================================================

async fn collect_lines(
    conn: &mut SqliteConnection,
    user_id: &str,
    source: &CheckoutSource,
) -> DbResult<Vec<CheckoutLine>> {
    match source {
        CheckoutSource::Cart => {
            let rows: Vec<(String, i64, i64)> = sqlx::query_as(
                r#"
                SELECT product_id, quantity, price_cents
                FROM cart_items
                WHERE user_id = ?1
                ORDER BY created_at, rowid
                "#,
            )
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await?;

            Ok(rows
                .into_iter()
                .map(|(product_id, quantity, price_cents)| CheckoutLine {
                    product_id,
                    quantity,
                    price: Money::from_cents(price_cents),
                })
                .collect())
        }
        CheckoutSource::Single {
            product_id,
            quantity,
        } => {
            let price_cents: Option<i64> = sqlx::query_scalar(
                "SELECT price_cents FROM products WHERE id = ?1 AND deleted_at IS NULL",
            )
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;
            let price_cents =
                price_cents.ok_or_else(|| CoreError::ProductNotFound(product_id.clone()))?;

            Ok(vec![CheckoutLine {
                product_id: product_id.clone(),
                quantity: *quantity,
                price: Money::from_cents(price_cents),
            }])
        }
    }
}

async fn run_checkout(
    conn: &mut SqliteConnection,
    user_id: &str,
    source: &CheckoutSource,
) -> DbResult<Receipt> {
    let lines = collect_lines(conn, user_id, source).await?;
    if lines.is_empty() {
        return Err(CoreError::EmptyCart.into());
    }

    // Totals are settled before the first write; an overflow leaves nothing behind.
    let line_totals = lines
        .iter()
        .map(CheckoutLine::total)
        .collect::<Option<Vec<Money>>>()
        .ok_or(CoreError::AmountOverflow)?;
    let total =
        Money::checked_sum(line_totals.iter().copied()).ok_or(CoreError::AmountOverflow)?;
    let now = Utc::now();

    let transaction = Transaction {
        id: generate_id(),
        user_id: user_id.to_string(),
        total_cents: total.cents(),
        status: TRANSACTION_STATUS_COMPLETED.to_string(),
        created_at: now,
    };

    sqlx::query(
        "INSERT INTO transactions (id, user_id, total_cents, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(&transaction.id)
    .bind(&transaction.user_id)
    .bind(transaction.total_cents)
    .bind(&transaction.status)
    .bind(transaction.created_at)
    .execute(&mut *conn)
    .await?;

    let stock_sql = format!(
        "SELECT p.name, {EFFECTIVE_STOCK_SQL} FROM products p WHERE p.id = ?1 AND p.deleted_at IS NULL"
    );

    let mut details = Vec::with_capacity(lines.len());
    for (line, line_total) in lines.iter().zip(&line_totals) {
        let row: Option<(String, i64)> = sqlx::query_as(&stock_sql)
            .bind(&line.product_id)
            .fetch_optional(&mut *conn)
            .await?;
        let (name, stock) =
            row.ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

        let insufficient = || CoreError::InsufficientStock {
            name: name.clone(),
            available: stock,
            requested: line.quantity,
        };
        if stock < line.quantity {
            debug!(product_id = %line.product_id, stock, requested = line.quantity, "Checkout rejected");
            return Err(insufficient().into());
        }

        let updated = sqlx::query(
            r#"
            UPDATE products SET
                current_stock = ?2 - ?3,
                total_sold = total_sold + ?3,
                updated_at = ?4
            WHERE id = ?1 AND COALESCE(current_stock, ?2) >= ?3
            "#,
        )
        .bind(&line.product_id)
        .bind(stock)
        .bind(line.quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(insufficient().into());
        }

        let detail = TransactionDetail {
            id: generate_id(),
            transaction_id: transaction.id.clone(),
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            price_cents: line.price.cents(),
            total_cents: line_total.cents(),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO transaction_details (
                id, transaction_id, product_id, quantity, price_cents, total_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&detail.id)
        .bind(&detail.transaction_id)
        .bind(&detail.product_id)
        .bind(detail.quantity)
        .bind(detail.price_cents)
        .bind(detail.total_cents)
        .bind(detail.created_at)
        .execute(&mut *conn)
        .await?;

        details.push(detail);
    }

    if matches!(source, CheckoutSource::Cart) {
        sqlx::query("DELETE FROM cart_items WHERE user_id = ?1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
    }

    info!(
        transaction_id = %transaction.id,
        user_id = %user_id,
        lines = details.len(),
        total_cents = transaction.total_cents,
        "Checkout completed"
    );

    Ok(Receipt {
        transaction,
        details,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
