//! # Repository Module
//!
//! Database repository implementations for Kasir POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP handler                                                           │
//! │       │                                                                 │
//! │       │  db.carts().add(&user_id, &product_id, 2)                       │
//! │       ▼                                                                 │
//! │  CartRepository                                                        │
//! │  ├── add(&self, user, product, quantity)                               │
//! │  ├── update_quantity(&self, user, item, quantity)                      │
//! │  └── view(&self, user)                                                 │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product CRUD, soft delete, name lookup
//! - [`stock::StockRepository`] - Stock adjustments and the stock ledger
//! - [`cart::CartRepository`] - Per-user cart with upsert semantics
//! - [`transaction::TransactionRepository`] - Checkout engine and receipts
//! - [`user::UserRepository`] - User accounts and deletion rules
//! - [`chat::ChatRepository`] - Chat topics, messages, pending actions

pub mod cart;
pub mod chat;
pub mod product;
pub mod stock;
pub mod transaction;
pub mod user;

use sqlx::SqliteConnection;
use tracing::warn;
use uuid::Uuid;

use crate::error::DbResult;

/// Generates a new UUID v4 string for a primary key.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Columns selected for every `Product` row.
pub(crate) const PRODUCT_COLUMNS: &str = "id, name, sku, price_cents, current_stock, total_sold, \
     description, created_at, updated_at, deleted_at";

/// Stock of product `p` with an unset column resolved from the ledger
/// (increases minus decreases).
pub(crate) const EFFECTIVE_STOCK_SQL: &str = "COALESCE(p.current_stock, (\
     SELECT COALESCE(SUM(CASE WHEN h.type = 'increase' THEN h.quantity ELSE -h.quantity END), 0) \
     FROM stock_histories h WHERE h.product_id = p.id))";

// =============================================================================
// Write Transactions
// =============================================================================
//
// Stock mutations run as:
//
//   BEGIN IMMEDIATE   ← takes the database write lock before any read
//   SELECT stock      ← value cannot change until COMMIT
//   UPDATE ... WHERE current_stock >= ?
//   COMMIT / ROLLBACK
//
// Callers run the whole sequence on a spawned task so a dropped request
// cannot leave a pooled connection inside an open transaction.

/// Starts a write transaction holding SQLite's write lock.
pub(crate) async fn begin_immediate(conn: &mut SqliteConnection) -> DbResult<()> {
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
    Ok(())
}

/// Commits on `Ok`, rolls back on `Err` (or when the commit itself fails).
pub(crate) async fn finish_write<T>(
    conn: &mut SqliteConnection,
    result: DbResult<T>,
) -> DbResult<T> {
    match result {
        Ok(value) => match sqlx::query("COMMIT").execute(&mut *conn).await {
            Ok(_) => Ok(value),
            Err(err) => {
                rollback(conn).await;
                Err(err.into())
            }
        },
        Err(err) => {
            rollback(conn).await;
            Err(err)
        }
    }
}

async fn rollback(conn: &mut SqliteConnection) {
    if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
        warn!(error = %e, "Rollback failed");
    }
}
