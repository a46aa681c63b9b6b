//! # Stock Analysis
//!
//! Days-of-stock, ledger trends, reorder prediction and critical alerts.
//! Like [`crate::reporting`], nothing here returns a database error: single
//! product lookups answer `Err(reason)` with a short user-facing reason and
//! list queries answer an empty list.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use tracing::{debug, error, warn};

use crate::error::DbResult;
use crate::repository::EFFECTIVE_STOCK_SQL;
use kasir_core::report::{CriticalStockItem, ReorderSuggestion, StockStatus, StockTrend};
use kasir_core::stock::{
    average_daily_sales, days_of_stock, is_stable, needs_restock, recommended_order_qty,
    StockLevel, TrendDirection, CRITICAL_STOCK, SALES_WINDOW_DAYS,
};

/// Reason given when the product does not exist.
pub const PRODUCT_NOT_FOUND: &str = "Product not found";

/// One product with the numbers every stock computation starts from.
#[derive(Debug, sqlx::FromRow)]
struct StockRow {
    id: String,
    name: String,
    current_stock: i64,
    units_sold: i64,
}

impl StockRow {
    fn status(&self) -> StockStatus {
        let average = average_daily_sales(self.units_sold, SALES_WINDOW_DAYS);
        let days = days_of_stock(self.current_stock, average);
        StockStatus {
            product_id: self.id.clone(),
            product_name: self.name.clone(),
            current_stock: self.current_stock,
            daily_sales_average: average,
            days_of_stock: days,
            status: StockLevel::classify(self.current_stock, days),
            needs_restock: needs_restock(days),
        }
    }
}

/// Stock analytics over products, sales and the stock ledger.
#[derive(Debug, Clone)]
pub struct StockAnalysis {
    pool: SqlitePool,
}

impl StockAnalysis {
    /// Creates a new StockAnalysis.
    pub fn new(pool: SqlitePool) -> Self {
        StockAnalysis { pool }
    }

    /// Days-of-stock and status of one product.
    ///
    /// ## Returns
    /// * `Ok(StockStatus)` - Analysis over the last 30 days of sales
    /// * `Err("Product not found")` - Unknown or deleted product
    /// * `Err("Failed to fetch stock status")` - Query failed (logged)
    pub async fn stock_status(&self, product_id: &str) -> Result<StockStatus, String> {
        debug!(product_id = %product_id, "Fetching stock status");
        match self.query_stock_rows(Some(product_id)).await {
            Ok(rows) => match rows.first() {
                Some(row) => Ok(row.status()),
                None => {
                    warn!(product_id = %product_id, "Stock status requested for unknown product");
                    Err(PRODUCT_NOT_FOUND.to_string())
                }
            },
            Err(e) => {
                error!(error = %e, product_id = %product_id, "Failed to fetch stock status");
                Err("Failed to fetch stock status".to_string())
            }
        }
    }

    /// Ledger increases vs. decreases of a product over the last `days` days.
    pub async fn stock_trends(&self, product_id: &str, days: i64) -> Result<StockTrend, String> {
        debug!(product_id = %product_id, days, "Analyzing stock trends");
        match self.query_ledger_totals(product_id, days).await {
            Ok((increased, decreased)) => Ok(StockTrend {
                product_id: product_id.to_string(),
                period_days: days,
                total_increased: increased,
                total_decreased: decreased,
                net_change: increased - decreased,
                trend: TrendDirection::from_totals(increased, decreased),
                is_stable: is_stable(increased, decreased),
            }),
            Err(e) => {
                error!(error = %e, product_id = %product_id, "Failed to analyze stock trends");
                Err("Failed to analyze trends".to_string())
            }
        }
    }

    /// Products expected to run out within `look_ahead_days`, soonest first.
    pub async fn predict_reorder(&self, look_ahead_days: i64) -> Vec<ReorderSuggestion> {
        debug!(look_ahead_days, "Predicting reorder needs");
        let rows = match self.query_stock_rows(None).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "Failed to predict reorder needs");
                return Vec::new();
            }
        };

        let mut suggestions: Vec<ReorderSuggestion> = rows
            .iter()
            .map(StockRow::status)
            .filter(|s| s.days_of_stock <= look_ahead_days)
            .map(|s| ReorderSuggestion {
                recommended_order_qty: recommended_order_qty(s.daily_sales_average),
                product_id: s.product_id,
                product_name: s.product_name,
                current_stock: s.current_stock,
                days_of_stock: s.days_of_stock,
                daily_sales_average: s.daily_sales_average,
            })
            .collect();
        suggestions.sort_by_key(|s| s.days_of_stock);

        debug!(count = suggestions.len(), "Products needing reorder");
        suggestions
    }

    /// Products at or below the critical stock level, lowest first.
    pub async fn critical_alerts(&self) -> Vec<CriticalStockItem> {
        match self.query_critical().await {
            Ok(items) => items,
            Err(e) => {
                error!(error = %e, "Failed to fetch critical alerts");
                Vec::new()
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    async fn query_stock_rows(&self, product_id: Option<&str>) -> DbResult<Vec<StockRow>> {
        let since = Utc::now() - Duration::days(SALES_WINDOW_DAYS);
        let sql = format!(
            "SELECT p.id, p.name, {EFFECTIVE_STOCK_SQL} AS current_stock, \
                 (SELECT COALESCE(SUM(d.quantity), 0) \
                  FROM transaction_details d \
                  JOIN transactions t ON t.id = d.transaction_id \
                  WHERE d.product_id = p.id AND t.created_at >= ?1) AS units_sold \
             FROM products p \
             WHERE p.deleted_at IS NULL AND (?2 IS NULL OR p.id = ?2) \
             ORDER BY p.name"
        );
        let rows = sqlx::query_as::<_, StockRow>(&sql)
            .bind(since)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn query_ledger_totals(&self, product_id: &str, days: i64) -> DbResult<(i64, i64)> {
        let since = Utc::now() - Duration::days(days);
        let totals: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN type = 'increase' THEN quantity ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN type = 'decrease' THEN quantity ELSE 0 END), 0)
            FROM stock_histories
            WHERE product_id = ?1 AND created_at >= ?2
            "#,
        )
        .bind(product_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }

    async fn query_critical(&self) -> DbResult<Vec<CriticalStockItem>> {
        let sql = format!(
            "SELECT id, name, current_stock, price_cents FROM ( \
                 SELECT p.id, p.name, {EFFECTIVE_STOCK_SQL} AS current_stock, p.price_cents \
                 FROM products p WHERE p.deleted_at IS NULL \
             ) WHERE current_stock <= ?1 \
             ORDER BY current_stock ASC, name"
        );
        let items = sqlx::query_as::<_, CriticalStockItem>(&sql)
            .bind(CRITICAL_STOCK)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
