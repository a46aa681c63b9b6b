//! # Reporting Queries
//!
//! Sales and product aggregates answered to the chat and the report
//! endpoints.
//!
//! ## Failure Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  public method          private query                                  │
//! │  ─────────────          ─────────────                                  │
//! │  low_stock_products ──► query_low_stock ──► DbResult<Vec<_>>           │
//! │        │                                                                │
//! │        ├── Ok(rows)  → rows                                             │
//! │        └── Err(e)    → error!(...) and an empty / zero value           │
//! │                                                                         │
//! │  A failed report never breaks a chat reply.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use sqlx::SqlitePool;
use tracing::{debug, error};

use crate::error::{DbError, DbResult};
use crate::repository::EFFECTIVE_STOCK_SQL;
use kasir_core::report::{
    average_cents, BestSeller, CashierPerformance, DailySales, LowStockProduct, MonthlyRevenue,
    ProductSalesPoint,
};

/// Read-only aggregate queries.
#[derive(Debug, Clone)]
pub struct ReportingQueries {
    pool: SqlitePool,
}

impl ReportingQueries {
    /// Creates a new ReportingQueries.
    pub fn new(pool: SqlitePool) -> Self {
        ReportingQueries { pool }
    }

    /// Products whose stock is at or below `threshold`, lowest first.
    pub async fn low_stock_products(&self, threshold: i64, limit: i64) -> Vec<LowStockProduct> {
        debug!(threshold, limit, "Fetching low stock products");
        match self.query_low_stock(threshold, limit).await {
            Ok(products) => {
                debug!(count = products.len(), "Low stock products retrieved");
                products
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch low stock products");
                Vec::new()
            }
        }
    }

    /// Products ranked by units sold in the last `days` days.
    pub async fn best_selling_products(&self, days: i64, limit: i64) -> Vec<BestSeller> {
        debug!(days, limit, "Fetching best sellers");
        match self.query_best_sellers(days, limit).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "Failed to fetch best sellers");
                Vec::new()
            }
        }
    }

    /// Total and transaction count of one UTC calendar day.
    pub async fn daily_sales(&self, date: NaiveDate) -> DailySales {
        let label = date.format("%Y-%m-%d").to_string();
        debug!(date = %label, "Fetching daily sales");
        match self.query_daily_sales(date).await {
            Ok((total_cents, transaction_count)) => DailySales {
                date: label,
                total_cents,
                transaction_count,
            },
            Err(e) => {
                error!(error = %e, date = %label, "Failed to fetch daily sales");
                DailySales::empty(label)
            }
        }
    }

    /// Sales of today and the six days before it, oldest first.
    pub async fn weekly_sales(&self) -> Vec<DailySales> {
        let today = Utc::now().date_naive();
        let mut days = Vec::with_capacity(7);
        for offset in (0..7).rev() {
            days.push(self.daily_sales(today - Duration::days(offset)).await);
        }

        let week_total = days.iter().fold(0i64, |acc, d| acc.saturating_add(d.total_cents));
        debug!(week_total_cents = week_total, "Weekly breakdown retrieved");
        days
    }

    /// Revenue of a calendar month.
    pub async fn monthly_revenue(&self, month: u32, year: i32) -> MonthlyRevenue {
        debug!(month, year, "Fetching monthly revenue");
        match self.query_monthly_revenue(month, year).await {
            Ok(revenue) => revenue,
            Err(e) => {
                error!(error = %e, month, year, "Failed to fetch monthly revenue");
                MonthlyRevenue::empty(month, year)
            }
        }
    }

    /// Cashiers ranked by sales total over the last `days` days.
    pub async fn top_cashiers(&self, days: i64, limit: i64) -> Vec<CashierPerformance> {
        debug!(days, limit, "Fetching top cashiers");
        match self.query_top_cashiers(days, limit).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "Failed to fetch top cashiers");
                Vec::new()
            }
        }
    }

    /// Daily units and revenue of one product, oldest day first.
    pub async fn product_sales_trend(&self, product_id: &str, days: i64) -> Vec<ProductSalesPoint> {
        debug!(product_id = %product_id, days, "Fetching product sales trend");
        match self.query_product_trend(product_id, days).await {
            Ok(points) => points,
            Err(e) => {
                error!(error = %e, product_id = %product_id, "Failed to fetch product sales trend");
                Vec::new()
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    async fn query_low_stock(&self, threshold: i64, limit: i64) -> DbResult<Vec<LowStockProduct>> {
        let sql = format!(
            "SELECT id, name, sku, current_stock, price_cents FROM ( \
                 SELECT p.id, p.name, p.sku, {EFFECTIVE_STOCK_SQL} AS current_stock, p.price_cents \
                 FROM products p WHERE p.deleted_at IS NULL \
             ) WHERE current_stock <= ?1 \
             ORDER BY current_stock ASC, name \
             LIMIT ?2"
        );
        let products = sqlx::query_as::<_, LowStockProduct>(&sql)
            .bind(threshold)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    async fn query_best_sellers(&self, days: i64, limit: i64) -> DbResult<Vec<BestSeller>> {
        let since = Utc::now() - Duration::days(days);
        let rows = sqlx::query_as::<_, BestSeller>(
            r#"
            SELECT d.product_id,
                   COALESCE(p.name, 'Unknown') AS product_name,
                   SUM(d.quantity) AS quantity_sold,
                   SUM(d.total_cents) AS revenue_cents,
                   COUNT(DISTINCT d.transaction_id) AS transaction_count
            FROM transaction_details d
            JOIN transactions t ON t.id = d.transaction_id
            LEFT JOIN products p ON p.id = d.product_id
            WHERE t.created_at >= ?1
            GROUP BY d.product_id
            ORDER BY quantity_sold DESC
            LIMIT ?2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn query_daily_sales(&self, date: NaiveDate) -> DbResult<(i64, i64)> {
        let start = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| DbError::Internal(format!("Invalid date: {}", date)))?;
        let start = Utc.from_utc_datetime(&start);
        let end = start + Duration::days(1);

        let row: (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total_cents), 0), COUNT(*)
            FROM transactions
            WHERE created_at >= ?1 AND created_at < ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn query_monthly_revenue(&self, month: u32, year: i32) -> DbResult<MonthlyRevenue> {
        let invalid = || DbError::Internal(format!("Invalid month: {}-{}", year, month));
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;

        let start = Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0).ok_or_else(invalid)?);
        let end = Utc.from_utc_datetime(&next.and_hms_opt(0, 0, 0).ok_or_else(invalid)?);

        let (total, count): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total_cents), 0), COUNT(*)
            FROM transactions
            WHERE created_at >= ?1 AND created_at < ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(MonthlyRevenue {
            month,
            year,
            total_revenue_cents: total,
            transaction_count: count,
            average_transaction_cents: average_cents(total, count),
        })
    }

    async fn query_top_cashiers(&self, days: i64, limit: i64) -> DbResult<Vec<CashierPerformance>> {
        let since = Utc::now() - Duration::days(days);
        let rows: Vec<(String, String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT t.user_id,
                   COALESCE(u.name, 'Unknown'),
                   COUNT(*) AS transaction_count,
                   SUM(t.total_cents) AS total_sales
            FROM transactions t
            LEFT JOIN users u ON u.id = t.user_id
            WHERE t.created_at >= ?1
            GROUP BY t.user_id
            ORDER BY total_sales DESC
            LIMIT ?2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, cashier_name, count, total)| CashierPerformance {
                user_id,
                cashier_name,
                transaction_count: count,
                total_sales_cents: total,
                average_sale_cents: average_cents(total, count),
            })
            .collect())
    }

    async fn query_product_trend(
        &self,
        product_id: &str,
        days: i64,
    ) -> DbResult<Vec<ProductSalesPoint>> {
        let since = Utc::now() - Duration::days(days);
        let points = sqlx::query_as::<_, ProductSalesPoint>(
            r#"
            SELECT substr(t.created_at, 1, 10) AS date,
                   SUM(d.quantity) AS quantity_sold,
                   SUM(d.total_cents) AS revenue_cents
            FROM transaction_details d
            JOIN transactions t ON t.id = d.transaction_id
            WHERE d.product_id = ?1 AND t.created_at >= ?2
            GROUP BY substr(t.created_at, 1, 10)
            ORDER BY date ASC
            "#,
        )
        .bind(product_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(points)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Datelike;
    use kasir_core::{NewProduct, NewUser, Product, UserRole};

    struct Fixture {
        db: Database,
        cashier: String,
        teh: Product,
        pocari: Product,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cashier = db
            .users()
            .create(&NewUser {
                name: "Siti".into(),
                username: "siti".into(),
                password: "secret1".into(),
                role: UserRole::Cashier,
            })
            .await
            .unwrap()
            .id;

        let mut products = Vec::new();
        for (name, sku, price, stock) in [
            ("Teh Botol Sosro", "BEV-TB-001", 500_000, 150),
            ("Pocari Sweat", "BEV-PS-005", 800_000, 8),
        ] {
            products.push(
                db.products()
                    .create(
                        &NewProduct {
                            name: name.into(),
                            sku: sku.into(),
                            price_cents: price,
                            description: None,
                            current_stock: stock,
                        },
                        None,
                    )
                    .await
                    .unwrap(),
            );
        }
        let pocari = products.pop().unwrap();
        let teh = products.pop().unwrap();

        Fixture {
            db,
            cashier,
            teh,
            pocari,
        }
    }

    #[tokio::test]
    async fn test_low_stock_products() {
        let f = fixture().await;
        let low = f.db.reports().low_stock_products(10, 20).await;
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Pocari Sweat");
        assert_eq!(low[0].current_stock, 8);
    }

    #[tokio::test]
    async fn test_best_sellers_and_daily_sales() {
        let f = fixture().await;
        let tx = f.db.transactions();
        tx.checkout_single(&f.cashier, &f.teh.id, 5).await.unwrap();
        tx.checkout_single(&f.cashier, &f.teh.id, 2).await.unwrap();
        tx.checkout_single(&f.cashier, &f.pocari.id, 1).await.unwrap();

        let best = f.db.reports().best_selling_products(30, 10).await;
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].product_name, "Teh Botol Sosro");
        assert_eq!(best[0].quantity_sold, 7);
        assert_eq!(best[0].revenue_cents, 3_500_000);
        assert_eq!(best[0].transaction_count, 2);

        let today = f.db.reports().daily_sales(Utc::now().date_naive()).await;
        assert_eq!(today.transaction_count, 3);
        assert_eq!(today.total_cents, 4_300_000);

        let week = f.db.reports().weekly_sales().await;
        assert_eq!(week.len(), 7);
        assert_eq!(week[6].transaction_count, 3);
        assert_eq!(week[0].transaction_count, 0);
    }

    #[tokio::test]
    async fn test_monthly_revenue_and_cashiers() {
        let f = fixture().await;
        let tx = f.db.transactions();
        tx.checkout_single(&f.cashier, &f.teh.id, 1).await.unwrap();
        tx.checkout_single(&f.cashier, &f.teh.id, 2).await.unwrap();

        let now = Utc::now();
        let month = f.db.reports().monthly_revenue(now.month(), now.year()).await;
        assert_eq!(month.transaction_count, 2);
        assert_eq!(month.total_revenue_cents, 1_500_000);
        assert_eq!(month.average_transaction_cents, 750_000);

        let cashiers = f.db.reports().top_cashiers(30, 10).await;
        assert_eq!(cashiers.len(), 1);
        assert_eq!(cashiers[0].cashier_name, "Siti");
        assert_eq!(cashiers[0].average_sale_cents, 750_000);

        let trend = f.db.reports().product_sales_trend(&f.teh.id, 30).await;
        assert_eq!(trend.len(), 1);
        assert_eq!(trend[0].quantity_sold, 3);
        assert_eq!(trend[0].date, now.format("%Y-%m-%d").to_string());
    }

    #[tokio::test]
    async fn test_invalid_month_yields_empty_revenue() {
        let f = fixture().await;
        let month = f.db.reports().monthly_revenue(13, 2026).await;
        assert_eq!(month, MonthlyRevenue::empty(13, 2026));
    }

    #[tokio::test]
    async fn test_failed_query_returns_empty() {
        let f = fixture().await;
        f.db.close().await;
        assert!(f.db.reports().low_stock_products(10, 20).await.is_empty());
        let sales = f.db.reports().daily_sales(Utc::now().date_naive()).await;
        assert_eq!(sales.transaction_count, 0);
    }
}
