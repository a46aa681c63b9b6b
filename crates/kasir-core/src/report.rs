//! # Report Types
//!
//! Result records of the reporting and stock-analysis queries, plus the
//! chat-ready text renderings of the most common ones.
//!
//! All money fields are minor units. Every record has an "empty" value
//! (`Default` or an explicit constructor) so the query layer can answer
//! with zeros when a query fails.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{group_thousands, Money};
use crate::stock::StockLevel;

// =============================================================================
// Sales & Products
// =============================================================================

/// Product at or below the low-stock threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LowStockProduct {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub current_stock: i64,
    pub price_cents: i64,
}

/// Product ranked by units sold in a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BestSeller {
    pub product_id: String,
    /// "Unknown" when the product row is gone.
    pub product_name: String,
    pub quantity_sold: i64,
    pub revenue_cents: i64,
    pub transaction_count: i64,
}

/// Sales of one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailySales {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub total_cents: i64,
    pub transaction_count: i64,
}

impl DailySales {
    pub fn empty(date: impl Into<String>) -> Self {
        DailySales {
            date: date.into(),
            total_cents: 0,
            transaction_count: 0,
        }
    }
}

/// Revenue of one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlyRevenue {
    pub month: u32,
    pub year: i32,
    pub total_revenue_cents: i64,
    pub transaction_count: i64,
    pub average_transaction_cents: i64,
}

impl MonthlyRevenue {
    pub fn empty(month: u32, year: i32) -> Self {
        MonthlyRevenue {
            month,
            year,
            total_revenue_cents: 0,
            transaction_count: 0,
            average_transaction_cents: 0,
        }
    }
}

/// Checkout totals of one cashier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashierPerformance {
    pub user_id: String,
    /// "Unknown" when the user row is gone.
    pub cashier_name: String,
    pub transaction_count: i64,
    pub total_sales_cents: i64,
    pub average_sale_cents: i64,
}

/// Units and revenue of one product on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductSalesPoint {
    pub date: String,
    pub quantity_sold: i64,
    pub revenue_cents: i64,
}

/// Average of `total` over `count`, rounded half-up; zero when `count` is 0.
pub fn average_cents(total: i64, count: i64) -> i64 {
    if count <= 0 {
        return 0;
    }
    (total * 2 + count) / (count * 2)
}

// =============================================================================
// Stock Analysis
// =============================================================================

/// Stock analysis of a single product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockStatus {
    pub product_id: String,
    pub product_name: String,
    pub current_stock: i64,
    pub daily_sales_average: f64,
    pub days_of_stock: i64,
    pub status: StockLevel,
    pub needs_restock: bool,
}

/// Stock ledger movement of a product over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockTrend {
    pub product_id: String,
    pub period_days: i64,
    pub total_increased: i64,
    pub total_decreased: i64,
    pub net_change: i64,
    pub trend: crate::stock::TrendDirection,
    pub is_stable: bool,
}

/// Product expected to run out within the look-ahead window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReorderSuggestion {
    pub product_id: String,
    pub product_name: String,
    pub current_stock: i64,
    pub days_of_stock: i64,
    pub daily_sales_average: f64,
    pub recommended_order_qty: i64,
}

/// Product at or below the critical stock level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CriticalStockItem {
    pub id: String,
    pub name: String,
    pub current_stock: i64,
    pub price_cents: i64,
}

// =============================================================================
// Text Renderings
// =============================================================================

/// Chat text for the low-stock list.
///
/// ## Example
/// ```rust
/// use kasir_core::report::format_low_stock_report;
///
/// assert_eq!(format_low_stock_report(&[]), "Tidak ada produk dengan stok rendah.");
/// ```
pub fn format_low_stock_report(products: &[LowStockProduct]) -> String {
    if products.is_empty() {
        return "Tidak ada produk dengan stok rendah.".to_string();
    }

    let mut lines = vec!["📦 *Daftar Produk Stok Rendah:*\n".to_string()];
    for product in products {
        lines.push(format!(
            "• {} - Stok: {} (Harga: {})",
            product.name,
            product.current_stock,
            Money::from_cents(product.price_cents)
        ));
    }
    lines.join("\n")
}

/// Chat text for a day's sales.
pub fn format_sales_report(sales: &DailySales) -> String {
    format!(
        "💰 *Laporan Penjualan {}*\n\nTotal: Rp{}\nTransaksi: {}",
        sales.date,
        group_thousands(Money::from_cents(sales.total_cents).rounded_rupiah()),
        sales.transaction_count
    )
}

/// Chat text for a product's stock analysis. `Err` carries a short reason
/// ("Product not found").
pub fn format_stock_status_report(status: &Result<StockStatus, String>) -> String {
    let status = match status {
        Ok(status) => status,
        Err(reason) => return format!("❌ {reason}"),
    };

    format!(
        "{} *{}*\n\nStok Saat Ini: {} unit\nRata-rata Terjual/hari: {:.2} unit\nEstimasi Tersisa: {} hari\nStatus: {}\n\n{}",
        status.status.emoji(),
        status.product_name,
        status.current_stock,
        status.daily_sales_average,
        status.days_of_stock,
        status.status.title(),
        if status.needs_restock {
            "⚠️ Butuh restock segera!"
        } else {
            "✅ Stok cukup"
        }
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_stock_report_lines() {
        let report = format_low_stock_report(&[LowStockProduct {
            id: "p1".into(),
            name: "Beng Beng".into(),
            sku: "SNK-BB-010".into(),
            current_stock: 4,
            price_cents: 250_000,
        }]);
        assert_eq!(
            report,
            "📦 *Daftar Produk Stok Rendah:*\n\n• Beng Beng - Stok: 4 (Harga: Rp2.500)"
        );
    }

    #[test]
    fn test_sales_report() {
        let report = format_sales_report(&DailySales {
            date: "2026-03-01".into(),
            total_cents: 12_550_000,
            transaction_count: 7,
        });
        assert_eq!(
            report,
            "💰 *Laporan Penjualan 2026-03-01*\n\nTotal: Rp125.500\nTransaksi: 7"
        );
    }

    #[test]
    fn test_stock_status_report() {
        let status = StockStatus {
            product_id: "p1".into(),
            product_name: "Pocari Sweat".into(),
            current_stock: 5,
            daily_sales_average: 0.5,
            days_of_stock: 10,
            status: StockLevel::Critical,
            needs_restock: false,
        };
        let text = format_stock_status_report(&Ok(status));
        assert!(text.starts_with("🔴 *Pocari Sweat*"));
        assert!(text.contains("Rata-rata Terjual/hari: 0.50 unit"));
        assert!(text.contains("Status: Critical"));
        assert!(text.ends_with("✅ Stok cukup"));

        assert_eq!(
            format_stock_status_report(&Err("Product not found".into())),
            "❌ Product not found"
        );
    }

    #[test]
    fn test_average_cents_rounds_half_up() {
        assert_eq!(average_cents(1_000, 3), 333);
        assert_eq!(average_cents(1_001, 2), 501);
        assert_eq!(average_cents(500, 0), 0);
    }
}
