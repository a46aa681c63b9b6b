//! # Stock Math
//!
//! Days-of-stock, status thresholds and trend arithmetic used by the stock
//! analysis queries. Everything here is a pure function of numbers the
//! database layer already fetched.
//!
//! ## Status Thresholds
//! ```text
//! stock ≤ 5                          → critical
//! days ≤ 7  or  stock ≤ 10           → low
//! days ≤ 14                          → normal
//! otherwise                          → healthy
//!
//! days = ceil(stock / (units sold in last 30 days / 30))
//!      = 999 when nothing was sold
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Sales window used for the daily average.
pub const SALES_WINDOW_DAYS: i64 = 30;

/// Days-of-stock reported when the daily average is zero.
pub const DAYS_OF_STOCK_SENTINEL: i64 = 999;

/// Stock at or below this level is critical regardless of sales.
pub const CRITICAL_STOCK: i64 = 5;

/// Stock at or below this level is at least low.
pub const LOW_STOCK: i64 = 10;

/// A product needs restocking when it runs out within this many days.
pub const RESTOCK_HORIZON_DAYS: i64 = 7;

/// Average units sold per day over `window_days`.
pub fn average_daily_sales(units_sold: i64, window_days: i64) -> f64 {
    if window_days <= 0 {
        return 0.0;
    }
    units_sold as f64 / window_days as f64
}

/// Days until the current stock runs out at `daily_average`, rounded up.
///
/// ## Example
/// ```rust
/// use kasir_core::stock::{days_of_stock, DAYS_OF_STOCK_SENTINEL};
///
/// assert_eq!(days_of_stock(60, 2.0), 30);
/// assert_eq!(days_of_stock(7, 2.0), 4);
/// assert_eq!(days_of_stock(60, 0.0), DAYS_OF_STOCK_SENTINEL);
/// ```
pub fn days_of_stock(current_stock: i64, daily_average: f64) -> i64 {
    if daily_average <= 0.0 {
        return DAYS_OF_STOCK_SENTINEL;
    }
    (current_stock as f64 / daily_average).ceil() as i64
}

/// Stock health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum StockLevel {
    Critical,
    Low,
    Normal,
    Healthy,
}

impl StockLevel {
    /// Classifies a product. The stock checks come first, so a product at
    /// or below [`CRITICAL_STOCK`] is critical whatever its sales velocity.
    pub fn classify(current_stock: i64, days_of_stock: i64) -> Self {
        if current_stock <= CRITICAL_STOCK {
            StockLevel::Critical
        } else if days_of_stock <= RESTOCK_HORIZON_DAYS || current_stock <= LOW_STOCK {
            StockLevel::Low
        } else if days_of_stock <= 14 {
            StockLevel::Normal
        } else {
            StockLevel::Healthy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockLevel::Critical => "critical",
            StockLevel::Low => "low",
            StockLevel::Normal => "normal",
            StockLevel::Healthy => "healthy",
        }
    }

    /// Capitalised label for chat replies.
    pub fn title(&self) -> &'static str {
        match self {
            StockLevel::Critical => "Critical",
            StockLevel::Low => "Low",
            StockLevel::Normal => "Normal",
            StockLevel::Healthy => "Healthy",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            StockLevel::Critical => "🔴",
            StockLevel::Low => "🟡",
            StockLevel::Normal | StockLevel::Healthy => "🟢",
        }
    }
}

/// True when the product runs out within [`RESTOCK_HORIZON_DAYS`].
pub fn needs_restock(days_of_stock: i64) -> bool {
    days_of_stock <= RESTOCK_HORIZON_DAYS
}

/// Label shown next to each product in a product list reply.
///
/// Uses stock level only; it is a quick visual hint, not the full
/// [`StockLevel`] analysis.
pub fn product_status_label(stock: i64) -> &'static str {
    if stock <= 5 {
        "🔴 Kritis"
    } else if stock <= 10 {
        "🟡 Rendah"
    } else if stock <= 20 {
        "🟡 Normal"
    } else {
        "🟢 Sehat"
    }
}

// =============================================================================
// Trends
// =============================================================================

/// Direction of the stock ledger over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

impl TrendDirection {
    /// Ties count as decreasing.
    pub fn from_totals(increased: i64, decreased: i64) -> Self {
        if increased > decreased {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        }
    }
}

/// Stable when the net change is under 20% of the total movement.
///
/// An empty ledger (no movement) is not stable.
pub fn is_stable(increased: i64, decreased: i64) -> bool {
    let net = (increased - decreased).abs() as f64;
    net < (increased + decreased) as f64 * 0.2
}

/// Quantity to reorder to cover a full sales window.
pub fn recommended_order_qty(daily_average: f64) -> i64 {
    (daily_average * SALES_WINDOW_DAYS as f64).ceil() as i64
}

// =============================================================================
// Unit Tests
// =============================================================================
