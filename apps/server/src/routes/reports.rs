//! Read-only report endpoints.
//!
//! The underlying queries swallow their own failures and return empty or
//! zero results, so these handlers only fail on a missing acting user.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Datelike, NaiveDate, Utc};
use kasir_core::report::{
    BestSeller, CashierPerformance, CriticalStockItem, DailySales, LowStockProduct,
    MonthlyRevenue, ProductSalesPoint, ReorderSuggestion,
};
use kasir_core::stock::{LOW_STOCK, RESTOCK_HORIZON_DAYS, SALES_WINDOW_DAYS};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::CurrentUser;
use crate::AppState;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;
const MAX_DAYS: i64 = 366;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/low-stock", get(low_stock))
        .route("/best-sellers", get(best_sellers))
        .route("/sales/daily", get(daily_sales))
        .route("/sales/weekly", get(weekly_sales))
        .route("/sales/monthly", get(monthly_revenue))
        .route("/cashiers", get(cashiers))
        .route("/products/{id}/trend", get(product_trend))
        .route("/stock/reorder", get(reorder))
        .route("/stock/critical", get(critical))
        .route("/stock/{id}/status", get(stock_status))
        .route("/stock/{id}/trends", get(stock_trends))
}

/// Common query parameters; each endpoint reads the ones it needs.
#[derive(Debug, Default, Deserialize)]
struct ReportQuery {
    days: Option<i64>,
    limit: Option<i64>,
    threshold: Option<i64>,
    date: Option<NaiveDate>,
    month: Option<u32>,
    year: Option<i32>,
}

impl ReportQuery {
    fn days(&self, default: i64) -> i64 {
        self.days.unwrap_or(default).clamp(1, MAX_DAYS)
    }

    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

async fn low_stock(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> Json<Vec<LowStockProduct>> {
    let threshold = query.threshold.unwrap_or(LOW_STOCK).max(0);
    Json(
        state
            .db
            .reports()
            .low_stock_products(threshold, query.limit())
            .await,
    )
}

async fn best_sellers(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> Json<Vec<BestSeller>> {
    Json(
        state
            .db
            .reports()
            .best_selling_products(query.days(SALES_WINDOW_DAYS), query.limit())
            .await,
    )
}

async fn daily_sales(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> Json<DailySales> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    Json(state.db.reports().daily_sales(date).await)
}

async fn weekly_sales(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
) -> Json<Vec<DailySales>> {
    Json(state.db.reports().weekly_sales().await)
}

async fn monthly_revenue(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> Json<MonthlyRevenue> {
    let today = Utc::now().date_naive();
    let month = query.month.filter(|m| (1..=12).contains(m)).unwrap_or(today.month());
    let year = query.year.unwrap_or(today.year());
    Json(state.db.reports().monthly_revenue(month, year).await)
}

async fn cashiers(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> Json<Vec<CashierPerformance>> {
    Json(
        state
            .db
            .reports()
            .top_cashiers(query.days(SALES_WINDOW_DAYS), query.limit())
            .await,
    )
}

async fn product_trend(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Json<Vec<ProductSalesPoint>> {
    Json(
        state
            .db
            .reports()
            .product_sales_trend(&id, query.days(SALES_WINDOW_DAYS))
            .await,
    )
}

async fn stock_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
) -> Json<Value> {
    match state.db.stock_analysis().stock_status(&id).await {
        Ok(status) => Json(json!(status)),
        Err(reason) => Json(json!({ "error": reason })),
    }
}

async fn stock_trends(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Json<Value> {
    match state
        .db
        .stock_analysis()
        .stock_trends(&id, query.days(SALES_WINDOW_DAYS))
        .await
    {
        Ok(trend) => Json(json!(trend)),
        Err(reason) => Json(json!({ "error": reason })),
    }
}

async fn reorder(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> Json<Vec<ReorderSuggestion>> {
    Json(
        state
            .db
            .stock_analysis()
            .predict_reorder(query.days(RESTOCK_HORIZON_DAYS))
            .await,
    )
}

async fn critical(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
) -> Json<Vec<CriticalStockItem>> {
    Json(state.db.stock_analysis().critical_alerts().await)
}
