//! Manual stock adjustments and the stock ledger.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use kasir_core::{Product, StockAdjustment, StockHistory};
use serde::{Deserialize, Serialize};

use crate::auth::{CurrentUser, Manager};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 50;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(update_stock))
        .route("/{product_id}/history", get(stock_history))
}

#[derive(Debug, Serialize)]
pub struct StockUpdated {
    pub message: &'static str,
    pub product: Product,
    pub history: StockHistory,
}

async fn update_stock(
    State(state): State<Arc<AppState>>,
    Manager(user): Manager,
    Json(adjustment): Json<StockAdjustment>,
) -> ApiResult<Json<StockUpdated>> {
    let (product, history) = state
        .db
        .stock()
        .update_stock(&adjustment, Some(&user.id))
        .await
        .map_err(|e| ApiError::from_db(e, "Failed to update stock."))?;

    Ok(Json(StockUpdated {
        message: "Stock updated.",
        product,
        history,
    }))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<i64>,
}

async fn stock_history(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Path(product_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<StockHistory>>> {
    state.db.products().require(&product_id).await?;
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, 500);
    Ok(Json(state.db.stock().history(&product_id, limit).await?))
}
