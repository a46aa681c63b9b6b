//! POS quick sale of a single product.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use super::cart::CheckoutResponse;
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/checkout", post(checkout))
}

#[derive(Debug, Deserialize)]
struct SingleCheckout {
    product_id: String,
    quantity: i64,
}

async fn checkout(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<SingleCheckout>,
) -> ApiResult<Json<CheckoutResponse>> {
    let receipt = state
        .db
        .transactions()
        .checkout_single(&user.id, &input.product_id, input.quantity)
        .await
        .map_err(|e| ApiError::from_db(e, "Checkout failed."))?;

    info!(
        transaction_id = %receipt.transaction.id,
        product_id = %input.product_id,
        quantity = input.quantity,
        "POS sale completed"
    );
    Ok(Json(CheckoutResponse {
        message: "Checkout successful.",
        receipt,
    }))
}
