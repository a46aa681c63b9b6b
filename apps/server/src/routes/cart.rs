//! Per-user cart and cart checkout.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use kasir_core::{CartItem, CartView, Receipt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(view_cart).post(add_to_cart).delete(clear_cart))
        .route("/{id}", put(update_item).delete(remove_item))
        .route("/{id}/checkout", post(checkout))
}

#[derive(Debug, Deserialize)]
struct AddToCart {
    product_id: String,
    quantity: i64,
}

#[derive(Debug, Deserialize)]
struct UpdateQuantity {
    quantity: i64,
}

/// Response of a successful checkout.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub message: &'static str,
    pub receipt: Receipt,
}

async fn view_cart(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<CartView>> {
    Ok(Json(state.db.carts().view(&user.id).await?))
}

async fn add_to_cart(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<AddToCart>,
) -> ApiResult<Json<CartItem>> {
    let item = state
        .db
        .carts()
        .add(&user.id, &input.product_id, input.quantity)
        .await?;
    Ok(Json(item))
}

async fn update_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<String>,
    Json(input): Json<UpdateQuantity>,
) -> ApiResult<Json<CartItem>> {
    let item = state
        .db
        .carts()
        .update_quantity(&user.id, &item_id, input.quantity)
        .await?;
    Ok(Json(item))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.db.carts().remove(&user.id, &item_id).await?;
    Ok(Json(json!({ "message": "Item removed from cart." })))
}

async fn clear_cart(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Value>> {
    let removed = state.db.carts().clear(&user.id).await?;
    Ok(Json(json!({ "message": "Cart cleared.", "removed": removed })))
}

async fn checkout(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<String>,
) -> ApiResult<Json<CheckoutResponse>> {
    if user_id != user.id {
        warn!(acting = %user.id, target = %user_id, "Checkout of another user's cart refused");
        return Err(ApiError::forbidden("Unauthorized action."));
    }

    let receipt = state
        .db
        .transactions()
        .checkout_cart(&user.id)
        .await
        .map_err(|e| ApiError::from_db(e, "Checkout failed."))?;

    info!(
        transaction_id = %receipt.transaction.id,
        total_cents = receipt.transaction.total_cents,
        "Cart checked out"
    );
    Ok(Json(CheckoutResponse {
        message: "Checkout successful.",
        receipt,
    }))
}
