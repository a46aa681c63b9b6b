//! Product catalog. Reads are open to every user; writes need a manager.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use kasir_core::{NewProduct, Product, ProductUpdate};
use serde_json::{json, Value};
use tracing::info;

use crate::auth::{CurrentUser, Manager};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().list().await?))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.db.products().require(&id).await?))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    Manager(user): Manager,
    Json(input): Json<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = state
        .db
        .products()
        .create(&input, Some(&user.id))
        .await
        .map_err(|e| ApiError::from_db(e, "Failed to create product."))?;

    info!(product_id = %product.id, user_id = %user.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    Manager(_user): Manager,
    Path(id): Path<String>,
    Json(input): Json<ProductUpdate>,
) -> ApiResult<Json<Product>> {
    let product = state
        .db
        .products()
        .update(&id, &input)
        .await
        .map_err(|e| ApiError::from_db(e, "Failed to update product."))?;
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    Manager(user): Manager,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .db
        .products()
        .soft_delete(&id)
        .await
        .map_err(|e| ApiError::from_db(e, "Failed to delete product."))?;

    info!(product_id = %id, user_id = %user.id, "Product deleted");
    Ok(Json(json!({ "message": "Product deleted." })))
}
