//! User management (managers only).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use kasir_core::{NewUser, User, UserUpdate};
use serde_json::{json, Value};
use tracing::info;

use crate::auth::Manager;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", put(update_user).delete(delete_user))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Manager(_user): Manager,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.db.users().list().await?))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Manager(actor): Manager,
    Json(input): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state
        .db
        .users()
        .create(&input)
        .await
        .map_err(|e| ApiError::from_db(e, "Failed to create user."))?;

    info!(actor = %actor.id, user_id = %user.id, role = user.role.as_str(), "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Manager(_actor): Manager,
    Path(id): Path<String>,
    Json(input): Json<UserUpdate>,
) -> ApiResult<Json<User>> {
    let user = state
        .db
        .users()
        .update(&id, &input)
        .await
        .map_err(|e| ApiError::from_db(e, "Failed to update user."))?;
    Ok(Json(user))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Manager(actor): Manager,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .db
        .users()
        .delete(&actor, &id)
        .await
        .map_err(|e| ApiError::from_db(e, "Failed to delete user."))?;
    Ok(Json(json!({ "message": "User deleted successfully." })))
}
