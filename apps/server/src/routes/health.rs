//! Liveness and database health.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::warn;

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let database = state.db.health_check().await;
    if !database {
        warn!("Health check: database unavailable");
    }

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if database { "up" } else { "down" },
            "version": env!("CARGO_PKG_VERSION"),
            "database": database,
            "model_enabled": state.model.is_some(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
