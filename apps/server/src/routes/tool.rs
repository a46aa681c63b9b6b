//! Whitelisted read-only database tool for the chat front end.
//!
//! ```text
//! POST /api/chat/tool  { "intent": "product_lookup", "params": { "q": "stok pocari", "limit": 5 } }
//!   200 { "intent": "product_lookup", "rows": [...] }
//!   403 { "error": "DB tool disabled" }
//!   422 { "error": "unknown_intent" }
//!   500 { "error": "tool_failed" }
//! ```

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use kasir_db::{ToolIntent, ToolParams};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::auth::CurrentUser;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/tool", post(run_tool))
}

#[derive(Debug, Deserialize)]
struct ToolRequest {
    intent: String,
    #[serde(default)]
    params: ToolParams,
}

async fn run_tool(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<ToolRequest>,
) -> (StatusCode, Json<Value>) {
    let config = &state.config.db_tool;
    if !config.enabled {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "DB tool disabled" })),
        );
    }

    let Some(intent) = ToolIntent::parse(&request.intent) else {
        warn!(intent = %request.intent, user_id = %user.id, "Unknown tool intent");
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "unknown_intent" })),
        );
    };

    let tool = state
        .db
        .db_tool()
        .with_limits(config.row_limit, config.allow_full_export);
    match tool.run_intent(intent, &request.params).await {
        Ok(rows) => (
            StatusCode::OK,
            Json(json!({ "intent": intent.as_str(), "rows": rows })),
        ),
        Err(e) => {
            error!(error = %e, intent = intent.as_str(), "Tool call failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "tool_failed" })),
            )
        }
    }
}
