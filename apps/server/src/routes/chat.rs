//! Chat topics and message sending.
//!
//! ```text
//! GET  /api/chat/topics               list (a first topic is created when none exist)
//! POST /api/chat/topics               create
//! GET  /api/chat/topics/{id}          topic + last messages
//! POST /api/chat/topics/{id}/messages send ──► ChatOrchestrator
//! POST /api/chat/topics/{id}/clear    drop messages and pending action
//! DELETE /api/chat/topics/{id}        delete
//! ```
//!
//! Every topic route checks ownership; a foreign topic is a 403.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use kasir_core::validation::validate_message_content;
use kasir_core::{ChatMessage, ChatTopic, MAX_TOPIC_MESSAGES};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::tool;
use crate::auth::CurrentUser;
use crate::chat::ChatReply;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/topics", get(list_topics).post(create_topic))
        .route("/topics/{id}", get(show_topic).delete(delete_topic))
        .route("/topics/{id}/messages", post(send_message))
        .route("/topics/{id}/clear", post(clear_topic))
        .merge(tool::router())
}

#[derive(Debug, Default, Deserialize)]
struct CreateTopic {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendMessage {
    content: String,
}

#[derive(Debug, Serialize)]
pub struct TopicWithMessages {
    pub topic: ChatTopic,
    pub messages: Vec<ChatMessage>,
}

async fn list_topics(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<ChatTopic>>> {
    Ok(Json(state.db.chats().list_or_create_topics(&user.id).await?))
}

async fn create_topic(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    body: Option<Json<CreateTopic>>,
) -> ApiResult<(StatusCode, Json<ChatTopic>)> {
    let input = body.map(|Json(b)| b).unwrap_or_default();
    let topic = state
        .db
        .chats()
        .create_topic(&user.id, input.title.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(topic)))
}

async fn show_topic(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<TopicWithMessages>> {
    let topic = state.db.chats().owned_topic(&user.id, &id).await?;
    let messages = state
        .db
        .chats()
        .recent_messages(&topic.id, MAX_TOPIC_MESSAGES)
        .await?;
    Ok(Json(TopicWithMessages { topic, messages }))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<SendMessage>,
) -> ApiResult<Json<ChatReply>> {
    validate_message_content(&input.content)?;
    let topic = state.db.chats().owned_topic(&user.id, &id).await?;

    debug!(topic_id = %topic.id, user_id = %user.id, "Chat message received");
    let reply = state
        .orchestrator()
        .send_message(&user, &topic, &input.content)
        .await
        .map_err(|e| ApiError::from_db(e, "Failed to send message."))?;
    Ok(Json(reply))
}

async fn clear_topic(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.db.chats().clear_topic(&user.id, &id).await?;
    Ok(Json(json!({ "message": "Chat cleared." })))
}

async fn delete_topic(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.db.chats().delete_topic(&user.id, &id).await?;
    Ok(Json(json!({ "message": "Chat deleted." })))
}
