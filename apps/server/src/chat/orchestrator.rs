//! # Chat Orchestrator
//!
//! Turns one user message into one assistant reply.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  user message ──► persisted                                             │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  1. pending action on topic?  ── answer ──► flows::answer_pending      │
//! │  2. add-product intent        ────────────► flows::start_add_product   │
//! │  3. restock intent            ────────────► flows::start_restock       │
//! │  4. reporting intent          ────────────► reports::answer_query      │
//! │  5. product search            ── stock/price question ──► product list │
//! │        │ (rows kept as prompt context)                                  │
//! │        ▼                                                                │
//! │  6. generative model, three attempts with shrinking history            │
//! │  7. static fallback text                                                │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  assistant message (text fallback of the payload) ──► persisted        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only persisting the user message can fail the request. Everything after
//! that resolves to some reply; internal failures become an error payload.

use std::sync::Arc;

use kasir_core::intent::{classify_query, is_add_product, is_restock};
use kasir_core::response::{ProductListItem, ResponsePayload};
use kasir_core::{ChatMessage, ChatRole, ChatTopic, Money, User, MAX_TOPIC_MESSAGES};
use kasir_db::db_tool::{format_product_lines, DEFAULT_LIMIT};
use kasir_db::{Database, DbResult, ProductRow};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::prompt::{build_prompt, history_window};
use super::{flows, reports};
use crate::generative::{GenerationConfig, GenerativeModel};

/// Reply used when the model is unavailable or every attempt failed.
pub const FALLBACK_REPLY: &str =
    "Maaf, asisten sedang tidak dapat merespons saat ini. Silakan coba lagi nanti.";

/// Number of model attempts per message.
pub const MODEL_ATTEMPTS: u32 = 3;

static STOCK_PRICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(stok|stock|harga|price)\b").expect("invalid stock/price regex")
});

/// Which stage produced the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    PendingAction,
    AddProduct,
    Restock,
    Report,
    DbTool,
    Model,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyDebug {
    pub source: ReplySource,
    /// Model calls made for this message.
    pub attempts: u32,
    /// Product rows found by the search stage.
    pub db_rows: usize,
}

/// Result of [`ChatOrchestrator::send_message`].
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub user_message: ChatMessage,
    pub assistant_message: ChatMessage,
    pub payload: ResponsePayload,
    pub debug: ReplyDebug,
}

struct Answer {
    payload: ResponsePayload,
    debug: ReplyDebug,
}

impl Answer {
    fn new(payload: ResponsePayload, source: ReplySource) -> Self {
        Answer {
            payload,
            debug: ReplyDebug {
                source,
                attempts: 0,
                db_rows: 0,
            },
        }
    }
}

/// One model attempt: history window, temperature, output token cap.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Attempt {
    window: usize,
    config: GenerationConfig,
}

fn attempt_ladder(history_limit: usize) -> [Attempt; MODEL_ATTEMPTS as usize] {
    let attempt = |window, temperature, max_output_tokens| Attempt {
        window,
        config: GenerationConfig {
            temperature,
            max_output_tokens,
        },
    };
    [
        attempt(history_limit, 0.7, 1024),
        attempt(history_limit / 2, 0.4, 2048),
        attempt(0, 0.2, 512),
    ]
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Chat pipeline bound to a database and an optional model.
#[derive(Clone)]
pub struct ChatOrchestrator {
    db: Database,
    model: Option<Arc<dyn GenerativeModel>>,
    history_limit: i64,
}

impl ChatOrchestrator {
    /// `history_limit` is clamped to what a topic ever returns.
    pub fn new(db: Database, model: Option<Arc<dyn GenerativeModel>>, history_limit: i64) -> Self {
        ChatOrchestrator {
            db,
            model,
            history_limit: history_limit.clamp(0, MAX_TOPIC_MESSAGES),
        }
    }

    /// Stores `content` in `topic`, answers it and stores the answer.
    ///
    /// ## Returns
    /// * `Ok(ChatReply)` - Both messages and the structured reply
    /// * `Err(DbError)` - The message was invalid or could not be stored
    pub async fn send_message(
        &self,
        user: &User,
        topic: &ChatTopic,
        content: &str,
    ) -> DbResult<ChatReply> {
        let user_message = self
            .db
            .chats()
            .append_message(&topic.id, Some(&user.id), ChatRole::User, content)
            .await?;

        let answer = match self.answer(user, topic, &user_message).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, topic_id = %topic.id, "Chat pipeline failed");
                Answer::new(
                    ResponsePayload::error(
                        "Terjadi kesalahan saat memproses pesan.",
                        "internal_error",
                    ),
                    ReplySource::Fallback,
                )
            }
        };

        let assistant_message = self
            .db
            .chats()
            .append_message(
                &topic.id,
                None,
                ChatRole::Assistant,
                &answer.payload.to_text_fallback(),
            )
            .await?;

        info!(
            topic_id = %topic.id,
            source = ?answer.debug.source,
            attempts = answer.debug.attempts,
            db_rows = answer.debug.db_rows,
            "Chat reply sent"
        );

        Ok(ChatReply {
            user_message,
            assistant_message,
            payload: answer.payload,
            debug: answer.debug,
        })
    }

    async fn answer(
        &self,
        user: &User,
        topic: &ChatTopic,
        message: &ChatMessage,
    ) -> DbResult<Answer> {
        let content = message.content.as_str();

        if let Some(action) = topic.pending_action() {
            match flows::answer_pending(&self.db, user, &topic.id, action, content).await? {
                Some(payload) => return Ok(Answer::new(payload, ReplySource::PendingAction)),
                None => {
                    debug!(topic_id = %topic.id, "Message does not answer pending action");
                    self.db.chats().clear_pending(&topic.id).await?;
                }
            }
        }

        if is_add_product(content) {
            let payload = flows::start_add_product(&self.db, user, &topic.id, content).await?;
            return Ok(Answer::new(payload, ReplySource::AddProduct));
        }

        if is_restock(content) {
            let payload = flows::start_restock(&self.db, user, &topic.id, content).await?;
            return Ok(Answer::new(payload, ReplySource::Restock));
        }

        if let Some(intent) = classify_query(content) {
            let payload = reports::answer_query(&self.db, intent, content).await;
            return Ok(Answer::new(payload, ReplySource::Report));
        }

        let rows = match self.db.db_tool().search_products(content, DEFAULT_LIMIT).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "Product search failed, continuing without context");
                Vec::new()
            }
        };

        if !rows.is_empty() && STOCK_PRICE.is_match(content) {
            let mut answer = Answer::new(product_list(&rows), ReplySource::DbTool);
            answer.debug.db_rows = rows.len();
            return Ok(answer);
        }

        Ok(self.ask_model(topic, message, &rows).await)
    }

    async fn ask_model(&self, topic: &ChatTopic, message: &ChatMessage, rows: &[ProductRow]) -> Answer {
        let mut answer = Answer::new(ResponsePayload::text(FALLBACK_REPLY), ReplySource::Fallback);
        answer.debug.db_rows = rows.len();

        let Some(model) = &self.model else {
            debug!("Generative model disabled, using fallback reply");
            return answer;
        };

        let history: Vec<ChatMessage> = match self
            .db
            .chats()
            .recent_messages(&topic.id, self.history_limit.saturating_add(1))
            .await
        {
            Ok(messages) => messages.into_iter().filter(|m| m.id != message.id).collect(),
            Err(e) => {
                warn!(error = %e, "Failed to load chat history");
                Vec::new()
            }
        };

        let product_lines = format_product_lines(rows);
        for (index, attempt) in attempt_ladder(self.history_limit as usize).iter().enumerate() {
            answer.debug.attempts = index as u32 + 1;
            let prompt = build_prompt(
                &product_lines,
                &message.content,
                history_window(&history, attempt.window),
            );

            match model.generate(&prompt, attempt.config).await {
                Ok(text) => {
                    answer.payload = ResponsePayload::text(text);
                    answer.debug.source = ReplySource::Model;
                    return answer;
                }
                Err(e) => warn!(
                    attempt = index + 1,
                    window = attempt.window,
                    error = %e,
                    "Generative model attempt failed"
                ),
            }
        }

        error!(topic_id = %topic.id, "All model attempts failed, using fallback reply");
        answer
    }
}

fn product_list(rows: &[ProductRow]) -> ResponsePayload {
    let items = rows
        .iter()
        .map(|row| {
            ProductListItem::new(
                Some(row.id.clone()),
                &row.name,
                row.current_stock,
                Money::parse_decimal(&row.price).unwrap_or_else(Money::zero),
                row.description.clone().unwrap_or_default(),
            )
        })
        .collect();
    ResponsePayload::product_list(items, "Hasil Pencarian Produk")
}

// =============================================================================
// Unit Tests
// =============================================================================
