//! # kasir-server
//!
//! JSON API of Kasir POS and the inventory chatbot.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Kasir Server                                    │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  products      │  │  cart / pos    │  │  chat                      ││
//! │  │  stock         │  │                │  │                            ││
//! │  │  users         │  │ • add / update │  │ • topics                   ││
//! │  │  (managers)    │  │ • checkout     │  │ • send message ──► orch.   ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐                                │
//! │  │  reports       │  │  chat tool     │   X-User-Id ──► CurrentUser   │
//! │  │ (never fail)   │  │ (whitelisted)  │                                │
//! │  └────────────────┘  └────────────────┘                                │
//! │                                                                         │
//! │          kasir-db (SQLite)           Generative Language API           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (all optional):
//! - `KASIR_BIND_ADDR` - Listen address (default: 0.0.0.0:8080)
//! - `KASIR_DATABASE_PATH` - SQLite file (default: ./kasir.db)
//! - `KASIR_DB_MAX_CONNECTIONS` - Pool size (default: 5)
//! - `CHATBOT_DB_TOOL_ENABLED` / `CHATBOT_DB_TOOL_ROW_LIMIT` /
//!   `CHATBOT_DB_TOOL_ALLOW_FULL_EXPORT`
//! - `CHATBOT_HISTORY_LIMIT` - Messages sent as history (default: 10)
//! - `GEMINI_API_KEY` - Model API key; the model is disabled without it
//! - `GEMINI_MODEL` / `GEMINI_API_BASE` / `GEMINI_TIMEOUT_SECS`

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod generative;
pub mod routes;

use std::sync::Arc;

use kasir_db::Database;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use routes::build_router;

use crate::chat::ChatOrchestrator;
use crate::generative::GenerativeModel;

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
    /// `None` when no API key is configured.
    pub model: Option<Arc<dyn GenerativeModel>>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig, model: Option<Arc<dyn GenerativeModel>>) -> Self {
        AppState { db, config, model }
    }

    /// Chat pipeline over this state's database and model.
    pub fn orchestrator(&self) -> ChatOrchestrator {
        ChatOrchestrator::new(
            self.db.clone(),
            self.model.clone(),
            self.config.history_limit,
        )
    }
}
