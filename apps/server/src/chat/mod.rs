//! Inventory chatbot: intent routing, multi-step flows, reporting answers
//! and the generative-model fallback chain.

pub mod flows;
pub mod orchestrator;
pub mod prompt;
pub mod reports;

pub use orchestrator::{ChatOrchestrator, ChatReply, ReplyDebug, ReplySource};
