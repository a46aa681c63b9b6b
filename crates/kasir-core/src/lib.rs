//! # kasir-core: Pure Business Logic for Kasir POS
//!
//! This crate is the **heart** of Kasir POS. It contains the business logic
//! that does not need a database or a network: money math, domain types,
//! validation, chat intent detection, response shapes and stock-status math.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasir POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web Front End                                │   │
//! │  │    POS Terminal ──► Cart ──► Checkout     Chatbot panel         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/server (axum)                           │   │
//! │  │    routes, chat orchestrator, generative client                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kasir-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  intent   │  │ response  │  │   │
//! │  │   │  Product  │  │   Money   │  │  parser   │  │  shapes   │  │   │
//! │  │   │  ChatMsg  │  │  Rp fmt   │  │ priority  │  │ fallback  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐                                 │   │
//! │  │   │   stock   │  │ validation│                                 │   │
//! │  │   │  status   │  │   rules   │                                 │   │
//! │  │   └───────────┘  └───────────┘                                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kasir-db (Database Layer)                    │   │
//! │  │        SQLite queries, migrations, checkout, reports            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Transaction, ChatMessage, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`intent`] - Chat intent detection and parameter extraction
//! - [`response`] - Structured chatbot response shapes and text fallback
//! - [`stock`] - Days-of-stock, status thresholds, trend math
//! - [`report`] - Reporting / stock-analysis records and their chat text
//!
//! ## Example Usage
//!
//! ```rust
//! use kasir_core::money::Money;
//!
//! let price = Money::from_rupiah(8_000).unwrap();
//! let line = price.multiply_quantity(3).unwrap();
//! assert_eq!(line.to_string(), "Rp24.000");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod intent;
pub mod money;
pub mod report;
pub mod response;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single cart line or stock adjustment.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 10000 instead of 100).
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Highest accepted price, in minor units (Rp1.000.000.000).
///
/// A full line (`MAX_PRICE_CENTS × MAX_ITEM_QUANTITY`) stays far inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 100_000_000_000;

/// Highest stock level a product may reach.
pub const MAX_STOCK_LEVEL: i64 = 1_000_000_000;

/// Default title for a freshly created chat topic.
pub const DEFAULT_TOPIC_TITLE: &str = "New Chat";

/// Maximum number of messages returned when a topic is opened.
pub const MAX_TOPIC_MESSAGES: i64 = 200;
