//! # kasir-db: Database Layer for Kasir POS
//!
//! This crate provides database access for Kasir POS.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasir POS Data Flow                              │
//! │                                                                         │
//! │  HTTP handler / chat orchestrator                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kasir-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ products      │    │  (embedded)  │  │   │
//! │  │   │               │    │ stock, carts  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ transactions  │    │ 001_init.sql │  │   │
//! │  │   │               │    │ users, chats  │    │ 002_chat.sql │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  reporting    │    │stock_analysis │    │   db_tool    │  │   │
//! │  │   │ (never fails) │    │ (never fails) │    │ (read-only)  │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (kasir.db)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, embedded migrations, repository accessors
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`reporting`] - Sales / product aggregate queries
//! - [`stock_analysis`] - Days-of-stock, trends, reorder prediction
//! - [`db_tool`] - Layered product search and whitelisted intents
//! - [`password`] - Argon2 password hashing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kasir_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./kasir.db")).await?;
//! let receipt = db.transactions().checkout_cart(&user_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod db_tool;
pub mod error;
pub mod password;
pub mod pool;
pub mod reporting;
pub mod repository;
pub mod stock_analysis;

// =============================================================================
// Re-exports
// =============================================================================

pub use db_tool::{DbToolService, ProductRow, ToolIntent, ToolParams, ToolRow};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use reporting::ReportingQueries;
pub use stock_analysis::StockAnalysis;

// Repository re-exports for convenience
pub use repository::cart::CartRepository;
pub use repository::chat::ChatRepository;
pub use repository::product::ProductRepository;
pub use repository::stock::StockRepository;
pub use repository::transaction::TransactionRepository;
pub use repository::user::UserRepository;
