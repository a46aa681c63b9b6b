//! # Database Handle
//!
//! Opens the SQLite pool, applies the embedded schema and hands out
//! repositories.
//!
//! ```text
//! DbConfig { path, max_connections, busy_timeout }
//!      │
//!      ▼
//! Database::new ── connect (WAL, foreign keys, busy timeout)
//!      │        └─ MIGRATOR.run   migrations/sqlite/NNN_*.sql
//!      ▼
//! db.products()  db.stock()  db.carts()  db.transactions()  db.users()
//! db.chats()     db.reports()  db.stock_analysis()  db.db_tool()
//! ```
//!
//! Writers serialize through `BEGIN IMMEDIATE`; a second checkout waits up
//! to `busy_timeout` for the lock instead of failing with `SQLITE_BUSY`.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::info;

use crate::db_tool::DbToolService;
use crate::error::{DbError, DbResult};
use crate::reporting::ReportingQueries;
use crate::repository::cart::CartRepository;
use crate::repository::chat::ChatRepository;
use crate::repository::product::ProductRepository;
use crate::repository::stock::StockRepository;
use crate::repository::transaction::TransactionRepository;
use crate::repository::user::UserRepository;
use crate::stock_analysis::StockAnalysis;

/// Schema files, embedded at compile time and applied in filename order.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the database lives and how many connections may use it.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    /// How long a writer waits for another writer's lock.
    pub busy_timeout: Duration,
}

impl DbConfig {
    /// File database at `path`, created when missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(30),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Private in-memory database for tests. One connection, so every
    /// query sees the same schema.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY),
            max_connections: 1,
            busy_timeout: Duration::from_secs(5),
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        Ok(options.foreign_keys(true).busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Pool handle. Clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects and brings the schema up to date.
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready to use
    /// * `Err(DbError::ConnectionFailed)` - File could not be opened
    /// * `Err(DbError::MigrationFailed)` - Schema could not be applied
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            // The in-memory database lives only as long as its connection.
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(config.busy_timeout)
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        MIGRATOR.run(&pool).await?;

        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            migrations = MIGRATOR.migrations.len(),
            "Database ready"
        );
        Ok(Database { pool })
    }

    /// Raw pool for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Stock ledger and manual adjustments.
    pub fn stock(&self) -> StockRepository {
        StockRepository::new(self.pool.clone())
    }

    pub fn carts(&self) -> CartRepository {
        CartRepository::new(self.pool.clone())
    }

    /// Checkout engine and receipts.
    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    /// Chat topics, messages and pending actions.
    pub fn chats(&self) -> ChatRepository {
        ChatRepository::new(self.pool.clone())
    }

    pub fn reports(&self) -> ReportingQueries {
        ReportingQueries::new(self.pool.clone())
    }

    pub fn stock_analysis(&self) -> StockAnalysis {
        StockAnalysis::new(self.pool.clone())
    }

    /// Read-only product search and whitelisted queries.
    pub fn db_tool(&self) -> DbToolService {
        DbToolService::new(self.pool.clone())
    }

    /// `true` while the pool answers queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Closes every connection. Later queries fail.
    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
