//! # Kasir Server
//!
//! HTTP API of Kasir POS with the inventory chatbot.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Initialize logging (tracing, RUST_LOG)                              │
//! │  2. Load configuration from the environment                             │
//! │  3. Open SQLite pool, run migrations                                    │
//! │  4. Build generative client (skipped without GEMINI_API_KEY)            │
//! │  5. Serve until Ctrl+C / SIGTERM                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::Context;
use kasir_db::{Database, DbConfig};
use kasir_server::generative::{GeminiClient, GenerativeModel};
use kasir_server::{build_router, AppConfig, AppState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    info!("Starting Kasir server...");

    let config = AppConfig::load().context("Failed to load configuration")?;
    info!(
        addr = %config.bind_addr,
        database = %config.database_path.display(),
        db_tool_enabled = config.db_tool.enabled,
        "Configuration loaded"
    );

    let db = Database::new(
        DbConfig::new(config.database_path.clone()).max_connections(config.db_max_connections),
    )
    .await
    .context("Failed to open database")?;
    info!("Database ready");

    let model: Option<Arc<dyn GenerativeModel>> = match GeminiClient::from_config(&config.gemini)
        .context("Failed to build generative client")?
    {
        Some(client) => {
            info!(model = %config.gemini.model, "Generative model enabled");
            Some(Arc::new(client))
        }
        None => {
            warn!("GEMINI_API_KEY not set, chatbot will use fallback replies");
            None
        }
    };

    let addr = config.bind_addr;
    let state = Arc::new(AppState::new(db.clone(), config, model));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kasir=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
