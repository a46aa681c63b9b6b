//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. Variable names are matched case-insensitively.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `KASIR_BIND_ADDR` | `0.0.0.0:8080` |
//! | `KASIR_DATABASE_PATH` | `./kasir.db` |
//! | `KASIR_DB_MAX_CONNECTIONS` | `5` |
//! | `CHATBOT_DB_TOOL_ENABLED` | `true` |
//! | `CHATBOT_DB_TOOL_ROW_LIMIT` | `50` |
//! | `CHATBOT_DB_TOOL_ALLOW_FULL_EXPORT` | `false` |
//! | `CHATBOT_HISTORY_LIMIT` | `10` |
//! | `GEMINI_API_KEY` | unset |
//! | `GEMINI_MODEL` | `gemini-1.5-flash` |
//! | `GEMINI_API_BASE` | `https://generativelanguage.googleapis.com/v1beta` |
//! | `GEMINI_TIMEOUT_SECS` | `30` |

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment};
use kasir_core::MAX_TOPIC_MESSAGES;
use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen address
    pub bind_addr: SocketAddr,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub db_max_connections: u32,

    /// Whitelisted DB tool settings
    pub db_tool: DbToolConfig,

    /// Generative-language API settings
    pub gemini: GeminiConfig,

    /// Max prior messages included in a prompt
    pub history_limit: i64,
}

/// Settings of the whitelisted DB tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbToolConfig {
    pub enabled: bool,
    /// Hard cap on rows any tool call returns.
    pub row_limit: i64,
    /// When false, requested limits are clamped to `row_limit`.
    pub allow_full_export: bool,
}

/// Settings of the outbound generative-language client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// `None` disables the external model; the fallback reply is stored.
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
}

/// Raw environment values, one field per variable.
#[derive(Debug, Deserialize)]
struct RawConfig {
    kasir_bind_addr: String,
    kasir_database_path: String,
    kasir_db_max_connections: u32,
    chatbot_db_tool_enabled: bool,
    chatbot_db_tool_row_limit: i64,
    chatbot_db_tool_allow_full_export: bool,
    chatbot_history_limit: i64,
    gemini_api_key: Option<String>,
    gemini_model: String,
    gemini_api_base: String,
    gemini_timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env_source(None)
    }

    /// Load configuration from an explicit variable map instead of the
    /// process environment.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_env_source(Some(vars))
    }

    fn from_env_source(source: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let raw: RawConfig = Config::builder()
            .set_default("kasir_bind_addr", "0.0.0.0:8080")?
            .set_default("kasir_database_path", "./kasir.db")?
            .set_default("kasir_db_max_connections", 5)?
            .set_default("chatbot_db_tool_enabled", true)?
            .set_default("chatbot_db_tool_row_limit", 50)?
            .set_default("chatbot_db_tool_allow_full_export", false)?
            .set_default("chatbot_history_limit", 10)?
            .set_default("gemini_model", "gemini-1.5-flash")?
            .set_default(
                "gemini_api_base",
                "https://generativelanguage.googleapis.com/v1beta",
            )?
            .set_default("gemini_timeout_secs", 30)?
            .add_source(Environment::default().try_parsing(true).source(source))
            .build()?
            .try_deserialize()?;

        let bind_addr = raw
            .kasir_bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidValue("KASIR_BIND_ADDR".to_string()))?;

        if raw.kasir_db_max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "KASIR_DB_MAX_CONNECTIONS".to_string(),
            ));
        }
        if raw.chatbot_db_tool_row_limit < 1 {
            return Err(ConfigError::InvalidValue(
                "CHATBOT_DB_TOOL_ROW_LIMIT".to_string(),
            ));
        }

        Ok(AppConfig {
            bind_addr,
            database_path: PathBuf::from(raw.kasir_database_path),
            db_max_connections: raw.kasir_db_max_connections,
            db_tool: DbToolConfig {
                enabled: raw.chatbot_db_tool_enabled,
                row_limit: raw.chatbot_db_tool_row_limit,
                allow_full_export: raw.chatbot_db_tool_allow_full_export,
            },
            gemini: GeminiConfig {
                api_key: raw
                    .gemini_api_key
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty()),
                model: raw.gemini_model,
                api_base: raw.gemini_api_base.trim_end_matches('/').to_string(),
                timeout: Duration::from_secs(raw.gemini_timeout_secs),
            },
            history_limit: raw.chatbot_history_limit.clamp(0, MAX_TOPIC_MESSAGES),
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Failed to read configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_vars(HashMap::new()).unwrap();
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.database_path, PathBuf::from("./kasir.db"));
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(
            config.db_tool,
            DbToolConfig {
                enabled: true,
                row_limit: 50,
                allow_full_export: false,
            }
        );
        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert_eq!(config.gemini.timeout, Duration::from_secs(30));
        assert_eq!(config.history_limit, 10);
    }

    #[test]
    fn test_environment_overrides() {
        let config = AppConfig::from_vars(vars(&[
            ("KASIR_BIND_ADDR", "127.0.0.1:9000"),
            ("CHATBOT_DB_TOOL_ENABLED", "false"),
            ("CHATBOT_DB_TOOL_ROW_LIMIT", "20"),
            ("GEMINI_API_KEY", "abc123"),
            ("GEMINI_API_BASE", "http://localhost:1234/"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert!(!config.db_tool.enabled);
        assert_eq!(config.db_tool.row_limit, 20);
        assert_eq!(config.gemini.api_key.as_deref(), Some("abc123"));
        assert_eq!(config.gemini.api_base, "http://localhost:1234");
    }

    #[test]
    fn test_blank_api_key_disables_model() {
        let config = AppConfig::from_vars(vars(&[("GEMINI_API_KEY", "  ")])).unwrap();
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn test_invalid_bind_addr() {
        let err = AppConfig::from_vars(vars(&[("KASIR_BIND_ADDR", "not-an-address")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v) if v == "KASIR_BIND_ADDR"));
    }

    #[test]
    fn test_invalid_row_limit() {
        let err = AppConfig::from_vars(vars(&[("CHATBOT_DB_TOOL_ROW_LIMIT", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_history_limit_is_clamped() {
        let config = AppConfig::from_vars(vars(&[(
            "CHATBOT_HISTORY_LIMIT",
            "9223372036854775807",
        )]))
        .unwrap();
        assert_eq!(config.history_limit, MAX_TOPIC_MESSAGES);

        let config = AppConfig::from_vars(vars(&[("CHATBOT_HISTORY_LIMIT", "-3")])).unwrap();
        assert_eq!(config.history_limit, 0);
    }
}
