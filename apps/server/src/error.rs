//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Kasir POS                              │
//! │                                                                         │
//! │  Handler: Result<Json<T>, ApiError>                                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  CoreError (business rule) ──► ApiError { code, message, description } │
//! │  DbError::NotFound          ──► 404 NOT_FOUND                           │
//! │  DbError::UniqueViolation   ──► 409 CONFLICT                            │
//! │  DbError storage failure    ──► logged, 500 with a generic message      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  { "code": "INSUFFICIENT_STOCK", "message": "Not enough stock for X." } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage errors never leak SQL text to the client. Handlers that own a
//! user-visible failure message ("Checkout failed.") pass it through
//! [`ApiError::from_db`]; everything else uses the plain `From` conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kasir_core::{CoreError, ValidationError};
use kasir_db::DbError;
use serde::Serialize;
use tracing::error;

/// Generic message for storage failures without a more specific one.
pub const DATABASE_FAILURE: &str = "Database operation failed";

/// API error returned from handlers.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock.",
///   "description": "Current stock: 4"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Optional secondary line shown under the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (422)
    ValidationError,

    /// Malformed request (400)
    BadRequest,

    /// Missing or unknown acting user (401)
    Unauthorized,

    /// Acting user may not touch the target (403)
    Forbidden,

    /// Duplicate or still-referenced record (409)
    Conflict,

    /// Cart operation failed (422)
    CartError,

    /// Insufficient stock (422)
    InsufficientStock,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    /// HTTP status of the code.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError
            | ErrorCode::CartError
            | ErrorCode::InsufficientStock => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            description: None,
        }
    }

    /// Adds a description line.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Converts a database error, replacing storage failures with
    /// `failure_message`. Business-rule and lookup errors keep their own
    /// messages.
    pub fn from_db(err: DbError, failure_message: &str) -> Self {
        if err.is_storage_failure() {
            error!(error = %err, "{}", failure_message);
            return ApiError::new(ErrorCode::DatabaseError, failure_message);
        }
        ApiError::from(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::Conflict, "Record is still referenced")
            }
            DbError::Business(core) => ApiError::from(core),
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::MigrationFailed(e) | DbError::QueryFailed(e) | DbError::Internal(e) => {
                // Log the actual error but return a generic message
                error!("Database operation failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, DATABASE_FAILURE)
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            err @ CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CoreError::StockUnderflow { current } => {
                ApiError::new(ErrorCode::InsufficientStock, "Insufficient stock.")
                    .with_description(format!("Current stock: {}", current))
            }
            CoreError::EmptyCart => ApiError::new(ErrorCode::CartError, "Cart is empty."),
            CoreError::AmountOverflow => {
                ApiError::new(ErrorCode::ValidationError, "Amount too large.")
            }
            CoreError::Forbidden(message) => ApiError::forbidden(message),
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
