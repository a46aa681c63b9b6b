//! # Error Types
//!
//! Domain-specific error types for kasir-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kasir-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kasir-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Server errors (in app)                                                │
//! │  └── ApiError         - What the HTTP client sees (serialized)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. Each one maps to a
/// user-facing message and never leaves partial state behind.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found (or was soft-deleted).
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock to complete a checkout or a stock decrease.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (Pocari Sweat x5)
    ///      │
    ///      ▼
    /// Lock + read stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Pocari Sweat", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Client shows: "Not enough stock for Pocari Sweat."
    /// ```
    #[error("Not enough stock for {name}.")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// A manual stock decrease would take stock below zero.
    #[error("Insufficient stock.")]
    StockUnderflow { current: i64 },

    /// Checkout was requested for an empty cart.
    #[error("Cart is empty.")]
    EmptyCart,

    /// A line or total does not fit in minor units.
    #[error("Amount too large.")]
    AmountOverflow,

    /// The acting user may not perform this operation on the target.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any write happens.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message_names_product() {
        let err = CoreError::InsufficientStock {
            name: "Pocari Sweat".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(err.to_string(), "Not enough stock for Pocari Sweat.");
    }

    #[test]
    fn test_stock_underflow_message() {
        let err = CoreError::StockUnderflow { current: 4 };
        assert_eq!(err.to_string(), "Insufficient stock.");
    }

    #[test]
    fn test_empty_cart_message() {
        assert_eq!(CoreError::EmptyCart.to_string(), "Cart is empty.");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "sku".to_string(),
        };
        assert_eq!(err.to_string(), "sku is required");

        let err = ValidationError::TooShort {
            field: "password".to_string(),
            min: 6,
        };
        assert_eq!(err.to_string(), "password must be at least 6 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
