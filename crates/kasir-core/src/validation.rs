//! # Validation Module
//!
//! Input validation utilities for Kasir POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (serde)                                         │
//! │  └── Shape validation (deserialization)                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Business rule validation, before any write                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE (username, cart user+product)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kasir_core::validation::{validate_sku, validate_quantity};
//!
//! assert!(validate_sku("BEV-PS-005").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{NewProduct, NewUser, ProductUpdate, UserUpdate};
use crate::{MAX_ITEM_QUANTITY, MAX_PRICE_CENTS, MAX_STOCK_LEVEL};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Minimum password length for user accounts.
pub const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use kasir_core::validation::validate_sku;
///
/// assert!(validate_sku("BEV-PS-005").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (product or user).
///
/// ## Rules
/// - Must not be empty
/// - At most 255 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 255 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 255,
        });
    }

    Ok(())
}

/// Validates a login username: 3 to 50 characters, no whitespace.
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }
    if username.len() < 3 {
        return Err(ValidationError::TooShort {
            field: "username".to_string(),
            min: 3,
        });
    }
    if username.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: 50,
        });
    }
    if username.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must not contain spaces".to_string(),
        });
    }

    Ok(())
}

/// Validates a plain-text password before hashing.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// Validates a chat message body.
pub fn validate_message_content(content: &str) -> ValidationResult<()> {
    if content.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "content".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value (cart line, checkout, stock adjustment).
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in minor units. Zero is allowed (free items).
///
/// ## Rules
/// - 0 ..= MAX_PRICE_CENTS, so price × MAX_ITEM_QUANTITY never overflows
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a stock level (zero allowed).
pub fn validate_initial_stock(stock: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK_LEVEL).contains(&stock) {
        return Err(ValidationError::OutOfRange {
            field: "current_stock".to_string(),
            min: 0,
            max: MAX_STOCK_LEVEL,
        });
    }
    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates all fields of a new product.
pub fn validate_new_product(input: &NewProduct) -> ValidationResult<()> {
    validate_name("name", &input.name)?;
    validate_sku(&input.sku)?;
    validate_price_cents(input.price_cents)?;
    validate_initial_stock(input.current_stock)
}

/// Validates a product update.
pub fn validate_product_update(input: &ProductUpdate) -> ValidationResult<()> {
    validate_name("name", &input.name)?;
    validate_sku(&input.sku)?;
    validate_price_cents(input.price_cents)
}

/// Validates a new user.
pub fn validate_new_user(input: &NewUser) -> ValidationResult<()> {
    validate_name("name", &input.name)?;
    validate_username(&input.username)?;
    validate_password(&input.password)
}

/// Validates a user update. The password is only checked when provided.
pub fn validate_user_update(input: &UserUpdate) -> ValidationResult<()> {
    validate_name("name", &input.name)?;
    validate_username(&input.username)?;
    match input.password.as_deref() {
        Some(pw) if !pw.is_empty() => validate_password(pw),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserRole;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("BEV-PS-005").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Pocari Sweat").is_ok());
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(800_000).is_ok());
        assert!(validate_price_cents(-100).is_err());
        assert!(validate_price_cents(MAX_PRICE_CENTS).is_ok());
        assert!(validate_price_cents(MAX_PRICE_CENTS + 1).is_err());
        assert!(validate_price_cents(i64::MAX / 2).is_err());
    }

    #[test]
    fn test_max_line_fits() {
        assert!(MAX_PRICE_CENTS.checked_mul(MAX_ITEM_QUANTITY).is_some());
        assert!(validate_initial_stock(MAX_STOCK_LEVEL).is_ok());
        assert!(validate_initial_stock(MAX_STOCK_LEVEL + 1).is_err());
    }

    #[test]
    fn test_validate_username_and_password() {
        assert!(validate_username("superadmin").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());

        assert!(validate_password("password").is_ok());
        assert!(validate_password("123").is_err());
    }

    #[test]
    fn test_user_update_password_optional() {
        let update = UserUpdate {
            name: "Kasir Satu".into(),
            username: "kasir1".into(),
            password: None,
            role: UserRole::Cashier,
        };
        assert!(validate_user_update(&update).is_ok());

        let update = UserUpdate {
            password: Some("123".into()),
            ..update
        };
        assert!(validate_user_update(&update).is_err());
    }

    #[test]
    fn test_validate_new_product_rejects_negative_stock() {
        let input = NewProduct {
            name: "Teh Botol Sosro".into(),
            sku: "BEV-TB-001".into(),
            price_cents: 500_000,
            description: None,
            current_stock: -1,
        };
        assert!(validate_new_product(&input).is_err());
    }
}
