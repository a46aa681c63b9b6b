//! # Money Module
//!
//! Provides the `Money` type for handling Rupiah amounts exactly.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A checkout total is a sum of (price × quantity) lines. Summing        │
//! │  floats drifts; summing integer minor units never does.                │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (1 Rupiah = 100 sen)                │
//! │    Rp3.500,50 is stored as 350050                                       │
//! │    Transaction.total == Σ detail.total, exactly, always                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kasir_core::money::Money;
//!
//! let price = Money::from_rupiah(3_500).unwrap();
//! let line = price.multiply_quantity(2).unwrap();
//! assert_eq!(line.to_string(), "Rp7.000");
//! assert_eq!(line.to_decimal_string(), "7000.00");
//! ```
//!
//! Everything built from user input goes through the checked constructors
//! and operations; they return `None` instead of wrapping.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Minor units per Rupiah.
const MINOR_PER_MAJOR: i64 = 100;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in minor units (sen, 1/100 Rupiah).
///
/// ## Design Decisions
/// - **i64 (signed)**: Leaves room for corrections and negative deltas
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serialized as the raw integer**: The API exchanges `*_cents` fields
///
/// ## Where Money is Used
/// ```text
/// Product.price_cents ──► CartItem.price_cents (snapshot) ──► line total
///                                                                │
///           Transaction.total_cents ◄── Σ TransactionDetail.total_cents
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use kasir_core::money::Money;
    ///
    /// let price = Money::from_cents(800_000);
    /// assert_eq!(price.rupiah(), 8_000);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole Rupiah.
    ///
    /// Chat input ("harga 5000") and most shelf prices are whole Rupiah.
    /// `None` when the amount does not fit in minor units.
    #[inline]
    pub const fn from_rupiah(rupiah: i64) -> Option<Self> {
        match rupiah.checked_mul(MINOR_PER_MAJOR) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-Rupiah part (truncated toward zero).
    #[inline]
    pub const fn rupiah(&self) -> i64 {
        self.0 / MINOR_PER_MAJOR
    }

    /// Returns the value rounded half-up to whole Rupiah.
    ///
    /// ## Example
    /// ```rust
    /// use kasir_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(349_950).rounded_rupiah(), 3_500);
    /// assert_eq!(Money::from_cents(349_949).rounded_rupiah(), 3_499);
    /// ```
    pub const fn rounded_rupiah(&self) -> i64 {
        let half = MINOR_PER_MAJOR / 2;
        if self.0 >= 0 {
            self.0.saturating_add(half) / MINOR_PER_MAJOR
        } else {
            self.0.saturating_sub(half) / MINOR_PER_MAJOR
        }
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity, `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use kasir_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(250_000);
    /// assert_eq!(unit_price.multiply_quantity(3), Some(Money::from_cents(750_000)));
    /// assert_eq!(Money::from_cents(i64::MAX / 2).multiply_quantity(3), None);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Exact total of `amounts`, `None` when it does not fit.
    pub fn checked_sum<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |total, amount| total.checked_add(amount))
    }

    /// Renders the amount as a plain decimal string with two fraction
    /// digits (`"8000.00"`), the shape of a DECIMAL column.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_major = MINOR_PER_MAJOR as u64;
        format!("{}{}.{:02}", sign, abs / per_major, abs % per_major)
    }

    /// Parses a decimal string such as `"8000"`, `"8000.5"` or `"8000.50"`.
    ///
    /// Returns `None` for anything with more than two fraction digits or
    /// non-digit characters.
    pub fn parse_decimal(input: &str) -> Option<Self> {
        let input = input.trim();
        let (negative, digits) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input),
        };
        let (major, minor) = match digits.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (digits, ""),
        };
        if major.is_empty()
            || minor.len() > 2
            || !major.chars().all(|c| c.is_ascii_digit())
            || !minor.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        let major: i64 = major.parse().ok()?;
        let minor: i64 = match minor.len() {
            0 => 0,
            1 => minor.parse::<i64>().ok()? * 10,
            _ => minor.parse().ok()?,
        };
        let cents = major.checked_mul(MINOR_PER_MAJOR)?.checked_add(minor)?;
        Some(Money(if negative { -cents } else { cents }))
    }
}

/// Groups digits of a non-negative integer with `.` separators.
///
/// ## Example
/// ```rust
/// use kasir_core::money::group_thousands;
///
/// assert_eq!(group_thousands(1_234_567), "1.234.567");
/// assert_eq!(group_thousands(999), "999");
/// ```
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows Rupiah the way receipts and chat replies do: `Rp8.000`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rp{}", group_thousands(self.rounded_rupiah()))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
