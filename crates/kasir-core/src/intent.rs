//! # Intent Parser
//!
//! Classifies free-text chat input and extracts structured parameters.
//!
//! ## Pipeline Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "restock produk pocari stok 24"                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐   pending action?   ┌───────────────────────────┐ │
//! │  │ reply predicates│ ──────────────────► │ is_confirmation / reject  │ │
//! │  │                 │                     │ cancel / numeric select   │ │
//! │  └────────┬────────┘                     └───────────────────────────┘ │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                    │
//! │  │ action intents  │  add product, restock  ──► extract_* helpers      │
//! │  └────────┬────────┘                                                    │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                    │
//! │  │ classify_query  │  QUERY_PRIORITY, first match wins                 │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Matching is keyword based (Indonesian and English) and never fails:
//! unrecognised input yields `None` or a default value.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::ProductDraft;

// =============================================================================
// Pattern Tables
// =============================================================================

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).expect("intent pattern must compile"))
        .collect()
}

fn any_match(patterns: &[Regex], input: &str) -> bool {
    let normalized = input.to_lowercase();
    patterns.iter().any(|re| re.is_match(&normalized))
}

static ADD_PRODUCT: Lazy<Vec<Regex>> =
    Lazy::new(|| compile(&[r"tambah.*produk", r"add.*product", r"create.*product"]));

static RESTOCK: Lazy<Vec<Regex>> =
    Lazy::new(|| compile(&[r"(restok|restock).*produk", r"(restock|update|increase).*stock"]));

static LOW_STOCK: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(stok|stock)\s+(rendah|low)",
        r"(produk|barang).*stok.*rendah",
        r"stok.*di bawah",
        r"perlu.*restock",
    ])
});

static SALES: Lazy<Vec<Regex>> =
    Lazy::new(|| compile(&[r"(penjualan|sales|terjual|omset|revenue)"]));

static BEST_SELLER: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"best\s+seller",
        r"(terlaris|paling laku|best selling)",
        r"produk.*populer",
    ])
});

static TRANSACTIONS: Lazy<Vec<Regex>> =
    Lazy::new(|| compile(&[r"(transaksi|riwayat|history|histori)", r"lihat.*transaksi"]));

static CASHIER_PERFORMANCE: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(kasir|cashier).*performa",
        r"performa.*(kasir|cashier)",
        r"(top|terbaik).*kasir",
    ])
});

static STOCK_ANALYSIS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"analisis.*stok",
        r"status.*stok",
        r"(stok|stock).*bagaimana",
    ])
});

static NAME_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:nama|name)\s+").expect("name label pattern"));
static NEXT_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:harga|price|stok|stock|deskripsi|description)")
        .expect("next label pattern")
});
static PRICE_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:harga|price)\s+([0-9]+)").expect("price pattern"));
static STOCK_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:stok|stock)\s+([0-9]+)").expect("stock pattern"));
static DESCRIPTION_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:deskripsi|description)\s+(.+)$").expect("description pattern"));
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("digits pattern"));
static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["']([^"']+)["']"#).expect("quoted pattern"));
static QUERY_NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"stok\s+(rendah|lowbagaimana)",
        r"status.*stok\s+",
        r"bagaimana.*stok\s+",
    ])
});

const CONFIRM_WORDS: &[&str] = &["ya", "iya", "yes", "y"];
const REJECT_WORDS: &[&str] = &["tidak", "no", "n"];
const CANCEL_WORDS: &[&str] = &["batal", "cancel", "stop"];
const RESTOCK_PHRASES: &[&str] = &[
    "restok produk",
    "restock product",
    "update stock",
    "increase stock",
];

// =============================================================================
// Reply Predicates
// =============================================================================

fn normalized_word(input: &str) -> String {
    input.trim().to_lowercase()
}

/// True for "ya", "iya", "yes", "y" (case-insensitive, trimmed).
///
/// ## Example
/// ```rust
/// use kasir_core::intent::is_confirmation;
///
/// assert!(is_confirmation(" YES "));
/// assert!(!is_confirmation("yes please"));
/// ```
pub fn is_confirmation(input: &str) -> bool {
    CONFIRM_WORDS.contains(&normalized_word(input).as_str())
}

/// True for "tidak", "no", "n".
pub fn is_rejection(input: &str) -> bool {
    REJECT_WORDS.contains(&normalized_word(input).as_str())
}

/// True for "batal", "cancel", "stop".
pub fn is_cancellation(input: &str) -> bool {
    CANCEL_WORDS.contains(&normalized_word(input).as_str())
}

/// True when the trimmed input is made of ASCII digits only.
pub fn is_numeric_selection(input: &str) -> bool {
    let trimmed = input.trim();
    !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit())
}

/// Converts a 1-based numeric selection to a 0-based index.
///
/// Returns `None` when the input is not a numeric selection or is `"0"`.
/// Callers check [`is_numeric_selection`] first.
pub fn selection_index(input: &str) -> Option<usize> {
    if !is_numeric_selection(input) {
        return None;
    }
    input.trim().parse::<usize>().ok()?.checked_sub(1)
}

// =============================================================================
// Action Intents
// =============================================================================

/// "tambah produk ...", "add product ...", "create product ...".
pub fn is_add_product(input: &str) -> bool {
    any_match(&ADD_PRODUCT, input)
}

/// "restok produk ...", "restock ... stock", "update stock ...".
pub fn is_restock(input: &str) -> bool {
    any_match(&RESTOCK, input)
}

/// Extracts labelled product fields from an add-product message.
///
/// Expected shape: `tambah produk nama <name> harga <price> stok <stock>
/// deskripsi <desc>`. Any label may be missing; missing fields keep their
/// defaults.
///
/// ## Example
/// ```rust
/// use kasir_core::intent::extract_product_draft;
///
/// let draft = extract_product_draft("tambah produk nama Kopi Susu harga 5000 stok 10");
/// assert_eq!(draft.name.as_deref(), Some("Kopi Susu"));
/// assert_eq!(draft.price, 5000);
/// assert_eq!(draft.current_stock, 10);
/// ```
pub fn extract_product_draft(input: &str) -> ProductDraft {
    ProductDraft {
        name: extract_labelled_name(input),
        price: capture_number(&PRICE_FIELD, input).unwrap_or(0),
        current_stock: capture_number(&STOCK_FIELD, input).unwrap_or(0),
        description: DESCRIPTION_FIELD
            .captures(input)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
    }
}

/// Name value runs from the `nama`/`name` label up to the next label or the
/// end of the input, and may contain only letters, digits and spaces.
fn extract_labelled_name(input: &str) -> Option<String> {
    let label = NAME_LABEL.find(input)?;
    let rest = &input[label.end()..];
    let value = match NEXT_LABEL.find(rest) {
        Some(next) => &rest[..next.start()],
        None => rest,
    };
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ') {
        return None;
    }
    Some(value.to_string())
}

fn capture_number(re: &Regex, input: &str) -> Option<i64> {
    re.captures(input)?.get(1)?.as_str().parse().ok()
}

/// Extracts the amount from "... stok 24".
pub fn extract_restock_amount(input: &str) -> Option<i64> {
    capture_number(&STOCK_FIELD, input)
}

/// Product name of a restock request: the lowercased input with digits and
/// restock phrases removed.
///
/// ## Example
/// ```rust
/// use kasir_core::intent::extract_restock_product_name;
///
/// assert_eq!(extract_restock_product_name("Restok produk Pocari Sweat"), "pocari sweat");
/// ```
pub fn extract_restock_product_name(input: &str) -> String {
    let lowered = input.to_lowercase();
    let mut name = DIGITS.replace_all(&lowered, "").into_owned();
    for phrase in RESTOCK_PHRASES {
        name = name.replace(phrase, "");
    }
    name.trim().to_string()
}

// =============================================================================
// Reporting Queries
// =============================================================================

/// Reporting question categories answered deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum QueryIntent {
    LowStock,
    BestSeller,
    CashierPerformance,
    StockAnalysis,
    Sales,
    TransactionHistory,
}

/// Order in which query intents are tested. Earlier entries win when a
/// message matches several categories ("produk terlaris penjualan" is a
/// best-seller question, not a sales total).
pub const QUERY_PRIORITY: [QueryIntent; 6] = [
    QueryIntent::LowStock,
    QueryIntent::BestSeller,
    QueryIntent::CashierPerformance,
    QueryIntent::StockAnalysis,
    QueryIntent::Sales,
    QueryIntent::TransactionHistory,
];

impl QueryIntent {
    /// Tests this single category against the input.
    pub fn matches(&self, input: &str) -> bool {
        let patterns: &[Regex] = match self {
            QueryIntent::LowStock => &LOW_STOCK,
            QueryIntent::BestSeller => &BEST_SELLER,
            QueryIntent::CashierPerformance => &CASHIER_PERFORMANCE,
            QueryIntent::StockAnalysis => &STOCK_ANALYSIS,
            QueryIntent::Sales => &SALES,
            QueryIntent::TransactionHistory => &TRANSACTIONS,
        };
        any_match(patterns, input)
    }
}

/// Returns the first category of [`QUERY_PRIORITY`] matching the input.
pub fn classify_query(input: &str) -> Option<QueryIntent> {
    QUERY_PRIORITY.into_iter().find(|intent| intent.matches(input))
}

/// Date window mentioned in a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum DateParam {
    Today,
    Yesterday,
    Week,
    Month,
}

/// Detects "hari ini"/"today", "kemarin"/"yesterday", "minggu"/"week",
/// "bulan"/"month", checked in that order.
pub fn extract_date_param(input: &str) -> Option<DateParam> {
    let normalized = input.to_lowercase();
    if normalized.contains("hari ini") || normalized.contains("today") {
        Some(DateParam::Today)
    } else if normalized.contains("kemarin") || normalized.contains("yesterday") {
        Some(DateParam::Yesterday)
    } else if normalized.contains("minggu") || normalized.contains("week") {
        Some(DateParam::Week)
    } else if normalized.contains("bulan") || normalized.contains("month") {
        Some(DateParam::Month)
    } else {
        None
    }
}

/// Best-effort product name from a question: quoted text first, otherwise
/// the input with the analysis phrases removed.
pub fn extract_product_name_from_query(input: &str) -> Option<String> {
    if let Some(quoted) = QUOTED.captures(input).and_then(|c| c.get(1)) {
        let name = quoted.as_str().trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }

    let mut cleaned = input.to_string();
    for re in QUERY_NOISE.iter() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
