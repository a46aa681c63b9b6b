//! # Domain Types
//!
//! Core domain types used throughout Kasir POS.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  Transaction    │   │   ChatTopic     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku            │   │  user_id        │   │  user_id        │       │
//! │  │  price_cents    │   │  total_cents    │   │  pending action │       │
//! │  │  current_stock  │   │  ├─ details[]   │   │  ├─ messages[]  │       │
//! │  └────────┬────────┘   └─────────────────┘   └─────────────────┘       │
//! │           │                                                             │
//! │  ┌────────┴────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  StockHistory   │   │    CartItem     │   │      User       │       │
//! │  │  (append-only)  │   │ (user, product) │   │  role: enum     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Cart items and transaction details copy the product price at the time
//! they are written. Later price edits never change historical totals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Users
// =============================================================================

/// Role of a back-office user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "kebab-case"))]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum UserRole {
    /// Full access, including managing admins.
    SuperAdmin,
    /// Store manager. May manage cashiers but not other admins.
    Admin,
    /// Runs the POS terminal.
    Cashier,
}

impl UserRole {
    /// Returns true when a user with this role may delete a user with
    /// `target` role. Self-deletion is checked separately.
    pub fn can_delete(&self, target: UserRole) -> bool {
        match self {
            UserRole::SuperAdmin => true,
            UserRole::Admin => target == UserRole::Cashier,
            UserRole::Cashier => false,
        }
    }

    /// Returns true for roles that manage products, stock and users.
    pub fn is_manager(&self) -> bool {
        matches!(self, UserRole::SuperAdmin | UserRole::Admin)
    }

    /// Database / wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super-admin",
            UserRole::Admin => "admin",
            UserRole::Cashier => "cashier",
        }
    }
}

/// A back-office user. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: UserRole,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub password: String,
    pub role: UserRole,
}

/// Input for updating a user. `password` is optional; when absent the
/// existing hash is kept.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct UserUpdate {
    pub name: String,
    pub username: String,
    pub password: Option<String>,
    pub role: UserRole,
}

// =============================================================================
// Products
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to cashier and in chat replies.
    pub name: String,

    /// Stock Keeping Unit (e.g. "BEV-PS-005").
    pub sku: String,

    /// Price in minor units.
    pub price_cents: i64,

    /// Current stock level. `None` means the column was never set and the
    /// stock ledger is the only source of truth.
    pub current_stock: Option<i64>,

    /// Units sold through checkout. Never decreases.
    pub total_sold: i64,

    pub description: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker.
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Stock level with an unset column treated as zero.
    #[inline]
    pub fn stock(&self) -> i64 {
        self.current_stock.unwrap_or(0)
    }

    /// Checks whether `quantity` units can be taken from stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock() >= quantity
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    pub price_cents: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub current_stock: i64,
}

/// Input for updating a product's catalog fields. Stock is changed only
/// through stock adjustments and checkout.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub name: String,
    pub sku: String,
    pub price_cents: i64,
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Stock History
// =============================================================================

/// Direction of a stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum StockChangeType {
    Increase,
    Decrease,
}

impl StockChangeType {
    /// Applies the change to a stock level (quantity is always positive).
    pub fn signed(&self, quantity: i64) -> i64 {
        match self {
            StockChangeType::Increase => quantity,
            StockChangeType::Decrease => -quantity,
        }
    }
}

/// One entry of the append-only stock ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockHistory {
    pub id: String,
    pub product_id: String,
    /// Who performed the change.
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    pub change_type: StockChangeType,
    /// Always positive; direction is in `change_type`.
    pub quantity: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for a manual stock adjustment.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct StockAdjustment {
    pub product_id: String,
    #[serde(rename = "type")]
    pub change_type: StockChangeType,
    pub quantity: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// Cart
// =============================================================================

/// A cart row. One row per (user, product); quantity is updated in place.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartItem {
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Price snapshot taken when the item was (last) added.
    pub price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A cart row joined with its product for display.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartLine {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub price_cents: i64,
    pub line_total_cents: i64,
}

/// The whole cart of a user with its exact total.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total_cents: i64,
}

impl CartView {
    /// Builds the view, summing line totals exactly.
    pub fn new(items: Vec<CartLine>) -> CoreResult<Self> {
        let total = Money::checked_sum(items.iter().map(|l| Money::from_cents(l.line_total_cents)))
            .ok_or(CoreError::AmountOverflow)?;
        Ok(CartView {
            items,
            total_cents: total.cents(),
        })
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// Status written for every checkout.
pub const TRANSACTION_STATUS_COMPLETED: &str = "completed";

/// A completed checkout. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    /// Cashier who performed the checkout.
    pub user_id: String,
    /// Exact sum of the detail totals, computed once at creation.
    pub total_cents: i64,
    pub status: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A line item of a transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionDetail {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price snapshot.
    pub price_cents: i64,
    /// price × quantity.
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A transaction together with its line items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Receipt {
    pub transaction: Transaction,
    pub details: Vec<TransactionDetail>,
}

/// One requested checkout line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price to record for this line.
    pub price: Money,
}

impl CheckoutLine {
    /// price × quantity, `None` when it does not fit.
    #[inline]
    pub fn total(&self) -> Option<Money> {
        self.price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Chat
// =============================================================================

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ChatRole {
    User,
    Assistant,
}

/// A conversation thread owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ChatTopic {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[ts(as = "Option<String>")]
    pub last_message_at: Option<DateTime<Utc>>,
    /// Name of the pending multi-step action, if any.
    pub confirmation_action: Option<String>,
    /// JSON payload of the pending action.
    pub confirmation_payload: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ChatTopic {
    /// Decodes the pending multi-step action stored on the topic.
    pub fn pending_action(&self) -> Option<PendingAction> {
        let action = self.confirmation_action.as_deref()?;
        let payload = self.confirmation_payload.as_deref().unwrap_or("null");
        PendingAction::from_parts(action, payload)
    }
}

/// A single message in a topic. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ChatMessage {
    pub id: String,
    pub chat_topic_id: String,
    /// `None` for assistant messages.
    pub user_id: Option<String>,
    pub role: ChatRole,
    pub content: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Pending chat actions
// =============================================================================

/// Product fields extracted from a chat message such as
/// `"tambah produk nama Kopi Susu harga 5000 stok 10"`.
///
/// Missing fields keep their defaults (`None`, `0`, `""`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductDraft {
    pub name: Option<String>,
    /// Whole Rupiah.
    pub price: i64,
    pub current_stock: i64,
    pub description: String,
}

/// A product offered to the user in a numbered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductChoice {
    pub product_id: String,
    pub name: String,
}

/// A multi-step chat flow waiting for the user's answer.
///
/// Persisted on the topic as `confirmation_action` (the name) and
/// `confirmation_payload` (the JSON body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    /// Waiting for yes/no before creating a product.
    AddProduct(ProductDraft),
    /// Waiting for yes/no before adding stock to a product.
    Restock {
        product_id: String,
        product_name: String,
        amount: i64,
    },
    /// Waiting for the user to pick one of several matching products.
    RestockSelect {
        candidates: Vec<ProductChoice>,
        amount: i64,
    },
}

#[derive(Serialize, Deserialize)]
struct RestockPayload {
    product_id: String,
    product_name: String,
    amount: i64,
}

#[derive(Serialize, Deserialize)]
struct RestockSelectPayload {
    candidates: Vec<ProductChoice>,
    amount: i64,
}

impl PendingAction {
    pub const ADD_PRODUCT: &'static str = "add_product";
    pub const RESTOCK: &'static str = "restock";
    pub const RESTOCK_SELECT: &'static str = "restock_select";

    /// Action name stored in `confirmation_action`.
    pub fn name(&self) -> &'static str {
        match self {
            PendingAction::AddProduct(_) => Self::ADD_PRODUCT,
            PendingAction::Restock { .. } => Self::RESTOCK,
            PendingAction::RestockSelect { .. } => Self::RESTOCK_SELECT,
        }
    }

    /// JSON stored in `confirmation_payload`.
    pub fn payload_json(&self) -> serde_json::Result<String> {
        match self {
            PendingAction::AddProduct(draft) => serde_json::to_string(draft),
            PendingAction::Restock {
                product_id,
                product_name,
                amount,
            } => serde_json::to_string(&RestockPayload {
                product_id: product_id.clone(),
                product_name: product_name.clone(),
                amount: *amount,
            }),
            PendingAction::RestockSelect { candidates, amount } => {
                serde_json::to_string(&RestockSelectPayload {
                    candidates: candidates.clone(),
                    amount: *amount,
                })
            }
        }
    }

    /// Rebuilds an action from its stored parts. Unknown names or
    /// malformed payloads yield `None` (the pending state is then ignored).
    pub fn from_parts(action: &str, payload: &str) -> Option<Self> {
        match action {
            Self::ADD_PRODUCT => serde_json::from_str(payload)
                .ok()
                .map(PendingAction::AddProduct),
            Self::RESTOCK => serde_json::from_str::<RestockPayload>(payload).ok().map(|p| {
                PendingAction::Restock {
                    product_id: p.product_id,
                    product_name: p.product_name,
                    amount: p.amount,
                }
            }),
            Self::RESTOCK_SELECT => serde_json::from_str::<RestockSelectPayload>(payload)
                .ok()
                .map(|p| PendingAction::RestockSelect {
                    candidates: p.candidates,
                    amount: p.amount,
                }),
            _ => None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
