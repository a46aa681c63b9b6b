//! # DB Tool Service
//!
//! Read-only product search for chat messages and the whitelisted intent
//! runner behind `POST /api/chat/tool`.
//!
//! ## Layered Search
//! ```text
//! "berapa stok pocari sweat?"
//!      │
//!      ▼
//! normalize → "berapa stok pocari sweat"
//!      │  no stock/price/product keyword → []
//!      ▼
//! terms (≥2 chars): [berapa, stok, pocari, sweat]
//!      │
//!      ├─ 1. any term in name | sku | description     (OR)
//!      ├─ 2. every term in name                       (AND, >1 term)
//!      └─ 3. keywords removed, "%pocari%sweat%"        (wildcard, ≥3 chars)
//!      │
//!      ▼
//! rows: id, name, sku, current_stock (ledger when unset), price
//! ```
//!
//! Every layer binds its patterns as parameters. Normalization removes
//! `%` and `_` so user text never widens a pattern.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::EFFECTIVE_STOCK_SQL;
use kasir_core::Money;

/// Columns of `products` the tool may expose.
pub const PRODUCT_COLUMNS: [&str; 6] = ["id", "name", "sku", "current_stock", "price", "description"];

/// Columns of `transactions` the tool may expose.
pub const TRANSACTION_COLUMNS: [&str; 5] = ["id", "user_id", "total", "status", "created_at"];

/// Default number of rows for searches and intents.
pub const DEFAULT_LIMIT: i64 = 10;

/// Default hard cap on rows any tool call returns.
pub const DEFAULT_ROW_LIMIT: i64 = 50;

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\p{L}]+").expect("invalid non-word regex"));

static INVENTORY_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(stok|stock|produk|product|tersedia|available|harga|price)\b")
        .expect("invalid inventory keyword regex")
});

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("invalid whitespace regex"));

// =============================================================================
// Rows & Intents
// =============================================================================

/// A product as exposed to the chat prompt and the tool endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub sku: String,
    /// Column value, or the ledger balance when the column is unset.
    pub current_stock: i64,
    /// Decimal price, e.g. `"8000.00"`.
    pub price: String,
    pub description: Option<String>,
}

/// A transaction as exposed to the tool endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRow {
    pub id: String,
    pub user_id: String,
    /// Decimal total, e.g. `"16000.00"`.
    pub total: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// One row returned by [`DbToolService::run_intent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ToolRow {
    Product(ProductRow),
    Transaction(TransactionRow),
}

/// The fixed set of intents the tool endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolIntent {
    ProductLookup,
    StockLookup,
    TransactionsRecent,
}

impl ToolIntent {
    /// Parses an intent name (trimmed, case-insensitive). Anything outside
    /// the fixed set is `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "product_lookup" => Some(ToolIntent::ProductLookup),
            "stock_lookup" => Some(ToolIntent::StockLookup),
            "transactions_recent" => Some(ToolIntent::TransactionsRecent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolIntent::ProductLookup => "product_lookup",
            ToolIntent::StockLookup => "stock_lookup",
            ToolIntent::TransactionsRecent => "transactions_recent",
        }
    }
}

/// Parameters of a tool call. `q` and `query` are synonyms.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl ToolParams {
    fn search_text(&self) -> &str {
        self.q
            .as_deref()
            .or(self.query.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SearchRow {
    id: String,
    name: String,
    sku: String,
    current_stock: i64,
    price_cents: i64,
    description: Option<String>,
}

impl From<SearchRow> for ProductRow {
    fn from(row: SearchRow) -> Self {
        ProductRow {
            id: row.id,
            name: row.name,
            sku: row.sku,
            current_stock: row.current_stock,
            price: Money::from_cents(row.price_cents).to_decimal_string(),
            description: row.description,
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Read-only queries for the chat assistant.
#[derive(Debug, Clone)]
pub struct DbToolService {
    pool: SqlitePool,
    row_limit: i64,
    allow_full_export: bool,
}

impl DbToolService {
    /// Creates a service with the default row cap.
    pub fn new(pool: SqlitePool) -> Self {
        DbToolService {
            pool,
            row_limit: DEFAULT_ROW_LIMIT,
            allow_full_export: false,
        }
    }

    /// Sets the row cap. With `allow_full_export` the cap is not applied.
    pub fn with_limits(mut self, row_limit: i64, allow_full_export: bool) -> Self {
        self.row_limit = row_limit.max(1);
        self.allow_full_export = allow_full_export;
        self
    }

    fn clamp(&self, limit: i64) -> i64 {
        let limit = limit.max(1);
        if self.allow_full_export {
            limit
        } else {
            limit.min(self.row_limit)
        }
    }

    /// Finds products mentioned in free text.
    ///
    /// Returns nothing unless the text asks about stock, price or products.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let rows = db.db_tool().search_products("berapa stok pocari sweat", 10).await?;
    /// assert_eq!(rows[0].sku, "BEV-PS-005");
    /// ```
    pub async fn search_products(&self, content: &str, limit: i64) -> DbResult<Vec<ProductRow>> {
        let limit = self.clamp(limit);
        let normalized = normalize(content);
        if normalized.is_empty() || !INVENTORY_KEYWORD.is_match(&normalized) {
            return Ok(Vec::new());
        }

        let terms: Vec<&str> = normalized
            .split_whitespace()
            .filter(|t| t.chars().count() >= 2)
            .collect();
        debug!(normalized = %normalized, terms = ?terms, "Searching products");

        let mut found = self.search_any_term(&terms, limit).await?;

        if found.is_empty() && terms.len() > 1 {
            debug!(terms = ?terms, "Trying all-terms name match");
            found = self.search_all_terms(&terms, limit).await?;
        }

        if found.is_empty() {
            let fallback = INVENTORY_KEYWORD.replace_all(&normalized, "");
            let fallback = WHITESPACE.replace_all(fallback.trim(), " ").to_string();
            if fallback.chars().count() >= 3 {
                debug!(fallback = %fallback, "Trying wildcard phrase match");
                found = self.search_phrase(&fallback, limit).await?;
            }
        }

        if !found.is_empty() {
            debug!(count = found.len(), "Products found");
        }
        Ok(found.into_iter().map(ProductRow::from).collect())
    }

    /// Runs one whitelisted intent.
    pub async fn run_intent(&self, intent: ToolIntent, params: &ToolParams) -> DbResult<Vec<ToolRow>> {
        let limit = self.clamp(params.limit.unwrap_or(DEFAULT_LIMIT));

        let rows = match intent {
            ToolIntent::ProductLookup | ToolIntent::StockLookup => self
                .search_products(params.search_text(), limit)
                .await?
                .into_iter()
                .map(ToolRow::Product)
                .collect(),
            ToolIntent::TransactionsRecent => self
                .recent_transactions(limit)
                .await?
                .into_iter()
                .map(ToolRow::Transaction)
                .collect(),
        };

        Ok(rows)
    }

    async fn search_any_term(&self, terms: &[&str], limit: i64) -> DbResult<Vec<SearchRow>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let clause = (1..=terms.len())
            .map(|i| {
                format!(
                    "LOWER(p.name) LIKE ?{i} OR LOWER(p.sku) LIKE ?{i} \
                     OR LOWER(COALESCE(p.description, '')) LIKE ?{i}"
                )
            })
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = search_sql(&clause, terms.len() + 1);

        let mut query = sqlx::query_as::<_, SearchRow>(&sql);
        for term in terms {
            query = query.bind(format!("%{}%", term));
        }
        Ok(query.bind(limit).fetch_all(&self.pool).await?)
    }

    async fn search_all_terms(&self, terms: &[&str], limit: i64) -> DbResult<Vec<SearchRow>> {
        let clause = (1..=terms.len())
            .map(|i| format!("LOWER(p.name) LIKE ?{i}"))
            .collect::<Vec<_>>()
            .join(" AND ");
        let sql = search_sql(&clause, terms.len() + 1);

        let mut query = sqlx::query_as::<_, SearchRow>(&sql);
        for term in terms {
            query = query.bind(format!("%{}%", term));
        }
        Ok(query.bind(limit).fetch_all(&self.pool).await?)
    }

    async fn search_phrase(&self, phrase: &str, limit: i64) -> DbResult<Vec<SearchRow>> {
        let wild = format!("%{}%", phrase.replace(' ', "%"));
        let sql = search_sql(
            "p.name LIKE ?1 OR COALESCE(p.description, '') LIKE ?1 OR p.sku LIKE ?2",
            3,
        );

        let rows = sqlx::query_as::<_, SearchRow>(&sql)
            .bind(wild)
            .bind(format!("%{}%", phrase))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn recent_transactions(&self, limit: i64) -> DbResult<Vec<TransactionRow>> {
        let rows: Vec<(String, String, i64, String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT id, user_id, total_cents, status, created_at
            FROM transactions
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, user_id, total_cents, status, created_at)| TransactionRow {
                id,
                user_id,
                total: Money::from_cents(total_cents).to_decimal_string(),
                status,
                created_at,
            })
            .collect())
    }
}

fn search_sql(clause: &str, limit_param: usize) -> String {
    format!(
        "SELECT p.id, p.name, p.sku, {EFFECTIVE_STOCK_SQL} AS current_stock, \
             p.price_cents, p.description \
         FROM products p \
         WHERE p.deleted_at IS NULL AND ({clause}) \
         ORDER BY p.name \
         LIMIT ?{limit_param}"
    )
}

/// Lowercases and replaces every run of non-alphanumeric characters with a
/// single space.
pub fn normalize(content: &str) -> String {
    let lowered = content.to_lowercase();
    NON_WORD.replace_all(&lowered, " ").trim().to_string()
}

/// Renders product rows as prompt lines, e.g.
/// `"Product: Pocari Sweat (SKU: BEV-PS-005), Stock: 60, Price: 8000.00"`.
pub fn format_product_lines(rows: &[ProductRow]) -> Vec<String> {
    rows.iter()
        .map(|p| {
            let mut line = format!("Product: {}", p.name);
            if !p.sku.is_empty() {
                line.push_str(&format!(" (SKU: {})", p.sku));
            }
            line.push_str(&format!(", Stock: {}, Price: {}", p.current_stock, p.price));
            line
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use kasir_core::{NewProduct, NewUser, UserRole};

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (name, sku, rupiah, stock, description) in [
            ("Teh Botol Sosro", "BEV-TB-001", 5_000, 150, "Teh manis dalam botol"),
            ("Aqua 600ml", "BEV-AQ-002", 3_500, 200, "Air mineral"),
            ("Kopi Kapal Api", "BEV-KK-003", 1_500, 80, "Kopi bubuk sachet"),
            ("Pocari Sweat", "BEV-PS-005", 8_000, 60, "Minuman isotonik 350ml"),
        ] {
            db.products()
                .create(
                    &NewProduct {
                        name: name.into(),
                        sku: sku.into(),
                        price_cents: rupiah * 100,
                        description: Some(description.into()),
                        current_stock: stock,
                    },
                    None,
                )
                .await
                .unwrap();
        }
        db
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Berapa STOK pocari-sweat??"), "berapa stok pocari sweat");
        assert_eq!(normalize("50%_off"), "50 off");
    }

    #[test]
    fn test_intent_whitelist() {
        assert_eq!(ToolIntent::parse(" Product_Lookup "), Some(ToolIntent::ProductLookup));
        assert_eq!(ToolIntent::parse("stock_lookup"), Some(ToolIntent::StockLookup));
        assert_eq!(ToolIntent::parse("transactions_recent"), Some(ToolIntent::TransactionsRecent));
        assert_eq!(ToolIntent::parse("users_dump"), None);
        assert_eq!(ToolIntent::parse(""), None);
    }

    #[tokio::test]
    async fn test_search_pocari_by_stock_question() {
        let db = seeded().await;
        let rows = db
            .db_tool()
            .search_products("berapa stok pocari sweat", 10)
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Pocari Sweat");
        assert_eq!(rows[0].sku, "BEV-PS-005");
        assert_eq!(rows[0].current_stock, 60);
        assert_eq!(rows[0].price, "8000.00");
    }

    #[tokio::test]
    async fn test_search_requires_inventory_keyword() {
        let db = seeded().await;
        let rows = db.db_tool().search_products("pocari sweat", 10).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_search_by_sku_and_ledger_fallback() {
        let db = seeded().await;
        sqlx::query("UPDATE products SET current_stock = NULL WHERE sku = 'BEV-KK-003'")
            .execute(db.pool())
            .await
            .unwrap();

        let rows = db.db_tool().search_products("stok kk", 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Kopi Kapal Api");
        assert_eq!(rows[0].current_stock, 80);
    }

    #[tokio::test]
    async fn test_row_limit_is_enforced() {
        let db = seeded().await;
        let tool = db.db_tool().with_limits(2, false);
        let rows = tool
            .run_intent(
                ToolIntent::ProductLookup,
                &ToolParams {
                    q: Some("harga bev".into()),
                    query: None,
                    limit: Some(100),
                },
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let rows = db
            .db_tool()
            .with_limits(2, true)
            .run_intent(
                ToolIntent::StockLookup,
                &ToolParams {
                    q: None,
                    query: Some("harga bev".into()),
                    limit: Some(100),
                },
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 4);
    }

    #[tokio::test]
    async fn test_recent_transactions_expose_whitelisted_columns() {
        let db = seeded().await;
        let user = db
            .users()
            .create(&NewUser {
                name: "Kasir".into(),
                username: "kasir1".into(),
                password: "secret1".into(),
                role: UserRole::Cashier,
            })
            .await
            .unwrap();
        let teh = db.products().find_by_name("teh botol sosro", 1).await.unwrap();
        db.transactions()
            .checkout_single(&user.id, &teh[0].id, 2)
            .await
            .unwrap();

        let rows = db
            .db_tool()
            .run_intent(ToolIntent::TransactionsRecent, &ToolParams::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        let json = serde_json::to_value(&rows[0]).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        let mut expected: Vec<_> = TRANSACTION_COLUMNS.iter().map(|c| c.to_string()).collect();
        expected.sort();
        assert_eq!(keys, expected);
        assert_eq!(json["total"], "10000.00");
    }

    #[test]
    fn test_format_product_lines() {
        let lines = format_product_lines(&[ProductRow {
            id: "p1".into(),
            name: "Pocari Sweat".into(),
            sku: "BEV-PS-005".into(),
            current_stock: 60,
            price: "8000.00".into(),
            description: None,
        }]);
        assert_eq!(
            lines,
            vec!["Product: Pocari Sweat (SKU: BEV-PS-005), Stock: 60, Price: 8000.00"]
        );
    }
}
