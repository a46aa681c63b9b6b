//! # Response Shapes
//!
//! Structured chatbot replies and their plain-text fallback.
//!
//! Every assistant reply is one [`ResponsePayload`] variant. Rich clients
//! render the JSON (tagged by `"type"`); everything else gets
//! [`ResponsePayload::to_text_fallback`], which is also what is stored as the
//! assistant message content.
//!
//! ```text
//! ReportingQueries ──► ResponsePayload::table(..)         ──► JSON payload
//!                                      │
//!                                      └──► to_text_fallback() ──► ChatMessage.content
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::money::{group_thousands, Money};
use crate::stock::product_status_label;

pub const ICON_SUCCESS: &str = "✅";
pub const ICON_FAILURE: &str = "❌";

/// A table column: `key` into each row, `label` for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    pub key: String,
    pub label: String,
}

impl TableColumn {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        TableColumn {
            key: key.into(),
            label: label.into(),
        }
    }

    /// Column derived from a row key: `quantity_sold` → `Quantity sold`.
    pub fn from_key(key: &str) -> Self {
        TableColumn::new(key, ucfirst(&key.replace('_', " ")))
    }
}

/// One labelled value of a confirmation, summary or operation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detail {
    pub key: String,
    pub value: String,
}

impl Detail {
    pub fn new(key: impl Into<String>, value: impl ToString) -> Self {
        Detail {
            key: key.into(),
            value: value.to_string(),
        }
    }
}

/// A button offered by an actionable reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    pub label: String,
    pub action: String,
}

/// Product row of a product list reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductListItem {
    pub id: Option<String>,
    pub name: String,
    pub stock: i64,
    pub price_cents: i64,
    pub description: String,
    pub status_label: String,
}

impl ProductListItem {
    /// Builds an item, deriving the status label from the stock level.
    pub fn new(
        id: Option<String>,
        name: impl Into<String>,
        stock: i64,
        price: Money,
        description: impl Into<String>,
    ) -> Self {
        ProductListItem {
            id,
            name: name.into(),
            stock,
            price_cents: price.cents(),
            description: description.into(),
            status_label: product_status_label(stock).to_string(),
        }
    }
}

// =============================================================================
// Payload
// =============================================================================

/// Structured assistant reply. Serialized with a `"type"` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    Table {
        title: String,
        columns: Vec<TableColumn>,
        data: Vec<Map<String, Value>>,
        row_count: usize,
    },
    ProductList {
        title: String,
        items: Vec<ProductListItem>,
        count: usize,
    },
    Confirmation {
        title: String,
        message: String,
        details: Vec<Detail>,
        actions: Vec<String>,
        requires_response: bool,
    },
    Actionable {
        title: String,
        message: String,
        actions: Vec<ActionButton>,
    },
    OperationResult {
        success: bool,
        message: String,
        operation_type: String,
        details: Vec<Detail>,
        icon: String,
    },
    Summary {
        title: String,
        metrics: Vec<Detail>,
    },
    Error {
        message: String,
        error_code: String,
        icon: String,
    },
    Text {
        content: String,
    },
}

impl ResponsePayload {
    /// Table reply. When `columns` is empty they are derived from the keys
    /// of the first row.
    pub fn table(
        data: Vec<Map<String, Value>>,
        columns: Vec<TableColumn>,
        title: impl Into<String>,
    ) -> Self {
        let columns = if columns.is_empty() {
            data.first()
                .map(|row| row.keys().map(|k| TableColumn::from_key(k)).collect())
                .unwrap_or_default()
        } else {
            columns
        };
        ResponsePayload::Table {
            title: title.into(),
            row_count: data.len(),
            columns,
            data,
        }
    }

    /// Product list reply; an empty title becomes "Daftar Produk".
    pub fn product_list(items: Vec<ProductListItem>, title: impl Into<String>) -> Self {
        let title = non_empty_or(title.into(), "Daftar Produk");
        ResponsePayload::ProductList {
            title,
            count: items.len(),
            items,
        }
    }

    /// Yes/no confirmation reply with the default "Konfirmasi" title.
    pub fn confirmation(message: impl Into<String>, details: Vec<Detail>) -> Self {
        ResponsePayload::Confirmation {
            title: "Konfirmasi".to_string(),
            message: message.into(),
            details,
            actions: vec!["yes".to_string(), "no".to_string()],
            requires_response: true,
        }
    }

    pub fn actionable(
        message: impl Into<String>,
        actions: Vec<ActionButton>,
        title: impl Into<String>,
    ) -> Self {
        ResponsePayload::Actionable {
            title: title.into(),
            message: message.into(),
            actions,
        }
    }

    pub fn operation_result(
        success: bool,
        message: impl Into<String>,
        details: Vec<Detail>,
        operation_type: impl Into<String>,
    ) -> Self {
        ResponsePayload::OperationResult {
            success,
            message: message.into(),
            operation_type: operation_type.into(),
            details,
            icon: if success { ICON_SUCCESS } else { ICON_FAILURE }.to_string(),
        }
    }

    /// Metric summary; an empty title becomes "Ringkasan".
    pub fn summary(metrics: Vec<Detail>, title: impl Into<String>) -> Self {
        ResponsePayload::Summary {
            title: non_empty_or(title.into(), "Ringkasan"),
            metrics,
        }
    }

    pub fn error(message: impl Into<String>, error_code: impl Into<String>) -> Self {
        ResponsePayload::Error {
            message: message.into(),
            error_code: error_code.into(),
            icon: ICON_FAILURE.to_string(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        ResponsePayload::Text {
            content: content.into(),
        }
    }

    /// Wire name of the variant (the `"type"` tag).
    pub fn kind(&self) -> &'static str {
        match self {
            ResponsePayload::Table { .. } => "table",
            ResponsePayload::ProductList { .. } => "product_list",
            ResponsePayload::Confirmation { .. } => "confirmation",
            ResponsePayload::Actionable { .. } => "actionable",
            ResponsePayload::OperationResult { .. } => "operation_result",
            ResponsePayload::Summary { .. } => "summary",
            ResponsePayload::Error { .. } => "error",
            ResponsePayload::Text { .. } => "text",
        }
    }

    // =========================================================================
    // Text Fallback
    // =========================================================================

    /// Renders the reply as plain text.
    ///
    /// ## Example
    /// ```rust
    /// use kasir_core::response::{Detail, ResponsePayload};
    ///
    /// let reply = ResponsePayload::summary(vec![Detail::new("total", "Rp8.000")], "Penjualan");
    /// assert_eq!(reply.to_text_fallback(), "📈 Penjualan\n  Total: Rp8.000");
    /// ```
    pub fn to_text_fallback(&self) -> String {
        match self {
            ResponsePayload::Table {
                title,
                columns,
                data,
                ..
            } => table_to_text(title, columns, data),
            ResponsePayload::ProductList { title, items, .. } => {
                product_list_to_text(title, items)
            }
            ResponsePayload::Confirmation {
                title,
                message,
                details,
                actions,
                ..
            } => confirmation_to_text(title, message, details, actions),
            ResponsePayload::Summary { title, metrics } => summary_to_text(title, metrics),
            ResponsePayload::Error { message, .. } => message.clone(),
            ResponsePayload::Actionable { message, .. }
            | ResponsePayload::OperationResult { message, .. } => message.clone(),
            ResponsePayload::Text { content } => content.clone(),
        }
    }
}

fn table_to_text(title: &str, columns: &[TableColumn], data: &[Map<String, Value>]) -> String {
    let mut lines = Vec::new();

    if !title.is_empty() {
        lines.push(format!("📊 {title}"));
        lines.push("=".repeat(title.chars().count() + 3));
    }

    if data.is_empty() {
        return format!("{}\n(Tidak ada data)", lines.join("\n"));
    }

    for row in data {
        for col in columns {
            let value = row.get(&col.key).map(display_value).unwrap_or_else(|| "-".to_string());
            lines.push(format!("{}: {}", col.label, value));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn product_list_to_text(title: &str, items: &[ProductListItem]) -> String {
    let mut lines = Vec::new();

    if !title.is_empty() {
        lines.push(format!("📦 {title}"));
    }

    for (idx, item) in items.iter().enumerate() {
        lines.push(format!(
            "{}. {} - Stok: {} (Harga: Rp{}) {}",
            idx + 1,
            item.name,
            item.stock,
            group_thousands(Money::from_cents(item.price_cents).rounded_rupiah()),
            item.status_label
        ));
    }

    lines.join("\n")
}

fn confirmation_to_text(
    title: &str,
    message: &str,
    details: &[Detail],
    actions: &[String],
) -> String {
    let mut lines = Vec::new();

    if !title.is_empty() {
        lines.push(format!("❓ {title}"));
    }
    lines.push(message.to_string());
    for detail in details {
        lines.push(format!("  {}: {}", ucfirst(&detail.key), detail.value));
    }
    if !actions.is_empty() {
        lines.push(format!("\nPilihan: {}", actions.join(", ")));
    }

    lines.join("\n")
}

fn summary_to_text(title: &str, metrics: &[Detail]) -> String {
    let mut lines = Vec::new();

    if !title.is_empty() {
        lines.push(format!("📈 {title}"));
    }
    for metric in metrics {
        lines.push(format!("  {}: {}", ucfirst(&metric.key), metric.value));
    }

    lines.join("\n")
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

/// Upper-cases the first character.
pub fn ucfirst(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_table_auto_detects_columns() {
        let reply = ResponsePayload::table(
            vec![row(json!({"product_name": "Aqua 600ml", "quantity_sold": 12}))],
            vec![],
            "Produk Terlaris",
        );
        match &reply {
            ResponsePayload::Table {
                columns, row_count, ..
            } => {
                assert_eq!(*row_count, 1);
                assert_eq!(columns[0], TableColumn::new("product_name", "Product name"));
                assert_eq!(columns[1], TableColumn::new("quantity_sold", "Quantity sold"));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_table_text_fallback() {
        let reply = ResponsePayload::table(
            vec![row(json!({"name": "Aqua", "stock": 4, "note": null}))],
            vec![
                TableColumn::new("name", "Nama"),
                TableColumn::new("stock", "Stok"),
                TableColumn::new("note", "Catatan"),
                TableColumn::new("missing", "Lain"),
            ],
            "Stok",
        );
        assert_eq!(
            reply.to_text_fallback(),
            "📊 Stok\n=======\nNama: Aqua\nStok: 4\nCatatan: -\nLain: -\n"
        );
    }

    #[test]
    fn test_empty_table_text_fallback() {
        let reply = ResponsePayload::table(vec![], vec![], "Kosong");
        assert_eq!(reply.to_text_fallback(), "📊 Kosong\n=========\n(Tidak ada data)");
    }

    #[test]
    fn test_product_list_text_fallback() {
        let reply = ResponsePayload::product_list(
            vec![
                ProductListItem::new(
                    Some("p1".into()),
                    "Pocari Sweat",
                    60,
                    Money::from_cents(8_000_00),
                    "",
                ),
                ProductListItem::new(None, "Beng Beng", 3, Money::from_cents(2_500_00), ""),
            ],
            "",
        );
        assert_eq!(
            reply.to_text_fallback(),
            "📦 Daftar Produk\n1. Pocari Sweat - Stok: 60 (Harga: Rp8.000) 🟢 Sehat\n2. Beng Beng - Stok: 3 (Harga: Rp2.500) 🔴 Kritis"
        );
    }

    #[test]
    fn test_confirmation_defaults_and_text() {
        let reply = ResponsePayload::confirmation(
            "Tambahkan produk ini?",
            vec![Detail::new("nama", "Kopi Susu"), Detail::new("harga", "Rp5.000")],
        );
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["type"], "confirmation");
        assert_eq!(json["requires_response"], true);
        assert_eq!(json["actions"], json!(["yes", "no"]));

        assert_eq!(
            reply.to_text_fallback(),
            "❓ Konfirmasi\nTambahkan produk ini?\n  Nama: Kopi Susu\n  Harga: Rp5.000\n\nPilihan: yes, no"
        );
    }

    #[test]
    fn test_operation_result_icon() {
        let ok = ResponsePayload::operation_result(true, "Produk ditambahkan", vec![], "add_product");
        let failed = ResponsePayload::operation_result(false, "Gagal", vec![], "restock");
        assert!(matches!(ok, ResponsePayload::OperationResult { ref icon, .. } if icon == "✅"));
        assert!(matches!(failed, ResponsePayload::OperationResult { ref icon, .. } if icon == "❌"));
        assert_eq!(ok.to_text_fallback(), "Produk ditambahkan");
    }

    #[test]
    fn test_error_and_text_fallback() {
        assert_eq!(
            ResponsePayload::error("Nama produk wajib diisi", "missing_name").to_text_fallback(),
            "Nama produk wajib diisi"
        );
        assert_eq!(ResponsePayload::text("halo").to_text_fallback(), "halo");
        assert_eq!(ResponsePayload::text("halo").kind(), "text");
    }

    #[test]
    fn test_summary_default_title() {
        let reply = ResponsePayload::summary(vec![], "");
        assert_eq!(reply.to_text_fallback(), "📈 Ringkasan");
    }
}
