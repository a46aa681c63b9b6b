//! Deterministic answers to reporting questions.
//!
//! Every answer is built from the reporting and stock-analysis queries,
//! which never fail, so nothing here returns an error.

use chrono::{Datelike, Duration, Utc};
use kasir_core::intent::{extract_date_param, extract_product_name_from_query, DateParam, QueryIntent};
use kasir_core::report::{format_low_stock_report, format_sales_report, format_stock_status_report};
use kasir_core::response::{Detail, ProductListItem, ResponsePayload, TableColumn};
use kasir_core::stock::LOW_STOCK;
use kasir_core::Money;
use kasir_db::Database;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

const LOW_STOCK_LIMIT: i64 = 20;
const BEST_SELLER_LIMIT: i64 = 5;
const CASHIER_LIMIT: i64 = 5;
const RECENT_TRANSACTIONS: i64 = 10;
const REORDER_LOOK_AHEAD_DAYS: i64 = 7;

/// Words dropped from a stock-analysis question before the product lookup.
const ANALYSIS_NOISE: &[&str] = &[
    "analisis", "analisa", "status", "stok", "stock", "produk", "product", "bagaimana",
    "gimana", "untuk", "dari",
];

/// Look-back window of a question, in days.
fn window_days(param: Option<DateParam>) -> i64 {
    match param {
        Some(DateParam::Today) => 1,
        Some(DateParam::Yesterday) => 2,
        Some(DateParam::Week) => 7,
        Some(DateParam::Month) | None => 30,
    }
}

fn row(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn rupiah(cents: i64) -> String {
    Money::from_cents(cents).to_string()
}

/// Answers a classified reporting question.
pub async fn answer_query(db: &Database, intent: QueryIntent, content: &str) -> ResponsePayload {
    debug!(?intent, "Answering reporting query");
    match intent {
        QueryIntent::LowStock => low_stock(db).await,
        QueryIntent::BestSeller => best_sellers(db, content).await,
        QueryIntent::CashierPerformance => cashiers(db, content).await,
        QueryIntent::StockAnalysis => stock_analysis(db, content).await,
        QueryIntent::Sales => sales(db, content).await,
        QueryIntent::TransactionHistory => transactions(db).await,
    }
}

async fn low_stock(db: &Database) -> ResponsePayload {
    let products = db
        .reports()
        .low_stock_products(LOW_STOCK, LOW_STOCK_LIMIT)
        .await;
    if products.is_empty() {
        return ResponsePayload::text(format_low_stock_report(&[]));
    }

    let items = products
        .iter()
        .map(|p| {
            ProductListItem::new(
                Some(p.id.clone()),
                &p.name,
                p.current_stock,
                Money::from_cents(p.price_cents),
                format!("SKU: {}", p.sku),
            )
        })
        .collect();
    ResponsePayload::product_list(items, "Produk Stok Rendah")
}

async fn best_sellers(db: &Database, content: &str) -> ResponsePayload {
    let days = window_days(extract_date_param(content));
    let sellers = db
        .reports()
        .best_selling_products(days, BEST_SELLER_LIMIT)
        .await;

    let data = sellers
        .iter()
        .map(|s| {
            row(json!({
                "product": s.product_name,
                "quantity_sold": s.quantity_sold,
                "revenue": rupiah(s.revenue_cents),
                "transactions": s.transaction_count,
            }))
        })
        .collect();
    ResponsePayload::table(
        data,
        vec![
            TableColumn::new("product", "Produk"),
            TableColumn::new("quantity_sold", "Terjual"),
            TableColumn::new("revenue", "Pendapatan"),
            TableColumn::new("transactions", "Transaksi"),
        ],
        format!("Produk Terlaris ({} hari terakhir)", days),
    )
}

async fn cashiers(db: &Database, content: &str) -> ResponsePayload {
    let days = window_days(extract_date_param(content));
    let cashiers = db.reports().top_cashiers(days, CASHIER_LIMIT).await;

    let data = cashiers
        .iter()
        .map(|c| {
            row(json!({
                "cashier": c.cashier_name,
                "transactions": c.transaction_count,
                "total_sales": rupiah(c.total_sales_cents),
                "average_sale": rupiah(c.average_sale_cents),
            }))
        })
        .collect();
    ResponsePayload::table(
        data,
        vec![
            TableColumn::new("cashier", "Kasir"),
            TableColumn::new("transactions", "Transaksi"),
            TableColumn::new("total_sales", "Total Penjualan"),
            TableColumn::new("average_sale", "Rata-rata"),
        ],
        format!("Performa Kasir ({} hari terakhir)", days),
    )
}

fn analysis_product_name(content: &str) -> Option<String> {
    let raw = extract_product_name_from_query(content)?.to_lowercase();
    let name = raw
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty() && !ANALYSIS_NOISE.contains(w))
        .collect::<Vec<_>>()
        .join(" ");
    (!name.is_empty()).then_some(name)
}

async fn stock_analysis(db: &Database, content: &str) -> ResponsePayload {
    if let Some(name) = analysis_product_name(content) {
        match db.products().find_by_name(&name, 1).await {
            Ok(found) => {
                if let Some(product) = found.first() {
                    let status = db.stock_analysis().stock_status(&product.id).await;
                    return ResponsePayload::text(format_stock_status_report(&status));
                }
            }
            Err(e) => warn!(error = %e, name = %name, "Product lookup for stock analysis failed"),
        }
    }

    let suggestions = db
        .stock_analysis()
        .predict_reorder(REORDER_LOOK_AHEAD_DAYS)
        .await;
    if suggestions.is_empty() {
        return ResponsePayload::text(format!(
            "Tidak ada produk yang diperkirakan habis dalam {} hari ke depan.",
            REORDER_LOOK_AHEAD_DAYS
        ));
    }

    let data = suggestions
        .iter()
        .map(|s| {
            row(json!({
                "product": s.product_name,
                "current_stock": s.current_stock,
                "days_of_stock": s.days_of_stock,
                "recommended_order_qty": s.recommended_order_qty,
            }))
        })
        .collect();
    ResponsePayload::table(
        data,
        vec![
            TableColumn::new("product", "Produk"),
            TableColumn::new("current_stock", "Stok"),
            TableColumn::new("days_of_stock", "Sisa Hari"),
            TableColumn::new("recommended_order_qty", "Saran Order"),
        ],
        "Prediksi Restock",
    )
}

async fn sales(db: &Database, content: &str) -> ResponsePayload {
    let today = Utc::now().date_naive();
    match extract_date_param(content) {
        Some(DateParam::Today) | None => {
            ResponsePayload::text(format_sales_report(&db.reports().daily_sales(today).await))
        }
        Some(DateParam::Yesterday) => {
            let yesterday = today - Duration::days(1);
            ResponsePayload::text(format_sales_report(
                &db.reports().daily_sales(yesterday).await,
            ))
        }
        Some(DateParam::Week) => {
            let days = db.reports().weekly_sales().await;
            let data = days
                .iter()
                .map(|d| {
                    row(json!({
                        "date": d.date,
                        "total": rupiah(d.total_cents),
                        "transactions": d.transaction_count,
                    }))
                })
                .collect();
            ResponsePayload::table(
                data,
                vec![
                    TableColumn::new("date", "Tanggal"),
                    TableColumn::new("total", "Total"),
                    TableColumn::new("transactions", "Transaksi"),
                ],
                "Penjualan 7 Hari Terakhir",
            )
        }
        Some(DateParam::Month) => {
            let revenue = db
                .reports()
                .monthly_revenue(today.month(), today.year())
                .await;
            ResponsePayload::summary(
                vec![
                    Detail::new("total_pendapatan", rupiah(revenue.total_revenue_cents)),
                    Detail::new("jumlah_transaksi", revenue.transaction_count),
                    Detail::new("rata_rata_transaksi", rupiah(revenue.average_transaction_cents)),
                ],
                format!("Pendapatan {:02}/{}", revenue.month, revenue.year),
            )
        }
    }
}

async fn transactions(db: &Database) -> ResponsePayload {
    let recent = match db.transactions().recent(RECENT_TRANSACTIONS).await {
        Ok(recent) => recent,
        Err(e) => {
            warn!(error = %e, "Recent transactions query failed");
            Vec::new()
        }
    };

    let data = recent
        .iter()
        .map(|t| {
            row(json!({
                "id": t.id,
                "total": rupiah(t.total_cents),
                "status": t.status,
                "created_at": t.created_at.format("%Y-%m-%d %H:%M").to_string(),
            }))
        })
        .collect();
    ResponsePayload::table(
        data,
        vec![
            TableColumn::new("id", "ID"),
            TableColumn::new("total", "Total"),
            TableColumn::new("status", "Status"),
            TableColumn::new("created_at", "Waktu"),
        ],
        "Transaksi Terakhir",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use kasir_core::{NewProduct, NewUser, UserRole};
    use kasir_db::DbConfig;

    async fn seeded() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cashier = db
            .users()
            .create(&NewUser {
                name: "Kasir Satu".into(),
                username: "kasir1".into(),
                password: "secret1".into(),
                role: UserRole::Cashier,
            })
            .await
            .unwrap();
        let aqua = db
            .products()
            .create(
                &NewProduct {
                    name: "Aqua".into(),
                    sku: "BEV-AQ-001".into(),
                    price_cents: 3_000_00,
                    description: None,
                    current_stock: 50,
                },
                None,
            )
            .await
            .unwrap();
        db.products()
            .create(
                &NewProduct {
                    name: "Teh Botol".into(),
                    sku: "BEV-TB-002".into(),
                    price_cents: 4_000_00,
                    description: None,
                    current_stock: 3,
                },
                None,
            )
            .await
            .unwrap();
        db.transactions()
            .checkout_single(&cashier.id, &aqua.id, 4)
            .await
            .unwrap();
        (db, aqua.id)
    }

    #[test]
    fn test_window_days() {
        assert_eq!(window_days(Some(DateParam::Today)), 1);
        assert_eq!(window_days(Some(DateParam::Week)), 7);
        assert_eq!(window_days(None), 30);
    }

    #[test]
    fn test_analysis_product_name() {
        assert_eq!(
            analysis_product_name("analisis stok aqua").as_deref(),
            Some("aqua")
        );
        assert_eq!(analysis_product_name("analisis stok"), None);
    }

    #[tokio::test]
    async fn test_low_stock_lists_products() {
        let (db, _) = seeded().await;
        match answer_query(&db, QueryIntent::LowStock, "stok rendah").await {
            ResponsePayload::ProductList { items, .. } => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].name, "Teh Botol");
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_best_sellers_table() {
        let (db, _) = seeded().await;
        match answer_query(&db, QueryIntent::BestSeller, "produk terlaris minggu ini").await {
            ResponsePayload::Table { data, row_count, .. } => {
                assert_eq!(row_count, 1);
                assert_eq!(data[0]["product"], "Aqua");
                assert_eq!(data[0]["quantity_sold"], 4);
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sales_today_text() {
        let (db, _) = seeded().await;
        let reply = answer_query(&db, QueryIntent::Sales, "penjualan hari ini").await;
        let text = reply.to_text_fallback();
        assert!(text.contains("Total: Rp12.000"), "{text}");
        assert!(text.contains("Transaksi: 1"), "{text}");
    }

    #[tokio::test]
    async fn test_stock_analysis_for_named_product() {
        let (db, _) = seeded().await;
        let reply = answer_query(&db, QueryIntent::StockAnalysis, "analisis stok aqua").await;
        assert_eq!(reply.kind(), "text");
        assert!(reply.to_text_fallback().contains("Aqua"));
    }

    #[tokio::test]
    async fn test_transaction_history_table() {
        let (db, _) = seeded().await;
        match answer_query(&db, QueryIntent::TransactionHistory, "riwayat transaksi").await {
            ResponsePayload::Table { row_count, .. } => assert_eq!(row_count, 1),
            other => panic!("unexpected reply: {:?}", other),
        }
    }
}
