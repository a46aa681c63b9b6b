//! # Multi-step Chat Flows
//!
//! Add-product and restock requests are never executed straight from a
//! chat message. They are parked on the topic as a [`PendingAction`] and
//! run only after the user answers.
//!
//! ```text
//! "tambah produk nama X harga 5000"  ──► add_product ──"ya"──► product created
//!
//! "restok produk kopi stok 12"
//!      │ one match ──────────────────► restock ──"ya"──► stock +12, ledger entry
//!      │ several matches ─► restock_select ──"2"──► restock ──"ya"──► ...
//!      └ none ──► error reply
//!
//! "tidak" / "batal" at any step ──► pending action cleared
//! anything else                 ──► pending action cleared, message handled normally
//! ```
//!
//! Both flows change the catalogue, so only managers may start or confirm
//! them; cashiers get a `forbidden` error reply.

use kasir_core::intent::{
    extract_product_draft, extract_restock_amount, extract_restock_product_name,
    is_cancellation, is_confirmation, is_numeric_selection, is_rejection, selection_index,
};
use kasir_core::response::{Detail, ProductListItem, ResponsePayload};
use kasir_core::validation::{validate_initial_stock, validate_price_cents};
use kasir_core::{
    Money, NewProduct, PendingAction, ProductChoice, ProductDraft, StockAdjustment,
    StockChangeType, User, MAX_PRICE_CENTS, MAX_STOCK_LEVEL,
};
use kasir_db::repository::product::sku_from_name;
use kasir_db::{Database, DbError, DbResult};
use tracing::{error, info};

/// Ledger note of stock added through the chat.
pub const RESTOCK_NOTE: &str = "Restock via chatbot";

const CANCELLED_REPLY: &str = "Baik, permintaan dibatalkan.";

const FORBIDDEN_REPLY: &str = "Hanya admin yang dapat mengubah produk atau stok.";

/// Words removed from a restock request before the product lookup.
const RESTOCK_NOISE: &[&str] = &[
    "stok", "stock", "restok", "restock", "produk", "product", "update", "increase",
];

const MAX_RESTOCK_CANDIDATES: i64 = 10;

// =============================================================================
// Pending Replies
// =============================================================================

/// Answers a message sent while `action` is pending.
///
/// ## Returns
/// * `Ok(Some(payload))` - The message was an answer to the pending action
/// * `Ok(None)` - Not an answer; the caller clears the action and handles
///   the message normally
pub async fn answer_pending(
    db: &Database,
    user: &User,
    topic_id: &str,
    action: PendingAction,
    content: &str,
) -> DbResult<Option<ResponsePayload>> {
    if is_rejection(content) || is_cancellation(content) {
        db.chats().clear_pending(topic_id).await?;
        return Ok(Some(ResponsePayload::text(CANCELLED_REPLY)));
    }

    if is_confirmation(content) {
        return confirm(db, user, topic_id, action).await.map(Some);
    }

    if is_numeric_selection(content) {
        if let PendingAction::RestockSelect { candidates, amount } = &action {
            return select_candidate(db, topic_id, candidates, *amount, content)
                .await
                .map(Some);
        }
    }

    Ok(None)
}

async fn confirm(
    db: &Database,
    user: &User,
    topic_id: &str,
    action: PendingAction,
) -> DbResult<ResponsePayload> {
    if let Some(refusal) = refuse_non_manager(user) {
        db.chats().clear_pending(topic_id).await?;
        return Ok(refusal);
    }

    match action {
        PendingAction::AddProduct(draft) => {
            db.chats().clear_pending(topic_id).await?;
            Ok(create_product(db, user, &draft).await)
        }
        PendingAction::Restock {
            product_id,
            product_name,
            amount,
        } => {
            db.chats().clear_pending(topic_id).await?;
            Ok(restock(db, user, &product_id, &product_name, amount).await)
        }
        PendingAction::RestockSelect { candidates, .. } => Ok(ResponsePayload::text(format!(
            "Balas dengan nomor produk (1-{}) terlebih dahulu.",
            candidates.len()
        ))),
    }
}

async fn select_candidate(
    db: &Database,
    topic_id: &str,
    candidates: &[ProductChoice],
    amount: i64,
    content: &str,
) -> DbResult<ResponsePayload> {
    let Some(choice) = selection_index(content).and_then(|i| candidates.get(i)) else {
        return Ok(ResponsePayload::text(format!(
            "Pilihan tidak valid. Balas dengan nomor 1 sampai {}.",
            candidates.len()
        )));
    };

    db.chats()
        .set_pending(
            topic_id,
            &PendingAction::Restock {
                product_id: choice.product_id.clone(),
                product_name: choice.name.clone(),
                amount,
            },
        )
        .await?;
    Ok(restock_confirmation(&choice.name, amount))
}

fn refuse_non_manager(user: &User) -> Option<ResponsePayload> {
    if user.role.is_manager() {
        return None;
    }
    info!(user_id = %user.id, role = user.role.as_str(), "Catalogue change via chat refused");
    Some(ResponsePayload::error(FORBIDDEN_REPLY, "forbidden"))
}

/// Price of a draft in minor units, `None` when out of range.
fn draft_price(draft: &ProductDraft) -> Option<Money> {
    Money::from_rupiah(draft.price).filter(|price| validate_price_cents(price.cents()).is_ok())
}

/// User-facing reason of a failed chat operation. Storage details stay in
/// the log.
fn failure_reason(err: &DbError) -> String {
    if err.is_storage_failure() {
        "Terjadi kesalahan pada database.".to_string()
    } else {
        err.to_string()
    }
}

async fn create_product(db: &Database, user: &User, draft: &ProductDraft) -> ResponsePayload {
    let Some(name) = draft.name.clone() else {
        return ResponsePayload::operation_result(
            false,
            "Nama produk wajib diisi.",
            Vec::new(),
            PendingAction::ADD_PRODUCT,
        );
    };

    let Some(price) = draft_price(draft) else {
        return ResponsePayload::operation_result(
            false,
            "Harga produk tidak valid.",
            Vec::new(),
            PendingAction::ADD_PRODUCT,
        );
    };

    let input = NewProduct {
        sku: sku_from_name(&name),
        name,
        price_cents: price.cents(),
        description: (!draft.description.trim().is_empty())
            .then(|| draft.description.trim().to_string()),
        current_stock: draft.current_stock,
    };

    match db.products().create(&input, Some(&user.id)).await {
        Ok(product) => {
            info!(product_id = %product.id, user_id = %user.id, "Product created via chat");
            ResponsePayload::operation_result(
                true,
                format!("Produk {} berhasil ditambahkan.", product.name),
                vec![
                    Detail::new("nama", &product.name),
                    Detail::new("sku", &product.sku),
                    Detail::new("harga", product.price()),
                    Detail::new("stok", product.stock()),
                ],
                PendingAction::ADD_PRODUCT,
            )
        }
        Err(e) => {
            error!(error = %e, "Failed to create product via chat");
            ResponsePayload::operation_result(
                false,
                format!("Gagal menambahkan produk: {}", failure_reason(&e)),
                Vec::new(),
                PendingAction::ADD_PRODUCT,
            )
        }
    }
}

async fn restock(
    db: &Database,
    user: &User,
    product_id: &str,
    product_name: &str,
    amount: i64,
) -> ResponsePayload {
    let adjustment = StockAdjustment {
        product_id: product_id.to_string(),
        change_type: StockChangeType::Increase,
        quantity: amount,
        notes: Some(RESTOCK_NOTE.to_string()),
    };

    match db.stock().update_stock(&adjustment, Some(&user.id)).await {
        Ok((product, _entry)) => {
            info!(product_id = %product.id, amount, "Restocked via chat");
            ResponsePayload::operation_result(
                true,
                format!("Stok {} berhasil ditambah {} unit.", product.name, amount),
                vec![
                    Detail::new("produk", &product.name),
                    Detail::new("ditambah", amount),
                    Detail::new("stok_sekarang", product.stock()),
                ],
                PendingAction::RESTOCK,
            )
        }
        Err(e) => {
            error!(error = %e, product_id = %product_id, "Failed to restock via chat");
            ResponsePayload::operation_result(
                false,
                format!("Gagal menambah stok {}: {}", product_name, failure_reason(&e)),
                Vec::new(),
                PendingAction::RESTOCK,
            )
        }
    }
}

fn restock_confirmation(product_name: &str, amount: i64) -> ResponsePayload {
    ResponsePayload::confirmation(
        format!("Tambah stok {} sebanyak {} unit?", product_name, amount),
        vec![
            Detail::new("produk", product_name),
            Detail::new("jumlah", amount),
        ],
    )
}

// =============================================================================
// Starting a Flow
// =============================================================================

/// Parks an add-product request and asks for confirmation.
pub async fn start_add_product(
    db: &Database,
    user: &User,
    topic_id: &str,
    content: &str,
) -> DbResult<ResponsePayload> {
    if let Some(refusal) = refuse_non_manager(user) {
        return Ok(refusal);
    }

    let draft = extract_product_draft(content);
    let Some(name) = draft.name.clone() else {
        return Ok(ResponsePayload::error(
            "Nama produk tidak ditemukan. Gunakan format: tambah produk nama <nama> harga <harga> stok <stok>",
            "missing_name",
        ));
    };
    let Some(price) = draft_price(&draft) else {
        return Ok(ResponsePayload::error(
            format!("Harga produk tidak valid. Maksimal {}.", Money::from_cents(MAX_PRICE_CENTS)),
            "invalid_price",
        ));
    };
    if validate_initial_stock(draft.current_stock).is_err() {
        return Ok(ResponsePayload::error(
            format!("Stok awal tidak valid. Maksimal {} unit.", MAX_STOCK_LEVEL),
            "invalid_stock",
        ));
    }

    let mut details = vec![
        Detail::new("nama", &name),
        Detail::new("harga", price),
        Detail::new("stok", draft.current_stock),
    ];
    if !draft.description.trim().is_empty() {
        details.push(Detail::new("deskripsi", draft.description.trim()));
    }

    db.chats()
        .set_pending(topic_id, &PendingAction::AddProduct(draft))
        .await?;
    Ok(ResponsePayload::confirmation(
        "Tambahkan produk baru berikut?",
        details,
    ))
}

/// Product name of a restock request with amount and command words removed.
fn restock_product_name(content: &str) -> String {
    extract_restock_product_name(content)
        .split_whitespace()
        .filter(|word| !RESTOCK_NOISE.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves the product of a restock request and asks for confirmation,
/// or for a choice when several products match.
pub async fn start_restock(
    db: &Database,
    user: &User,
    topic_id: &str,
    content: &str,
) -> DbResult<ResponsePayload> {
    if let Some(refusal) = refuse_non_manager(user) {
        return Ok(refusal);
    }

    let Some(amount) = extract_restock_amount(content).filter(|a| *a > 0) else {
        return Ok(ResponsePayload::error(
            "Jumlah restock tidak ditemukan. Contoh: restok produk Pocari Sweat stok 24",
            "missing_amount",
        ));
    };

    let name = restock_product_name(content);
    if name.is_empty() {
        return Ok(ResponsePayload::error(
            "Nama produk tidak ditemukan. Contoh: restok produk Pocari Sweat stok 24",
            "missing_name",
        ));
    }

    let matches = db
        .products()
        .find_by_name(&name, MAX_RESTOCK_CANDIDATES)
        .await?;

    match matches.as_slice() {
        [] => Ok(ResponsePayload::error(
            format!("Produk \"{}\" tidak ditemukan.", name),
            "product_not_found",
        )),
        [product] => {
            db.chats()
                .set_pending(
                    topic_id,
                    &PendingAction::Restock {
                        product_id: product.id.clone(),
                        product_name: product.name.clone(),
                        amount,
                    },
                )
                .await?;
            Ok(restock_confirmation(&product.name, amount))
        }
        products => {
            let candidates = products
                .iter()
                .map(|p| ProductChoice {
                    product_id: p.id.clone(),
                    name: p.name.clone(),
                })
                .collect();
            db.chats()
                .set_pending(
                    topic_id,
                    &PendingAction::RestockSelect { candidates, amount },
                )
                .await?;

            let items = products
                .iter()
                .map(|p| {
                    ProductListItem::new(
                        Some(p.id.clone()),
                        &p.name,
                        p.stock(),
                        p.price(),
                        p.description.clone().unwrap_or_default(),
                    )
                })
                .collect();
            Ok(ResponsePayload::product_list(
                items,
                "Beberapa produk cocok. Balas dengan nomor produk:",
            ))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
