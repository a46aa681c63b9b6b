//! End-to-end tests of the HTTP API against an in-memory database.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use kasir_core::{NewProduct, NewUser, Product, User, UserRole};
use kasir_db::{Database, DbConfig};
use kasir_server::generative::{GenerationConfig, GenerativeError, GenerativeModel};
use kasir_server::{build_router, AppConfig, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

// =============================================================================
// Harness
// =============================================================================

struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, GenerativeError>>>,
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(
        &self,
        _prompt: &str,
        _config: GenerationConfig,
    ) -> Result<String, GenerativeError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenerativeError::NoText))
    }
}

struct TestApp {
    router: Router,
    db: Database,
    admin: User,
    cashier: User,
    pocari: Product,
}

impl TestApp {
    async fn new() -> Self {
        Self::with(&[], None).await
    }

    async fn with(vars: &[(&str, &str)], replies: Option<Vec<Result<String, GenerativeError>>>) -> Self {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = AppConfig::from_vars(vars).unwrap();
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let admin = create_user(&db, "admin", UserRole::Admin).await;
        let cashier = create_user(&db, "kasir", UserRole::Cashier).await;
        let pocari = db
            .products()
            .create(
                &NewProduct {
                    name: "Pocari Sweat".into(),
                    sku: "BEV-PS-005".into(),
                    price_cents: 8_000_00,
                    description: Some("Minuman isotonik".into()),
                    current_stock: 60,
                },
                Some(&admin.id),
            )
            .await
            .unwrap();

        let model: Option<Arc<dyn GenerativeModel>> = replies.map(|r| {
            Arc::new(ScriptedModel {
                replies: Mutex::new(r.into()),
            }) as Arc<dyn GenerativeModel>
        });
        let state = Arc::new(AppState::new(db.clone(), config, model));

        TestApp {
            router: build_router(state),
            db,
            admin,
            cashier,
            pocari,
        }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<&User>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", &user.id);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn get(&self, uri: &str, user: &User) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(user), None).await
    }

    async fn post(&self, uri: &str, user: &User, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(user), Some(body)).await
    }

    async fn stock_of(&self, product: &Product) -> i64 {
        self.db.products().require(&product.id).await.unwrap().stock()
    }
}

async fn create_user(db: &Database, username: &str, role: UserRole) -> User {
    db.users()
        .create(&NewUser {
            name: format!("User {}", username),
            username: username.into(),
            password: "secret1".into(),
            role,
        })
        .await
        .unwrap()
}

// =============================================================================
// Health & Auth
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], true);
    assert_eq!(body["model_enabled"], false);
}

#[tokio::test]
async fn test_missing_or_unknown_user_is_unauthorized() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/api/products", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let request = Request::builder()
        .uri("/api/products")
        .header("x-user-id", "nobody")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Products & Stock
// =============================================================================

#[tokio::test]
async fn test_cashier_cannot_create_product() {
    let app = TestApp::new().await;
    let body = json!({"name": "Aqua", "sku": "BEV-AQ-001", "price_cents": 300000});

    let (status, _) = app.post("/api/products", &app.cashier, body.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = app.post("/api/products", &app.admin, body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Aqua");

    let (status, list) = app.get("/api/products", &app.cashier).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_duplicate_sku_conflicts() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post(
            "/api/products",
            &app.admin,
            json!({"name": "Pocari Lagi", "sku": "BEV-PS-005", "price_cents": 100}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_deleted_product_is_hidden() {
    let app = TestApp::new().await;
    let uri = format!("/api/products/{}", app.pocari.id);
    let (status, _) = app
        .request(Method::DELETE, &uri, Some(&app.admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&uri, &app.cashier).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stock_update_and_history() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post(
            "/api/stock",
            &app.admin,
            json!({"product_id": app.pocari.id, "type": "decrease", "quantity": 10, "notes": "rusak"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["current_stock"], 50);
    assert_eq!(body["history"]["type"], "decrease");

    let (status, history) = app
        .get(&format!("/api/stock/{}/history", app.pocari.id), &app.cashier)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history[0]["quantity"], 10);
}

#[tokio::test]
async fn test_stock_decrease_below_zero_is_rejected() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post(
            "/api/stock",
            &app.admin,
            json!({"product_id": app.pocari.id, "type": "decrease", "quantity": 61}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Insufficient stock.");
    assert_eq!(body["description"], "Current stock: 60");
    assert_eq!(app.stock_of(&app.pocari).await, 60);
}

// =============================================================================
// Cart & Checkout
// =============================================================================

#[tokio::test]
async fn test_cart_checkout() {
    let app = TestApp::new().await;
    let (status, _) = app
        .post(
            "/api/cart",
            &app.cashier,
            json!({"product_id": app.pocari.id, "quantity": 2}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, cart) = app.get("/api/cart", &app.cashier).await;
    assert_eq!(cart["total_cents"], 1_600_000);

    let uri = format!("/api/cart/{}/checkout", app.cashier.id);
    let (status, body) = app.post(&uri, &app.cashier, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Checkout successful.");
    assert_eq!(body["receipt"]["transaction"]["total_cents"], 1_600_000);
    assert_eq!(app.stock_of(&app.pocari).await, 58);

    let (_, cart) = app.get("/api/cart", &app.cashier).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_checkout_of_foreign_cart_is_forbidden() {
    let app = TestApp::new().await;
    let uri = format!("/api/cart/{}/checkout", app.admin.id);
    let (status, _) = app.post(&uri, &app.cashier, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_empty_cart_checkout_fails() {
    let app = TestApp::new().await;
    let uri = format!("/api/cart/{}/checkout", app.cashier.id);
    let (status, body) = app.post(&uri, &app.cashier, json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Cart is empty.");
}

#[tokio::test]
async fn test_pos_checkout_insufficient_stock() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post(
            "/api/pos/checkout",
            &app.cashier,
            json!({"product_id": app.pocari.id, "quantity": 61}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert_eq!(app.stock_of(&app.pocari).await, 60);

    let (status, _) = app
        .post(
            "/api/pos/checkout",
            &app.cashier,
            json!({"product_id": app.pocari.id, "quantity": 60}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stock_of(&app.pocari).await, 0);
}

// =============================================================================
// Users
// =============================================================================

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let app = TestApp::new().await;
    let uri = format!("/api/users/{}", app.admin.id);
    let (status, body) = app
        .request(Method::DELETE, &uri, Some(&app.admin), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_admin_creates_and_deletes_cashier() {
    let app = TestApp::new().await;
    let (status, user) = app
        .post(
            "/api/users",
            &app.admin,
            json!({"name": "Kasir Dua", "username": "kasir2", "password": "secret1", "role": "cashier"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(user.get("password_hash").is_none());

    let uri = format!("/api/users/{}", user["id"].as_str().unwrap());
    let (status, _) = app
        .request(Method::DELETE, &uri, Some(&app.admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Chat
// =============================================================================

async fn first_topic(app: &TestApp, user: &User) -> String {
    let (status, topics) = app.get("/api/chat/topics", user).await;
    assert_eq!(status, StatusCode::OK);
    topics[0]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_topics_are_auto_created_and_owned() {
    let app = TestApp::new().await;
    let topic = first_topic(&app, &app.cashier).await;

    let (status, _) = app
        .get(&format!("/api/chat/topics/{}", topic), &app.admin)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .get(&format!("/api/chat/topics/{}", topic), &app.cashier)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["topic"]["title"], "New Chat");
}

#[tokio::test]
async fn test_send_message_uses_model() {
    let app = TestApp::with(&[], Some(vec![Ok("Halo! Ada yang bisa dibantu?".into())])).await;
    let topic = first_topic(&app, &app.cashier).await;

    let (status, reply) = app
        .post(
            &format!("/api/chat/topics/{}/messages", topic),
            &app.cashier,
            json!({"content": "halo"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["user_message"]["content"], "halo");
    assert_eq!(reply["assistant_message"]["content"], "Halo! Ada yang bisa dibantu?");
    assert_eq!(reply["payload"]["type"], "text");
    assert_eq!(reply["debug"]["source"], "model");
    assert_eq!(reply["debug"]["attempts"], 1);

    let (_, body) = app
        .get(&format!("/api/chat/topics/{}", topic), &app.cashier)
        .await;
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_send_message_falls_back_after_failures() {
    let app = TestApp::with(&[], Some(vec![])).await;
    let topic = first_topic(&app, &app.cashier).await;

    let (status, reply) = app
        .post(
            &format!("/api/chat/topics/{}/messages", topic),
            &app.cashier,
            json!({"content": "ceritakan lelucon"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["debug"]["source"], "fallback");
    assert_eq!(reply["debug"]["attempts"], 3);
    assert_eq!(
        reply["assistant_message"]["content"],
        "Maaf, asisten sedang tidak dapat merespons saat ini. Silakan coba lagi nanti."
    );
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let app = TestApp::new().await;
    let topic = first_topic(&app, &app.cashier).await;
    let (status, body) = app
        .post(
            &format!("/api/chat/topics/{}/messages", topic),
            &app.cashier,
            json!({"content": "  "}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_chat_restock_flow_over_http() {
    let app = TestApp::new().await;
    let topic = first_topic(&app, &app.admin).await;
    let uri = format!("/api/chat/topics/{}/messages", topic);

    let (_, reply) = app
        .post(&uri, &app.admin, json!({"content": "restok produk pocari sweat stok 24"}))
        .await;
    assert_eq!(reply["payload"]["type"], "confirmation");

    let (_, reply) = app.post(&uri, &app.admin, json!({"content": "ya"})).await;
    assert_eq!(reply["payload"]["type"], "operation_result");
    assert_eq!(reply["payload"]["success"], true);
    assert_eq!(app.stock_of(&app.pocari).await, 84);
}

#[tokio::test]
async fn test_cashier_chat_restock_is_refused_over_http() {
    let app = TestApp::new().await;
    let topic = first_topic(&app, &app.cashier).await;
    let uri = format!("/api/chat/topics/{}/messages", topic);

    let (status, reply) = app
        .post(&uri, &app.cashier, json!({"content": "restok produk pocari sweat stok 24"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["payload"]["type"], "error");
    assert_eq!(reply["payload"]["error_code"], "forbidden");

    let (_, reply) = app.post(&uri, &app.cashier, json!({"content": "ya"})).await;
    assert_ne!(reply["payload"]["type"], "operation_result");
    assert_eq!(app.stock_of(&app.pocari).await, 60);
}

#[tokio::test]
async fn test_clear_and_delete_topic() {
    let app = TestApp::new().await;
    let topic = first_topic(&app, &app.cashier).await;
    app.post(
        &format!("/api/chat/topics/{}/messages", topic),
        &app.cashier,
        json!({"content": "halo"}),
    )
    .await;

    let (status, _) = app
        .post(&format!("/api/chat/topics/{}/clear", topic), &app.cashier, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app
        .get(&format!("/api/chat/topics/{}", topic), &app.cashier)
        .await;
    assert!(body["messages"].as_array().unwrap().is_empty());

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/chat/topics/{}", topic),
            Some(&app.cashier),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .get(&format!("/api/chat/topics/{}", topic), &app.cashier)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// DB Tool
// =============================================================================

#[tokio::test]
async fn test_tool_product_lookup() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post(
            "/api/chat/tool",
            &app.cashier,
            json!({"intent": "product_lookup", "params": {"q": "stok pocari"}}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intent"], "product_lookup");
    assert_eq!(body["rows"][0]["sku"], "BEV-PS-005");
    assert_eq!(body["rows"][0]["price"], "8000.00");
}

#[tokio::test]
async fn test_tool_unknown_intent() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post(
            "/api/chat/tool",
            &app.cashier,
            json!({"intent": "drop_tables"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "unknown_intent");
}

#[tokio::test]
async fn test_tool_disabled() {
    let app = TestApp::with(&[("CHATBOT_DB_TOOL_ENABLED", "false")], None).await;
    let (status, body) = app
        .post(
            "/api/chat/tool",
            &app.cashier,
            json!({"intent": "product_lookup", "params": {"q": "pocari"}}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "DB tool disabled");
}

// =============================================================================
// Reports
// =============================================================================

#[tokio::test]
async fn test_reports_after_sale() {
    let app = TestApp::new().await;
    app.post(
        "/api/pos/checkout",
        &app.cashier,
        json!({"product_id": app.pocari.id, "quantity": 3}),
    )
    .await;

    let (status, sellers) = app.get("/api/reports/best-sellers?days=7", &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sellers[0]["product_name"], "Pocari Sweat");
    assert_eq!(sellers[0]["quantity_sold"], 3);

    let (_, daily) = app.get("/api/reports/sales/daily", &app.admin).await;
    assert_eq!(daily["total_cents"], 2_400_000);
    assert_eq!(daily["transaction_count"], 1);

    let (_, cashiers) = app.get("/api/reports/cashiers", &app.admin).await;
    assert_eq!(cashiers[0]["user_id"], app.cashier.id.as_str());

    let (_, status_body) = app
        .get(&format!("/api/reports/stock/{}/status", app.pocari.id), &app.admin)
        .await;
    assert_eq!(status_body["current_stock"], 57);
}

#[tokio::test]
async fn test_stock_status_for_unknown_product() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/reports/stock/missing/status", &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "Product not found");
}
