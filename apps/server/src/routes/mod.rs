//! HTTP routes.
//!
//! Each module exposes a `router()` nested or merged here. Handlers resolve
//! the acting user through [`crate::auth::CurrentUser`] or
//! [`crate::auth::Manager`] and return [`crate::error::ApiResult`].

pub mod cart;
pub mod chat;
pub mod health;
pub mod pos;
pub mod products;
pub mod reports;
pub mod stock;
pub mod tool;
pub mod users;

use std::sync::Arc;

use axum::Router;

use crate::AppState;

/// Builds the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .nest("/products", products::router())
        .nest("/stock", stock::router())
        .nest("/cart", cart::router())
        .nest("/pos", pos::router())
        .nest("/users", users::router())
        .nest("/chat", chat::router())
        .nest("/reports", reports::router());

    Router::new()
        .merge(health::router())
        .nest("/api", api)
        .with_state(state)
}
