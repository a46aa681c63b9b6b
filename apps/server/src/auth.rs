//! Acting-user resolution.
//!
//! Session handling lives in front of this server; every request carries
//! the authenticated user's id in the `X-User-Id` header. The extractors
//! here load that user once per request and hand it to the handler.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use kasir_core::User;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::AppState;

/// Header carrying the acting user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user performing the request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Missing X-User-Id header"))?;

        match state.db.users().get_by_id(user_id).await? {
            Some(user) => {
                debug!(user_id = %user.id, role = user.role.as_str(), "Resolved acting user");
                Ok(CurrentUser(user))
            }
            None => {
                warn!(user_id = %user_id, "Request for unknown user");
                Err(ApiError::unauthorized("Unknown user"))
            }
        }
    }
}

/// An acting user with a managing role (`super-admin` or `admin`).
#[derive(Debug, Clone)]
pub struct Manager(pub User);

impl FromRequestParts<Arc<AppState>> for Manager {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.role.is_manager() {
            return Err(ApiError::forbidden("Unauthorized action."));
        }
        Ok(Manager(user))
    }
}
