//! Token authentication
//!
//! Protected routes require `Authorization: Token <key>` (`Bearer <key>` is
//! accepted as well). The middleware resolves the key to an active user and
//! stores it as an [`AuthUser`] request extension.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use super::state::AppState;
use crate::error::{Result, TodoError};
use crate::model::User;
use crate::operations::accounts;
use crate::storage;

/// The authenticated caller, plus the key it presented (for logout).
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub token_key: String,
}

/// Pull the key out of an `Authorization` header.
fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, key) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let key = key.trim();
    (!key.is_empty()).then_some(key)
}

fn resolve(state: &AppState, key: &str) -> Result<User> {
    let conn = storage::lock(&state.db)?;
    accounts::authenticate(&conn, key, Utc::now())
}

/// Axum middleware guarding every owner-scoped route.
pub async fn require_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(key) = token_from_headers(request.headers()).map(str::to_string) else {
        return TodoError::unauthorized("Authentication credentials were not provided.")
            .into_response();
    };

    match resolve(&state, &key) {
        Ok(user) => {
            request.extensions_mut().insert(AuthUser {
                user,
                token_key: key,
            });
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "token rejected");
            e.into_response()
        }
    }
}
