//! Account API handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{blocking, nullable, MessageResponse, SUCCESS};
use crate::api::auth::AuthUser;
use crate::api::error::bad_body;
use crate::api::state::AppState;
use crate::credentials;
use crate::error::Result;
use crate::model::{ProfilePatch, User};
use crate::operations::accounts::{self as ops, Registration, Session};
use crate::storage;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: Option<String>,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Registration {
            username: req.username,
            password: req.password,
            password_confirm: req.password_confirm,
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Partial profile update; `"email": null` removes the address.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<UpdateProfileRequest> for ProfilePatch {
    fn from(req: UpdateProfileRequest) -> Self {
        ProfilePatch {
            username: req.username,
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
        }
    }
}

/// Profile read model
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub can_change_username: bool,
    pub days_until_username_change: i64,
}

impl UserResponse {
    fn new(user: User, now: DateTime<Utc>, cooldown_days: u32) -> Self {
        let days = user.days_until_username_change(now, cooldown_days);
        let can_change_username = user.can_change_username(now, cooldown_days);
        Self {
            full_name: user.full_name(),
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            date_joined: user.date_joined,
            last_login: user.last_login,
            can_change_username,
            days_until_username_change: days,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub user: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl UserEnvelope {
    fn session(
        message: &'static str,
        session: Session,
        now: DateTime<Utc>,
        cooldown: u32,
    ) -> Self {
        Self {
            status: SUCCESS,
            message: Some(message),
            user: UserResponse::new(session.user, now, cooldown),
            token: Some(session.token),
        }
    }

    fn profile(
        message: Option<&'static str>,
        user: User,
        now: DateTime<Utc>,
        cooldown: u32,
    ) -> Self {
        Self {
            status: SUCCESS,
            message,
            user: UserResponse::new(user, now, cooldown),
            token: None,
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// POST /api/auth/register/
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserEnvelope>)> {
    let Json(req) = payload.map_err(bad_body)?;
    let form = Registration::from(req);
    {
        let conn = storage::lock(&state.db)?;
        ops::check_registration(&conn, &form)?;
    }
    let password = form.password.clone();
    let password_hash = blocking(move || credentials::hash_password(&password)).await?;

    let policy = state.account_policy();
    let now = Utc::now();
    let conn = storage::lock(&state.db)?;
    let session = ops::register(&conn, &policy, form, password_hash, now)?;

    let body = UserEnvelope::session(
        "Account created successfully.",
        session,
        now,
        policy.username_cooldown_days,
    );
    Ok((StatusCode::CREATED, Json(body)))
}

/// POST /api/auth/login/
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<UserEnvelope>> {
    let Json(req) = payload.map_err(bad_body)?;
    let user = {
        let conn = storage::lock(&state.db)?;
        ops::find_login_account(&conn, &req.username)?
    };
    let password = req.password;
    let user = blocking(move || ops::check_password(&user, &password).map(|()| user)).await?;

    let policy = state.account_policy();
    let now = Utc::now();
    let conn = storage::lock(&state.db)?;
    let session = ops::open_session(&conn, &policy, user.id, now)?;

    Ok(Json(UserEnvelope::session(
        "Login successful.",
        session,
        now,
        policy.username_cooldown_days,
    )))
}

/// POST /api/auth/logout/
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MessageResponse>> {
    let conn = storage::lock(&state.db)?;
    ops::logout(&conn, &auth.token_key)?;
    tracing::info!(user_id = auth.user.id, "logout");
    Ok(Json(MessageResponse::new("Logged out successfully.")))
}

/// GET /api/auth/profile/
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Json<UserEnvelope> {
    let cooldown = state.config.auth.username_change_cooldown_days;
    Json(UserEnvelope::profile(None, auth.user, Utc::now(), cooldown))
}

/// PATCH (or PUT) /api/auth/profile/
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: std::result::Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<UserEnvelope>> {
    let Json(req) = payload.map_err(bad_body)?;
    let policy = state.account_policy();
    let now = Utc::now();
    let conn = storage::lock(&state.db)?;
    let user = ops::update_profile(&conn, &policy, &auth.user, req.into(), now)?;

    Ok(Json(UserEnvelope::profile(
        Some("Profile updated successfully."),
        user,
        now,
        policy.username_cooldown_days,
    )))
}
