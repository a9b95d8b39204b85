//! Account operations: registration, login/logout, token authentication
//! and profile updates.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;

use crate::credentials;
use crate::error::{Result, TodoError, Validator};
use crate::model::{NewUser, ProfilePatch, User};
use crate::storage::config::AuthConfig;
use crate::storage::{tokens, users};

const USERNAME_MAX_CHARS: usize = 150;
const NAME_MAX_CHARS: usize = 150;
const PASSWORD_MIN_CHARS: usize = 8;

const INVALID_TOKEN: &str = "Invalid token.";

/// Account rules derived from `[auth]` config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountPolicy {
    pub token_ttl: Option<Duration>,
    pub username_cooldown_days: u32,
}

impl Default for AccountPolicy {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for AccountPolicy {
    fn from(config: &AuthConfig) -> Self {
        Self {
            token_ttl: config
                .token_ttl_hours
                .map(|hours| Duration::hours(i64::from(hours))),
            username_cooldown_days: config.username_change_cooldown_days,
        }
    }
}

/// Registration form
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

/// An authenticated user plus the freshly issued token key
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Field and uniqueness checks for a registration form, all reported
/// together. Run before hashing the password.
pub fn check_registration(conn: &Connection, form: &Registration) -> Result<()> {
    let mut v = Validator::new();

    let username = form.username.trim();
    check_username(&mut v, username);
    if v.is_empty() && users::username_taken(conn, username, None)? {
        v.add("username", "A user with this username already exists.");
    }

    if let Some(email) = normalize_email(form.email.as_deref()) {
        check_email(conn, &mut v, &email, None)?;
    }

    check_name(&mut v, "first_name", form.first_name.trim());
    check_name(&mut v, "last_name", form.last_name.trim());

    check_password_strength(&mut v, &form.password);
    if form.password != form.password_confirm {
        v.add("password_confirm", "Passwords do not match.");
    }
    v.finish()
}

/// Create an account from a form whose password is already hashed, and
/// log it in. The form is checked again since the hash is computed
/// without holding the connection.
pub fn register(
    conn: &Connection,
    policy: &AccountPolicy,
    form: Registration,
    password_hash: String,
    now: DateTime<Utc>,
) -> Result<Session> {
    check_registration(conn, &form)?;
    let expires_at = token_expiry(policy, now)?;

    let new = NewUser {
        username: form.username.trim().to_string(),
        email: normalize_email(form.email.as_deref()),
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        password_hash,
    };
    let user = users::insert_user(conn, &new, now)?;
    let token = issue_token(conn, user.id, now, expires_at)?;
    tracing::info!(user_id = user.id, username = %user.username, "account registered");
    Ok(Session { user, token })
}

/// First login step: the account named `username`.
pub fn find_login_account(conn: &Connection, username: &str) -> Result<User> {
    users::find_by_username(conn, username.trim())?.ok_or_else(|| {
        TodoError::validation("username", "No account found with this username.")
    })
}

/// Second login step. Argon2 verification is slow; callers run it
/// without holding the connection.
pub fn check_password(user: &User, password: &str) -> Result<()> {
    if !credentials::verify_password(password, &user.password_hash)? {
        tracing::warn!(user_id = user.id, "login rejected: wrong password");
        return Err(TodoError::validation("password", "Incorrect password."));
    }
    Ok(())
}

/// Last login step: stamp the login and issue a new token, unless the
/// account is (or meanwhile became) inactive.
pub fn open_session(
    conn: &Connection,
    policy: &AccountPolicy,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Session> {
    if !reload(conn, user_id)?.is_active {
        return Err(TodoError::validation(
            "username",
            "This account has been deactivated.",
        ));
    }
    let expires_at = token_expiry(policy, now)?;

    users::touch_last_login(conn, user_id, now)?;
    let token = issue_token(conn, user_id, now, expires_at)?;
    let user = reload(conn, user_id)?;
    tracing::info!(user_id, "login");
    Ok(Session { user, token })
}

/// Revoke the token that authenticated the request.
pub fn logout(conn: &Connection, token_key: &str) -> Result<()> {
    if !tokens::delete_token(conn, &credentials::token_digest(token_key))? {
        return Err(TodoError::unauthorized(INVALID_TOKEN));
    }
    Ok(())
}

/// Resolve the active user owning an unexpired `token_key`.
pub fn authenticate(conn: &Connection, token_key: &str, now: DateTime<Utc>) -> Result<User> {
    let digest = credentials::token_digest(token_key);
    let Some(record) = tokens::find_token(conn, &digest)? else {
        return Err(TodoError::unauthorized(INVALID_TOKEN));
    };
    if record.expires_at.is_some_and(|expires| expires <= now) {
        tokens::delete_token(conn, &digest)?;
        return Err(TodoError::unauthorized("Token has expired."));
    }
    match users::find_by_id(conn, record.user_id)? {
        Some(user) if user.is_active => Ok(user),
        _ => Err(TodoError::unauthorized("User inactive or deleted.")),
    }
}

/// Apply a partial profile update for `user`.
pub fn update_profile(
    conn: &Connection,
    policy: &AccountPolicy,
    user: &User,
    patch: ProfilePatch,
    now: DateTime<Utc>,
) -> Result<User> {
    let mut v = Validator::new();
    let mut updated = user.clone();

    if let Some(username) = patch.username {
        let username = username.trim().to_string();
        if username != user.username {
            let wait = user.days_until_username_change(now, policy.username_cooldown_days);
            if wait > 0 {
                v.add(
                    "username",
                    format!(
                        "You cannot change your username yet. Please wait {} more day(s).",
                        wait
                    ),
                );
            } else {
                check_username(&mut v, &username);
                if v.is_empty() && users::username_taken(conn, &username, Some(user.id))? {
                    v.add("username", "A user with this username already exists.");
                }
            }
            updated.username = username;
            updated.last_username_change = Some(now);
        }
    }

    if let Some(email) = patch.email {
        let email = normalize_email(email.as_deref());
        if email != user.email {
            if let Some(address) = email.as_deref() {
                check_email(conn, &mut v, address, Some(user.id))?;
            }
            updated.email = email;
        }
    }

    if let Some(first_name) = patch.first_name {
        updated.first_name = first_name.trim().to_string();
        check_name(&mut v, "first_name", &updated.first_name);
    }
    if let Some(last_name) = patch.last_name {
        updated.last_name = last_name.trim().to_string();
        check_name(&mut v, "last_name", &updated.last_name);
    }

    v.finish()?;
    users::save_profile(conn, &updated)?;
    tracing::debug!(user_id = user.id, "profile updated");
    reload(conn, user.id)
}

/// Activate or deactivate an account by username. Tokens of an inactive
/// account stop authenticating but are kept for reactivation.
pub fn set_active(conn: &Connection, username: &str, active: bool) -> Result<User> {
    let user = users::find_by_username(conn, username.trim())?
        .ok_or_else(|| TodoError::not_found(format!("No account named '{}'.", username)))?;
    users::set_active(conn, user.id, active)?;
    tracing::info!(user_id = user.id, active, "account status changed");
    reload(conn, user.id)
}

fn token_expiry(policy: &AccountPolicy, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    policy
        .token_ttl
        .map(|ttl| {
            now.checked_add_signed(ttl)
                .ok_or_else(|| TodoError::config("auth.token_ttl_hours is out of range"))
        })
        .transpose()
}

fn issue_token(
    conn: &Connection,
    user_id: i64,
    now: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<String> {
    let purged = tokens::purge_expired(conn, now)?;
    if purged > 0 {
        tracing::debug!(purged, "expired tokens removed");
    }
    let key = credentials::generate_token_key()?;
    tokens::insert_token(conn, &credentials::token_digest(&key), user_id, now, expires_at)?;
    Ok(key)
}

fn reload(conn: &Connection, user_id: i64) -> Result<User> {
    users::find_by_id(conn, user_id)?.ok_or_else(|| TodoError::not_found("User not found."))
}

fn check_username(v: &mut Validator, username: &str) {
    if username.is_empty() {
        v.add("username", "This field may not be blank.");
        return;
    }
    if username.chars().count() > USERNAME_MAX_CHARS {
        v.add(
            "username",
            format!(
                "Ensure this field has no more than {} characters.",
                USERNAME_MAX_CHARS
            ),
        );
    }
    let has_alnum = username.chars().any(|c| c.is_ascii_alphanumeric());
    if !has_alnum || !username.chars().all(|c| c == '_' || c.is_ascii_alphanumeric()) {
        v.add(
            "username",
            "Username can only contain letters, numbers, and underscores.",
        );
    }
}

fn check_name(v: &mut Validator, field: &str, value: &str) {
    if value.is_empty() {
        v.add(field, "This field may not be blank.");
    } else if value.chars().count() > NAME_MAX_CHARS {
        v.add(
            field,
            format!(
                "Ensure this field has no more than {} characters.",
                NAME_MAX_CHARS
            ),
        );
    }
}

fn check_password_strength(v: &mut Validator, password: &str) {
    if password.chars().count() < PASSWORD_MIN_CHARS {
        v.add(
            "password",
            format!(
                "Password must be at least {} characters long.",
                PASSWORD_MIN_CHARS
            ),
        );
    }
    if !password.chars().any(char::is_uppercase) {
        v.add(
            "password",
            "Password must contain at least one uppercase letter.",
        );
    }
    if !password.chars().any(char::is_lowercase) {
        v.add(
            "password",
            "Password must contain at least one lowercase letter.",
        );
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        v.add("password", "Password must contain at least one number.");
    }
}

/// Blank addresses are treated as "no email".
fn normalize_email(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn check_email(
    conn: &Connection,
    v: &mut Validator,
    email: &str,
    except_id: Option<i64>,
) -> Result<()> {
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !well_formed {
        v.add("email", "Enter a valid email address.");
        return Ok(());
    }
    if users::email_taken(conn, email, except_id)? {
        v.add("email", "A user with this email already exists.");
    }
    Ok(())
}
