//! Unified error type for todo-rs
//!
//! Built on `thiserror` so every layer can propagate with `?`; the api layer
//! turns each variant into a status code in one place.

use std::collections::BTreeMap;
use std::io;
use thiserror::Error;

/// Field name → human-readable messages, reported together.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// todo-rs error type
#[derive(Debug, Error)]
pub enum TodoError {
    /// Bad input shape/content (empty title, weak password, ...)
    #[error("Validation failed: {}", summarize(.0))]
    Validation(FieldErrors),

    /// Record absent, or owned by someone else. Callers cannot tell which.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing/invalid/expired token or inactive account
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error (config file, data directory)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Password hashing failure (not a wrong password)
    #[error("Password hash error: {0}")]
    PasswordHash(String),
}

/// todo-rs Result alias
pub type Result<T> = std::result::Result<T, TodoError>;

fn summarize(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}

impl TodoError {
    /// Single-field validation error
    pub fn validation(field: impl Into<String>, msg: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), vec![msg.into()]);
        Self::Validation(errors)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for errors caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound(_) | Self::Unauthorized(_)
        )
    }
}

/// Collects per-field messages, then fails once with all of them.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, msg: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(msg.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(TodoError::Validation(self.errors))
        }
    }
}
