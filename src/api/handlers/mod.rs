//! API handlers

pub mod accounts;
pub mod tasks;
pub mod version;

use axum::{http::Uri, Json};
use serde::{Deserialize, Deserializer, Serialize};

use super::error::ErrorResponse;
use crate::error::TodoError;

pub(crate) const SUCCESS: &str = "success";

/// Body for endpoints that only report an outcome
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: SUCCESS,
            message: message.into(),
        }
    }
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Run CPU-bound work (password hashing) on the blocking pool so it
/// neither stalls a runtime worker nor holds the database lock.
pub(crate) async fn blocking<T, F>(work: F) -> crate::error::Result<T>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| TodoError::Io(std::io::Error::other(e)))?
}

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> (axum::http::StatusCode, Json<ErrorResponse>) {
    (
        axum::http::StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            status: "error",
            message: format!("No route for {}", uri.path()),
            errors: None,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blocking_returns_work_result() {
        assert_eq!(blocking(|| Ok(6 * 7)).await.unwrap(), 42);
        let err = blocking(|| -> crate::error::Result<()> { Err(TodoError::not_found("gone")) })
            .await
            .unwrap_err();
        assert!(matches!(err, TodoError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_blocking_panic_becomes_error() {
        let err = blocking(|| -> crate::error::Result<()> { panic!("hash worker died") })
            .await
            .unwrap_err();
        assert!(matches!(err, TodoError::Io(_)));
    }
}
