//! Version API handler

use axum::Json;
use serde::Serialize;

use super::SUCCESS;

#[derive(Serialize)]
pub struct VersionResponse {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
}

/// GET /api/version
pub async fn get_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        status: SUCCESS,
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}
