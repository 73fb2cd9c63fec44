//! Health check endpoint.

use axum::Json;
use serde::Serialize;

use crate::api::types::ApiResponse;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// `GET /api/health`: liveness probe, no auth.
pub async fn check() -> Json<ApiResponse<HealthResponse>> {
    ApiResponse::ok(HealthResponse {
        status: "ok",
        service: crate::config::APP_NAME,
        version: crate::config::APP_VERSION,
    })
}
