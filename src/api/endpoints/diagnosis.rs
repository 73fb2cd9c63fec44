//! Authenticated self-check.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiResponse, AuthContext};
use crate::db;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResponse {
    pub database_reachable: bool,
    pub report_count: i64,
    pub model_configured: bool,
    pub model: Option<String>,
    pub ocr_available: bool,
    pub uptime_secs: u64,
    pub version: &'static str,
}

/// `GET /api/diagnosis`
pub async fn check(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ApiResponse<DiagnosisResponse>>, ApiError> {
    let core = &ctx.core;
    let database_reachable = core.db().ping();
    let report_count = if database_reachable {
        core.db()
            .with_conn(|conn| db::count_reports(conn, &auth.identity.user_id))?
    } else {
        0
    };
    let vision = core.vision();

    Ok(ApiResponse::ok(DiagnosisResponse {
        database_reachable,
        report_count,
        model_configured: vision.is_some(),
        model: vision.map(|v| v.model_name().to_string()),
        ocr_available: core.ocr().is_available(),
        uptime_secs: core.uptime_secs(),
        version: crate::config::APP_VERSION,
    }))
}
