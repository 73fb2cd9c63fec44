//! Analysis endpoint: run the pipeline over an uploaded image.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiResponse, AuthContext};
use crate::models::Analysis;
use crate::pipeline::analysis::analyze_report;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Upload URL (or bare filename) returned by `POST /api/upload`.
    #[serde(default, alias = "imageReference")]
    pub image_url: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub report_id: Uuid,
    pub analysis: Analysis,
}

/// `POST /api/analyze`
///
/// OCR, the model call, and the database write are all blocking, so the
/// whole run goes to the blocking pool.
pub async fn analyze(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AnalyzeResponse>>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let core = Arc::clone(&ctx.core);
    let identity = auth.identity;
    let report = tokio::task::spawn_blocking(move || {
        analyze_report(&core, &identity, &request.image_url, &request.title)
    })
    .await??;

    Ok(ApiResponse::ok(AnalyzeResponse {
        report_id: report.id,
        analysis: report.analysis,
    }))
}
