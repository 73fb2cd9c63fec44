//! Report history endpoints. Every lookup is scoped to the caller.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiResponse, AuthContext};
use crate::db::{self, DEFAULT_LIST_LIMIT};
use crate::models::Report;

/// `GET /api/reports`: newest first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ApiResponse<Vec<Report>>>, ApiError> {
    let reports = ctx.core.db().with_conn(|conn| {
        db::list_reports(conn, &auth.identity.user_id, DEFAULT_LIST_LIMIT)
    })?;
    Ok(ApiResponse::ok(reports))
}

/// `GET /api/reports/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Report>>, ApiError> {
    let id = parse_report_id(&id)?;
    let report = ctx
        .core
        .db()
        .with_conn(|conn| db::get_report(conn, &auth.identity.user_id, &id))?;
    Ok(ApiResponse::ok(report))
}

/// `DELETE /api/reports/:id`: returns the removed report.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Report>>, ApiError> {
    let id = parse_report_id(&id)?;
    let report = ctx
        .core
        .db()
        .with_conn(|conn| db::delete_report(conn, &auth.identity.user_id, &id))?;
    tracing::info!(user_id = %auth.identity.user_id, report_id = %id, "Report deleted");
    Ok(ApiResponse::ok(report))
}

/// A malformed id can't name any report, so it is a plain 404.
fn parse_report_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Report not found".into()))
}
