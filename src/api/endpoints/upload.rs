//! Image upload endpoint.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiResponse, AuthContext};
use crate::uploads::StoredUpload;

/// Multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

/// `POST /api/upload`: store one image for the caller.
///
/// The type is sniffed from the bytes; the client's content type and
/// file extension are ignored.
pub async fn upload(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<StoredUpload>>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let original_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        let core = Arc::clone(&ctx.core);
        let user_id = auth.identity.user_id;
        let stored = tokio::task::spawn_blocking(move || {
            core.uploads().save(&user_id, &original_name, &bytes)
        })
        .await??;
        return Ok(ApiResponse::ok(stored));
    }

    Err(ApiError::BadRequest("No file uploaded".into()))
}
