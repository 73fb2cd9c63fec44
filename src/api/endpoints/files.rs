//! Serves stored uploads back to their owner.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthContext};

/// `GET /uploads/:user_id/:filename`
///
/// Another user's directory answers 404, same as a missing file.
pub async fn serve(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path((user_id, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let owner = Uuid::parse_str(&user_id).ok();
    if owner != Some(auth.identity.user_id) {
        return Err(ApiError::NotFound("File not found".into()));
    }

    let mime = mime_guess::from_path(&filename).first_or_octet_stream();
    let core = Arc::clone(&ctx.core);
    let user_id = auth.identity.user_id;
    let bytes =
        tokio::task::spawn_blocking(move || core.uploads().read_file(&user_id, &filename))
            .await??;

    let mut response = bytes.into_response();
    if let Ok(value) = HeaderValue::from_str(mime.essence_str()) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    Ok(response)
}
