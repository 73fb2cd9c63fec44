//! Development-mode error enrichment.
//!
//! Errors with a generic client message carry their server-side detail in
//! a `HiddenDetail` response extension. In development mode this layer
//! copies it into the body as `error.details`; otherwise it is dropped.

use axum::body::{to_bytes, Body};
use axum::http::header::CONTENT_LENGTH;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::api_context;
use crate::api::error::{ApiError, HiddenDetail};

/// Error bodies are small JSON documents.
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

pub async fn expose_in_development(req: Request<Body>, next: Next) -> Response {
    let development = match api_context(&req) {
        Ok(ctx) => ctx.core.config.development,
        Err(e) => return e.into_response(),
    };

    let mut response = next.run(req).await;
    let Some(HiddenDetail(detail)) = response.extensions_mut().remove::<HiddenDetail>() else {
        return response;
    };
    if !development {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_ERROR_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => return ApiError::Internal(format!("error body: {e}")).into_response(),
    };
    let Ok(mut json) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
        return Response::from_parts(parts, Body::from(bytes));
    };
    if let Some(error) = json.get_mut("error").and_then(|e| e.as_object_mut()) {
        error.insert("details".into(), serde_json::Value::String(detail));
    }

    parts.headers.remove(CONTENT_LENGTH);
    match serde_json::to_vec(&json) {
        Ok(enriched) => Response::from_parts(parts, Body::from(enriched)),
        Err(e) => ApiError::Internal(format!("error body: {e}")).into_response(),
    }
}
