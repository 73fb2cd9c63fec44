//! Per-client rate limiting middleware: 100 requests per 15 minutes per
//! client address.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::api_context;
use crate::api::error::ApiError;

/// Extract a rate-limit key from the request.
///
/// The peer address when the server was started with connect info;
/// in-process callers (tests) all share one bucket.
fn rate_key(req: &Request<axum::body::Body>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "local".to_string())
}

/// Returns 429 with `Retry-After` once a client exceeds its budget.
pub async fn limit(req: Request<axum::body::Body>, next: Next) -> Response {
    match limit_inner(req, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn limit_inner(req: Request<axum::body::Body>, next: Next) -> Result<Response, ApiError> {
    let ctx = api_context(&req)?;
    let key = rate_key(&req);

    // MutexGuard is !Send: must drop before .await via block scope
    {
        let mut limiter = ctx
            .rate_limiter
            .lock()
            .map_err(|_| ApiError::Internal("rate limiter lock".into()))?;

        limiter.check(&key).map_err(|retry_after| {
            tracing::warn!(client = %key, retry_after, "Rate limit exceeded");
            ApiError::RateLimited { retry_after }
        })?;
    }

    Ok(next.run(req).await)
}
