//! Audit logging middleware.
//!
//! Logs every authenticated API request with user_id, method, path,
//! status and latency. Runs innermost (after auth has injected
//! `AuthContext`).

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::AuthContext;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user_id = req
        .extensions()
        .get::<AuthContext>()
        .map(|auth| auth.identity.user_id.to_string())
        .unwrap_or_else(|| "anonymous".to_string());
    let start = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        target: "medscan::audit",
        user_id = %user_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "API access"
    );
    response
}
