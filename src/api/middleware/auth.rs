//! Bearer token authentication middleware.
//!
//! Accepts `Authorization: Bearer <token>` or the `auth-token` cookie,
//! resolves the token's hash to a live session, and injects
//! `AuthContext` into request extensions for downstream handlers.

use axum::http::header::{AUTHORIZATION, CACHE_CONTROL, COOKIE};
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use super::api_context;
use crate::api::error::ApiError;
use crate::api::types::AuthContext;
use crate::crypto::hash_token;
use crate::db;

pub const AUTH_COOKIE: &str = "auth-token";

/// Require a valid session token.
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = api_context(&req)?;

    let token = presented_token(req.headers()).ok_or(ApiError::Unauthorized)?;
    let token_hash = hash_token(&token);

    let identity = ctx
        .core
        .db()
        .with_conn(|conn| db::find_identity(conn, &token_hash, &Utc::now()))?
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(AuthContext {
        identity,
        token_hash,
    });

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}

/// Token from the `Authorization` header, else from the `auth-token` cookie.
pub fn presented_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == AUTH_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
