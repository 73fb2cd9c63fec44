//! Account endpoints.
//!
//! `POST /api/auth/register` and `POST /api/auth/login` are unprotected
//! and return a fresh session token. `GET /api/auth/me` and
//! `POST /api/auth/logout` require one.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::middleware::auth::AUTH_COOKIE;
use crate::api::types::{ApiContext, ApiResponse, AuthContext};
use crate::config::TOKEN_TTL_SECS;
use crate::crypto::{
    generate_token, hash_password, hash_token, reject_unknown_account, verify_password,
};
use crate::db::{self, DatabaseError};
use crate::models::{Identity, User};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: Identity,
}

/// `POST /api/auth/register`
pub async fn register(
    State(ctx): State<ApiContext>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let name = request.name.trim().to_string();
    let email = normalize_email(&request.email);
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".into()));
    }
    if !looks_like_email(&email) {
        return Err(ApiError::BadRequest("A valid email is required".into()));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let iterations = ctx.core.config.password_iterations;
    let password = request.password;
    let password_hash =
        tokio::task::spawn_blocking(move || hash_password(&password, iterations)).await?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email,
        name,
        password_hash,
        created_at: now,
        updated_at: now,
    };
    ctx.core
        .db()
        .with_conn(|conn| db::insert_user(conn, &user))
        .map_err(|e| match e {
            DatabaseError::ConstraintViolation(_) => {
                ApiError::Conflict("An account with this email already exists".into())
            }
            other => other.into(),
        })?;
    tracing::info!(user_id = %user.id, "User registered");

    start_session(&ctx, Identity::from(&user))
}

/// `POST /api/auth/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let email = normalize_email(&request.email);
    if email.is_empty() || request.password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".into()));
    }

    let user = ctx
        .core
        .db()
        .with_conn(|conn| db::get_user_by_email(conn, &email))?;

    // A missing account costs the same hashing work as a wrong password.
    let stored = user.as_ref().map(|u| u.password_hash.clone());
    let iterations = ctx.core.config.password_iterations;
    let password = request.password;
    tokio::task::spawn_blocking(move || match stored {
        Some(stored) => verify_password(&password, &stored),
        None => reject_unknown_account(&password, iterations),
    })
    .await??;
    let user = user.ok_or(ApiError::InvalidCredentials)?;

    tracing::info!(user_id = %user.id, "User logged in");
    start_session(&ctx, Identity::from(&user))
}

/// `GET /api/auth/me`
pub async fn me(Extension(auth): Extension<AuthContext>) -> Json<ApiResponse<Identity>> {
    ApiResponse::ok(auth.identity)
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}

/// `POST /api/auth/logout`: revokes the presented token only.
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Response, ApiError> {
    let removed = ctx
        .core
        .db()
        .with_conn(|conn| db::delete_session(conn, &auth.token_hash))?;
    tracing::info!(user_id = %auth.identity.user_id, "User logged out");

    let mut response = ApiResponse::ok(LogoutResponse {
        logged_out: removed,
    })
    .into_response();
    response.headers_mut().insert(
        SET_COOKIE,
        HeaderValue::from_static("auth-token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );
    Ok(response)
}

/// Issue a token for `identity`, store its hash, and set the cookie.
fn start_session(ctx: &ApiContext, identity: Identity) -> Result<Response, ApiError> {
    let token = generate_token();
    let now = Utc::now();
    let expires_at = now + Duration::seconds(TOKEN_TTL_SECS);

    ctx.core.db().with_conn(|conn| {
        db::purge_expired_sessions(conn, &now)?;
        db::insert_session(conn, &hash_token(&token), &identity.user_id, &now, &expires_at)
    })?;

    let cookie = format!(
        "{AUTH_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={TOKEN_TTL_SECS}"
    );
    let mut response = ApiResponse::ok(SessionResponse {
        token,
        user: identity,
    })
    .into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    Ok(response)
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !email.contains(' ')
        }
        None => false,
    }
}
