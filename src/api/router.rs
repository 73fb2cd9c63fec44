//! HTTP router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! JSON routes live under `/api/`, stored images under `/uploads/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. CORS → 2. Error details → 3. Rate limiter → 4. Auth validator → 5. Audit logger

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::config::ServerConfig;
use crate::core_state::CoreState;

/// Multipart framing on top of the image itself.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Build the API router with the default rate limiter.
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

/// Build router from a pre-constructed `ApiContext`.
///
/// Lets callers (and tests) supply their own rate limiter.
pub fn build_router(ctx: ApiContext) -> Router {
    let config = &ctx.core.config;
    let upload_limit = config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    // Protected routes: auth + full middleware stack.
    //
    // Layers are applied from bottom (innermost) to top (outermost):
    //   Extension (outermost) → Rate limit → Auth → Audit (innermost) → Handler
    //
    // Extension must be outermost so all middleware can access ApiContext.
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/api/auth/me", get(endpoints::auth::me))
        .route("/api/auth/logout", post(endpoints::auth::logout))
        .route(
            "/api/upload",
            post(endpoints::upload::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/analyze", post(endpoints::analyze::analyze))
        .route("/api/reports", get(endpoints::reports::list))
        .route(
            "/api/reports/:id",
            get(endpoints::reports::detail).delete(endpoints::reports::remove),
        )
        .route("/api/diagnosis", get(endpoints::diagnosis::check))
        .route("/uploads/:user_id/:filename", get(endpoints::files::serve))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes (rate-limited only, no auth required)
    let unprotected = Router::new()
        .route("/api/health", get(endpoints::health::check))
        .route("/api/auth/register", post(endpoints::auth::register))
        .route("/api/auth/login", post(endpoints::auth::login))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx.clone()));

    let cors = cors_layer(config);

    Router::new()
        .merge(protected)
        .merge(unprotected)
        .layer(axum::middleware::from_fn(
            middleware::details::expose_in_development,
        ))
        .layer(axum::Extension(ctx))
        .layer(SetResponseHeaderLayer::if_not_present(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(cors)
}

/// Credentialed CORS for the configured web client origin.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    match HeaderValue::from_str(&config.frontend_url) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(
                frontend_url = %config.frontend_url,
                "FRONTEND_URL is not a valid origin; cross-origin requests will be refused"
            );
            layer
        }
    }
}
