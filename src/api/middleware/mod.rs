//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Error details: development-mode enrichment of error bodies
//! 2. Rate limiter: reject early, save resources
//! 3. Auth validator: resolves the bearer token to an identity
//! 4. Audit logger: logs after auth, has user_id

pub mod audit;
pub mod auth;
pub mod details;
pub mod rate;

use axum::http::Request;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// Pull the `ApiContext` the outermost `Extension` layer put on the request.
pub(crate) fn api_context<B>(req: &Request<B>) -> Result<ApiContext, ApiError> {
    req.extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or_else(|| ApiError::Internal("missing API context".into()))
}
