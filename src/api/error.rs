//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::core_state::CoreError;
use crate::crypto::CryptoError;
use crate::db::DatabaseError;
use crate::pipeline::analysis::AnalysisError;
use crate::uploads::UploadError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// Server-side detail for an error whose message is generic.
///
/// Rides along in the response extensions; the `error_details`
/// middleware copies it into the body in development mode only.
#[derive(Debug, Clone)]
pub struct HiddenDetail(pub String);

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: u64 },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, hidden) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
                None,
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid email or password".to_string(),
                None,
            ),
            ApiError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Too many requests. Retry after {retry_after}s"),
                None,
            ),
            ApiError::NotFound(detail) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone(), None)
            }
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone(), None)
            }
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "CONFLICT", detail.clone(), None),
            ApiError::AnalysisFailed(detail) => {
                tracing::error!(detail, "Analysis failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ANALYSIS_FAILED",
                    "Failed to analyze image. Please try again.".to_string(),
                    Some(detail.clone()),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    Some(detail.clone()),
                )
            }
        };

        let body = ErrorBody {
            success: false,
            error: ErrorDetail { code, message },
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimited { retry_after } = &self {
            if let Ok(val) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", val);
            }
        }
        if let Some(detail) = hidden {
            response.extensions_mut().insert(HiddenDetail(detail));
        }
        response
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, .. } => {
                ApiError::NotFound(format!("{entity_type} not found"))
            }
            DatabaseError::ConstraintViolation(detail) => ApiError::Conflict(detail),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidInput(detail) => ApiError::BadRequest(detail),
            AnalysisError::ImageNotFound(_) => ApiError::NotFound("Image file not found".into()),
            AnalysisError::ServiceFailure(e) => ApiError::AnalysisFailed(e.to_string()),
            AnalysisError::PersistenceFailure(e) => {
                ApiError::AnalysisFailed(format!("could not save report: {e}"))
            }
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::NotFound(_) => ApiError::NotFound("File not found".into()),
            UploadError::Io(e) => ApiError::Internal(format!("upload storage: {e}")),
            invalid => ApiError::BadRequest(invalid.to_string()),
        }
    }
}

impl From<CryptoError> for ApiError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::WrongPassword => ApiError::InvalidCredentials,
            CryptoError::MalformedHash => ApiError::Internal("stored password hash is malformed".into()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {err}"))
    }
}
