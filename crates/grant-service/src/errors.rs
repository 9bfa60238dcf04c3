//! Access plane error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl and
//! render as the canonical flat envelope `{"error": CODE, "message": …}`.
//! Internal errors are logged server-side with full context and returned
//! to clients with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Access plane error type.
///
/// Maps to HTTP status codes:
/// - Validation: 400 Bad Request
/// - Unauthorized: 401 Unauthorized
/// - Forbidden: 403 Forbidden
/// - NotFound: 404 Not Found
/// - Conflict: 409 Conflict
/// - RateLimited: 429 Too Many Requests
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed input or unknown enum value.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or invalid tenant credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but the resource belongs to another tenant.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Referenced resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request is incompatible with current state.
    #[allow(dead_code)] // taxonomy hook; no REST path conflicts today
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Exceeded allowance (hook for future rate limiting).
    #[allow(dead_code)]
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Unexpected fault.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// The stable code string for the error envelope.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::RateLimited => "RATE_LIMITED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Internal(detail) => {
                // Log the real fault server-side; clients get a generic line.
                tracing::error!(target: "ag.errors", error = %detail, "Internal error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let envelope = ErrorEnvelope {
            error: self.code(),
            message,
        };
        (self.status_code(), Json(envelope)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::RateLimited.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_code_strings() {
        assert_eq!(ApiError::Validation("x".into()).code(), "VALIDATION_ERROR");
        assert_eq!(ApiError::Unauthorized("x".into()).code(), "UNAUTHORIZED");
        assert_eq!(ApiError::Forbidden("x".into()).code(), "FORBIDDEN");
        assert_eq!(ApiError::NotFound("x".into()).code(), "NOT_FOUND");
        assert_eq!(ApiError::Conflict("x".into()).code(), "CONFLICT");
        assert_eq!(ApiError::RateLimited.code(), "RATE_LIMITED");
        assert_eq!(ApiError::Internal("x".into()).code(), "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_envelope_shape() {
        let response = ApiError::NotFound("room does not exist".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"], "NOT_FOUND");
        assert_eq!(body["message"], "Not found: room does not exist");
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response =
            ApiError::Internal("secret key unreachable at 10.0.0.5".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"], "INTERNAL_ERROR");
        assert_eq!(body["message"], "An internal error occurred");
    }
}
