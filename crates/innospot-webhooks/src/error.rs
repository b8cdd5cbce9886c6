//! Error types for the webhook system.
//!
//! Only operator/programmer errors live here. Transport and HTTP failures
//! during delivery are recorded on the attempt (see
//! [`DeliveryFailure`](crate::models::DeliveryFailure)) and never surface
//! as a `WebhookError`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Webhook system error variants.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("SSRF protection: {0}")]
    SsrfDetected(String),

    #[error("Invalid webhook: {0}")]
    Validation(String),

    #[error("Invalid authentication config: {0}")]
    Configuration(String),

    #[error("Webhook limit ({limit}) reached for owner")]
    WebhookLimitExceeded { limit: usize },

    #[error("Webhook not found")]
    WebhookNotFound,

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl WebhookError {
    /// True for the errors raised when a config fails validation at write time.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InvalidUrl(_) | Self::SsrfDetected(_)
        )
    }
}

impl From<innospot_db::DbError> for WebhookError {
    fn from(err: innospot_db::DbError) -> Self {
        match err {
            innospot_db::DbError::Query(e) => Self::Database(e),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// JSON error response returned by webhook API endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            WebhookError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            WebhookError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "invalid_url"),
            WebhookError::SsrfDetected(_) => (StatusCode::BAD_REQUEST, "ssrf_detected"),
            WebhookError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            WebhookError::Configuration(_) => (StatusCode::BAD_REQUEST, "configuration_error"),
            WebhookError::WebhookLimitExceeded { .. } => {
                (StatusCode::CONFLICT, "webhook_limit_exceeded")
            }
            WebhookError::WebhookNotFound => (StatusCode::NOT_FOUND, "webhook_not_found"),
            WebhookError::UnknownEvent(_) => (StatusCode::NOT_FOUND, "unknown_event"),
            WebhookError::EncryptionFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "encryption_error")
            }
            WebhookError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Webhook API request failed");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            status: status.as_u16(),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, WebhookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_class() {
        assert!(WebhookError::Validation("x".into()).is_validation());
        assert!(WebhookError::InvalidUrl("x".into()).is_validation());
        assert!(WebhookError::SsrfDetected("x".into()).is_validation());
        assert!(!WebhookError::Configuration("x".into()).is_validation());
        assert!(!WebhookError::WebhookNotFound.is_validation());
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (WebhookError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (WebhookError::Configuration("bad".into()), StatusCode::BAD_REQUEST),
            (WebhookError::WebhookNotFound, StatusCode::NOT_FOUND),
            (
                WebhookError::WebhookLimitExceeded { limit: 1 },
                StatusCode::CONFLICT,
            ),
            (WebhookError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
