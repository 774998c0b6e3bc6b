use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Top-level application error. Every variant renders as
/// `(status, {"error": "..."})`; internal failures are logged in full and
/// reported to the caller with a generic message.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Database errors ──────────────────────────────────────────────────────
    #[error("Database query failed: {message}")]
    DatabaseQueryFailed {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    // ── Request errors ───────────────────────────────────────────────────────
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Field '{field_name}' cannot be empty")]
    EmptyField { field_name: String },

    #[error("Field '{field_name}' exceeds max length of {max_length} (actual: {actual_length})")]
    FieldTooLong { field_name: String, max_length: usize, actual_length: usize },

    #[error("{0}")]
    BadRequest(String),

    // ── Upstream errors ──────────────────────────────────────────────────────
    #[error("Rate limit exceeded, please try again later.")]
    UpstreamRateLimited,

    #[error("AI credits exhausted, please contact the portal administrators.")]
    UpstreamPaymentRequired,

    #[error("AI gateway error")]
    UpstreamFailed { status: u16, body: String },

    #[error("AI service is not configured")]
    RelayNotConfigured,

    #[error("Upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    // ── Hook errors ──────────────────────────────────────────────────────────
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Email delivery failed: {0}")]
    EmailDelivery(String),

    #[error("Template rendering failed: {0}")]
    Template(#[from] askama::Error),

    // ── System errors ────────────────────────────────────────────────────────
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn db_query(message: impl Into<String>, source: sqlx::Error) -> Self {
        AppError::DatabaseQueryFailed { message: message.into(), source }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::EmptyField { .. } | AppError::FieldTooLong { .. } | AppError::BadRequest(_)
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            e if e.is_validation() => StatusCode::BAD_REQUEST,
            AppError::Unauthorized | AppError::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
            AppError::UpstreamRateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::UpstreamPaymentRequired => StatusCode::PAYMENT_REQUIRED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller.
    fn client_message(&self) -> String {
        match self {
            AppError::DatabaseQueryFailed { .. }
            | AppError::Http(_)
            | AppError::Template(_)
            | AppError::Unexpected(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = ?self, "request failed");
        }
        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_bad_request() {
        let err = AppError::EmptyField { field_name: "content".into() };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_statuses_are_preserved() {
        assert_eq!(AppError::UpstreamRateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(AppError::UpstreamPaymentRequired.status(), StatusCode::PAYMENT_REQUIRED);
        let err = AppError::UpstreamFailed { status: 503, body: "down".into() };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "AI gateway error");
    }

    #[test]
    fn internal_details_are_hidden() {
        let err = AppError::Unexpected("secret path /etc/x".into());
        assert_eq!(err.client_message(), "Internal server error");
    }
}
