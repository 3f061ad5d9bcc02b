use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Auth service domain error variants.
///
/// Every failure of `requestCode`/`verifyCode` surfaces as one of these; the
/// domain and usecase layers never log or swallow them.
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("invalid email")]
    InvalidIdentity,
    #[error("invalid code format")]
    InvalidCode,
    #[error("no pending code for this email")]
    CodeNotFound,
    #[error("invalid code")]
    CodeMismatch,
    #[error("code expired")]
    CodeExpired,
    #[error("too many failed attempts")]
    AttemptsExhausted,
    #[error("too many pending codes")]
    StoreFull,
    #[error("failed to deliver code")]
    DeliveryFailed(#[source] anyhow::Error),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AuthServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidIdentity => "INVALID_IDENTITY",
            Self::InvalidCode => "INVALID_CODE",
            Self::CodeNotFound => "CODE_NOT_FOUND",
            Self::CodeMismatch => "CODE_MISMATCH",
            Self::CodeExpired => "CODE_EXPIRED",
            Self::AttemptsExhausted => "ATTEMPTS_EXHAUSTED",
            Self::StoreFull => "STORE_FULL",
            Self::DeliveryFailed(_) => "DELIVERY_FAILED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the caller may succeed by repeating the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CodeMismatch | Self::StoreFull | Self::DeliveryFailed(_)
        )
    }
}

impl IntoResponse for AuthServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidIdentity
            | Self::InvalidCode
            | Self::CodeNotFound
            | Self::CodeMismatch
            | Self::CodeExpired => StatusCode::BAD_REQUEST,
            Self::AttemptsExhausted => StatusCode::TOO_MANY_REQUESTS,
            Self::StoreFull => StatusCode::SERVICE_UNAVAILABLE,
            Self::DeliveryFailed(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // 4xx are expected client errors and already show up in the trace layer.
        // Server-side failures need the anyhow chain for the root cause.
        match &self {
            Self::DeliveryFailed(e) => {
                tracing::error!(error = %format!("{e:#}"), kind = "DELIVERY_FAILED", "code delivery failed");
            }
            Self::Internal(e) => {
                tracing::error!(error = %format!("{e:#}"), kind = "INTERNAL", "internal error");
            }
            Self::StoreFull => {
                tracing::warn!(kind = "STORE_FULL", "pending code store at capacity");
            }
            _ => {}
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
