use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Orders service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum OrdersServiceError {
    #[error("invalid order payload: {0}")]
    InvalidOrder(String),
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("order already exists")]
    DuplicateOrder,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl OrdersServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidOrder(_) => "INVALID_ORDER",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::DuplicateOrder => "DUPLICATE_ORDER",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for OrdersServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            // The ingest use case collapses duplicates into an idempotent 201;
            // this arm only fires if a caller surfaces the variant directly.
            Self::DuplicateOrder => StatusCode::CONFLICT,
            Self::InvalidOrder(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Log 500s only. TraceLayer already records method/uri/status for
        // every request, and 4xx are expected client errors.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

/// Malformed request bodies become a structured 400 instead of axum's
/// plain-text rejection.
impl From<JsonRejection> for OrdersServiceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidOrder(rejection.body_text())
    }
}

/// Event channel faults, reported by the publisher and the subscription.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The broker did not acknowledge the message within the publish timeout.
    #[error("channel did not acknowledge within timeout")]
    Timeout,
    #[error("channel backend error: {0}")]
    Backend(#[from] anyhow::Error),
}
