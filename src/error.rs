use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Error taxonomy for the hub, realized as one enum so every fallible
/// path in the pipeline returns the same currency.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("authentication failed")]
    Auth,

    #[error("capacity exceeded: {0}")]
    Capacity(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HubError {
    fn status(&self) -> StatusCode {
        match self {
            HubError::Validation(_) => StatusCode::BAD_REQUEST,
            HubError::Auth => StatusCode::UNAUTHORIZED,
            HubError::Capacity(_) => StatusCode::SERVICE_UNAVAILABLE,
            HubError::NotFound(_) => StatusCode::NOT_FOUND,
            HubError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
            HubError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        // AuthError never leaks which check failed.
        let message = match &self {
            HubError::Auth => "unauthorized".to_string(),
            HubError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };

        if matches!(self, HubError::Internal(_)) {
            tracing::error!(error = %self, "internal error");
        }

        (self.status(), Json(json!({ "error": message }))).into_response()
    }
}

pub type HubResult<T> = Result<T, HubError>;
