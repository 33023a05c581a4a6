//! API-key authentication middleware.
//!
//! Simplified from a JWT-based scheme to a single shared-secret header
//! check: the core has no per-entity key differentiation requirement,
//! so there is nothing for a token scheme to buy here.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::HubError;
use crate::hub::Hub;

const API_KEY_HEADER: &str = "x-api-key";

/// Reject any request whose `X-API-Key` header doesn't match the
/// configured key. Never indicates which check failed.
pub async fn require_api_key(
    State(hub): State<Arc<Hub>>,
    request: Request,
    next: Next,
) -> Result<Response, HubError> {
    let configured_key = hub.config_snapshot().api_key;

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(key) if key == configured_key => Ok(next.run(request).await),
        _ => Err(HubError::Auth),
    }
}
