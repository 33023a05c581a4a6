//! Request logging middleware, adapted from a simpler predecessor that
//! lacked connection info: logs method, path, status, and latency for
//! every request except the liveness probe.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if path == "/health" {
        return next.run(request).await;
    }

    let started = Instant::now();
    let response = next.run(request).await;
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
    let status = response.status();

    if status.is_server_error() {
        tracing::warn!(%method, %path, %status, latency_ms, "request completed");
    } else {
        tracing::info!(%method, %path, %status, latency_ms, "request completed");
    }

    response
}
