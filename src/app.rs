//! Axum router assembly, factored out of `main` so integration tests
//! can drive the HTTP surface without a real listener.

use std::sync::Arc;

use axum::middleware as axum_middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::auth;
use crate::hub::Hub;
use crate::middleware::request_logging;

pub fn build_router(hub: Arc<Hub>, prometheus_handle: PrometheusHandle) -> Router {
    let protected = Router::new()
        .route("/api/v1/fingerprints", post(api::ingest_fingerprint))
        .route("/api/v1/advisories", get(api::list_advisories))
        .route("/api/v1/stats", get(api::stats))
        .route("/api/v1/patterns/:fingerprint", get(api::pattern_history))
        .route("/api/v1/entities/:entity_id/activity", get(api::entity_activity))
        .route("/api/v1/metrics", get(api::metrics_summary))
        .route("/api/v1/graph/nodes", get(api::graph_nodes))
        .route("/api/v1/graph/edges", get(api::graph_edges))
        .route("/api/v1/config", patch(api::update_config))
        .route_layer(axum_middleware::from_fn_with_state(
            Arc::clone(&hub),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(api::health))
        .route("/metrics", get(move || async move { prometheus_handle.render() }))
        .merge(protected)
        .layer(axum_middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(hub)
}
