//! Ingestion and advisory-poll routes: the two entity-facing endpoints
//! that drive the core pipeline.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::HubResult;
use crate::hub::Hub;
use crate::models::{Advisory, RiskFingerprint};

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub fingerprint: String,
    pub entity_id: String,
    pub correlation_detected: bool,
}

pub async fn ingest_fingerprint(
    State(hub): State<Arc<Hub>>,
    Json(payload): Json<RiskFingerprint>,
) -> HubResult<(StatusCode, Json<IngestResponse>)> {
    let outcome = hub.ingest(payload).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            status: "accepted",
            fingerprint: outcome.fingerprint_prefix,
            entity_id: outcome.entity_id,
            correlation_detected: outcome.correlation_detected,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct AdvisoryQuery {
    pub limit: Option<usize>,
    pub severity: Option<String>,
}

pub async fn list_advisories(
    State(hub): State<Arc<Hub>>,
    Query(params): Query<AdvisoryQuery>,
) -> Json<Vec<Advisory>> {
    let limit = params.limit.unwrap_or(10);
    let advisories = hub.recent_advisories(limit, params.severity.as_deref()).await;
    Json(advisories)
}
