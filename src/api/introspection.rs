//! Read-only introspection surface: health, stats, pattern history,
//! entity activity, metrics summary, and runtime config update.
//!
//! Dashboard needs visibility, not control. Every handler here except
//! `update_config` only reads hub state.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::config::HubConfig;
use crate::error::{HubError, HubResult};
use crate::hub::brg::{EntityActivity, PatternDetails};
use crate::hub::Hub;
use crate::models::{GraphStats, HealthStatus, MetricsSummary};

pub async fn health(State(hub): State<Arc<Hub>>) -> Json<HealthStatus> {
    Json(hub.health().await)
}

pub async fn stats(State(hub): State<Arc<Hub>>) -> Json<GraphStats> {
    Json(hub.graph_stats().await)
}

#[derive(Debug, Serialize)]
#[serde(tag = "status")]
pub enum PatternHistory {
    #[serde(rename = "NOT_FOUND")]
    NotFound { fingerprint: String },
    #[serde(rename = "ACTIVE")]
    Active {
        fingerprint: String,
        observation_count: u64,
        entity_count: usize,
        first_seen: chrono::DateTime<chrono::Utc>,
        last_seen: chrono::DateTime<chrono::Utc>,
        base_confidence: f64,
        decay_score: f64,
        effective_confidence: f64,
        pattern_status: String,
    },
}

pub async fn pattern_history(
    State(hub): State<Arc<Hub>>,
    Path(fingerprint): Path<String>,
) -> HubResult<Json<PatternHistory>> {
    match hub.pattern_details(&fingerprint).await {
        Some(details) => Ok(Json(PatternHistory::Active {
            fingerprint: details.fingerprint,
            observation_count: details.observation_count,
            entity_count: details.entity_count,
            first_seen: details.first_seen,
            last_seen: details.last_seen,
            base_confidence: details.base_confidence,
            decay_score: details.decay_score,
            effective_confidence: details.effective_confidence,
            pattern_status: details.pattern_status.to_string(),
        })),
        None => Err(HubError::NotFound(format!("no pattern {fingerprint}"))),
    }
}

pub async fn metrics_summary(State(hub): State<Arc<Hub>>) -> Json<MetricsSummary> {
    Json(hub.metrics_summary().await)
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub hours: Option<i64>,
}

pub async fn entity_activity(
    State(hub): State<Arc<Hub>>,
    Path(entity_id): Path<String>,
    Query(params): Query<ActivityQuery>,
) -> HubResult<Json<EntityActivity>> {
    let hours = params.hours.unwrap_or(24);
    hub.entity_activity(&entity_id, hours)
        .await
        .map(Json)
        .ok_or_else(|| HubError::NotFound(format!("no activity for entity {entity_id}")))
}

pub async fn graph_nodes(State(hub): State<Arc<Hub>>) -> Json<Vec<PatternDetails>> {
    Json(hub.graph_nodes().await)
}

pub async fn graph_edges(State(hub): State<Arc<Hub>>) -> Json<Vec<String>> {
    Json(hub.graph_entities().await)
}

pub async fn update_config(
    State(hub): State<Arc<Hub>>,
    Json(patch): Json<BTreeMap<String, serde_json::Value>>,
) -> HubResult<Json<HubConfig>> {
    let updated = hub.update_config(&patch)?;
    Ok(Json(updated))
}
