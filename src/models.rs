use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered risk tag. Declaration order doubles as `Ord` so callers can
/// compare severities directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        write!(f, "{s}")
    }
}

/// Pattern lifecycle tag derived from effective confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PatternStatus {
    Active,
    Cooling,
    Dormant,
}

impl std::fmt::Display for PatternStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PatternStatus::Active => "ACTIVE",
            PatternStatus::Cooling => "COOLING",
            PatternStatus::Dormant => "DORMANT",
        };
        write!(f, "{s}")
    }
}

/// Textual correlation confidence label (distinct from numeric
/// `base_confidence`/`effective_confidence`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLabel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConfidenceLabel::Low => "LOW",
            ConfidenceLabel::Medium => "MEDIUM",
            ConfidenceLabel::High => "HIGH",
        };
        write!(f, "{s}")
    }
}

/// Ingress message: one entity reporting one behavioral fingerprint.
/// Contains no PII by construction — only an opaque fingerprint, an
/// opaque entity id, a severity tag, and a timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFingerprint {
    pub entity_id: String,
    pub fingerprint: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// One (entity, pattern) observation edge as returned from the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub entity_id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
}

/// Result of C2's decay computation, bundling the three derived values
/// with the inputs that produced them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecayResult {
    pub base_confidence: f64,
    pub decay_score: f64,
    pub effective_confidence: f64,
    pub status: PatternStatus,
    pub last_seen: DateTime<Utc>,
    pub age_seconds: f64,
}

/// C3's finding that a fingerprint has been observed by enough distinct
/// entities within the correlation window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correlation {
    pub fingerprint: String,
    pub entity_count: usize,
    pub time_span_seconds: f64,
    pub confidence: ConfidenceLabel,
    pub observations: Vec<Observation>,
    pub base_confidence: f64,
    pub decay_score: f64,
    pub effective_confidence: f64,
    pub last_seen: DateTime<Utc>,
    pub pattern_status: PatternStatus,
}

/// Recommended entity response, mirrored from the original escalation
/// vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    ImmediateEscalation,
    UrgentReview,
    PriorityReview,
}

/// Internal escalation of a correlation past a severity threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub intent_type: String,
    pub fingerprint: String,
    pub severity: Severity,
    pub confidence: ConfidenceLabel,
    pub entity_count: usize,
    pub time_span_seconds: f64,
    pub description: String,
    pub rationale: String,
    pub recommendation: Recommendation,
    pub fraud_score: u8,
    pub timestamp: DateTime<Utc>,
    pub base_confidence: f64,
    pub decay_score: f64,
    pub effective_confidence: f64,
    pub last_seen: DateTime<Utc>,
    pub pattern_status: PatternStatus,
    pub time_since_last_seen_seconds: f64,
    pub decay_explanation: String,
}

/// Outward-facing recommendation produced from an alert. This is a
/// recommendation, not a command; entities retain sovereignty over
/// their own decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advisory {
    pub advisory_id: String,
    pub fingerprint: String,
    pub severity: String,
    pub message: String,
    pub recommended_actions: Vec<String>,
    pub entity_count: usize,
    pub confidence: String,
    pub fraud_score: u8,
    pub timestamp: DateTime<Utc>,
    pub base_confidence: f64,
    pub decay_score: f64,
    pub effective_confidence: f64,
    pub last_seen_timestamp: DateTime<Utc>,
    pub pattern_status: String,
    pub time_since_last_seen_seconds: f64,
    pub decay_explanation: String,
}

/// Per-pattern lifecycle counts, reported by C1's stats and C7's
/// `MetricsSummary` alike.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternStatusCounts {
    pub active: usize,
    pub cooling: usize,
    pub dormant: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub unique_patterns: usize,
    pub total_observations: u64,
    pub total_edges: usize,
    pub active_entities: usize,
    pub unique_entities: usize,
    pub memory_size_bytes: u64,
    pub temporal_coverage_seconds: i64,
    pub pattern_statuses: PatternStatusCounts,
    pub avg_effective_confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub uptime_seconds: f64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricsSummary {
    pub fingerprints_ingested: usize,
    pub correlations_detected: usize,
    pub alerts_escalated: usize,
    pub advisories_generated: usize,

    pub avg_ingestion_latency_ms: f64,
    pub avg_correlation_latency_ms: f64,
    pub p95_ingestion_latency_ms: f64,
    pub p95_correlation_latency_ms: f64,

    pub graph_size_nodes: usize,
    pub graph_size_edges: usize,
    pub active_patterns: usize,
    pub cooling_patterns: usize,
    pub dormant_patterns: usize,

    pub active_entities: usize,
    pub entities_by_fingerprints: std::collections::BTreeMap<String, u64>,

    pub advisories_by_severity: std::collections::BTreeMap<String, u64>,
    pub avg_fraud_score: f64,

    pub measurement_window_seconds: u64,
    pub timestamp: DateTime<Utc>,
}
