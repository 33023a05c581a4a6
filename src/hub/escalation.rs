//! Escalation Engine (C4).
//!
//! Not every correlation is fraud. This turns a correlation into an
//! internal alert only once entity count clears a configured
//! threshold, and scores it using the *decayed* effective confidence so
//! a stale pattern can never outscore a fresh one with the same raw
//! correlation shape.

use chrono::Utc;

use crate::config::HubConfig;
use crate::models::{Alert, Correlation, Recommendation, Severity};

fn severity_for(config: &HubConfig, entity_count: usize) -> Option<Severity> {
    if entity_count >= config.critical_threshold {
        Some(Severity::Critical)
    } else if entity_count >= config.high_threshold {
        Some(Severity::High)
    } else if entity_count >= config.medium_threshold {
        Some(Severity::Medium)
    } else {
        None
    }
}

fn recommendation_for(severity: Severity) -> Recommendation {
    match severity {
        Severity::Critical => Recommendation::ImmediateEscalation,
        Severity::High => Recommendation::UrgentReview,
        _ => Recommendation::PriorityReview,
    }
}

/// `score = clamp(min(n*20, 60) + trunc(effective_confidence*30) - (10 if span > 600s else 0), 0, 100)`.
/// The confidence bonus truncates rather than rounds to nearest, matching
/// the scenario fixtures (e.g. 0.75 effective confidence contributes 22,
/// not 23).
fn fraud_score(correlation: &Correlation) -> u8 {
    let base = (correlation.entity_count as i64 * 20).min(60);
    let confidence_bonus = (correlation.effective_confidence * 30.0) as i64;
    let span_penalty = if correlation.time_span_seconds > 600.0 { 10 } else { 0 };
    (base + confidence_bonus - span_penalty).clamp(0, 100) as u8
}

fn alert_id(fingerprint: &str, now: chrono::DateTime<Utc>) -> String {
    format!(
        "ALT-{}-{}",
        now.format("%Y%m%d%H%M%S"),
        &fingerprint[..fingerprint.len().min(8)]
    )
}

/// Evaluate a correlation and escalate if thresholds are met. Returns
/// `None` (never raises) when entity count is below every threshold.
pub fn evaluate(config: &HubConfig, correlation: &Correlation) -> Option<Alert> {
    let severity = severity_for(config, correlation.entity_count)?;
    let score = fraud_score(correlation);
    let now = Utc::now();

    let fp_short = &correlation.fingerprint[..correlation.fingerprint.len().min(8)];
    let description = format!(
        "{severity} fraud intent detected: Pattern {fp_short}... observed across \
         {} entities within {:.0}s. Confidence: {}. Recommend immediate investigation \
         and potential coordinated response.",
        correlation.entity_count, correlation.time_span_seconds, correlation.confidence
    );

    let fp_medium = &correlation.fingerprint[..correlation.fingerprint.len().min(12)];
    let rationale = format!(
        "Pattern {fp_medium}... observed across {} entities within {:.0}s. \
         Fraud score: {score}/100. Severity: {severity}. Confidence: {}.",
        correlation.entity_count, correlation.time_span_seconds, correlation.confidence
    );

    let time_since_last_seen_seconds =
        (now - correlation.last_seen).num_milliseconds() as f64 / 1000.0;

    Some(Alert {
        alert_id: alert_id(&correlation.fingerprint, now),
        intent_type: "COORDINATED_FRAUD".to_string(),
        fingerprint: correlation.fingerprint.clone(),
        severity,
        confidence: correlation.confidence,
        entity_count: correlation.entity_count,
        time_span_seconds: correlation.time_span_seconds,
        description,
        rationale,
        recommendation: recommendation_for(severity),
        fraud_score: score,
        timestamp: now,
        base_confidence: correlation.base_confidence,
        decay_score: correlation.decay_score,
        effective_confidence: correlation.effective_confidence,
        last_seen: correlation.last_seen,
        pattern_status: correlation.pattern_status,
        time_since_last_seen_seconds,
        decay_explanation: format!(
            "Pattern lifecycle: {}, decay={:.2}",
            correlation.pattern_status, correlation.decay_score
        ),
    })
}
