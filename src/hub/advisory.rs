//! Advisory Builder (C5).
//!
//! Alerts are internal. Advisories are external. This converts threat
//! intelligence into action recommendations for entities, with no
//! visibility into or dependency on the graph itself.

use chrono::Utc;

use crate::models::{Advisory, Alert, ConfidenceLabel, PatternStatus, Severity};

fn confidence_to_severity(confidence: ConfidenceLabel) -> Severity {
    match confidence {
        ConfidenceLabel::High => Severity::Critical,
        ConfidenceLabel::Medium => Severity::High,
        ConfidenceLabel::Low => Severity::Medium,
    }
}

fn status_prefix(status: PatternStatus) -> &'static str {
    match status {
        PatternStatus::Cooling => "[COOLING PATTERN] ",
        PatternStatus::Dormant => "[DORMANT PATTERN] ",
        PatternStatus::Active => "",
    }
}

fn actions_for(severity: Severity, status: PatternStatus) -> Vec<String> {
    let prefix = status_prefix(status);
    let mut actions: Vec<String> = match severity {
        Severity::Critical => vec![
            format!("{prefix}IMMEDIATE: Flag all matching transactions for manual review"),
            "IMMEDIATE: Implement temporary transaction limits on affected accounts".into(),
            "URGENT: Notify fraud investigation team for coordinated response".into(),
            "URGENT: Check for additional correlated patterns in recent history".into(),
            "RECOMMENDED: Share findings with peer institutions via secure channel".into(),
            "RECOMMENDED: Review and update fraud detection rules based on pattern".into(),
        ],
        Severity::High => vec![
            format!("{prefix}URGENT: Flag matching transactions for priority review"),
            "URGENT: Monitor affected accounts for additional suspicious activity".into(),
            "RECOMMENDED: Notify fraud team for investigation".into(),
            "RECOMMENDED: Check transaction history for similar patterns".into(),
            "OPTIONAL: Consider enhanced authentication for affected accounts".into(),
        ],
        Severity::Medium => vec![
            format!("{prefix}RECOMMENDED: Add matching transactions to review queue"),
            "RECOMMENDED: Monitor accounts for pattern recurrence".into(),
            "OPTIONAL: Alert fraud analysts for manual inspection".into(),
            "OPTIONAL: Document pattern for future rule refinement".into(),
        ],
        Severity::Low => vec!["INFORMATIONAL: Pattern noted, no immediate action required".into()],
    };

    match status {
        PatternStatus::Dormant => {
            actions.push("NOTE: This is a dormant pattern - verify if still actively occurring".into())
        }
        PatternStatus::Cooling => {
            actions.push("NOTE: Pattern cooling down - last observed several minutes ago".into())
        }
        PatternStatus::Active => {}
    }

    actions
}

fn decay_explanation(alert: &Alert) -> String {
    let minutes_since = alert.time_since_last_seen_seconds / 60.0;
    match alert.pattern_status {
        PatternStatus::Active => format!(
            "Pattern is ACTIVE (last seen {minutes_since:.1} min ago). Base confidence \
             {:.2}% remains high with minimal decay (decay factor {:.2}). This is a fresh, \
             actively occurring pattern requiring immediate attention.",
            alert.base_confidence * 100.0,
            alert.decay_score
        ),
        PatternStatus::Cooling => format!(
            "Pattern is COOLING (last seen {minutes_since:.1} min ago). Base confidence \
             {:.2}% has been reduced to {:.2}% due to time decay (factor {:.2}). Pattern may \
             be slowing down but still warrants monitoring.",
            alert.base_confidence * 100.0,
            alert.effective_confidence * 100.0,
            alert.decay_score
        ),
        PatternStatus::Dormant => format!(
            "Pattern is DORMANT (last seen {minutes_since:.1} min ago). Base confidence \
             {:.2}% has significantly decayed to {:.2}% (factor {:.2}). This is a stale \
             pattern - verify if still actively occurring before taking action.",
            alert.base_confidence * 100.0,
            alert.effective_confidence * 100.0,
            alert.decay_score
        ),
    }
}

fn message_for(alert: &Alert, severity: Severity) -> String {
    let fp_short = &alert.fingerprint[..alert.fingerprint.len().min(12)];
    let minutes_since_last_seen = alert.time_since_last_seen_seconds / 60.0;

    format!(
        "BRIDGE Hub Fraud Advisory\n\n\
         Severity: {severity}\n\
         Fraud Score: {}/100\n\
         Confidence: {}\n\
         Pattern Status: {}\n\
         Effective Confidence: {:.2}%\n\
         Last Seen: {minutes_since_last_seen:.1} minutes ago\n\n\
         A coordinated fraud pattern has been detected across {} financial institutions \
         within a {:.0}s window. This behavioral signature (Pattern ID: {fp_short}...) \
         suggests an organized fraud operation.\n\n\
         PATTERN CHARACTERISTICS:\n\
         - Multi-entity coordination detected\n\
         - Rapid succession execution\n\
         - Behavioral anomaly correlation confirmed\n\
         - Pattern lifecycle: {} (decay factor: {:.2})\n\n\
         DECAY ANALYSIS:\n\
         {}\n\n\
         PRIVACY NOTE: This advisory is based on behavioral fingerprints only. No customer \
         PII or transaction data has been shared between institutions.\n\n\
         Timestamp: {}Z",
        alert.fraud_score,
        alert.confidence,
        alert.pattern_status,
        alert.effective_confidence * 100.0,
        alert.entity_count,
        alert.time_span_seconds,
        alert.pattern_status,
        alert.decay_score,
        decay_explanation(alert),
        alert.timestamp.to_rfc3339(),
    )
}

fn advisory_id(fingerprint: &str, timestamp: chrono::DateTime<Utc>) -> String {
    format!(
        "ADV-{}-{}",
        timestamp.format("%Y%m%d-%H%M%S"),
        &fingerprint[..fingerprint.len().min(8)]
    )
}

/// Render an `Alert` into an outward-facing `Advisory`.
pub fn build_advisory(alert: &Alert) -> Advisory {
    let severity = confidence_to_severity(alert.confidence);
    let actions = actions_for(severity, alert.pattern_status);
    let message = message_for(alert, severity);
    let explanation = decay_explanation(alert);

    Advisory {
        advisory_id: advisory_id(&alert.fingerprint, alert.timestamp),
        fingerprint: alert.fingerprint.clone(),
        severity: severity.to_string(),
        message,
        recommended_actions: actions,
        entity_count: alert.entity_count,
        confidence: alert.confidence.to_string(),
        fraud_score: alert.fraud_score,
        timestamp: Utc::now(),
        base_confidence: alert.base_confidence,
        decay_score: alert.decay_score,
        effective_confidence: alert.effective_confidence,
        last_seen_timestamp: alert.last_seen,
        pattern_status: alert.pattern_status.to_string(),
        time_since_last_seen_seconds: alert.time_since_last_seen_seconds,
        decay_explanation: explanation,
    }
}

/// An advisory indicating a pattern has stopped showing cross-entity
/// correlation. No caller in the ingest pipeline invokes this today
/// (kept as a publicly callable method per the design note that covers
/// it), since the hub never positively detects "a pattern stopped
/// correlating" — only the absence of a fresh correlation, which is not
/// itself an event.
pub fn build_all_clear(fingerprint: &str) -> Advisory {
    let fp_short = &fingerprint[..fingerprint.len().min(12)];
    Advisory {
        advisory_id: format!("ADV-CLEAR-{}", &fingerprint[..fingerprint.len().min(8)]),
        fingerprint: fingerprint.to_string(),
        severity: "INFO".to_string(),
        message: format!(
            "BRIDGE Hub Pattern Update\n\n\
             The previously flagged pattern (ID: {fp_short}...) has not shown coordinated \
             activity across entities in recent monitoring. Standard fraud detection \
             protocols can resume.\n\n\
             This does not indicate the pattern is safe - only that multi-entity \
             coordination has ceased. Continue monitoring individual transactions."
        ),
        recommended_actions: vec![
            "INFORMATIONAL: Pattern no longer shows cross-entity correlation".into(),
            "RECOMMENDED: Continue standard fraud monitoring".into(),
            "OPTIONAL: Review outcome of previous advisory actions".into(),
        ],
        entity_count: 0,
        confidence: "INFO".to_string(),
        fraud_score: 0,
        timestamp: Utc::now(),
        base_confidence: 0.0,
        decay_score: 0.0,
        effective_confidence: 0.0,
        last_seen_timestamp: Utc::now(),
        pattern_status: "DORMANT".to_string(),
        time_since_last_seen_seconds: 0.0,
        decay_explanation: "Pattern no longer meets correlation criteria.".to_string(),
    }
}
