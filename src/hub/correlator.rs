//! Temporal Correlator (C3).
//!
//! A pattern appearing once is noise. The same pattern appearing across
//! multiple entities in a short time window is intelligence. This
//! module decides which is which, and attaches decay metadata to
//! whichever correlations it finds.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::config::HubConfig;
use crate::hub::brg::BehavioralRiskGraph;
use crate::hub::decay;
use crate::models::{ConfidenceLabel, Correlation};

/// Map `(entity_count, time_span)` to a textual confidence label and a
/// numeric base confidence.
fn label_and_base(entity_count: usize, span_seconds: f64) -> (ConfidenceLabel, f64) {
    if entity_count >= 3 && span_seconds < 180.0 {
        (ConfidenceLabel::High, 0.9)
    } else if entity_count >= 2 && span_seconds < 300.0 {
        (ConfidenceLabel::Medium, 0.75)
    } else {
        (ConfidenceLabel::Low, 0.5)
    }
}

/// Decide whether `fingerprint`, given its recent observations, shows
/// cross-entity correlation. Returns `None` with no side effects when
/// it does not; never raises.
pub fn detect_correlation(
    config: &HubConfig,
    brg: &BehavioralRiskGraph,
    fingerprint: &str,
    now: DateTime<Utc>,
) -> Option<Correlation> {
    let window = chrono::Duration::seconds(config.time_window_seconds as i64);
    let observations = brg.recent_observations(fingerprint, window, now);
    if observations.is_empty() {
        return None;
    }

    let entity_count = observations
        .iter()
        .map(|o| o.entity_id.clone())
        .collect::<HashSet<_>>()
        .len();
    if entity_count < config.entity_threshold {
        return None;
    }

    let span_seconds = if observations.len() > 1 {
        (observations.last().unwrap().timestamp - observations.first().unwrap().timestamp)
            .num_milliseconds() as f64
            / 1000.0
    } else {
        0.0
    };

    let (confidence, base) = label_and_base(entity_count, span_seconds);
    let last_seen = observations.last().unwrap().timestamp;
    let decay_result = decay::apply_decay(
        &config.decay_windows,
        &config.status_thresholds,
        base,
        last_seen,
        now,
    );

    Some(Correlation {
        fingerprint: fingerprint.to_string(),
        entity_count,
        time_span_seconds: span_seconds,
        confidence,
        observations,
        base_confidence: decay_result.base_confidence,
        decay_score: decay_result.decay_score,
        effective_confidence: decay_result.effective_confidence,
        last_seen,
        pattern_status: decay_result.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PatternStatus, Severity};

    fn ts(seconds: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn no_correlation_below_entity_threshold() {
        let config = HubConfig::default();
        let mut brg = BehavioralRiskGraph::new(3600);
        brg.add_observation("fp", "a", Severity::High, ts(0), 0.5, 1.0, 0.5, PatternStatus::Active);
        assert!(detect_correlation(&config, &brg, "fp", ts(1)).is_none());
    }

    #[test]
    fn medium_correlation_at_two_entities() {
        let config = HubConfig::default();
        let mut brg = BehavioralRiskGraph::new(3600);
        brg.add_observation("fp", "a", Severity::High, ts(0), 0.5, 1.0, 0.5, PatternStatus::Active);
        brg.add_observation("fp", "b", Severity::High, ts(60), 0.5, 1.0, 0.5, PatternStatus::Active);

        let corr = detect_correlation(&config, &brg, "fp", ts(60)).unwrap();
        assert_eq!(corr.entity_count, 2);
        assert_eq!(corr.confidence, ConfidenceLabel::Medium);
        assert_eq!(corr.base_confidence, 0.75);
        assert_eq!(corr.effective_confidence, 0.75);
    }

    #[test]
    fn high_correlation_at_three_entities_within_three_minutes() {
        let config = HubConfig::default();
        let mut brg = BehavioralRiskGraph::new(3600);
        brg.add_observation("fp", "a", Severity::High, ts(0), 0.5, 1.0, 0.5, PatternStatus::Active);
        brg.add_observation("fp", "b", Severity::High, ts(90), 0.5, 1.0, 0.5, PatternStatus::Active);
        brg.add_observation("fp", "c", Severity::High, ts(170), 0.5, 1.0, 0.5, PatternStatus::Active);

        let corr = detect_correlation(&config, &brg, "fp", ts(170)).unwrap();
        assert_eq!(corr.entity_count, 3);
        assert_eq!(corr.confidence, ConfidenceLabel::High);
        assert_eq!(corr.base_confidence, 0.9);
    }

    #[test]
    fn absent_pattern_yields_none() {
        let config = HubConfig::default();
        let brg = BehavioralRiskGraph::new(3600);
        assert!(detect_correlation(&config, &brg, "missing", ts(0)).is_none());
    }
}
