//! Pattern decay engine (C2).
//!
//! Pure and stateless: every function here takes its inputs explicitly
//! and returns a value, with no access to shared state. Decay is
//! computed from a small discrete lookup table, never a continuous
//! exponential — predictability and auditability over smoothness.
//! Patterns are never deleted by decay, only downgraded.

use chrono::{DateTime, Utc};

use crate::config::{DecayWindow, StatusThresholds};
use crate::models::{DecayResult, PatternStatus};

/// Look up the decay score for an observation `age_seconds` old, walking
/// the windows in order and taking the first whose `max_seconds` bound
/// is satisfied (inclusive on the low side: an age exactly at a
/// boundary falls in the tighter window).
pub fn decay_score(windows: &[DecayWindow], age_seconds: f64) -> f64 {
    for window in windows {
        match window.max_seconds {
            Some(bound) if age_seconds <= bound => return window.decay_score,
            None => return window.decay_score,
            _ => continue,
        }
    }
    // Defensive fallback if the caller supplied a table with no
    // catch-all window; mirrors the effect of a final "stale" entry.
    windows.last().map(|w| w.decay_score).unwrap_or(0.2)
}

/// `effective_confidence = clamp(base * decay, 0, 1)`, rounded to four
/// decimals for stable wire output.
pub fn effective_confidence(base: f64, decay: f64) -> f64 {
    let raw = (base * decay).clamp(0.0, 1.0);
    (raw * 10000.0).round() / 10000.0
}

/// Deterministic mapping from effective confidence to lifecycle status.
pub fn status(effective: f64, thresholds: &StatusThresholds) -> PatternStatus {
    if effective >= thresholds.active_min {
        PatternStatus::Active
    } else if effective >= thresholds.cooling_min {
        PatternStatus::Cooling
    } else {
        PatternStatus::Dormant
    }
}

/// Bundle the three decay steps: score the age, derive effective
/// confidence, classify lifecycle status. Given identical inputs this
/// always returns bit-identical output.
pub fn apply_decay(
    windows: &[DecayWindow],
    thresholds: &StatusThresholds,
    base_confidence: f64,
    last_seen: DateTime<Utc>,
    now: DateTime<Utc>,
) -> DecayResult {
    let age_seconds = (now - last_seen).num_milliseconds() as f64 / 1000.0;
    let decay = decay_score(windows, age_seconds);
    let effective = effective_confidence(base_confidence, decay);
    DecayResult {
        base_confidence: (base_confidence * 10000.0).round() / 10000.0,
        decay_score: decay,
        effective_confidence: effective,
        status: status(effective, thresholds),
        last_seen,
        age_seconds: (age_seconds * 100.0).round() / 100.0,
    }
}

/// Reset a pattern to full strength on reappearance: `decay = 1`,
/// `age = 0`, `last_seen = now`. No caller in the ingest pipeline
/// invokes this today — a fresh observation already forces
/// `last_seen = now` before `apply_decay` runs, which produces the
/// identical result. Kept as a standalone entry point for callers that
/// want an explicit reactivation (e.g. an operator-triggered reset) not
/// accompanied by a brand-new observation.
pub fn reactivate(
    thresholds: &StatusThresholds,
    new_base_confidence: f64,
    now: DateTime<Utc>,
) -> DecayResult {
    let effective = effective_confidence(new_base_confidence, 1.0);
    DecayResult {
        base_confidence: (new_base_confidence * 10000.0).round() / 10000.0,
        decay_score: 1.0,
        effective_confidence: effective,
        status: status(effective, thresholds),
        last_seen: now,
        age_seconds: 0.0,
    }
}

/// Human-readable explanation for audit trails, mentioning status, age,
/// base confidence, decay factor, and effective value.
pub fn explain(result: &DecayResult) -> String {
    let minutes = result.age_seconds / 60.0;
    let age_str = if result.age_seconds < 60.0 {
        format!("{} seconds", result.age_seconds as i64)
    } else if result.age_seconds < 3600.0 {
        format!("{} minutes", minutes as i64)
    } else {
        format!("{:.1} hours", result.age_seconds / 3600.0)
    };

    match result.status {
        PatternStatus::Active => format!(
            "Pattern is ACTIVE with full influence. Last observed {age_str} ago. \
             Effective confidence: {:.2} (from base {:.2}).",
            result.effective_confidence, result.base_confidence
        ),
        PatternStatus::Cooling => {
            let reduction = ((1.0 - result.decay_score) * 100.0) as i64;
            format!(
                "Pattern previously showed coordinated behavior, but its influence was \
                 reduced by {reduction}% due to inactivity over the last {age_str}. \
                 Effective confidence: {:.2} (from base {:.2}, decay {:.2}).",
                result.effective_confidence, result.base_confidence, result.decay_score
            )
        }
        PatternStatus::Dormant => format!(
            "Pattern is DORMANT. Last observed {age_str} ago. Minimal influence remaining: \
             {:.2} (from base {:.2}). Will reactivate immediately if pattern reappears.",
            result.effective_confidence, result.base_confidence
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;

    fn windows() -> Vec<DecayWindow> {
        HubConfig::default().decay_windows
    }

    fn thresholds() -> StatusThresholds {
        StatusThresholds::default()
    }

    #[test]
    fn fresh_boundary_is_inclusive() {
        assert_eq!(decay_score(&windows(), 120.0), 1.0);
        assert_eq!(decay_score(&windows(), 120.01), 0.8);
    }

    #[test]
    fn window_progression() {
        assert_eq!(decay_score(&windows(), 0.0), 1.0);
        assert_eq!(decay_score(&windows(), 300.0), 0.8);
        assert_eq!(decay_score(&windows(), 600.0), 0.5);
        assert_eq!(decay_score(&windows(), 10_000.0), 0.2);
    }

    #[test]
    fn effective_confidence_clamps_and_rounds() {
        assert_eq!(effective_confidence(1.5, 1.0), 1.0);
        assert_eq!(effective_confidence(-1.0, 1.0), 0.0);
        assert_eq!(effective_confidence(0.75, 0.8), 0.6);
    }

    #[test]
    fn status_thresholds_boundaries() {
        let t = thresholds();
        assert_eq!(status(0.7, &t), PatternStatus::Active);
        assert_eq!(status(0.69, &t), PatternStatus::Cooling);
        assert_eq!(status(0.4, &t), PatternStatus::Cooling);
        assert_eq!(status(0.39, &t), PatternStatus::Dormant);
    }

    #[test]
    fn apply_decay_is_deterministic() {
        let now = Utc::now();
        let last_seen = now - chrono::Duration::seconds(250);
        let a = apply_decay(&windows(), &thresholds(), 0.9, last_seen, now);
        let b = apply_decay(&windows(), &thresholds(), 0.9, last_seen, now);
        assert_eq!(a, b);
    }

    #[test]
    fn reactivation_yields_full_strength() {
        let now = Utc::now();
        let r = reactivate(&thresholds(), 0.75, now);
        assert_eq!(r.decay_score, 1.0);
        assert_eq!(r.effective_confidence, 0.75);
        assert_eq!(r.status, PatternStatus::Active);
        assert_eq!(r.age_seconds, 0.0);

        // immediately-following apply_decay at the same instant matches
        let again = apply_decay(&windows(), &thresholds(), 0.75, now, now);
        assert_eq!(again.decay_score, 1.0);
        assert_eq!(again.effective_confidence, 0.75);
        assert_eq!(again.status, PatternStatus::Active);
    }

    #[test]
    fn explain_mentions_status_and_values() {
        let now = Utc::now();
        let result = apply_decay(&windows(), &thresholds(), 0.9, now - chrono::Duration::seconds(30), now);
        let text = explain(&result);
        assert!(text.contains("ACTIVE"));
    }
}
