use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::HubError;

/// A single decay window: observations no older than `max_seconds` decay
/// to `decay_score`. Evaluated in ascending `max_seconds` order; the last
/// entry should carry `max_seconds = None` to act as the catch-all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecayWindow {
    pub name: String,
    pub max_seconds: Option<f64>,
    pub decay_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusThresholds {
    pub active_min: f64,
    pub cooling_min: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        StatusThresholds {
            active_min: 0.7,
            cooling_min: 0.4,
        }
    }
}

fn default_decay_windows() -> Vec<DecayWindow> {
    vec![
        DecayWindow {
            name: "fresh".into(),
            max_seconds: Some(120.0),
            decay_score: 1.0,
        },
        DecayWindow {
            name: "recent".into(),
            max_seconds: Some(300.0),
            decay_score: 0.8,
        },
        DecayWindow {
            name: "aging".into(),
            max_seconds: Some(600.0),
            decay_score: 0.5,
        },
        DecayWindow {
            name: "stale".into(),
            max_seconds: None,
            decay_score: 0.2,
        },
    ]
}

/// Every runtime-tunable knob the hub recognizes. Loaded once from the
/// environment at startup, then held behind a `parking_lot::RwLock` so a
/// `PATCH /api/v1/config` can swap it atomically without restarting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HubConfig {
    pub host: String,
    pub port: u16,
    pub api_key: String,

    pub entity_threshold: usize,
    pub time_window_seconds: u64,

    pub medium_threshold: usize,
    pub high_threshold: usize,
    pub critical_threshold: usize,

    pub max_graph_age_seconds: u64,
    pub prune_interval_seconds: u64,
    pub max_advisories: usize,

    pub decay_windows: Vec<DecayWindow>,
    pub status_thresholds: StatusThresholds,

    pub metrics_window_seconds: u64,
    pub ingest_timeout_ms: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        HubConfig {
            host: "0.0.0.0".into(),
            port: 8000,
            api_key: "dev-key-change-in-production".into(),

            entity_threshold: 2,
            time_window_seconds: 300,

            medium_threshold: 2,
            high_threshold: 3,
            critical_threshold: 4,

            max_graph_age_seconds: 3600,
            prune_interval_seconds: 300,
            max_advisories: 1000,

            decay_windows: default_decay_windows(),
            status_thresholds: StatusThresholds::default(),

            metrics_window_seconds: 3600,
            ingest_timeout_ms: 1000,
        }
    }
}

impl HubConfig {
    /// Load configuration from the environment, falling back to defaults
    /// for anything unset. Mirrors the env-var names a prior Python
    /// revision of this service used, so operators migrating keep the
    /// same knobs.
    pub fn from_env() -> Self {
        let defaults = HubConfig::default();
        HubConfig {
            host: std::env::var("HUB_HOST").unwrap_or(defaults.host),
            port: std::env::var("HUB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            api_key: std::env::var("HUB_API_KEY").unwrap_or(defaults.api_key),

            entity_threshold: std::env::var("ENTITY_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.entity_threshold),
            time_window_seconds: std::env::var("TIME_WINDOW_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.time_window_seconds),

            medium_threshold: std::env::var("MEDIUM_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.medium_threshold),
            high_threshold: std::env::var("HIGH_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.high_threshold),
            critical_threshold: std::env::var("CRITICAL_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.critical_threshold),

            max_graph_age_seconds: std::env::var("MAX_GRAPH_AGE_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_graph_age_seconds),
            prune_interval_seconds: std::env::var("PRUNE_INTERVAL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.prune_interval_seconds),
            max_advisories: std::env::var("MAX_ADVISORIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_advisories),

            decay_windows: defaults.decay_windows,
            status_thresholds: defaults.status_thresholds,

            metrics_window_seconds: std::env::var("METRICS_WINDOW_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.metrics_window_seconds),
            ingest_timeout_ms: std::env::var("INGEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.ingest_timeout_ms),
        }
    }

    /// Enforce the ordering and minimum constraints the components rely
    /// on without re-checking themselves. Called at startup and before
    /// any runtime config swap; the caller must keep the old config on
    /// `Err`.
    pub fn validate(&self) -> Result<(), HubError> {
        if self.entity_threshold < 1 {
            return Err(HubError::Config("entity_threshold must be >= 1".into()));
        }
        if self.time_window_seconds < 1 {
            return Err(HubError::Config(
                "time_window_seconds must be >= 1".into(),
            ));
        }
        if !(1 <= self.medium_threshold
            && self.medium_threshold <= self.high_threshold
            && self.high_threshold <= self.critical_threshold)
        {
            return Err(HubError::Config(
                "escalation thresholds must satisfy medium <= high <= critical".into(),
            ));
        }
        if self.max_graph_age_seconds < 60 {
            return Err(HubError::Config(
                "max_graph_age_seconds must be >= 60".into(),
            ));
        }
        if self.prune_interval_seconds < 10 {
            return Err(HubError::Config(
                "prune_interval_seconds must be >= 10".into(),
            ));
        }
        if self.max_advisories < 1 {
            return Err(HubError::Config("max_advisories must be >= 1".into()));
        }
        if self.port == 0 {
            return Err(HubError::Config("port must be between 1 and 65535".into()));
        }
        if self.decay_windows.is_empty() {
            return Err(HubError::Config("decay_windows must not be empty".into()));
        }
        if self.status_thresholds.cooling_min > self.status_thresholds.active_min {
            return Err(HubError::Config(
                "status_thresholds.cooling_min must be <= active_min".into(),
            ));
        }
        Ok(())
    }

    /// Apply a partial set of recognized overrides, validating the
    /// resulting config before it replaces the live one. Unknown keys
    /// are rejected explicitly rather than silently ignored.
    pub fn apply_patch(&self, patch: &BTreeMap<String, serde_json::Value>) -> Result<Self, HubError> {
        let mut next = self.clone();
        for (key, value) in patch {
            match key.as_str() {
                "entity_threshold" => next.entity_threshold = as_usize(value, key)?,
                "time_window_seconds" => next.time_window_seconds = as_u64(value, key)?,
                "medium_threshold" => next.medium_threshold = as_usize(value, key)?,
                "high_threshold" => next.high_threshold = as_usize(value, key)?,
                "critical_threshold" => next.critical_threshold = as_usize(value, key)?,
                "max_graph_age_seconds" => next.max_graph_age_seconds = as_u64(value, key)?,
                "prune_interval_seconds" => next.prune_interval_seconds = as_u64(value, key)?,
                "max_advisories" => next.max_advisories = as_usize(value, key)?,
                _ => return Err(HubError::Config(format!("unrecognized config key: {key}"))),
            }
        }
        next.validate()?;
        Ok(next)
    }
}

fn as_usize(value: &serde_json::Value, key: &str) -> Result<usize, HubError> {
    value
        .as_u64()
        .map(|v| v as usize)
        .ok_or_else(|| HubError::Config(format!("{key} must be a non-negative integer")))
}

fn as_u64(value: &serde_json::Value, key: &str) -> Result<u64, HubError> {
    value
        .as_u64()
        .ok_or_else(|| HubError::Config(format!("{key} must be a non-negative integer")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        assert!(HubConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_order_thresholds() {
        let mut cfg = HubConfig::default();
        cfg.high_threshold = 1;
        cfg.critical_threshold = 5;
        cfg.medium_threshold = 2;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn patch_rejects_unknown_key() {
        let cfg = HubConfig::default();
        let mut patch = BTreeMap::new();
        patch.insert("bogus".to_string(), serde_json::json!(1));
        assert!(cfg.apply_patch(&patch).is_err());
    }

    #[test]
    fn patch_rejects_ordering_violation() {
        let cfg = HubConfig::default();
        let mut patch = BTreeMap::new();
        patch.insert("medium_threshold".to_string(), serde_json::json!(10));
        assert!(cfg.apply_patch(&patch).is_err());
    }

    #[test]
    fn patch_applies_valid_override() {
        let cfg = HubConfig::default();
        let mut patch = BTreeMap::new();
        patch.insert("entity_threshold".to_string(), serde_json::json!(3));
        let next = cfg.apply_patch(&patch).unwrap();
        assert_eq!(next.entity_threshold, 3);
    }
}
