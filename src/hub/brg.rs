//! Behavioral Risk Graph (C1).
//!
//! Authoritative in-memory store of patterns, entities, and the
//! observation edges between them. Realized as an arena-or-table
//! design rather than a literal graph crate: one map of
//! fingerprint -> PatternNode, one set of known entity ids, and one
//! multi-valued edge list keyed by fingerprint. No pointer cycles, no
//! generic graph traversal machinery the hub doesn't need.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{DecayWindow, StatusThresholds};
use crate::models::{GraphStats, Observation, PatternStatus, PatternStatusCounts, Severity};

use super::decay;

#[derive(Debug, Clone)]
pub struct PatternNode {
    pub fingerprint: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub observation_count: u64,
    pub base_confidence: f64,
    pub decay_score: f64,
    pub effective_confidence: f64,
    pub pattern_status: PatternStatus,
}

#[derive(Debug, Clone)]
struct ObservationEdge {
    entity_id: String,
    timestamp: DateTime<Utc>,
    severity: Severity,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityActivity {
    pub entity_id: String,
    pub observation_count: u64,
    pub unique_patterns: usize,
    pub patterns: Vec<String>,
    pub first_observation: DateTime<Utc>,
    pub last_observation: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternDetails {
    pub fingerprint: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub observation_count: u64,
    pub entity_count: usize,
    pub base_confidence: f64,
    pub decay_score: f64,
    pub effective_confidence: f64,
    pub pattern_status: PatternStatus,
}

/// Bounded in-memory bipartite multigraph of patterns and entities.
pub struct BehavioralRiskGraph {
    max_age: chrono::Duration,
    patterns: HashMap<String, PatternNode>,
    entities: HashSet<String>,
    edges: HashMap<String, Vec<ObservationEdge>>,
    total_observations: u64,
}

impl BehavioralRiskGraph {
    pub fn new(max_age_seconds: u64) -> Self {
        BehavioralRiskGraph {
            max_age: chrono::Duration::seconds(max_age_seconds as i64),
            patterns: HashMap::new(),
            entities: HashSet::new(),
            edges: HashMap::new(),
            total_observations: 0,
        }
    }

    /// Create the pattern node on first sight, overwrite its decay
    /// fields and `last_seen`, bump its observation count, register the
    /// entity if new, and append the edge. O(1) amortized.
    #[allow(clippy::too_many_arguments)]
    pub fn add_observation(
        &mut self,
        fingerprint: &str,
        entity_id: &str,
        severity: Severity,
        ts: DateTime<Utc>,
        base_confidence: f64,
        decay_score: f64,
        effective_confidence: f64,
        status: PatternStatus,
    ) {
        let node = self
            .patterns
            .entry(fingerprint.to_string())
            .or_insert_with(|| PatternNode {
                fingerprint: fingerprint.to_string(),
                first_seen: ts,
                last_seen: ts,
                observation_count: 0,
                base_confidence,
                decay_score,
                effective_confidence,
                pattern_status: status,
            });

        node.base_confidence = base_confidence;
        node.decay_score = decay_score;
        node.effective_confidence = effective_confidence;
        node.pattern_status = status;
        if ts > node.last_seen {
            node.last_seen = ts;
        }
        node.observation_count += 1;

        self.entities.insert(entity_id.to_string());

        self.edges
            .entry(fingerprint.to_string())
            .or_default()
            .push(ObservationEdge {
                entity_id: entity_id.to_string(),
                timestamp: ts,
                severity,
            });

        self.total_observations += 1;
    }

    /// Edges into `fingerprint` newer than `now - window`, ascending by
    /// timestamp. Empty if the pattern is absent. O(#edges into
    /// fingerprint).
    pub fn recent_observations(
        &self,
        fingerprint: &str,
        window: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Vec<Observation> {
        let cutoff = now - window;
        let mut obs: Vec<Observation> = self
            .edges
            .get(fingerprint)
            .into_iter()
            .flatten()
            .filter(|e| e.timestamp > cutoff)
            .map(|e| Observation {
                entity_id: e.entity_id.clone(),
                timestamp: e.timestamp,
                severity: e.severity,
            })
            .collect();
        obs.sort_by_key(|o| o.timestamp);
        obs
    }

    /// Cardinality of distinct edge sources into `fingerprint` within
    /// `window`.
    pub fn unique_entities(
        &self,
        fingerprint: &str,
        window: chrono::Duration,
        now: DateTime<Utc>,
    ) -> usize {
        self.recent_observations(fingerprint, window, now)
            .into_iter()
            .map(|o| o.entity_id)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Entities with at least one edge newer than `now - window`,
    /// regardless of which pattern it targets.
    pub fn active_entities(&self, window: chrono::Duration, now: DateTime<Utc>) -> HashSet<String> {
        let cutoff = now - window;
        self.edges
            .values()
            .flatten()
            .filter(|e| e.timestamp > cutoff)
            .map(|e| e.entity_id.clone())
            .collect()
    }

    /// Remove every edge older than `max_age`, then remove any pattern
    /// whose degree became zero. Returns the number of removed edges.
    /// O(#edges); intended for a periodic cadence, not per-ingest.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.max_age;
        let mut removed = 0usize;

        self.edges.retain(|_, edges| {
            let before = edges.len();
            edges.retain(|e| e.timestamp >= cutoff);
            removed += before - edges.len();
            !edges.is_empty()
        });

        let live_fingerprints: HashSet<&String> = self.edges.keys().collect();
        self.patterns
            .retain(|fp, _| live_fingerprints.contains(fp));

        removed
    }

    pub fn get_pattern_details(&self, fingerprint: &str) -> Option<PatternDetails> {
        let node = self.patterns.get(fingerprint)?;
        let entity_count = self
            .edges
            .get(fingerprint)
            .map(|edges| edges.iter().map(|e| e.entity_id.clone()).collect::<HashSet<_>>().len())
            .unwrap_or(0);
        Some(PatternDetails {
            fingerprint: node.fingerprint.clone(),
            first_seen: node.first_seen,
            last_seen: node.last_seen,
            observation_count: node.observation_count,
            entity_count,
            base_confidence: node.base_confidence,
            decay_score: node.decay_score,
            effective_confidence: node.effective_confidence,
            pattern_status: node.pattern_status,
        })
    }

    /// Recompute a pattern's decay fields against `now` before reading
    /// them. The stored decay snapshot is only as fresh as the last
    /// observation that touched the node; a query long after the last
    /// write would otherwise report a stale (too-confident) status.
    ///
    /// A pattern still in the freshest decay window is always reported
    /// ACTIVE, regardless of what its `effective_confidence` works out
    /// to. This matters for the uncorrelated single-observation default
    /// (`base=0.5, decay=1.0, effective=0.5`): threshold-comparing that
    /// effective value alone would misclassify a pattern observed an
    /// instant ago as COOLING (`active_min` is 0.7). Once a pattern
    /// ages out of the fresh window, the ordinary effective-confidence
    /// thresholds decide its status, which is how a pattern cools and
    /// reactivation snaps it back to ACTIVE.
    pub fn refresh_pattern(
        &mut self,
        fingerprint: &str,
        windows: &[DecayWindow],
        thresholds: &StatusThresholds,
        now: DateTime<Utc>,
    ) -> Option<PatternDetails> {
        let node = self.patterns.get_mut(fingerprint)?;
        let result = decay::apply_decay(windows, thresholds, node.base_confidence, node.last_seen, now);
        let freshest_decay_score = windows.first().map(|w| w.decay_score).unwrap_or(1.0);
        let status = if result.decay_score >= freshest_decay_score {
            PatternStatus::Active
        } else {
            result.status
        };
        node.decay_score = result.decay_score;
        node.effective_confidence = result.effective_confidence;
        node.pattern_status = status;

        let entity_count = self
            .edges
            .get(fingerprint)
            .map(|edges| edges.iter().map(|e| e.entity_id.clone()).collect::<HashSet<_>>().len())
            .unwrap_or(0);
        let node = self.patterns.get(fingerprint)?;
        Some(PatternDetails {
            fingerprint: node.fingerprint.clone(),
            first_seen: node.first_seen,
            last_seen: node.last_seen,
            observation_count: node.observation_count,
            entity_count,
            base_confidence: node.base_confidence,
            decay_score: node.decay_score,
            effective_confidence: node.effective_confidence,
            pattern_status: node.pattern_status,
        })
    }

    /// Scan every pattern's edges for observations from `entity_id`
    /// within `window`. `None` if the entity made no observations in
    /// that window.
    pub fn entity_activity(
        &self,
        entity_id: &str,
        window: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Option<EntityActivity> {
        let cutoff = now - window;
        let mut patterns = HashSet::new();
        let mut first = None;
        let mut last = None;
        let mut observation_count = 0u64;

        for (fingerprint, edges) in &self.edges {
            for edge in edges {
                if edge.entity_id == entity_id && edge.timestamp >= cutoff {
                    patterns.insert(fingerprint.clone());
                    observation_count += 1;
                    first = Some(first.map_or(edge.timestamp, |f: DateTime<Utc>| f.min(edge.timestamp)));
                    last = Some(last.map_or(edge.timestamp, |l: DateTime<Utc>| l.max(edge.timestamp)));
                }
            }
        }

        if observation_count == 0 {
            return None;
        }

        Some(EntityActivity {
            entity_id: entity_id.to_string(),
            observation_count,
            unique_patterns: patterns.len(),
            patterns: patterns.into_iter().collect(),
            first_observation: first.unwrap(),
            last_observation: last.unwrap(),
        })
    }

    pub fn get_stats(&self, now: DateTime<Utc>) -> GraphStats {
        let active_entities = self.active_entities(chrono::Duration::minutes(60), now).len();

        let mut pattern_statuses = PatternStatusCounts::default();
        let mut total_effective = 0.0;
        for node in self.patterns.values() {
            match node.pattern_status {
                PatternStatus::Active => pattern_statuses.active += 1,
                PatternStatus::Cooling => pattern_statuses.cooling += 1,
                PatternStatus::Dormant => pattern_statuses.dormant += 1,
            }
            total_effective += node.effective_confidence;
        }
        let pattern_count = self.patterns.len();
        let avg_effective_confidence = if pattern_count > 0 {
            ((total_effective / pattern_count as f64) * 1000.0).round() / 1000.0
        } else {
            0.0
        };

        let timestamps: Vec<DateTime<Utc>> = self
            .edges
            .values()
            .flatten()
            .map(|e| e.timestamp)
            .collect();
        let temporal_coverage_seconds = if let (Some(min), Some(max)) =
            (timestamps.iter().min(), timestamps.iter().max())
        {
            (*max - *min).num_seconds()
        } else {
            0
        };

        GraphStats {
            unique_patterns: self.patterns.len(),
            total_observations: self.total_observations,
            total_edges: self.edge_count(),
            active_entities,
            unique_entities: self.entities.len(),
            memory_size_bytes: self.memory_size_bytes(),
            temporal_coverage_seconds,
            pattern_statuses,
            avg_effective_confidence,
        }
    }

    /// Rough per-node/per-edge byte estimate, not a precise accounting.
    fn memory_size_bytes(&self) -> u64 {
        let node_count = (self.patterns.len() + self.entities.len()) as u64;
        let edge_count: u64 = self.edges.values().map(|v| v.len() as u64).sum();
        node_count * 200 + edge_count * 300
    }

    /// All pattern nodes currently in the graph, for dashboard dumps.
    pub fn all_patterns(&self) -> Vec<PatternDetails> {
        self.patterns
            .keys()
            .filter_map(|fp| self.get_pattern_details(fp))
            .collect()
    }

    /// All known entity ids, for dashboard dumps.
    pub fn all_entities(&self) -> Vec<String> {
        self.entities.iter().cloned().collect()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(|v| v.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ts(seconds: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn add_then_recent_observations_round_trip() {
        let mut brg = BehavioralRiskGraph::new(3600);
        brg.add_observation(
            "fp1",
            "entity_a",
            Severity::High,
            ts(0),
            0.5,
            1.0,
            0.5,
            PatternStatus::Active,
        );
        let obs = brg.recent_observations("fp1", Duration::seconds(300), ts(10));
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].entity_id, "entity_a");
    }

    #[test]
    fn unique_entities_counts_distinct_sources() {
        let mut brg = BehavioralRiskGraph::new(3600);
        brg.add_observation("fp1", "a", Severity::High, ts(0), 0.5, 1.0, 0.5, PatternStatus::Active);
        brg.add_observation("fp1", "b", Severity::High, ts(10), 0.75, 1.0, 0.75, PatternStatus::Active);
        brg.add_observation("fp1", "a", Severity::High, ts(20), 0.75, 1.0, 0.75, PatternStatus::Active);
        assert_eq!(brg.unique_entities("fp1", Duration::seconds(300), ts(30)), 2);
    }

    #[test]
    fn observation_count_is_monotone() {
        let mut brg = BehavioralRiskGraph::new(3600);
        brg.add_observation("fp1", "a", Severity::High, ts(0), 0.5, 1.0, 0.5, PatternStatus::Active);
        let first = brg.get_pattern_details("fp1").unwrap().observation_count;
        brg.add_observation("fp1", "b", Severity::High, ts(10), 0.5, 1.0, 0.5, PatternStatus::Active);
        let second = brg.get_pattern_details("fp1").unwrap().observation_count;
        assert!(second > first);
    }

    #[test]
    fn prune_removes_expired_edges_and_orphaned_patterns() {
        let mut brg = BehavioralRiskGraph::new(300);
        brg.add_observation("fp1", "a", Severity::High, ts(0), 0.5, 1.0, 0.5, PatternStatus::Active);
        let removed = brg.prune(ts(400));
        assert_eq!(removed, 1);
        assert!(brg.get_pattern_details("fp1").is_none());
        assert!(brg.recent_observations("fp1", Duration::seconds(10_000), ts(400)).is_empty());
    }

    #[test]
    fn prune_keeps_patterns_with_remaining_edges() {
        let mut brg = BehavioralRiskGraph::new(300);
        brg.add_observation("fp1", "a", Severity::High, ts(0), 0.5, 1.0, 0.5, PatternStatus::Active);
        brg.add_observation("fp1", "b", Severity::High, ts(350), 0.5, 1.0, 0.5, PatternStatus::Active);
        let removed = brg.prune(ts(400));
        assert_eq!(removed, 1);
        assert!(brg.get_pattern_details("fp1").is_some());
    }

    #[test]
    fn absent_pattern_has_no_observations() {
        let brg = BehavioralRiskGraph::new(3600);
        assert!(brg.recent_observations("missing", Duration::seconds(300), ts(0)).is_empty());
        assert!(brg.get_pattern_details("missing").is_none());
    }

    #[test]
    fn refresh_reports_active_for_fresh_low_base_confidence() {
        use crate::config::{HubConfig, StatusThresholds};

        let windows = HubConfig::default().decay_windows;
        let thresholds = StatusThresholds::default();
        let mut brg = BehavioralRiskGraph::new(3600);
        // uncorrelated single-observation default: base 0.5 alone would
        // threshold-classify as COOLING, but a pattern this fresh must
        // still read ACTIVE.
        brg.add_observation("fp1", "a", Severity::High, ts(0), 0.5, 1.0, 0.5, PatternStatus::Active);

        let details = brg.refresh_pattern("fp1", &windows, &thresholds, ts(0)).unwrap();
        assert_eq!(details.pattern_status, PatternStatus::Active);
        assert_eq!(details.effective_confidence, 0.5);
    }

    #[test]
    fn refresh_cools_once_past_the_fresh_window() {
        use crate::config::{HubConfig, StatusThresholds};

        let windows = HubConfig::default().decay_windows;
        let thresholds = StatusThresholds::default();
        let mut brg = BehavioralRiskGraph::new(3600);
        brg.add_observation("fp1", "a", Severity::High, ts(0), 0.9, 1.0, 0.9, PatternStatus::Active);

        // age 430s -> aging window -> decay 0.5 -> effective 0.45 -> COOLING.
        let details = brg.refresh_pattern("fp1", &windows, &thresholds, ts(430)).unwrap();
        assert_eq!(details.pattern_status, PatternStatus::Cooling);
    }

    #[test]
    fn entity_activity_scans_across_patterns() {
        let mut brg = BehavioralRiskGraph::new(3600);
        brg.add_observation("fp1", "a", Severity::High, ts(0), 0.5, 1.0, 0.5, PatternStatus::Active);
        brg.add_observation("fp2", "a", Severity::Medium, ts(10), 0.5, 1.0, 0.5, PatternStatus::Active);

        let activity = brg.entity_activity("a", Duration::hours(24), ts(20)).unwrap();
        assert_eq!(activity.observation_count, 2);
        assert_eq!(activity.unique_patterns, 2);
    }

    #[test]
    fn entity_activity_is_none_outside_window() {
        let brg = BehavioralRiskGraph::new(3600);
        assert!(brg.entity_activity("missing", Duration::hours(24), ts(0)).is_none());
    }
}
