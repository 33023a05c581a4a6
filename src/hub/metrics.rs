//! Metrics Tracker (C7).
//!
//! A rolling-window event recorder over ingest/correlate/escalate/
//! advisory events. Percentiles are computed by sorting the retained
//! sample window and indexing exactly, not via a bucketed histogram —
//! the retained sample counts here stay small enough that an exact sort
//! is cheap, and exactness is what the reporting surface promises.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::models::{GraphStats, MetricsSummary};

const MAX_LATENCY_SAMPLES: usize = 10_000;
const MAX_FRAUD_SCORE_SAMPLES: usize = 1_000;

pub struct MetricsTracker {
    window: chrono::Duration,

    ingestion_latencies_ms: VecDeque<f64>,
    correlation_latencies_ms: VecDeque<f64>,

    fingerprints_ingested: VecDeque<DateTime<Utc>>,
    correlations_detected: VecDeque<DateTime<Utc>>,
    alerts_escalated: VecDeque<DateTime<Utc>>,
    advisories_generated: VecDeque<DateTime<Utc>>,

    entity_fingerprint_counts: BTreeMap<String, u64>,
    advisory_severity_counts: BTreeMap<String, u64>,
    fraud_scores: VecDeque<f64>,
}

impl MetricsTracker {
    pub fn new(window_seconds: u64) -> Self {
        MetricsTracker {
            window: chrono::Duration::seconds(window_seconds as i64),
            ingestion_latencies_ms: VecDeque::new(),
            correlation_latencies_ms: VecDeque::new(),
            fingerprints_ingested: VecDeque::new(),
            correlations_detected: VecDeque::new(),
            alerts_escalated: VecDeque::new(),
            advisories_generated: VecDeque::new(),
            entity_fingerprint_counts: BTreeMap::new(),
            advisory_severity_counts: BTreeMap::new(),
            fraud_scores: VecDeque::new(),
        }
    }

    pub fn record_ingestion(&mut self, entity_id: &str, latency_ms: f64, now: DateTime<Utc>) {
        self.fingerprints_ingested.push_back(now);
        push_capped(&mut self.ingestion_latencies_ms, latency_ms, MAX_LATENCY_SAMPLES);
        *self.entity_fingerprint_counts.entry(entity_id.to_string()).or_insert(0) += 1;
        self.prune_old_timestamps(now);
    }

    pub fn record_correlation(&mut self, latency_ms: f64, detected: bool, now: DateTime<Utc>) {
        push_capped(&mut self.correlation_latencies_ms, latency_ms, MAX_LATENCY_SAMPLES);
        if detected {
            self.correlations_detected.push_back(now);
        }
        self.prune_old_timestamps(now);
    }

    pub fn record_escalation(&mut self, now: DateTime<Utc>) {
        self.alerts_escalated.push_back(now);
        self.prune_old_timestamps(now);
    }

    pub fn record_advisory(&mut self, severity: &str, fraud_score: f64, now: DateTime<Utc>) {
        self.advisories_generated.push_back(now);
        *self.advisory_severity_counts.entry(severity.to_string()).or_insert(0) += 1;
        push_capped(&mut self.fraud_scores, fraud_score, MAX_FRAUD_SCORE_SAMPLES);
        self.prune_old_timestamps(now);
    }

    fn prune_old_timestamps(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        for deque in [
            &mut self.fingerprints_ingested,
            &mut self.correlations_detected,
            &mut self.alerts_escalated,
            &mut self.advisories_generated,
        ] {
            while matches!(deque.front(), Some(ts) if *ts < cutoff) {
                deque.pop_front();
            }
        }
    }

    /// `graph_stats` supplies node/edge counts and pattern-status
    /// counts, since those are owned by C1, not this tracker.
    pub fn get_summary(&mut self, now: DateTime<Utc>, graph_stats: Option<&GraphStats>) -> MetricsSummary {
        self.prune_old_timestamps(now);

        let avg_ingestion = mean(&self.ingestion_latencies_ms);
        let avg_correlation = mean(&self.correlation_latencies_ms);
        let p95_ingestion = percentile(&self.ingestion_latencies_ms, 95);
        let p95_correlation = percentile(&self.correlation_latencies_ms, 95);
        let avg_fraud_score = mean(&self.fraud_scores);

        let (active_patterns, cooling_patterns, dormant_patterns, graph_nodes, graph_edges) =
            match graph_stats {
                Some(stats) => (
                    stats.pattern_statuses.active,
                    stats.pattern_statuses.cooling,
                    stats.pattern_statuses.dormant,
                    stats.unique_patterns + stats.unique_entities,
                    stats.total_edges,
                ),
                None => (0, 0, 0, 0, 0),
            };

        MetricsSummary {
            fingerprints_ingested: self.fingerprints_ingested.len(),
            correlations_detected: self.correlations_detected.len(),
            alerts_escalated: self.alerts_escalated.len(),
            advisories_generated: self.advisories_generated.len(),
            avg_ingestion_latency_ms: round2(avg_ingestion),
            avg_correlation_latency_ms: round2(avg_correlation),
            p95_ingestion_latency_ms: round2(p95_ingestion),
            p95_correlation_latency_ms: round2(p95_correlation),
            graph_size_nodes: graph_nodes,
            graph_size_edges: graph_edges,
            active_patterns,
            cooling_patterns,
            dormant_patterns,
            active_entities: self.entity_fingerprint_counts.len(),
            entities_by_fingerprints: self.entity_fingerprint_counts.clone(),
            advisories_by_severity: self.advisory_severity_counts.clone(),
            avg_fraud_score: round2(avg_fraud_score),
            measurement_window_seconds: self.window.num_seconds() as u64,
            timestamp: now,
        }
    }
}

fn push_capped(deque: &mut VecDeque<f64>, value: f64, cap: usize) {
    deque.push_back(value);
    while deque.len() > cap {
        deque.pop_front();
    }
}

fn mean(values: &VecDeque<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// p95 = element at sorted index `min(n-1, floor(0.95n))`.
fn percentile(values: &VecDeque<f64>, pct: u32) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.iter().copied().collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    let index = ((n as f64) * (pct as f64 / 100.0)).floor() as usize;
    let index = index.min(n - 1);
    sorted[index]
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(seconds: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn p95_matches_sorted_index_formula() {
        let mut values = VecDeque::new();
        for v in 1..=20 {
            values.push_back(v as f64);
        }
        // n=20, floor(0.95*20)=19, index min(19,19)=19 -> value 20
        assert_eq!(percentile(&values, 95), 20.0);
    }

    #[test]
    fn p95_on_empty_is_zero() {
        assert_eq!(percentile(&VecDeque::new(), 95), 0.0);
    }

    #[test]
    fn counts_reset_outside_window() {
        let mut tracker = MetricsTracker::new(100);
        tracker.record_ingestion("a", 5.0, ts(0));
        tracker.record_ingestion("b", 6.0, ts(50));
        let summary = tracker.get_summary(ts(50), None);
        assert_eq!(summary.fingerprints_ingested, 2);

        let summary = tracker.get_summary(ts(300), None);
        assert_eq!(summary.fingerprints_ingested, 0);
    }

    #[test]
    fn entity_counts_are_not_windowed() {
        let mut tracker = MetricsTracker::new(100);
        tracker.record_ingestion("a", 5.0, ts(0));
        let summary = tracker.get_summary(ts(10_000), None);
        // active_entities counts distinct entities seen ever, by design
        assert_eq!(summary.active_entities, 1);
    }

    #[test]
    fn advisory_severity_counts_accumulate() {
        let mut tracker = MetricsTracker::new(3600);
        tracker.record_advisory("HIGH", 70.0, ts(0));
        tracker.record_advisory("HIGH", 80.0, ts(1));
        tracker.record_advisory("CRITICAL", 95.0, ts(2));
        let summary = tracker.get_summary(ts(2), None);
        assert_eq!(summary.advisories_by_severity.get("HIGH"), Some(&2));
        assert_eq!(summary.advisories_by_severity.get("CRITICAL"), Some(&1));
        assert_eq!(round2(summary.avg_fraud_score), round2((70.0 + 80.0 + 95.0) / 3.0));
    }
}
