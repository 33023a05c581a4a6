//! Hub Orchestrator (C6).
//!
//! Per-ingest choreography over C1-C5, plus the background pruner.
//! Concurrency model: a single value (`HubInner`) holds the graph and
//! the advisory log together behind one `tokio::sync::Mutex`, acquired
//! once per ingest and held for the whole read-correlate-write
//! sequence. This is the "single writer owns the graph" model the spec
//! explicitly allows, and it gets advisory-log-append-is-part-of-the-
//! same-critical-section and prune-vs-writer serialization for free,
//! since both live behind the same lock. Metrics use an independent
//! lock so counter writes never contend with graph writes.

pub mod advisory;
pub mod brg;
pub mod correlator;
pub mod decay;
pub mod escalation;
pub mod metrics;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::RwLock as SyncRwLock;
use tokio::sync::Mutex as AsyncMutex;

use crate::config::HubConfig;
use crate::error::HubError;
use crate::models::{Advisory, GraphStats, HealthStatus, MetricsSummary, PatternStatus, RiskFingerprint};

use brg::{BehavioralRiskGraph, EntityActivity, PatternDetails};

struct HubInner {
    brg: BehavioralRiskGraph,
    advisories: VecDeque<Advisory>,
}

/// Response handed back to the transport layer on a successful ingest.
pub struct IngestOutcome {
    pub fingerprint_prefix: String,
    pub entity_id: String,
    pub correlation_detected: bool,
}

pub struct Hub {
    config: SyncRwLock<HubConfig>,
    inner: AsyncMutex<HubInner>,
    metrics: parking_lot::Mutex<metrics::MetricsTracker>,
    start_time: Instant,
}

impl Hub {
    pub fn new(config: HubConfig) -> Self {
        let brg = BehavioralRiskGraph::new(config.max_graph_age_seconds);
        let metrics_window = config.metrics_window_seconds;
        Hub {
            inner: AsyncMutex::new(HubInner {
                brg,
                advisories: VecDeque::new(),
            }),
            metrics: parking_lot::Mutex::new(metrics::MetricsTracker::new(metrics_window)),
            config: SyncRwLock::new(config),
            start_time: Instant::now(),
        }
    }

    pub fn config_snapshot(&self) -> HubConfig {
        self.config.read().clone()
    }

    pub fn update_config(&self, patch: &std::collections::BTreeMap<String, serde_json::Value>) -> Result<HubConfig, HubError> {
        let current = self.config.read().clone();
        let next = current.apply_patch(patch)?;
        *self.config.write() = next.clone();
        Ok(next)
    }

    fn validate_ingress(fp: &RiskFingerprint) -> Result<(), HubError> {
        if fp.entity_id.trim().is_empty() {
            return Err(HubError::Validation("entity_id must not be empty".into()));
        }
        if fp.fingerprint.trim().is_empty() {
            return Err(HubError::Validation("fingerprint must not be empty".into()));
        }
        Ok(())
    }

    /// Per-ingest sequence from a `RiskFingerprint`: validate, correlate
    /// against pre-observation state, write the observation with the
    /// resulting decay fields, escalate and advise if warranted, append
    /// the advisory (capped, drop-oldest), and record timings. The
    /// whole correlate-then-write pair runs under one lock acquisition
    /// so no other ingest or prune can observe a half-updated pattern.
    pub async fn ingest(&self, fp: RiskFingerprint) -> Result<IngestOutcome, HubError> {
        Self::validate_ingress(&fp)?;

        let config = self.config_snapshot();
        let timeout = std::time::Duration::from_millis(config.ingest_timeout_ms);
        let ingest_started = Instant::now();

        let mut guard = tokio::time::timeout(timeout, self.inner.lock())
            .await
            .map_err(|_| HubError::Capacity("could not acquire hub lock within budget".into()))?;

        let now = fp.timestamp;

        let correlation_started = Instant::now();
        let correlation = correlator::detect_correlation(&config, &guard.brg, &fp.fingerprint, now);
        let correlation_latency_ms = correlation_started.elapsed().as_secs_f64() * 1000.0;

        let (base, decay_score, effective, status) = match &correlation {
            Some(c) => (c.base_confidence, c.decay_score, c.effective_confidence, c.pattern_status),
            None => (0.5, 1.0, 0.5, PatternStatus::Active),
        };

        guard.brg.add_observation(
            &fp.fingerprint,
            &fp.entity_id,
            fp.severity,
            now,
            base,
            decay_score,
            effective,
            status,
        );

        let correlation_detected = correlation.is_some();
        let mut advisory_severity = None;
        let mut advisory_score = None;

        if let Some(correlation) = correlation {
            if let Some(alert) = escalation::evaluate(&config, &correlation) {
                let advisory = advisory::build_advisory(&alert);
                advisory_severity = Some(advisory.severity.clone());
                advisory_score = Some(advisory.fraud_score as f64);

                guard.advisories.push_back(advisory);
                while guard.advisories.len() > config.max_advisories {
                    guard.advisories.pop_front();
                }

                let mut metrics = self.metrics.lock();
                metrics.record_escalation(now);
                if let (Some(sev), Some(score)) = (&advisory_severity, advisory_score) {
                    metrics.record_advisory(sev, score, now);
                }
            }
        }

        drop(guard);

        let ingest_latency_ms = ingest_started.elapsed().as_secs_f64() * 1000.0;
        {
            let mut metrics = self.metrics.lock();
            metrics.record_ingestion(&fp.entity_id, ingest_latency_ms, now);
            metrics.record_correlation(correlation_latency_ms, correlation_detected, now);
        }

        ::metrics::counter!("hub_ingest_total").increment(1);
        ::metrics::histogram!("hub_ingest_latency_ms").record(ingest_latency_ms);
        if correlation_detected {
            ::metrics::counter!("hub_correlation_total").increment(1);
        }
        if let Some(sev) = &advisory_severity {
            ::metrics::counter!("hub_advisory_total", "severity" => sev.clone()).increment(1);
        }

        let prefix: String = fp.fingerprint.chars().take(16).collect();
        Ok(IngestOutcome {
            fingerprint_prefix: format!("{prefix}..."),
            entity_id: fp.entity_id,
            correlation_detected,
        })
    }

    pub async fn recent_advisories(&self, limit: usize, severity: Option<&str>) -> Vec<Advisory> {
        let guard = self.inner.lock().await;
        let mut matching: Vec<Advisory> = guard
            .advisories
            .iter()
            .rev()
            .filter(|a| severity.map(|s| a.severity.eq_ignore_ascii_case(s)).unwrap_or(true))
            .take(limit)
            .cloned()
            .collect();
        matching.shrink_to_fit();
        matching
    }

    pub async fn graph_stats(&self) -> GraphStats {
        let guard = self.inner.lock().await;
        guard.brg.get_stats(Utc::now())
    }

    pub async fn pattern_details(&self, fingerprint: &str) -> Option<PatternDetails> {
        self.pattern_details_at(fingerprint, Utc::now()).await
    }

    /// Same as [`Hub::pattern_details`] but against an explicit clock
    /// reading, so decay refresh is testable without wall-clock sleeps.
    pub async fn pattern_details_at(&self, fingerprint: &str, now: DateTime<Utc>) -> Option<PatternDetails> {
        let config = self.config_snapshot();
        let mut guard = self.inner.lock().await;
        guard
            .brg
            .refresh_pattern(fingerprint, &config.decay_windows, &config.status_thresholds, now)
    }

    pub async fn health(&self) -> HealthStatus {
        let guard = self.inner.lock().await;
        let uptime_seconds = self.start_time.elapsed().as_secs_f64();

        let graph_healthy = guard.brg.pattern_count() < 10_000;
        let advisories_healthy = guard.advisories.len() < 1_000;
        let status = if graph_healthy && advisories_healthy {
            "HEALTHY"
        } else {
            "DEGRADED"
        };

        let message = if status == "HEALTHY" {
            "All systems operational".to_string()
        } else {
            let mut issues = Vec::new();
            if !graph_healthy {
                issues.push("Graph memory approaching limit");
            }
            if !advisories_healthy {
                issues.push("Advisory queue large");
            }
            format!("Issues detected: {}", issues.join("; "))
        };

        HealthStatus {
            status: status.to_string(),
            uptime_seconds,
            message,
            timestamp: Utc::now(),
        }
    }

    pub async fn entity_activity(&self, entity_id: &str, hours: i64) -> Option<EntityActivity> {
        let guard = self.inner.lock().await;
        guard
            .brg
            .entity_activity(entity_id, chrono::Duration::hours(hours), Utc::now())
    }

    pub async fn graph_nodes(&self) -> Vec<PatternDetails> {
        let guard = self.inner.lock().await;
        guard.brg.all_patterns()
    }

    pub async fn graph_entities(&self) -> Vec<String> {
        let guard = self.inner.lock().await;
        guard.brg.all_entities()
    }

    pub async fn metrics_summary(&self) -> MetricsSummary {
        let stats = self.graph_stats().await;
        let now = Utc::now();
        let mut metrics = self.metrics.lock();
        metrics.get_summary(now, Some(&stats))
    }

    /// Run `BRG.prune(now)` under the shared lock, so pruning is
    /// globally serialized with any in-flight ingest.
    pub async fn prune(&self, now: DateTime<Utc>) -> usize {
        let mut guard = self.inner.lock().await;
        guard.brg.prune(now)
    }
}

/// Spawn the background pruner loop. Errors inside a single tick are
/// logged and the loop continues; they never propagate out and never
/// abort the task.
pub fn spawn_pruner(hub: Arc<Hub>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let interval = hub.config_snapshot().prune_interval_seconds;
            tokio::time::sleep(std::time::Duration::from_secs(interval)).await;
            let removed = hub.prune(Utc::now()).await;
            if removed > 0 {
                tracing::info!(removed, "pruned expired observations");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn fp(entity: &str, fingerprint: &str, ts: DateTime<Utc>) -> RiskFingerprint {
        RiskFingerprint {
            entity_id: entity.to_string(),
            fingerprint: fingerprint.to_string(),
            severity: Severity::High,
            timestamp: ts,
        }
    }

    fn ts(seconds: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    #[tokio::test]
    async fn s1_single_observation_no_correlation() {
        let hub = Hub::new(HubConfig::default());
        let outcome = hub.ingest(fp("entity_a", "AAAA1111", ts(0))).await.unwrap();
        assert!(!outcome.correlation_detected);
        assert!(hub.recent_advisories(10, None).await.is_empty());

        let stats = hub.graph_stats().await;
        assert_eq!(stats.unique_patterns, 1);
        assert_eq!(stats.unique_entities, 1);

        let details = hub.pattern_details_at("AAAA1111", ts(0)).await.unwrap();
        assert_eq!(details.effective_confidence, 0.5);
        assert_eq!(details.pattern_status, PatternStatus::Active);
    }

    #[tokio::test]
    async fn s2_two_entities_yields_high_severity_advisory() {
        let hub = Hub::new(HubConfig::default());
        hub.ingest(fp("entity_a", "AAAA1111", ts(0))).await.unwrap();
        let outcome = hub.ingest(fp("entity_b", "AAAA1111", ts(60))).await.unwrap();

        assert!(outcome.correlation_detected);
        let advisories = hub.recent_advisories(10, None).await;
        assert_eq!(advisories.len(), 1);
        assert_eq!(advisories[0].severity, "HIGH");
        assert_eq!(advisories[0].entity_count, 2);
        assert_eq!(advisories[0].fraud_score, 62);
    }

    #[tokio::test]
    async fn s3_three_entities_within_three_minutes_critical_severity() {
        let hub = Hub::new(HubConfig::default());
        hub.ingest(fp("entity_a", "BBBB2222", ts(0))).await.unwrap();
        hub.ingest(fp("entity_b", "BBBB2222", ts(90))).await.unwrap();
        let outcome = hub.ingest(fp("entity_c", "BBBB2222", ts(170))).await.unwrap();

        assert!(outcome.correlation_detected);
        let advisories = hub.recent_advisories(10, None).await;
        assert_eq!(advisories[0].severity, "CRITICAL");
        assert_eq!(advisories[0].entity_count, 3);
        assert_eq!(advisories[0].fraud_score, 87);
    }

    #[tokio::test]
    async fn s4_decay_into_cooling_on_refresh() {
        let hub = Hub::new(HubConfig::default());
        hub.ingest(fp("entity_a", "BBBB2222", ts(0))).await.unwrap();
        hub.ingest(fp("entity_b", "BBBB2222", ts(90))).await.unwrap();
        hub.ingest(fp("entity_c", "BBBB2222", ts(170))).await.unwrap();

        // age 250s from last_seen (T0+170s) -> recent window -> still ACTIVE.
        let still_active = hub.pattern_details_at("BBBB2222", ts(170 + 250)).await.unwrap();
        assert_eq!(still_active.pattern_status, PatternStatus::Active);

        // age 430s from last_seen -> aging window -> decay 0.5 -> effective 0.45 -> COOLING.
        let cooling = hub.pattern_details_at("BBBB2222", ts(170 + 430)).await.unwrap();
        assert_eq!(cooling.pattern_status, PatternStatus::Cooling);
        assert_eq!(cooling.decay_score, 0.5);
    }

    #[tokio::test]
    async fn s5_reactivation_spike_after_dormant() {
        let hub = Hub::new(HubConfig::default());
        hub.ingest(fp("entity_a", "BBBB2222", ts(0))).await.unwrap();
        hub.ingest(fp("entity_b", "BBBB2222", ts(90))).await.unwrap();
        hub.ingest(fp("entity_c", "BBBB2222", ts(170))).await.unwrap();

        // age 730s from last_seen -> stale window -> DORMANT.
        let dormant = hub.pattern_details_at("BBBB2222", ts(170 + 730)).await.unwrap();
        assert_eq!(dormant.pattern_status, PatternStatus::Dormant);

        // a fresh observation resets decay to full strength.
        hub.ingest(fp("entity_a", "BBBB2222", ts(170 + 730))).await.unwrap();
        let reactivated = hub.pattern_details_at("BBBB2222", ts(170 + 730)).await.unwrap();
        assert_eq!(reactivated.decay_score, 1.0);
        assert_eq!(reactivated.pattern_status, PatternStatus::Active);
    }

    #[tokio::test]
    async fn s6_prune_horizon_removes_expired_pattern() {
        let mut config = HubConfig::default();
        config.max_graph_age_seconds = 300;
        let hub = Hub::new(config);
        hub.ingest(fp("entity_a", "CCCC3333", ts(0))).await.unwrap();

        let removed = hub.prune(ts(400)).await;
        assert!(removed >= 1);
        assert!(hub.pattern_details("CCCC3333").await.is_none());
    }

    #[tokio::test]
    async fn advisory_log_is_capped_and_keeps_most_recent() {
        let mut config = HubConfig::default();
        config.max_advisories = 2;
        config.entity_threshold = 1;
        config.medium_threshold = 1;
        let hub = Hub::new(config);

        for i in 0..5 {
            let fingerprint = format!("FP{i}AAAAAAAA");
            hub.ingest(fp("entity_a", &fingerprint, ts(i * 1000))).await.unwrap();
        }

        let advisories = hub.recent_advisories(10, None).await;
        assert!(advisories.len() <= 2);
    }

    #[tokio::test]
    async fn validation_rejects_empty_entity_id() {
        let hub = Hub::new(HubConfig::default());
        let result = hub.ingest(fp("", "AAAA1111", ts(0))).await;
        assert!(result.is_err());
        let stats = hub.graph_stats().await;
        assert_eq!(stats.unique_patterns, 0);
    }
}
