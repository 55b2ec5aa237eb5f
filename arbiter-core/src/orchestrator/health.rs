//! Per-provider rolling health statistics
//!
//! Statistics are all-time running averages updated incrementally on every
//! attempt outcome. Each provider's record sits behind its own lock, so
//! updates for one provider never contend with another.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Health snapshot for one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub provider_id: String,
    /// Soft signal; the circuit breaker is the hard gate
    pub is_healthy: bool,
    /// Fraction of successful attempts, in [0, 1]
    pub success_rate: f64,
    /// Running average latency of successful attempts
    pub avg_latency_ms: f64,
    pub request_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_time: Option<DateTime<Utc>>,
}

impl ProviderHealth {
    /// Fresh record: healthy, perfect success rate, no history
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            is_healthy: true,
            success_rate: 1.0,
            avg_latency_ms: 0.0,
            request_count: 0,
            last_error: None,
            last_error_time: None,
        }
    }

    /// Voting weight: rewards providers that are both reliable and fast
    pub fn weight(&self) -> f64 {
        self.success_rate / (self.avg_latency_ms / 1000.0).max(1.0)
    }

    fn apply_success(&mut self, latency_ms: u64) {
        self.request_count += 1;
        let n = self.request_count as f64;
        self.avg_latency_ms = (self.avg_latency_ms * (n - 1.0) + latency_ms as f64) / n;
        self.success_rate = (self.success_rate * (n - 1.0) + 1.0) / n;
        self.is_healthy = true;
    }

    fn apply_failure(&mut self, error_summary: &str) {
        self.request_count += 1;
        let n = self.request_count as f64;
        self.success_rate = (self.success_rate * (n - 1.0)) / n;
        self.last_error = Some(error_summary.to_string());
        self.last_error_time = Some(Utc::now());
    }
}

/// Tracks `ProviderHealth` for a fixed set of providers
#[derive(Debug, Default)]
pub struct HealthTracker {
    records: HashMap<String, Mutex<ProviderHealth>>,
    order: Vec<String>,
}

impl HealthTracker {
    pub fn new<I, S>(provider_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let order: Vec<String> = provider_ids.into_iter().map(Into::into).collect();
        let records = order
            .iter()
            .map(|id| (id.clone(), Mutex::new(ProviderHealth::new(id.clone()))))
            .collect();
        Self { records, order }
    }

    /// Record a successful attempt. Unknown providers are ignored.
    pub fn record_success(&self, provider_id: &str, latency_ms: u64) {
        self.with_record(provider_id, |health| {
            health.apply_success(latency_ms);
            debug!(
                "{} success: rate={:.3} avg_latency={:.0}ms n={}",
                provider_id, health.success_rate, health.avg_latency_ms, health.request_count
            );
        });
    }

    /// Record a failed attempt. Unknown providers are ignored.
    pub fn record_failure(&self, provider_id: &str, error_summary: &str) {
        self.with_record(provider_id, |health| {
            health.apply_failure(error_summary);
            debug!(
                "{} failure: rate={:.3} n={} error={}",
                provider_id, health.success_rate, health.request_count, error_summary
            );
        });
    }

    /// Force the soft health flag off (called when the breaker opens)
    pub fn mark_unhealthy(&self, provider_id: &str) {
        self.with_record(provider_id, |health| health.is_healthy = false);
    }

    pub fn get(&self, provider_id: &str) -> Option<ProviderHealth> {
        self.records.get(provider_id).map(|record| {
            record
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        })
    }

    pub fn success_rate(&self, provider_id: &str) -> f64 {
        self.get(provider_id).map_or(0.0, |h| h.success_rate)
    }

    pub fn weight(&self, provider_id: &str) -> f64 {
        self.get(provider_id).map_or(0.0, |h| h.weight())
    }

    /// Read-only snapshot of every provider, in registration order
    pub fn snapshot(&self) -> Vec<ProviderHealth> {
        self.order.iter().filter_map(|id| self.get(id)).collect()
    }

    fn with_record(&self, provider_id: &str, update: impl FnOnce(&mut ProviderHealth)) {
        if let Some(record) = self.records.get(provider_id) {
            let mut health = record.lock().unwrap_or_else(PoisonError::into_inner);
            update(&mut health);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_averages() {
        let tracker = HealthTracker::new(["a"]);
        tracker.record_success("a", 1000);
        tracker.record_success("a", 3000);
        tracker.record_failure("a", "boom");
        tracker.record_success("a", 2000);

        let health = tracker.get("a").unwrap();
        assert_eq!(health.request_count, 4);
        assert!((health.success_rate - 0.75).abs() < 1e-9);
        // Failures advance n without contributing a latency sample.
        assert!((health.avg_latency_ms - 2000.0).abs() < 1e-9);
        assert_eq!(health.last_error.as_deref(), Some("boom"));
        assert!(health.last_error_time.is_some());
    }

    #[test]
    fn test_failure_keeps_soft_health_until_marked() {
        let tracker = HealthTracker::new(["a"]);
        tracker.record_failure("a", "x");
        assert!(tracker.get("a").unwrap().is_healthy);
        tracker.mark_unhealthy("a");
        assert!(!tracker.get("a").unwrap().is_healthy);
        tracker.record_success("a", 10);
        assert!(tracker.get("a").unwrap().is_healthy);
    }

    #[test]
    fn test_weight_penalizes_slow_providers() {
        let mut fast = ProviderHealth::new("fast");
        fast.avg_latency_ms = 400.0;
        let mut slow = ProviderHealth::new("slow");
        slow.avg_latency_ms = 4000.0;

        assert_eq!(fast.weight(), 1.0);
        assert_eq!(slow.weight(), 0.25);
    }

    #[test]
    fn test_unknown_provider_is_ignored() {
        let tracker = HealthTracker::new(["a"]);
        tracker.record_failure("zzz", "x");
        assert!(tracker.get("zzz").is_none());
        assert_eq!(tracker.snapshot().len(), 1);
    }
}
