//! Counter/latency sink for lookup and API error statistics.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

/// Named-counter sink fed by the lookup service and diagnostics.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &str, by: u64);
    fn record_latency(&self, latency: Duration);
}

/// Point-in-time copy of [`LookupMetrics`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, u64>,
    pub total_latency_ms: f64,
}

impl MetricsSnapshot {
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }
}

/// In-process metrics store.
#[derive(Debug, Default)]
pub struct LookupMetrics {
    inner: Mutex<MetricsSnapshot>,
}

impl LookupMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MetricsSink for LookupMetrics {
    fn increment(&self, name: &str, by: u64) {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let counter = guard.counters.entry(name.to_string()).or_insert(0);
        *counter = counter.saturating_add(by);
    }

    fn record_latency(&self, latency: Duration) {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.total_latency_ms += latency.as_secs_f64() * 1000.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_accumulates_per_name() {
        let metrics = LookupMetrics::new();
        metrics.increment("cache_hits", 1);
        metrics.increment("cache_hits", 2);
        metrics.increment("cache_misses", 1);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.counter("cache_hits"), 3);
        assert_eq!(snapshot.counter("cache_misses"), 1);
        assert_eq!(snapshot.counter("never_seen"), 0);
    }

    #[test]
    fn test_latency_sums_in_milliseconds() {
        let metrics = LookupMetrics::new();
        metrics.record_latency(Duration::from_millis(250));
        metrics.record_latency(Duration::from_millis(750));
        let snapshot = metrics.snapshot();
        assert!((snapshot.total_latency_ms - 1000.0).abs() < 0.001);
    }
}
