use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,
    failures_by_kind: DashMap<&'static str, usize>,

    // Timing (in microseconds)
    total_chart_time_us: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            successful_requests: AtomicUsize::new(0),
            failed_requests: AtomicUsize::new(0),
            failures_by_kind: DashMap::new(),
            total_chart_time_us: AtomicU64::new(0),
        })
    }

    /// `failure` is the error kind, or `None` on success
    pub fn record_request(&self, failure: Option<&'static str>, duration: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_chart_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);

        match failure {
            None => {
                self.successful_requests.fetch_add(1, Ordering::Relaxed);
            }
            Some(kind) => {
                self.failed_requests.fetch_add(1, Ordering::Relaxed);
                *self.failures_by_kind.entry(kind).or_insert(0) += 1;
            }
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_us = self.total_chart_time_us.load(Ordering::Relaxed) as f64;

        MetricsSnapshot {
            total_requests,
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            failures_by_kind: self
                .failures_by_kind
                .iter()
                .map(|r| (r.key().to_string(), *r.value()))
                .collect(),
            avg_chart_time_ms: if total_requests > 0 {
                total_us / total_requests as f64 / 1000.0 // Convert to ms
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub failures_by_kind: BTreeMap<String, usize>,
    pub avg_chart_time_ms: f64,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let metrics = Metrics::new();
        metrics.record_request(None, Duration::from_millis(4));
        metrics.record_request(Some("unknown_column"), Duration::from_millis(2));
        metrics.record_request(Some("unknown_column"), Duration::from_millis(0));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.successful_requests, 1);
        assert_eq!(snapshot.failed_requests, 2);
        assert_eq!(snapshot.failures_by_kind.get("unknown_column"), Some(&2));
        assert!((snapshot.avg_chart_time_ms - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.avg_chart_time_ms, 0.0);
    }
}
