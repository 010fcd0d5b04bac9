//! Guard counters for monitoring.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by [`QueryGuard`](crate::guard::QueryGuard).
#[derive(Debug, Default)]
pub struct GuardMetrics {
    pub executed: AtomicU64,
    pub rejected: AtomicU64,
    pub timeouts: AtomicU64,
    pub driver_errors: AtomicU64,
    pub truncated: AtomicU64,
    pub slow_queries: AtomicU64,
}

impl GuardMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_executed(&self) {
        self.executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_driver_error(&self) {
        self.driver_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_truncated(&self) {
        self.truncated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_slow_query(&self) {
        self.slow_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> GuardMetricsSnapshot {
        GuardMetricsSnapshot {
            executed: self.executed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            driver_errors: self.driver_errors.load(Ordering::Relaxed),
            truncated: self.truncated.load(Ordering::Relaxed),
            slow_queries: self.slow_queries.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of guard metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GuardMetricsSnapshot {
    pub executed: u64,
    pub rejected: u64,
    pub timeouts: u64,
    pub driver_errors: u64,
    pub truncated: u64,
    pub slow_queries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_metrics() {
        let metrics = GuardMetrics::new();
        metrics.record_executed();
        metrics.record_executed();
        metrics.record_rejected();
        metrics.record_truncated();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.executed, 2);
        assert_eq!(snapshot.rejected, 1);
        assert_eq!(snapshot.truncated, 1);
        assert_eq!(snapshot.timeouts, 0);
    }
}
