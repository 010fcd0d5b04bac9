//! Guarded execution of caller-constructed SQL.

pub mod executor;
pub mod metrics;

pub use executor::{GuardedOutcome, QueryGuard, SLOW_QUERY_THRESHOLD, statement_preview};
pub use metrics::{GuardMetrics, GuardMetricsSnapshot};
