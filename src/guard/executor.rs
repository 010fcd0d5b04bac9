//! Guarded statement execution.
//!
//! Validates, then races the driver against a wall-clock timeout and bounds the
//! returned row volume. A lost race cancels the request token so the driver can
//! stop the statement server-side; the caller never waits past the ceiling.

use crate::config::ProtectionConfig;
use crate::database::{Column, QueryDriver, QueryOutput, QueryParam, QueryRequest, Row};
use crate::error::{DatabaseError, GuardError, GuardResult};
use crate::guard::metrics::{GuardMetrics, GuardMetricsSnapshot};
use crate::security::{ValidationResult, validate};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Executions slower than this are logged as slow queries.
pub const SLOW_QUERY_THRESHOLD: Duration = Duration::from_millis(5000);

const PREVIEW_CHARS: usize = 200;

/// Successful result of a guarded execution.
#[derive(Debug, Clone, Serialize)]
pub struct GuardedOutcome {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    /// Always equal to `rows.len()`.
    pub row_count: usize,
    pub warnings: Vec<String>,
    pub truncated: bool,
    pub execution_time_ms: u64,
}

/// The single path for caller-constructed SQL.
pub struct QueryGuard {
    driver: Arc<dyn QueryDriver>,
    config: Arc<ProtectionConfig>,
    metrics: Arc<GuardMetrics>,
}

impl QueryGuard {
    pub fn new(driver: Arc<dyn QueryDriver>, config: ProtectionConfig) -> Self {
        Self {
            driver,
            config: Arc::new(config),
            metrics: Arc::new(GuardMetrics::new()),
        }
    }

    pub fn config(&self) -> &ProtectionConfig {
        &self.config
    }

    pub fn metrics(&self) -> GuardMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Validate without executing, using the guard's configuration.
    pub fn validate(&self, sql: &str, params: &[QueryParam]) -> ValidationResult {
        validate(sql, params, &self.config)
    }

    /// Validate and execute with the guard's configuration.
    pub async fn execute(&self, sql: &str, params: &[QueryParam]) -> GuardResult<GuardedOutcome> {
        let config = Arc::clone(&self.config);
        self.execute_with(sql, params, &config).await
    }

    /// Validate and execute with a per-call configuration.
    ///
    /// # Errors
    ///
    /// - [`GuardError::ValidationRejected`] before any driver call.
    /// - [`GuardError::ExecutionTimeout`] once `max_query_time_ms` elapses.
    /// - [`GuardError::Driver`] for failures reported by the driver, before truncation.
    #[instrument(
        skip(self, sql, params, config),
        fields(driver = self.driver.name(), params = params.len())
    )]
    pub async fn execute_with(
        &self,
        sql: &str,
        params: &[QueryParam],
        config: &ProtectionConfig,
    ) -> GuardResult<GuardedOutcome> {
        let verdict = validate(sql, params, config);
        if !verdict.allowed {
            self.metrics.record_rejected();
            let reason = verdict
                .reason
                .unwrap_or_else(|| "Query rejected by validator".to_string());
            let err = GuardError::ValidationRejected(reason);
            warn!(kind = err.kind(), error = %err, "Query rejected");
            return Err(err);
        }

        debug!(warnings = verdict.warnings.len(), "Validation passed");
        for warning in &verdict.warnings {
            warn!(warning = %warning, "Query validation warning");
        }

        let cancel = CancellationToken::new();
        let mut request = QueryRequest::new(sql)
            .with_params(params.to_vec())
            .with_cancel(cancel.clone())
            .with_row_limit(config.max_result_rows.saturating_add(1));
        if config.enable_statement_timeout {
            request = request.with_statement_timeout(config.max_query_time());
        }

        let start = Instant::now();
        let output = self
            .run_with_timeout(request, cancel, config.max_query_time())
            .await?;
        let elapsed = start.elapsed();
        let execution_time_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        if elapsed > SLOW_QUERY_THRESHOLD {
            self.metrics.record_slow_query();
            warn!(
                target: "query_guard::slow_query",
                execution_time_ms,
                param_count = params.len(),
                statement = %statement_preview(sql),
                "Slow query"
            );
        }

        let QueryOutput { columns, mut rows, .. } = output;
        let mut warnings = verdict.warnings;

        let truncated = rows.len() > config.max_result_rows;
        if truncated {
            let received = rows.len();
            rows.truncate(config.max_result_rows);
            let message = format!(
                "Result exceeded {} rows and was truncated",
                config.max_result_rows
            );
            warn!(received_rows = received, max_rows = config.max_result_rows, "{}", message);
            self.metrics.record_truncated();
            warnings.push(message);
        }

        self.metrics.record_executed();
        debug!(rows = rows.len(), execution_time_ms, truncated, "Query completed");

        Ok(GuardedOutcome {
            columns,
            row_count: rows.len(),
            rows,
            warnings,
            truncated,
            execution_time_ms,
        })
    }

    /// Runs the driver on its own task so a lost race leaves it free to finish its cancel.
    async fn run_with_timeout(
        &self,
        request: QueryRequest,
        cancel: CancellationToken,
        limit: Duration,
    ) -> GuardResult<QueryOutput> {
        let driver = Arc::clone(&self.driver);
        // Cancels on every exit except an explicit disarm, including the caller dropping us.
        let cancel_on_exit = cancel.drop_guard();

        let task = tokio::spawn(async move { driver.query(request).await });

        match timeout(limit, task).await {
            Ok(Ok(Ok(output))) => {
                cancel_on_exit.disarm();
                Ok(output)
            }
            Ok(Ok(Err(e))) => {
                cancel_on_exit.disarm();
                self.metrics.record_driver_error();
                let err = GuardError::Driver(e);
                warn!(kind = err.kind(), error = %err, "Driver error");
                Err(err)
            }
            Ok(Err(join_error)) => {
                self.metrics.record_driver_error();
                let err = GuardError::Driver(DatabaseError::QueryFailed(format!(
                    "Driver task failed: {}",
                    join_error
                )));
                warn!(kind = err.kind(), error = %err, "Driver task failed");
                Err(err)
            }
            Err(_) => {
                let limit_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                self.metrics.record_timeout();
                let err = GuardError::ExecutionTimeout(limit_ms);
                warn!(kind = err.kind(), timeout_ms = limit_ms, "Query timed out, cancelling");
                drop(cancel_on_exit);
                Err(err)
            }
        }
    }
}

/// Whitespace-collapsed statement, cut to a fixed number of characters.
pub fn statement_preview(sql: &str) -> String {
    let collapsed = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= PREVIEW_CHARS {
        return collapsed;
    }
    let mut preview: String = collapsed.chars().take(PREVIEW_CHARS).collect();
    preview.push_str("...");
    preview
}
