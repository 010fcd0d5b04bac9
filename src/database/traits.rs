//! Database driver trait.

use crate::database::result::{QueryOutput, QueryParam};
use crate::error::DbResult;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A single statement handed to a [`QueryDriver`].
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub sql: String,
    pub params: Vec<QueryParam>,
    /// Session-scoped execution ceiling to install on the connection that runs `sql`.
    pub statement_timeout: Option<Duration>,
    /// Drivers stop fetching after this many rows.
    pub row_limit: Option<usize>,
    /// Fired when the caller stops waiting. Drivers should stop the statement server-side.
    pub cancel: CancellationToken,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            statement_timeout: None,
            row_limit: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<QueryParam>) -> Self {
        self.params = params;
        self
    }

    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    pub fn with_row_limit(mut self, rows: usize) -> Self {
        self.row_limit = Some(rows);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Async driver running statements against a pooled relational connection.
///
/// Implementations: [`PostgresDriver`](crate::database::PostgresDriver).
#[async_trait]
pub trait QueryDriver: Send + Sync {
    /// Returns the driver name (e.g., "postgres").
    fn name(&self) -> &'static str;

    /// Executes a statement and returns every row it produced.
    ///
    /// The statement timeout, when present, must apply to the same connection
    /// and transaction as `request.sql`. Failure to install it is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::QueryFailed`](crate::error::DatabaseError::QueryFailed)
    /// if the database reports an error and
    /// [`DatabaseError::Cancelled`](crate::error::DatabaseError::Cancelled) if
    /// `request.cancel` fired first.
    async fn query(&self, request: QueryRequest) -> DbResult<QueryOutput>;
}
