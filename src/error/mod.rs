//! Error types for the query guard.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` conversions.

use std::borrow::Cow;
use thiserror::Error;

/// Crate-level error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Guard error: {0}")]
    Guard(#[from] GuardError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome failures of a guarded execution.
///
/// Truncation is not an error; it is reported through
/// [`GuardedOutcome::truncated`](crate::guard::GuardedOutcome::truncated).
#[derive(Debug, Error)]
pub enum GuardError {
    /// Refused before any I/O (length, missing predicate, cartesian product).
    #[error("Query rejected: {0}")]
    ValidationRejected(String),

    /// Wall-clock ceiling exceeded. The statement may still be running server-side
    /// until the cancel request or the session ceiling stops it.
    #[error("Query timeout after {0}ms")]
    ExecutionTimeout(u64),

    #[error("Driver error: {0}")]
    Driver(#[from] DatabaseError),
}

impl GuardError {
    /// Short machine-readable kind, used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ValidationRejected(_) => "validation_rejected",
            Self::ExecutionTimeout(_) => "execution_timeout",
            Self::Driver(_) => "driver_error",
        }
    }
}

/// Database-related errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Query cancelled")]
    Cancelled,

    #[error("PostgreSQL error: {0}")]
    Postgres(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(Cow<'static, str>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
}

/// Result type alias for the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for GuardError.
pub type GuardResult<T> = std::result::Result<T, GuardError>;

/// Result type alias for DatabaseError.
pub type DbResult<T> = std::result::Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_error_kinds() {
        assert_eq!(
            GuardError::ValidationRejected("x".into()).kind(),
            "validation_rejected"
        );
        assert_eq!(GuardError::ExecutionTimeout(30).kind(), "execution_timeout");
        assert_eq!(
            GuardError::Driver(DatabaseError::PoolExhausted).kind(),
            "driver_error"
        );
    }

    #[test]
    fn test_driver_error_keeps_original_message() {
        let err: GuardError =
            DatabaseError::QueryFailed("relation \"x\" does not exist".into()).into();
        assert!(matches!(err, GuardError::Driver(_)));
        assert!(err.to_string().contains("relation \"x\" does not exist"));
    }

    #[test]
    fn test_error_conversion() {
        let config_error = ConfigError::MissingField("host".into());
        let error: Error = config_error.into();
        assert!(matches!(error, Error::Config(_)));

        let timeout: Error = GuardError::ExecutionTimeout(100).into();
        assert_eq!(timeout.to_string(), "Guard error: Query timeout after 100ms");
    }
}
