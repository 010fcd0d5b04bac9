//! Database abstraction layer.
//!
//! The guard talks to the database only through [`QueryDriver`].
//!
//! # Feature Flags
//!
//! - `postgres` - Enable the PostgreSQL driver (enabled by default)

#[cfg(feature = "postgres")]
pub mod postgres;
pub mod result;
pub mod traits;

#[cfg(feature = "postgres")]
pub use postgres::PostgresDriver;
pub use result::*;
pub use traits::{QueryDriver, QueryRequest};

use crate::config::DatabaseConfig;
#[cfg(not(feature = "postgres"))]
use crate::error::DatabaseError;
use crate::error::DbResult;
use std::sync::Arc;

/// Create the database driver for the given configuration.
///
/// # Errors
///
/// Returns [`DatabaseError::ConnectionFailed`](crate::error::DatabaseError::ConnectionFailed)
/// if the pool cannot be created or the first connection fails, and when the
/// `postgres` feature is disabled.
pub async fn create_driver(config: DatabaseConfig) -> DbResult<Arc<dyn QueryDriver>> {
    #[cfg(feature = "postgres")]
    {
        let driver = PostgresDriver::new(config).await?;
        Ok(Arc::new(driver))
    }

    #[cfg(not(feature = "postgres"))]
    {
        let _ = config;
        Err(DatabaseError::ConnectionFailed(
            "PostgreSQL support not enabled. Enable the 'postgres' feature.".to_string(),
        ))
    }
}
