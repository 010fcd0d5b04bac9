//! Protective execution layer for caller-constructed SQL.
//!
//! Every statement passes a textual validator (length, complexity, protected
//! tables, cartesian products) before it reaches the pool, then runs under a
//! wall-clock timeout with a server-side statement ceiling and a row cap.
//!
//! # Example
//!
//! ```no_run
//! use query_guard::{
//!     config::{DatabaseConfigBuilder, ProtectionConfig},
//!     database::{CellValue, create_driver},
//!     guard::QueryGuard,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db_config = DatabaseConfigBuilder::new().from_env()?.build()?;
//!     let driver = create_driver(db_config).await?;
//!     let guard = QueryGuard::new(driver, ProtectionConfig::from_env()?);
//!
//!     let outcome = guard
//!         .execute(
//!             "SELECT id, name FROM master_events WHERE id = $1",
//!             &[CellValue::Int(42)],
//!         )
//!         .await?;
//!
//!     println!("{} rows in {}ms", outcome.row_count, outcome.execution_time_ms);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod guard;
pub mod security;

pub use config::{DatabaseConfig, DatabaseConfigBuilder, ProtectedTableSet, ProtectionConfig};
pub use database::{CellValue, QueryDriver, QueryOutput, QueryParam, QueryRequest, create_driver};
pub use error::{DatabaseError, Error, GuardError, GuardResult, Result};
pub use guard::{GuardedOutcome, QueryGuard};
pub use security::{ValidationResult, validate};
