//! PostgreSQL driver using `tokio-postgres` and `deadpool`.

use crate::config::DatabaseConfig;
use crate::database::result::{CellValue, Column, QueryOutput, Row};
use crate::database::traits::{QueryDriver, QueryRequest};
use crate::error::{DatabaseError, DbResult};
use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use deadpool_postgres::{Config as DeadpoolConfig, Pool, PoolConfig, PoolError, Runtime, Timeouts};
use rust_decimal::Decimal;
use std::error::Error as StdError;
use std::time::Duration;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_postgres::{Client, NoTls, Transaction};
use tracing::{debug, info, instrument, warn};

const TIMEOUT_SAVEPOINT: &str = "query_guard_statement_timeout";

/// PostgreSQL database driver.
pub struct PostgresDriver {
    pool: Pool,
}

impl PostgresDriver {
    /// Create a new PostgreSQL driver with the given configuration.
    pub async fn new(config: DatabaseConfig) -> DbResult<Self> {
        info!(
            "Connecting to PostgreSQL: {}:{}/{}",
            config.host, config.port, config.database
        );

        let mut deadpool_config = DeadpoolConfig::new();
        deadpool_config.host = Some(config.host.clone());
        deadpool_config.port = Some(config.port);
        deadpool_config.dbname = Some(config.database.clone());
        deadpool_config.user = Some(config.username.clone());
        deadpool_config.password = Some(config.password.clone());

        let mut pool_config = PoolConfig::new(config.pool_size as usize);
        pool_config.timeouts = Timeouts {
            wait: Some(config.connection_timeout),
            create: Some(config.connection_timeout),
            recycle: None,
        };
        deadpool_config.pool = Some(pool_config);

        let pool = deadpool_config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        // Test connection
        let _conn = pool
            .get()
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!(
            "PostgreSQL connection pool created with max size {}",
            config.pool_size
        );

        Ok(Self { pool })
    }

    /// Runs the statement inside one transaction so `SET LOCAL` binds to it.
    async fn run(client: &mut Client, request: &QueryRequest) -> DbResult<QueryOutput> {
        let mut tx = client.transaction().await.map_err(query_error)?;

        if let Some(ceiling) = request.statement_timeout {
            if let Err(e) = install_statement_timeout(&mut tx, ceiling).await {
                warn!(error = %e, "Failed to install statement timeout, continuing without it");
            }
        }

        let stmt = tx.prepare(&request.sql).await.map_err(query_error)?;
        let params: Vec<&(dyn ToSql + Sync)> = request
            .params
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect();

        // A portal lets the server stop producing rows once the limit is reached.
        let pg_rows = match request.row_limit {
            Some(limit) => {
                let portal = tx.bind(&stmt, &params).await.map_err(query_error)?;
                tx.query_portal(&portal, portal_fetch_size(limit))
                    .await
                    .map_err(query_error)?
            }
            None => tx.query(&stmt, &params).await.map_err(query_error)?,
        };
        tx.commit().await.map_err(query_error)?;

        let columns: Vec<Column> = stmt
            .columns()
            .iter()
            .map(|c| Column::new(c.name(), c.type_().name()))
            .collect();

        let rows: Vec<Row> = pg_rows
            .iter()
            .map(|r| convert_row(r, stmt.columns()))
            .collect();

        Ok(QueryOutput::new(columns, rows))
    }
}

#[async_trait]
impl QueryDriver for PostgresDriver {
    fn name(&self) -> &'static str {
        "postgres"
    }

    #[instrument(skip(self, request), fields(db = "postgres", params = request.params.len()))]
    async fn query(&self, request: QueryRequest) -> DbResult<QueryOutput> {
        let mut conn = self.pool.get().await.map_err(|e| match e {
            PoolError::Timeout(_) => DatabaseError::PoolExhausted,
            other => DatabaseError::ConnectionFailed(other.to_string()),
        })?;

        // Taken before the statement starts so a cancel can reach this exact backend.
        let cancel_token = conn.cancel_token();
        let cancel = request.cancel.clone();

        debug!("Executing statement: {}", request.sql);

        tokio::select! {
            result = Self::run(&mut conn, &request) => result,
            _ = cancel.cancelled() => {
                warn!("Caller stopped waiting, sending cancel request");
                if let Err(e) = cancel_token.cancel_query(NoTls).await {
                    warn!(error = %e, "Cancel request failed");
                }
                Err(DatabaseError::Cancelled)
            }
        }
    }
}

async fn install_statement_timeout(
    tx: &mut Transaction<'_>,
    ceiling: Duration,
) -> Result<(), tokio_postgres::Error> {
    // A failed SET must not abort the outer transaction, so it runs in a savepoint.
    let savepoint = tx.savepoint(TIMEOUT_SAVEPOINT).await?;
    savepoint
        .batch_execute(&statement_timeout_sql(ceiling))
        .await?;
    savepoint.commit().await
}

fn statement_timeout_sql(ceiling: Duration) -> String {
    format!("SET LOCAL statement_timeout = {}", ceiling.as_millis().max(1))
}

/// Postgres treats a zero fetch size as unlimited.
fn portal_fetch_size(limit: usize) -> i32 {
    i32::try_from(limit.max(1)).unwrap_or(i32::MAX)
}

fn query_error(e: tokio_postgres::Error) -> DatabaseError {
    match e.as_db_error() {
        Some(db) => DatabaseError::QueryFailed(format!("{} ({})", db.message(), db.code().code())),
        None => DatabaseError::Postgres(e.to_string()),
    }
}

/// Convert a PostgreSQL row to our Row type.
fn convert_row(pg_row: &tokio_postgres::Row, columns: &[tokio_postgres::Column]) -> Row {
    columns
        .iter()
        .enumerate()
        .map(|(i, col)| (col.name().to_string(), cell_value(pg_row, i, col.type_())))
        .collect()
}

/// Extract a cell by its declared type; unsupported types fall back to text, then NULL.
fn cell_value(row: &tokio_postgres::Row, index: usize, ty: &Type) -> CellValue {
    let value: Result<CellValue, tokio_postgres::Error> = match ty.name() {
        "bool" => row.try_get::<_, Option<bool>>(index).map(CellValue::from),
        "int2" => row
            .try_get::<_, Option<i16>>(index)
            .map(|v| v.map(i64::from).into()),
        "int4" => row
            .try_get::<_, Option<i32>>(index)
            .map(|v| v.map(i64::from).into()),
        "int8" => row.try_get::<_, Option<i64>>(index).map(CellValue::from),
        "float4" => row
            .try_get::<_, Option<f32>>(index)
            .map(|v| v.map(f64::from).into()),
        "float8" => row.try_get::<_, Option<f64>>(index).map(CellValue::from),
        "numeric" => row.try_get::<_, Option<Decimal>>(index).map(CellValue::from),
        "timestamptz" => row
            .try_get::<_, Option<DateTime<Utc>>>(index)
            .map(CellValue::from),
        "timestamp" => row
            .try_get::<_, Option<NaiveDateTime>>(index)
            .map(|v| v.map(|ts| DateTime::from_naive_utc_and_offset(ts, Utc)).into()),
        "date" => row
            .try_get::<_, Option<NaiveDate>>(index)
            .map(|v| v.map(|d| d.to_string()).into()),
        "json" | "jsonb" => row
            .try_get::<_, Option<serde_json::Value>>(index)
            .map(CellValue::from),
        "bytea" => row.try_get::<_, Option<Vec<u8>>>(index).map(CellValue::from),
        _ => row.try_get::<_, Option<String>>(index).map(CellValue::from),
    };

    value.unwrap_or(CellValue::Null)
}

impl ToSql for CellValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        match self {
            Self::Null => Ok(IsNull::Yes),
            Self::Bool(v) => v.to_sql_checked(ty, out),
            Self::Int(v) => match ty.name() {
                "int2" => i16::try_from(*v)?.to_sql_checked(ty, out),
                "int4" => i32::try_from(*v)?.to_sql_checked(ty, out),
                "float4" => (*v as f32).to_sql_checked(ty, out),
                "float8" => (*v as f64).to_sql_checked(ty, out),
                "numeric" => Decimal::from(*v).to_sql_checked(ty, out),
                "text" | "varchar" | "bpchar" | "name" => v.to_string().to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Self::Float(v) => match ty.name() {
                "float4" => (*v as f32).to_sql_checked(ty, out),
                "numeric" => Decimal::try_from(*v)?.to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Self::Decimal(v) => v.to_sql_checked(ty, out),
            Self::String(v) => v.to_sql_checked(ty, out),
            Self::DateTime(v) => match ty.name() {
                "timestamp" => v.naive_utc().to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Self::Bytes(v) => v.to_sql_checked(ty, out),
            Self::Json(v) => v.to_sql_checked(ty, out),
        }
    }

    // Each variant checks the concrete type itself.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_timeout_sql() {
        assert_eq!(
            statement_timeout_sql(Duration::from_secs(30)),
            "SET LOCAL statement_timeout = 30000"
        );
        assert_eq!(
            statement_timeout_sql(Duration::from_micros(10)),
            "SET LOCAL statement_timeout = 1"
        );
    }

    #[test]
    fn test_portal_fetch_size() {
        assert_eq!(portal_fetch_size(10_001), 10_001);
        assert_eq!(portal_fetch_size(0), 1);
        assert_eq!(portal_fetch_size(usize::MAX), i32::MAX);
    }

    #[test]
    fn test_int_param_narrowing() {
        let mut buf = BytesMut::new();
        assert!(CellValue::Int(7).to_sql_checked(&Type::INT4, &mut buf).is_ok());
        assert_eq!(buf.len(), 4);

        let mut buf = BytesMut::new();
        assert!(
            CellValue::Int(70_000)
                .to_sql_checked(&Type::INT2, &mut buf)
                .is_err()
        );
    }

    #[test]
    fn test_param_type_mismatch() {
        let mut buf = BytesMut::new();
        assert!(
            CellValue::from("abc")
                .to_sql_checked(&Type::INT4, &mut buf)
                .is_err()
        );
    }

    #[test]
    fn test_null_param() {
        let mut buf = BytesMut::new();
        let result = CellValue::Null.to_sql_checked(&Type::TEXT, &mut buf).unwrap();
        assert!(matches!(result, IsNull::Yes));
    }
}
