//! Query guard binary entry point.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use query_guard::{
    config::{DatabaseConfigBuilder, ProtectionConfig},
    database::{CellValue, create_driver},
    guard::QueryGuard,
    security::validate,
};
use std::io::{self, Read};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

/// Validate or execute SQL under guard rails
#[derive(Parser, Debug)]
#[command(name = "query-guard", version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a statement without touching the database
    Validate {
        /// SQL text, or `-` to read from stdin
        sql: String,

        /// Positional parameter values ($1, $2, ...)
        #[arg(long = "param", value_name = "VALUE", allow_hyphen_values = true)]
        params: Vec<String>,
    },
    /// Validate and execute a statement against DATABASE_URL
    Execute {
        /// SQL text, or `-` to read from stdin
        sql: String,

        /// Positional parameter values ($1, $2, ...)
        #[arg(long = "param", value_name = "VALUE", allow_hyphen_values = true)]
        params: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let protection = ProtectionConfig::from_env().context("Invalid protection configuration")?;

    match args.command {
        Commands::Validate { sql, params } => {
            let sql = read_sql(sql)?;
            let params = parse_params(&params);
            let verdict = validate(&sql, &params, &protection);
            println!("{}", serde_json::to_string_pretty(&verdict)?);
            if !verdict.allowed {
                std::process::exit(2);
            }
        }
        Commands::Execute { sql, params } => {
            let sql = read_sql(sql)?;
            let params = parse_params(&params);

            let db_config = DatabaseConfigBuilder::new()
                .from_env()
                .context("Failed to read database configuration")?
                .build()
                .context("Invalid database configuration")?;

            info!(
                "Connecting to PostgreSQL at {}:{}",
                db_config.host, db_config.port
            );
            let driver = create_driver(db_config).await?;
            let guard = QueryGuard::new(driver, protection);

            let outcome = guard.execute(&sql, &params).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);

            info!(metrics = ?guard.metrics(), "Done");
        }
    }

    Ok(())
}

fn read_sql(sql: String) -> Result<String> {
    if sql != "-" {
        return Ok(sql);
    }

    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read SQL from stdin")?;
    if buf.trim().is_empty() {
        bail!("No SQL on stdin");
    }
    Ok(buf)
}

fn parse_params(raw: &[String]) -> Vec<CellValue> {
    raw.iter().map(|value| CellValue::infer(value)).collect()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("query_guard=info,warn"));

    // stdout carries the JSON result, logs go to stderr
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .json()
        .init();
}
