//! Warehouse initialization binary.
//!
//! Drops and recreates the star schema so a load can start from a clean
//! database. Destructive: every previously loaded row is gone afterwards.

use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;
use std::path::PathBuf;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use songplays_etl::warehouse::WAREHOUSE_SCHEMA;

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "init-warehouse")]
#[command(about = "Drop and recreate the songplays warehouse schema")]
struct CliArgs {
    /// Path to the SQLite warehouse database file.
    #[clap(value_parser = parse_path)]
    pub db_path: PathBuf,
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .ok();

    let conn = Connection::open(&cli_args.db_path)
        .with_context(|| format!("Failed to open database at {:?}", cli_args.db_path))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Dropping must succeed before creating, otherwise a partial old schema
    // could be left mixed with the new one.
    if let Err(e) = WAREHOUSE_SCHEMA.drop(&conn) {
        error!("Failed to drop existing tables: {:#}", e);
        return Err(e);
    }

    match WAREHOUSE_SCHEMA.create(&conn) {
        Ok(()) => info!(
            "Initialized warehouse schema at {:?} ({} tables)",
            cli_args.db_path,
            WAREHOUSE_SCHEMA.tables.len()
        ),
        Err(e) => error!("Failed to create tables: {:#}", e),
    }

    Ok(())
}
