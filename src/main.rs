//! ETL loader binary.
//!
//! Runs the song-metadata pass and then the activity-log pass over the
//! configured data directories, committing one unit of work per file.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use songplays_etl::config::{AppConfig, CliConfig, FileConfig};
use songplays_etl::etl::{run_pass, LoadStrategy, Pass, PassOptions};
use songplays_etl::warehouse::SqliteWarehouseStore;

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "etl-load")]
#[command(about = "Load song metadata and activity logs into the songplays warehouse")]
struct CliArgs {
    /// Path to the SQLite warehouse database file.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Root directory of the song-metadata JSON tree.
    #[clap(long, value_parser = parse_path)]
    pub song_data: Option<PathBuf>,

    /// Root directory of the activity-log JSON tree.
    #[clap(long, value_parser = parse_path)]
    pub log_data: Option<PathBuf>,

    /// Optional TOML config file; its values override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Log and skip files that fail to load instead of aborting the run.
    #[clap(long, default_value_t = true)]
    pub continue_on_error: bool,

    /// Use the bulk copy load path instead of row-by-row inserts.
    #[clap(long, default_value_t = false)]
    pub bulk_copy: bool,

    /// Drop and recreate the warehouse schema before loading.
    #[clap(long, default_value_t = false)]
    pub reset: bool,
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

    info!(
        "songplays-etl {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let config = AppConfig::resolve(
        &CliConfig {
            db_path: cli_args.db_path.clone(),
            song_data_dir: cli_args.song_data.clone(),
            log_data_dir: cli_args.log_data.clone(),
            continue_on_error: cli_args.continue_on_error,
            progress: true,
        },
        file_config,
    )?;

    info!("Opening warehouse database at {:?}...", config.db_path);
    let store =
        SqliteWarehouseStore::open(&config.db_path).context("Failed to open the warehouse")?;

    if cli_args.reset {
        store.reset()?;
    }

    let options = PassOptions {
        continue_on_error: config.continue_on_error,
        strategy: if cli_args.bulk_copy {
            LoadStrategy::BulkCopy
        } else {
            LoadStrategy::RowByRow
        },
        progress: config.progress,
    };

    let song_stats = match &config.song_data_dir {
        Some(dir) => {
            info!("Loading song metadata from {}...", dir.display());
            Some(run_pass(&store, dir, Pass::Songs, &options)?)
        }
        None => {
            info!("No song data directory configured, skipping song pass");
            None
        }
    };

    let log_stats = match &config.log_data_dir {
        Some(dir) => {
            info!("Loading activity logs from {}...", dir.display());
            Some(run_pass(&store, dir, Pass::Logs, &options)?)
        }
        None => {
            info!("No log data directory configured, skipping log pass");
            None
        }
    };

    info!("");
    info!("Load Summary");
    info!("============");
    if let Some(stats) = song_stats {
        info!(
            "Song files: {} loaded, {} failed (of {})",
            stats.files_loaded, stats.files_failed, stats.files_found
        );
    }
    if let Some(stats) = log_stats {
        info!(
            "Log files: {} loaded, {} failed (of {})",
            stats.files_loaded, stats.files_failed, stats.files_found
        );
        info!(
            "Play events: {} retained, {} resolved to the song catalog",
            stats.plays, stats.resolved_plays
        );
    }

    let failures =
        song_stats.map_or(0, |s| s.files_failed) + log_stats.map_or(0, |s| s.files_failed);
    if failures > 0 {
        warn!("{} files failed to load", failures);
    }

    let counts = store.counts()?;
    info!("");
    info!("Warehouse contains:");
    info!("  {} users", counts.users);
    info!("  {} artists", counts.artists);
    info!("  {} songs", counts.songs);
    info!("  {} time buckets", counts.time);
    info!("  {} songplays", counts.songplays);

    Ok(())
}
