//! Batch driver: file discovery, per-file units of work, progress and stats.

use std::path::{Path, PathBuf};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};
use walkdir::WalkDir;

use super::log_file::process_log_file;
use super::records::EtlError;
use super::song_file::process_song_file;
use crate::warehouse::SqliteWarehouseStore;

/// How rows reach the database. `BulkCopy` exists for a future server-side
/// bulk load; selecting it fails the pass up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStrategy {
    #[default]
    RowByRow,
    BulkCopy,
}

/// Which source file kind a pass loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Songs,
    Logs,
}

#[derive(Debug, Clone)]
pub struct PassOptions {
    /// Log and skip a failed file instead of aborting the whole pass. The
    /// file's partial writes are rolled back either way.
    pub continue_on_error: bool,
    pub strategy: LoadStrategy,
    /// Show a progress bar over the file loop.
    pub progress: bool,
}

impl Default for PassOptions {
    fn default() -> Self {
        PassOptions {
            continue_on_error: true,
            strategy: LoadStrategy::RowByRow,
            progress: false,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub files_found: usize,
    pub files_loaded: usize,
    pub files_failed: usize,
    /// Retained play events (log pass only).
    pub plays: usize,
    /// Plays whose song/artist lookup resolved (log pass only).
    pub resolved_plays: usize,
}

/// All `.json` files under `root`, recursively, in lexicographic path order
/// so a pass visits files deterministically.
pub fn discover_json_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        {
            files.push(entry.path().to_path_buf());
        }
    }
    Ok(files)
}

/// Run one pass over a directory tree. Each file is processed inside its
/// own transaction and committed on success; a failed file is rolled back
/// in full.
pub fn run_pass(
    store: &SqliteWarehouseStore,
    root: &Path,
    pass: Pass,
    options: &PassOptions,
) -> Result<LoadStats> {
    if options.strategy == LoadStrategy::BulkCopy {
        return Err(EtlError::BulkCopyUnsupported.into());
    }

    let files = discover_json_files(root)?;
    info!("{} files found in {}", files.len(), root.display());

    let mut stats = LoadStats {
        files_found: files.len(),
        ..Default::default()
    };

    let progress = if options.progress {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(bar)
    } else {
        None
    };

    for file in &files {
        if let Some(bar) = &progress {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            bar.set_message(format!("Loading {}...", name));
        }

        let tx = store.begin_unit_of_work()?;
        let result = match pass {
            Pass::Songs => process_song_file(store, file),
            Pass::Logs => process_log_file(store, file).map(|counts| {
                stats.plays += counts.plays;
                stats.resolved_plays += counts.resolved_plays;
            }),
        };

        match result {
            Ok(()) => {
                tx.commit()?;
                stats.files_loaded += 1;
            }
            Err(e) => {
                // Dropping the transaction rolls the file back.
                drop(tx);
                stats.files_failed += 1;
                error!("Failed to load {}: {:#}", file.display(), e);
                if !options.continue_on_error {
                    return Err(e);
                }
            }
        }

        if let Some(bar) = &progress {
            bar.inc(1);
        }
    }

    if let Some(bar) = &progress {
        bar.finish_and_clear();
    }

    Ok(stats)
}
