//! Extract-transform-load pipeline: typed input records, per-file
//! transforms, and the batch driver that walks a data directory and commits
//! one unit of work per file.

mod driver;
mod log_file;
mod records;
mod song_file;

pub use driver::{discover_json_files, run_pass, LoadStats, LoadStrategy, Pass, PassOptions};
pub use log_file::{process_log_file, LogFileCounts};
pub use records::{EtlError, LogEvent, SongDocument};
pub use song_file::process_song_file;
