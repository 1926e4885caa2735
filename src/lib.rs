//! Song-play ETL library.
//!
//! Reads song-metadata documents and activity-log files from a directory
//! tree and loads them into a SQLite star schema (fact table `songplays`,
//! dimensions `users`, `songs`, `artists`, `time`).

pub mod config;
pub mod etl;
pub mod sqlite_persistence;
pub mod warehouse;

// Re-export commonly used types for convenience
pub use etl::{run_pass, LoadStats, Pass, PassOptions};
pub use warehouse::{SqliteWarehouseStore, WAREHOUSE_SCHEMA};
