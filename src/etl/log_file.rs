//! Activity-log file transform.
//!
//! One log file holds many newline-delimited events. Only `NextSong` events
//! are song plays; the transform derives the time dimension, the distinct
//! users, and one fact row per retained event.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};

use super::records::{EtlError, LogEvent};
use crate::warehouse::{SongplayRecord, SqliteWarehouseStore};

/// What one log file contributed, before upsert dedup at the database.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogFileCounts {
    pub events: usize,
    pub plays: usize,
    pub time_buckets: usize,
    pub users: usize,
    pub resolved_plays: usize,
}

/// Load one log file. Steps, in order:
/// 1. parse every line, keep `NextSong` events only;
/// 2. upsert one time row per distinct `ts` (first occurrence wins);
/// 3. upsert one user row per distinct `userId` (first occurrence wins);
/// 4. insert one songplay per retained event, resolving song/artist by
///    exact match and degrading to NULL foreign keys on a miss.
pub fn process_log_file(store: &SqliteWarehouseStore, path: &Path) -> Result<LogFileCounts> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read log file {}", path.display()))?;

    let mut counts = LogFileCounts::default();
    let mut plays: Vec<LogEvent> = Vec::new();
    for (line_index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        counts.events += 1;
        let event: LogEvent =
            serde_json::from_str(line).map_err(|source| EtlError::MalformedRecord {
                path: path.to_path_buf(),
                line: line_index + 1,
                source,
            })?;
        if event.is_song_play() {
            plays.push(event);
        }
    }
    counts.plays = plays.len();

    // Time dimension, deduplicated by start_time within the batch.
    let mut seen_timestamps = HashSet::new();
    for event in &plays {
        if seen_timestamps.insert(event.ts) {
            store.upsert_time_bucket(&event.time_bucket()?)?;
            counts.time_buckets += 1;
        }
    }

    // User dimension, first occurrence wins within the batch.
    let mut seen_users = HashSet::new();
    for event in &plays {
        if let Some(user) = event.user() {
            if seen_users.insert(user.user_id) {
                store.upsert_user(&user)?;
                counts.users += 1;
            }
        }
    }

    // Fact rows: one per retained event, no dedup.
    for event in &plays {
        let user_id = match event.user_id {
            Some(id) => id,
            // A play without a user cannot satisfy the fact table's
            // NOT NULL user reference; skip it.
            None => continue,
        };

        let resolved = match (&event.song, &event.artist, event.length) {
            (Some(song), Some(artist), Some(length)) => store.find_song(song, artist, length)?,
            _ => None,
        };
        if resolved.is_some() {
            counts.resolved_plays += 1;
        }
        let (song_id, artist_id) = match resolved {
            Some((song_id, artist_id)) => (Some(song_id), Some(artist_id)),
            None => (None, None),
        };

        store.insert_songplay(&SongplayRecord {
            start_time: event.ts,
            user_id,
            level: event.level.clone(),
            song_id,
            artist_id,
            session_id: event.session_id,
            location: event.location.clone(),
            user_agent: event.user_agent.clone(),
        })?;
    }

    Ok(counts)
}
