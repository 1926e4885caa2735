//! Song-metadata file transform: one JSON document per file, two upserts.

use std::path::Path;

use anyhow::{Context, Result};

use super::records::SongDocument;
use crate::warehouse::SqliteWarehouseStore;

/// Load one song-metadata file: upsert the song row, then the artist row.
/// The order is fixed but not load-bearing (no constraint runs in this
/// direction); both upserts are idempotent on their primary key.
pub fn process_song_file(store: &SqliteWarehouseStore, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read song file {}", path.display()))?;
    let document: SongDocument = serde_json::from_str(&content)
        .with_context(|| format!("Malformed song document {}", path.display()))?;

    store.upsert_song(&document.song())?;
    store.upsert_artist(&document.artist())?;
    Ok(())
}
