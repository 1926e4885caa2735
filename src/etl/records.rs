//! Typed models of the two source file formats.
//!
//! The mapping from source JSON keys to warehouse columns is fixed here at
//! compile time; the transforms never rename fields dynamically.

use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use thiserror::Error;

use crate::warehouse::{Artist, Song, TimeBucket, User};

/// Errors raised while turning source files into warehouse rows.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record in {path} (line {line}): {source}")]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Timestamp {0} is outside the representable range")]
    TimestampOutOfRange(i64),

    #[error("Bulk copy loading is not implemented; use the row-by-row strategy")]
    BulkCopyUnsupported,
}

// =============================================================================
// Song metadata documents (one JSON object per file)
// =============================================================================

/// A song-metadata document. One document yields one `songs` row and one
/// `artists` row.
#[derive(Debug, Clone, Deserialize)]
pub struct SongDocument {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    #[serde(default, deserialize_with = "year_or_none")]
    pub year: Option<i32>,
    pub duration: f64,
    pub artist_name: String,
    #[serde(default)]
    pub artist_location: Option<String>,
    #[serde(default)]
    pub artist_latitude: Option<f64>,
    #[serde(default)]
    pub artist_longitude: Option<f64>,
}

impl SongDocument {
    pub fn song(&self) -> Song {
        Song {
            song_id: self.song_id.clone(),
            title: self.title.clone(),
            artist_id: self.artist_id.clone(),
            year: self.year,
            duration: self.duration,
        }
    }

    pub fn artist(&self) -> Artist {
        Artist {
            artist_id: self.artist_id.clone(),
            name: self.artist_name.clone(),
            location: self.artist_location.clone(),
            latitude: self.artist_latitude,
            longitude: self.artist_longitude,
        }
    }
}

/// The dumps use `"year": 0` for unknown release years.
fn year_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    let year = Option::<i32>::deserialize(deserializer)?;
    Ok(year.filter(|y| *y != 0))
}

// =============================================================================
// Event log records (newline-delimited JSON)
// =============================================================================

/// One event from an activity log file. Only `page == "NextSong"` events
/// represent song plays; everything else is discarded by the transform.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEvent {
    pub page: String,
    /// Epoch milliseconds.
    pub ts: i64,
    #[serde(rename = "userId", default, deserialize_with = "lenient_user_id")]
    pub user_id: Option<i64>,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub song: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    /// Track duration in seconds.
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(rename = "userAgent", default)]
    pub user_agent: Option<String>,
}

impl LogEvent {
    pub fn is_song_play(&self) -> bool {
        self.page == "NextSong"
    }

    pub fn time_bucket(&self) -> Result<TimeBucket, EtlError> {
        TimeBucket::from_start_time(self.ts).ok_or(EtlError::TimestampOutOfRange(self.ts))
    }

    /// The user row carried by this event, if it has a user id.
    pub fn user(&self) -> Option<User> {
        Some(User {
            user_id: self.user_id?,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            gender: self.gender.clone(),
            level: self.level.clone(),
        })
    }
}

/// The raw logs encode `userId` as an integer for plays but as `""` for
/// anonymous sessions, and some exports quote the integers.
fn lenient_user_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
        None,
    }
    match Raw::deserialize(deserializer)? {
        Raw::Int(id) => Ok(Some(id)),
        Raw::Text(s) if s.is_empty() => Ok(None),
        Raw::Text(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
        Raw::None => Ok(None),
    }
}
