//! Row models for the star schema.

use chrono::{DateTime, Datelike, Timelike};

#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: Option<i32>,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artist {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub user_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
}

/// Calendar decomposition of a play timestamp (epoch milliseconds).
/// Every field besides `start_time` is derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBucket {
    pub start_time: i64,
    pub hour: u32,
    pub day: u32,
    pub week: u32,
    pub month: u32,
    pub year: i32,
    /// Monday = 0 .. Sunday = 6.
    pub weekday: u32,
}

impl TimeBucket {
    /// Decompose an epoch-milliseconds timestamp. Returns `None` when the
    /// value is outside the representable datetime range.
    pub fn from_start_time(start_time_ms: i64) -> Option<Self> {
        let datetime = DateTime::from_timestamp_millis(start_time_ms)?.naive_utc();
        Some(TimeBucket {
            start_time: start_time_ms,
            hour: datetime.hour(),
            day: datetime.day(),
            week: datetime.iso_week().week(),
            month: datetime.month(),
            year: datetime.year(),
            weekday: datetime.weekday().num_days_from_monday(),
        })
    }
}

/// One row of the `songplays` fact table, before the database assigns its
/// `songplay_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct SongplayRecord {
    pub start_time: i64,
    pub user_id: i64,
    pub level: Option<String>,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}
