//! SQLite schema for the song-play star schema.
//!
//! Column declaration order is load-bearing: the store binds insert values
//! in exactly this order. Timestamps (`start_time`) are stored as epoch
//! milliseconds.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyAction, SqlType, Table, VersionedSchema,
};

// =============================================================================
// Dimension Tables
// =============================================================================

const USERS_TABLE: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("user_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("first_name", &SqlType::Text),
        sqlite_column!("last_name", &SqlType::Text),
        sqlite_column!("gender", &SqlType::Text),
        sqlite_column!("level", &SqlType::Text), // 'free' or 'paid'
    ],
    indices: &[],
};

const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("artist_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!("latitude", &SqlType::Real),
        sqlite_column!("longitude", &SqlType::Real),
    ],
    indices: &[("idx_artists_name", "name")],
};

// No artist_id foreign key here: song documents insert the song before its
// artist, so the constraint would reject every first insert.
const SONGS_TABLE: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!("song_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist_id", &SqlType::Text, non_null = true),
        sqlite_column!("year", &SqlType::Integer),
        sqlite_column!("duration", &SqlType::Real, non_null = true),
    ],
    indices: &[("idx_songs_title", "title")],
};

/// Calendar decomposition of a play timestamp. Every attribute is
/// functionally determined by `start_time`.
const TIME_TABLE: Table = Table {
    name: "time",
    columns: &[
        sqlite_column!("start_time", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("hour", &SqlType::Integer),
        sqlite_column!("day", &SqlType::Integer),
        sqlite_column!("week", &SqlType::Integer),
        sqlite_column!("month", &SqlType::Integer),
        sqlite_column!("year", &SqlType::Integer),
        sqlite_column!("weekday", &SqlType::Integer), // Monday = 0
    ],
    indices: &[],
};

// =============================================================================
// Fact Table
// =============================================================================

const FK_SONGPLAYS_TIME: ForeignKey = ForeignKey {
    foreign_table: "time",
    foreign_column: "start_time",
    on_delete: ForeignKeyAction::NoAction,
};

const FK_SONGPLAYS_USERS: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "user_id",
    on_delete: ForeignKeyAction::NoAction,
};

const FK_SONGPLAYS_SONGS: ForeignKey = ForeignKey {
    foreign_table: "songs",
    foreign_column: "song_id",
    on_delete: ForeignKeyAction::NoAction,
};

const FK_SONGPLAYS_ARTISTS: ForeignKey = ForeignKey {
    foreign_table: "artists",
    foreign_column: "artist_id",
    on_delete: ForeignKeyAction::NoAction,
};

/// One row per retained play event. `songplay_id` is assigned by SQLite
/// (integer primary key, never bound on insert). `song_id`/`artist_id` stay
/// NULL when the resolution lookup finds no match.
const SONGPLAYS_TABLE: Table = Table {
    name: "songplays",
    columns: &[
        sqlite_column!("songplay_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "start_time",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&FK_SONGPLAYS_TIME)
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&FK_SONGPLAYS_USERS)
        ),
        sqlite_column!("level", &SqlType::Text),
        sqlite_column!(
            "song_id",
            &SqlType::Text,
            foreign_key = Some(&FK_SONGPLAYS_SONGS)
        ),
        sqlite_column!(
            "artist_id",
            &SqlType::Text,
            foreign_key = Some(&FK_SONGPLAYS_ARTISTS)
        ),
        sqlite_column!("session_id", &SqlType::Integer),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!("user_agent", &SqlType::Text),
    ],
    indices: &[("idx_songplays_start_time", "start_time")],
};

// =============================================================================
// Schema Definition
// =============================================================================

/// Dimensions first, fact table last: tables are created (and loaded) in
/// this order, and dropped in reverse.
pub const WAREHOUSE_SCHEMA: VersionedSchema = VersionedSchema {
    version: 0,
    tables: &[
        USERS_TABLE,
        ARTISTS_TABLE,
        SONGS_TABLE,
        TIME_TABLE,
        SONGPLAYS_TABLE,
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{params, Connection};

    #[test]
    fn test_schema_creates_and_validates() {
        let conn = Connection::open_in_memory().unwrap();
        WAREHOUSE_SCHEMA.create(&conn).unwrap();
        WAREHOUSE_SCHEMA.validate(&conn).unwrap();
    }

    #[test]
    fn test_songplay_id_is_auto_assigned() {
        let conn = Connection::open_in_memory().unwrap();
        WAREHOUSE_SCHEMA.create(&conn).unwrap();

        conn.execute(
            "INSERT INTO users (user_id, first_name, last_name, gender, level)
             VALUES (7, 'Ada', 'Lovelace', 'F', 'paid')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
             VALUES (1541121934796, 23, 1, 44, 11, 2018, 3)",
            [],
        )
        .unwrap();

        for _ in 0..2 {
            conn.execute(
                "INSERT INTO songplays
                 (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
                 VALUES (1541121934796, 7, 'paid', NULL, NULL, 583, 'SF', 'agent')",
                [],
            )
            .unwrap();
        }

        let ids: Vec<i64> = conn
            .prepare("SELECT songplay_id FROM songplays ORDER BY songplay_id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_songplay_rejects_unknown_user() {
        let conn = Connection::open_in_memory().unwrap();
        WAREHOUSE_SCHEMA.create(&conn).unwrap();

        conn.execute(
            "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
             VALUES (1, 0, 1, 1, 1, 1970, 3)",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO songplays
             (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
             VALUES (1, 999, 'free', NULL, NULL, 1, 'x', 'y')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_song_without_artist_is_accepted() {
        // The songs -> artists constraint is deliberately absent; a song may
        // land before its artist does.
        let conn = Connection::open_in_memory().unwrap();
        WAREHOUSE_SCHEMA.create(&conn).unwrap();

        conn.execute(
            "INSERT INTO songs (song_id, title, artist_id, year, duration)
             VALUES ('S1', 'X', 'A-not-yet-loaded', 2000, 180.5)",
            params![],
        )
        .unwrap();
    }
}
