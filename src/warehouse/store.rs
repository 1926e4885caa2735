//! SQLite-backed store for the song-play star schema.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Transaction};
use tracing::info;

use super::models::{Artist, Song, SongplayRecord, TimeBucket, User};
use super::schema::WAREHOUSE_SCHEMA;
use crate::sqlite_persistence::{insert_sql, select_sql, OnConflict};

const SONG_COLUMNS: &[&str] = &["song_id", "title", "artist_id", "year", "duration"];
const ARTIST_COLUMNS: &[&str] = &["artist_id", "name", "location", "latitude", "longitude"];
const USER_COLUMNS: &[&str] = &["user_id", "first_name", "last_name", "gender", "level"];
const TIME_COLUMNS: &[&str] = &["start_time", "hour", "day", "week", "month", "year", "weekday"];
// songplay_id is absent: SQLite assigns it.
const SONGPLAY_COLUMNS: &[&str] = &[
    "start_time",
    "user_id",
    "level",
    "song_id",
    "artist_id",
    "session_id",
    "location",
    "user_agent",
];

/// Exact-match resolution of a play event to the song catalog.
const SONG_SELECT: &str = "SELECT songs.song_id, songs.artist_id \
     FROM songs JOIN artists ON songs.artist_id = artists.artist_id \
     WHERE songs.title = ?1 AND artists.name = ?2 AND songs.duration = ?3";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TableCounts {
    pub users: i64,
    pub artists: i64,
    pub songs: i64,
    pub time: i64,
    pub songplays: i64,
}

/// Single-owner store around one write connection. The ETL is sequential,
/// so there is no read pool; callers scope each source file in a unit of
/// work via [`SqliteWarehouseStore::begin_unit_of_work`].
pub struct SqliteWarehouseStore {
    conn: Connection,
}

impl SqliteWarehouseStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(
            db_path.as_ref(),
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )
        .context("Failed to open warehouse database")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
                [],
                |r| r.get(0),
            )
            .unwrap_or(0);

        if table_count == 0 {
            info!("Creating warehouse schema");
            WAREHOUSE_SCHEMA.create(&conn)?;
        } else {
            conn.execute("PRAGMA foreign_keys = ON;", params![])?;
            WAREHOUSE_SCHEMA
                .validate(&conn)
                .context("Existing database does not match the warehouse schema")?;
        }

        let store = SqliteWarehouseStore { conn };
        let counts = store.counts()?;
        info!(
            "Opened warehouse: {} songs, {} artists, {} users, {} songplays",
            counts.songs, counts.artists, counts.users, counts.songplays
        );
        Ok(store)
    }

    /// Drop every table and recreate the schema. Administrative; wipes all
    /// loaded data.
    pub fn reset(&self) -> Result<()> {
        info!("Resetting warehouse schema");
        WAREHOUSE_SCHEMA.drop(&self.conn)?;
        WAREHOUSE_SCHEMA.create(&self.conn)?;
        Ok(())
    }

    /// Start a unit of work. Commit applies everything written since; drop
    /// without commit rolls it back. The batch driver opens one per file.
    pub fn begin_unit_of_work(&self) -> Result<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    // =========================================================================
    // Dimension upserts - all idempotent on their primary key
    // =========================================================================

    pub fn upsert_song(&self, song: &Song) -> Result<()> {
        let (sql, _) = insert_sql(
            "songs",
            SONG_COLUMNS,
            Some(&OnConflict::DoNothing {
                columns: &["song_id"],
            }),
        );
        self.conn.prepare_cached(&sql)?.execute(params![
            song.song_id,
            song.title,
            song.artist_id,
            song.year,
            song.duration,
        ])?;
        Ok(())
    }

    pub fn upsert_artist(&self, artist: &Artist) -> Result<()> {
        let (sql, _) = insert_sql(
            "artists",
            ARTIST_COLUMNS,
            Some(&OnConflict::DoNothing {
                columns: &["artist_id"],
            }),
        );
        self.conn.prepare_cached(&sql)?.execute(params![
            artist.artist_id,
            artist.name,
            artist.location,
            artist.latitude,
            artist.longitude,
        ])?;
        Ok(())
    }

    /// `level` is the one mutable user attribute: a later load overwrites
    /// it, everything else keeps its first-seen value.
    pub fn upsert_user(&self, user: &User) -> Result<()> {
        let (sql, _) = insert_sql(
            "users",
            USER_COLUMNS,
            Some(&OnConflict::DoUpdate {
                columns: &["user_id"],
                update: &["level"],
            }),
        );
        self.conn.prepare_cached(&sql)?.execute(params![
            user.user_id,
            user.first_name,
            user.last_name,
            user.gender,
            user.level,
        ])?;
        Ok(())
    }

    pub fn upsert_time_bucket(&self, bucket: &TimeBucket) -> Result<()> {
        let (sql, _) = insert_sql(
            "time",
            TIME_COLUMNS,
            Some(&OnConflict::DoNothing {
                columns: &["start_time"],
            }),
        );
        self.conn.prepare_cached(&sql)?.execute(params![
            bucket.start_time,
            bucket.hour,
            bucket.day,
            bucket.week,
            bucket.month,
            bucket.year,
            bucket.weekday,
        ])?;
        Ok(())
    }

    // =========================================================================
    // Fact table
    // =========================================================================

    pub fn insert_songplay(&self, play: &SongplayRecord) -> Result<()> {
        let (sql, _) = insert_sql("songplays", SONGPLAY_COLUMNS, None);
        self.conn.prepare_cached(&sql)?.execute(params![
            play.start_time,
            play.user_id,
            play.level,
            play.song_id,
            play.artist_id,
            play.session_id,
            play.location,
            play.user_agent,
        ])?;
        Ok(())
    }

    /// Resolve a play event to (song_id, artist_id) by exact match on the
    /// song title, artist name and track duration. A miss is not an error.
    pub fn find_song(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Option<(String, String)>> {
        let mut stmt = self.conn.prepare_cached(SONG_SELECT)?;
        match stmt.query_row(params![title, artist_name, duration], |row| {
            Ok((row.get(0)?, row.get(1)?))
        }) {
            Ok(found) => Ok(Some(found)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Read-backs
    // =========================================================================

    pub fn counts(&self) -> Result<TableCounts> {
        let count = |table: &str| -> Result<i64> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?)
        };
        Ok(TableCounts {
            users: count("users")?,
            artists: count("artists")?,
            songs: count("songs")?,
            time: count("time")?,
            songplays: count("songplays")?,
        })
    }

    /// All fact rows, in insertion order.
    pub fn get_songplays(&self) -> Result<Vec<SongplayRecord>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT start_time, user_id, level, song_id, artist_id, session_id, location, user_agent
             FROM songplays ORDER BY songplay_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SongplayRecord {
                    start_time: row.get(0)?,
                    user_id: row.get(1)?,
                    level: row.get(2)?,
                    song_id: row.get(3)?,
                    artist_id: row.get(4)?,
                    session_id: row.get(5)?,
                    location: row.get(6)?,
                    user_agent: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The `level` currently stored for a user, if the user exists.
    pub fn get_user_level(&self, user_id: i64) -> Result<Option<Option<String>>> {
        let sql = select_sql(&["level"], "users", &["user_id"], None);
        match self
            .conn
            .query_row(&sql, params![user_id], |r| r.get(0))
        {
            Ok(level) => Ok(Some(level)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_song() -> Song {
        Song {
            song_id: "S1".to_string(),
            title: "X".to_string(),
            artist_id: "A1".to_string(),
            year: Some(2000),
            duration: 180.5,
        }
    }

    fn sample_artist() -> Artist {
        Artist {
            artist_id: "A1".to_string(),
            name: "Y".to_string(),
            location: Some("".to_string()),
            latitude: None,
            longitude: None,
        }
    }

    #[test]
    fn test_dimension_upserts_are_idempotent() {
        let store = SqliteWarehouseStore::open_in_memory().unwrap();

        for _ in 0..2 {
            store.upsert_song(&sample_song()).unwrap();
            store.upsert_artist(&sample_artist()).unwrap();
            store
                .upsert_time_bucket(&TimeBucket::from_start_time(1541121934796).unwrap())
                .unwrap();
        }

        let counts = store.counts().unwrap();
        assert_eq!(counts.songs, 1);
        assert_eq!(counts.artists, 1);
        assert_eq!(counts.time, 1);
    }

    #[test]
    fn test_upsert_user_updates_level_only() {
        let store = SqliteWarehouseStore::open_in_memory().unwrap();

        store
            .upsert_user(&User {
                user_id: 8,
                first_name: Some("Kaylee".to_string()),
                last_name: Some("Summers".to_string()),
                gender: Some("F".to_string()),
                level: Some("free".to_string()),
            })
            .unwrap();
        store
            .upsert_user(&User {
                user_id: 8,
                first_name: Some("Someone".to_string()),
                last_name: Some("Else".to_string()),
                gender: Some("M".to_string()),
                level: Some("paid".to_string()),
            })
            .unwrap();

        assert_eq!(store.counts().unwrap().users, 1);
        assert_eq!(
            store.get_user_level(8).unwrap(),
            Some(Some("paid".to_string()))
        );
        // Non-level attributes keep their first-seen values.
        let first_name: String = store
            .conn
            .query_row("SELECT first_name FROM users WHERE user_id = 8", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(first_name, "Kaylee");
    }

    #[test]
    fn test_find_song_hit_and_miss() {
        let store = SqliteWarehouseStore::open_in_memory().unwrap();
        store.upsert_song(&sample_song()).unwrap();
        store.upsert_artist(&sample_artist()).unwrap();

        assert_eq!(
            store.find_song("X", "Y", 180.5).unwrap(),
            Some(("S1".to_string(), "A1".to_string()))
        );
        // Duration must match exactly.
        assert_eq!(store.find_song("X", "Y", 180.0).unwrap(), None);
        assert_eq!(store.find_song("X", "Z", 180.5).unwrap(), None);
    }

    #[test]
    fn test_insert_songplay_with_null_foreign_keys() {
        let store = SqliteWarehouseStore::open_in_memory().unwrap();
        store
            .upsert_user(&User {
                user_id: 3,
                first_name: None,
                last_name: None,
                gender: None,
                level: Some("free".to_string()),
            })
            .unwrap();
        store
            .upsert_time_bucket(&TimeBucket::from_start_time(1000).unwrap())
            .unwrap();

        store
            .insert_songplay(&SongplayRecord {
                start_time: 1000,
                user_id: 3,
                level: Some("free".to_string()),
                song_id: None,
                artist_id: None,
                session_id: Some(42),
                location: None,
                user_agent: None,
            })
            .unwrap();

        let plays = store.get_songplays().unwrap();
        assert_eq!(plays.len(), 1);
        assert_eq!(plays[0].song_id, None);
        assert_eq!(plays[0].artist_id, None);
    }

    #[test]
    fn test_unit_of_work_rolls_back_on_drop() {
        let store = SqliteWarehouseStore::open_in_memory().unwrap();

        {
            let _tx = store.begin_unit_of_work().unwrap();
            store.upsert_song(&sample_song()).unwrap();
            // Dropped without commit.
        }
        assert_eq!(store.counts().unwrap().songs, 0);

        let tx = store.begin_unit_of_work().unwrap();
        store.upsert_song(&sample_song()).unwrap();
        tx.commit().unwrap();
        assert_eq!(store.counts().unwrap().songs, 1);
    }

    #[test]
    fn test_reset_wipes_all_rows() {
        let store = SqliteWarehouseStore::open_in_memory().unwrap();
        store.upsert_song(&sample_song()).unwrap();
        store.reset().unwrap();
        assert_eq!(store.counts().unwrap().songs, 0);
    }
}
