//! Star schema for song plays: fact table `songplays`, dimension tables
//! `users`, `songs`, `artists` and `time`.

mod models;
mod schema;
mod store;

pub use models::{Artist, Song, SongplayRecord, TimeBucket, User};
pub use schema::WAREHOUSE_SCHEMA;
pub use store::SqliteWarehouseStore;
