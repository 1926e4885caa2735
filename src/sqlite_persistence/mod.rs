mod query;
mod versioned_schema;

pub use query::{
    copy_from_ndjson_sql, create_table_sql, drop_table_sql, insert_sql, select_sql, OnConflict,
};
pub use versioned_schema::{Column, ForeignKey, ForeignKeyAction, SqlType, Table, VersionedSchema};
