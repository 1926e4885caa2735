//! Pure SQL statement generators.
//!
//! Nothing in here touches a connection; every function returns a statement
//! string built from table/column names supplied by the caller. Placeholders
//! are positional (`?1`, `?2`, ...) and their order always matches the order
//! of the column list passed in, so callers must bind values in the same
//! order they name columns. Column-list validation is the caller's job: an
//! empty column list produces SQL that the database will reject.

use std::path::Path;

use super::versioned_schema::{ForeignKeyAction, SqlType, Table};

/// Conflict policy appended to an INSERT statement.
pub enum OnConflict<'a> {
    /// `ON CONFLICT (cols) DO NOTHING` - makes the insert idempotent on the
    /// given key columns.
    DoNothing { columns: &'a [&'a str] },
    /// `ON CONFLICT (cols) DO UPDATE SET col = EXCLUDED.col, ...` for each
    /// column in `update`.
    DoUpdate {
        columns: &'a [&'a str],
        update: &'a [&'a str],
    },
}

/// `DROP TABLE IF EXISTS <name>;` - never errors when the table is absent.
pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {};", table)
}

/// `CREATE TABLE IF NOT EXISTS <name> (...);` from a static table
/// declaration. Column clauses are emitted in declaration order, which is
/// the order row values are supplied in everywhere else.
pub fn create_table_sql(table: &Table) -> String {
    let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (", table.name);
    for (column_index, column) in table.columns.iter().enumerate() {
        if column_index > 0 {
            sql.push_str(", ");
        }
        sql.push_str(column.name);
        sql.push(' ');
        sql.push_str(match column.sql_type {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Blob => "BLOB",
        });
        if column.is_primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if column.non_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default_value) = column.default_value {
            sql.push_str(" DEFAULT ");
            sql.push_str(default_value);
        }
        if let Some(foreign_key) = column.foreign_key {
            sql.push_str(&format!(
                " REFERENCES {}({}) ON DELETE {}",
                foreign_key.foreign_table,
                foreign_key.foreign_column,
                match foreign_key.on_delete {
                    ForeignKeyAction::NoAction => "NO ACTION",
                    ForeignKeyAction::Restrict => "RESTRICT",
                    ForeignKeyAction::SetNull => "SET NULL",
                    ForeignKeyAction::Cascade => "CASCADE",
                }
            ));
        }
    }
    sql.push_str(");");
    sql
}

/// Parameterized `INSERT INTO <table> (cols) VALUES (?1, ...)` with an
/// optional conflict policy. Returns the statement and the number of
/// placeholders, which always equals `columns.len()`.
pub fn insert_sql(table: &str, columns: &[&str], conflict: Option<&OnConflict>) -> (String, usize) {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );
    match conflict {
        Some(OnConflict::DoNothing { columns }) => {
            sql.push_str(&format!(" ON CONFLICT ({}) DO NOTHING", columns.join(", ")));
        }
        Some(OnConflict::DoUpdate { columns, update }) => {
            sql.push_str(&format!(" ON CONFLICT ({}) DO UPDATE SET ", columns.join(", ")));
            for (i, col) in update.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(&format!("{} = EXCLUDED.{}", col, col));
            }
        }
        None => {}
    }
    (sql, columns.len())
}

/// Simple `SELECT cols FROM table [WHERE a = ?1 AND b = ?2] [LIMIT n]`.
///
/// Only equality predicates are supported; that is all the song/artist
/// resolution lookup needs. Predicates are parameterized, one placeholder
/// per entry of `where_eq` in order.
pub fn select_sql(
    columns: &[&str],
    table: &str,
    where_eq: &[&str],
    limit: Option<usize>,
) -> String {
    let mut sql = format!("SELECT {} FROM {}", columns.join(", "), table);
    if !where_eq.is_empty() {
        sql.push_str(" WHERE ");
        for (i, col) in where_eq.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }
            sql.push_str(&format!("{} = ?{}", col, i + 1));
        }
    }
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    sql
}

/// Bulk-load statement for a newline-delimited JSON file.
///
/// Only the statement shape is provided; no execution path exists for it.
/// A real implementation would have to stream the file server-side instead
/// of replaying it row by row through the application.
pub fn copy_from_ndjson_sql(table: &str, columns: &[&str], ndjson_file: &Path) -> String {
    format!(
        "COPY {} ({}) FROM '{}'",
        table,
        columns.join(", "),
        ndjson_file.display()
    )
}

#[cfg(test)]
mod tests {
    use super::super::versioned_schema::ForeignKey;
    use super::*;
    use crate::sqlite_column;
    use crate::sqlite_persistence::Column;

    #[test]
    fn test_drop_table_sql() {
        assert_eq!(drop_table_sql("users"), "DROP TABLE IF EXISTS users;");
    }

    #[test]
    fn test_create_table_sql_emits_columns_in_declaration_order() {
        const T: Table = Table {
            name: "t",
            columns: &[
                sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
                sqlite_column!("name", &SqlType::Text, non_null = true),
                sqlite_column!("score", &SqlType::Real),
            ],
            indices: &[],
        };
        assert_eq!(
            create_table_sql(&T),
            "CREATE TABLE IF NOT EXISTS t (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score REAL);"
        );
    }

    #[test]
    fn test_create_table_sql_with_foreign_key() {
        const FK: ForeignKey = ForeignKey {
            foreign_table: "parent",
            foreign_column: "id",
            on_delete: ForeignKeyAction::NoAction,
        };
        const T: Table = Table {
            name: "child",
            columns: &[
                sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
                sqlite_column!("parent_id", &SqlType::Integer, foreign_key = Some(&FK)),
            ],
            indices: &[],
        };
        assert_eq!(
            create_table_sql(&T),
            "CREATE TABLE IF NOT EXISTS child (id INTEGER PRIMARY KEY, \
             parent_id INTEGER REFERENCES parent(id) ON DELETE NO ACTION);"
        );
    }

    #[test]
    fn test_insert_sql_without_conflict_clause() {
        let (sql, n) = insert_sql("t", &["a", "b"], None);
        assert_eq!(sql, "INSERT INTO t (a, b) VALUES (?1, ?2)");
        assert_eq!(n, 2);
        assert!(!sql.contains("ON CONFLICT"));
    }

    #[test]
    fn test_insert_sql_do_nothing() {
        let (sql, n) = insert_sql(
            "t",
            &["a", "b"],
            Some(&OnConflict::DoNothing { columns: &["a"] }),
        );
        assert_eq!(
            sql,
            "INSERT INTO t (a, b) VALUES (?1, ?2) ON CONFLICT (a) DO NOTHING"
        );
        assert_eq!(n, 2);
    }

    #[test]
    fn test_insert_sql_do_update() {
        let (sql, n) = insert_sql(
            "users",
            &["user_id", "level"],
            Some(&OnConflict::DoUpdate {
                columns: &["user_id"],
                update: &["level"],
            }),
        );
        assert_eq!(
            sql,
            "INSERT INTO users (user_id, level) VALUES (?1, ?2) \
             ON CONFLICT (user_id) DO UPDATE SET level = EXCLUDED.level"
        );
        assert_eq!(n, 2);
    }

    #[test]
    fn test_insert_sql_placeholder_count_matches_columns() {
        let cols = ["a", "b", "c", "d", "e"];
        let (sql, n) = insert_sql("t", &cols, None);
        assert_eq!(n, 5);
        assert_eq!(sql.matches('?').count(), 5);
    }

    #[test]
    fn test_select_sql_plain() {
        assert_eq!(select_sql(&["a", "b"], "t", &[], None), "SELECT a, b FROM t");
    }

    #[test]
    fn test_select_sql_where_and_limit() {
        assert_eq!(
            select_sql(&["song_id"], "songs", &["title", "duration"], Some(1)),
            "SELECT song_id FROM songs WHERE title = ?1 AND duration = ?2 LIMIT 1"
        );
    }

    #[test]
    fn test_copy_from_ndjson_sql() {
        let sql = copy_from_ndjson_sql("time", &["start_time", "hour"], Path::new("/tmp/a.json"));
        assert_eq!(sql, "COPY time (start_time, hour) FROM '/tmp/a.json'");
    }
}
