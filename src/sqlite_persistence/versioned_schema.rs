use anyhow::{bail, Result};
use rusqlite::{params, types::Type, Connection};

use super::query::{create_table_sql, drop_table_sql};

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // Allow unused_mut because the variable is only mutated when optional
            // field assignments are passed to the macro (e.g., `is_primary_key = true`)
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                default_value: None,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    Blob,
}

#[allow(unused)]
pub enum ForeignKeyAction {
    NoAction,
    Restrict,
    SetNull,
    Cascade,
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
    pub on_delete: ForeignKeyAction,
}

pub struct Column<'a, S: AsRef<str>> {
    pub name: S,
    pub sql_type: &'a SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub default_value: Option<S>,
    pub foreign_key: Option<&'a ForeignKey>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<'static, &'static str>],
    pub indices: &'static [(&'static str, &'static str)],
}

impl Table {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute(&create_table_sql(self), params![])?;
        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }

    pub fn drop(&self, conn: &Connection) -> Result<()> {
        conn.execute(&drop_table_sql(self.name), params![])?;
        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
}

impl VersionedSchema {
    /// Create every table (and its indices) in declaration order. Load order
    /// follows table order, so referenced tables must come first.
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    /// Drop every table, last-declared first so foreign key references never
    /// dangle mid-drop.
    pub fn drop(&self, conn: &Connection) -> Result<()> {
        for table in self.tables.iter().rev() {
            table.drop(conn)?;
        }
        Ok(())
    }

    /// Check that each declared table exists in the connection with the
    /// declared columns, in order, with matching type / NOT NULL / primary
    /// key flags. Catches a database created by an older binary before the
    /// load starts writing to it.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", table.name))?;
            let actual_columns: Vec<Column<'_, String>> = stmt
                .query_map(params![], |row| {
                    let sql_type = match row.get::<_, String>(2)?.as_str() {
                        "TEXT" => &SqlType::Text,
                        "INTEGER" => &SqlType::Integer,
                        "REAL" => &SqlType::Real,
                        "BLOB" => &SqlType::Blob,
                        _ => {
                            return Err(rusqlite::Error::InvalidColumnType(
                                2,
                                "".to_string(),
                                Type::Text,
                            ))
                        }
                    };
                    Ok(Column {
                        name: row.get::<_, String>(1)?,
                        sql_type,
                        non_null: row.get::<_, i32>(3)? == 1,
                        default_value: row.get::<_, Option<String>>(4)?,
                        is_primary_key: row.get::<_, i32>(5)? == 1,
                        foreign_key: None,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            if actual_columns.len() != table.columns.len() {
                bail!(
                    "Table {} has {} columns, expected {}. Found: [{}], expected: [{}]",
                    table.name,
                    actual_columns.len(),
                    table.columns.len(),
                    actual_columns
                        .iter()
                        .map(|c| c.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                    table
                        .columns
                        .iter()
                        .map(|c| c.name)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }

            for (actual, expected) in actual_columns.iter().zip(table.columns.iter()) {
                if actual.name != expected.name {
                    bail!(
                        "Table {} column name mismatch: expected {}, got {}",
                        table.name,
                        expected.name,
                        actual.name
                    );
                }
                if actual.sql_type != expected.sql_type {
                    bail!(
                        "Table {} column {} type mismatch: expected {:?}, got {:?}",
                        table.name,
                        expected.name,
                        expected.sql_type,
                        actual.sql_type
                    );
                }
                if actual.non_null != expected.non_null {
                    bail!(
                        "Table {} column {} non-null mismatch: expected {}, got {}",
                        table.name,
                        expected.name,
                        expected.non_null,
                        actual.non_null
                    );
                }
                if actual.is_primary_key != expected.is_primary_key {
                    bail!(
                        "Table {} column {} primary key mismatch: expected {}, got {}",
                        table.name,
                        expected.name,
                        expected.is_primary_key,
                        actual.is_primary_key
                    );
                }
            }
        }
        Ok(())
    }
}

pub const BASE_DB_VERSION: usize = 40000;
