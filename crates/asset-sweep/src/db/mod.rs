pub mod reference;
pub mod schema;

use crate::error::Result;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use reference::{ExistenceQuery, ReferenceChecker};
pub use schema::{ColumnRef, MatchKind, SchemaIndex};

/// Raw column metadata as the store declares it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
}

/// The structured store that asset paths are checked against.
///
/// Implementations must return tables and columns in a stable order so audit
/// logs are reproducible across runs against an unchanged schema.
pub trait ReferenceStore {
    fn list_tables(&self) -> Result<Vec<String>>;
    fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>>;
    /// True when at least one row satisfies the query.
    fn any_row_matches(&self, query: &ExistenceQuery) -> Result<bool>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open an existing database without write access.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl ReferenceStore for SqliteStore {
    fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;

        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tables)
    }

    fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;

        let columns = stmt
            .query_map([table], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    declared_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(columns)
    }

    fn any_row_matches(&self, query: &ExistenceQuery) -> Result<bool> {
        let mut stmt = self.conn.prepare_cached(&query.to_sql())?;
        let found: bool = stmt.query_row([query.needle()], |row| row.get(0))?;
        Ok(found)
    }
}
