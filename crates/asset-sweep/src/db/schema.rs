//! One-pass introspection of the store's tables into a registry of columns
//! that can plausibly hold a file path.

use crate::db::{ColumnInfo, ReferenceStore};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// How a column is compared against a relative file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    /// Bounded string fields hold the path verbatim.
    Exact,
    /// Long text may embed the path inside markup or content.
    Contains,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Contains => "contains",
        }
    }
}

/// Result of classifying a declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Text(MatchKind),
    /// Fixed-length character codes and flags.
    FixedChar,
    NotText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
    pub declared_type: String,
    pub match_kind: MatchKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumns {
    pub table: String,
    pub columns: Vec<ColumnRef>,
}

/// Tables in store order, each with its eligible columns.
///
/// Tables without eligible columns are kept with an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaIndex {
    tables: Vec<TableColumns>,
}

impl SchemaIndex {
    pub fn build(store: &dyn ReferenceStore) -> Result<Self> {
        let mut tables = Vec::new();

        for table in store.list_tables()? {
            let columns = store
                .table_columns(&table)?
                .into_iter()
                .filter_map(|info| eligible_column(&table, info))
                .collect();

            tables.push(TableColumns { table, columns });
        }

        log::debug!("Schema index built: {} tables", tables.len());
        Ok(Self { tables })
    }

    pub fn tables(&self) -> &[TableColumns] {
        &self.tables
    }

    pub fn get(&self, table: &str) -> Option<&[ColumnRef]> {
        self.tables
            .iter()
            .find(|t| t.table == table)
            .map(|t| t.columns.as_slice())
    }

    pub fn eligible_column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.eligible_column_count() == 0
    }
}

fn eligible_column(table: &str, info: ColumnInfo) -> Option<ColumnRef> {
    match classify_declared_type(&info.declared_type) {
        TypeClass::Text(match_kind) => Some(ColumnRef {
            table: table.to_string(),
            column: info.name,
            declared_type: info.declared_type,
            match_kind,
        }),
        TypeClass::FixedChar | TypeClass::NotText => None,
    }
}

/// Classify a free-form declared type such as `VARCHAR(255)` or `longtext`.
pub fn classify_declared_type(declared: &str) -> TypeClass {
    let upper = declared.trim().to_ascii_uppercase();
    let base = match upper.find('(') {
        Some(pos) => upper[..pos].trim_end(),
        None => upper.as_str(),
    };

    match base {
        "TEXT" | "CLOB" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "LONGVARCHAR" | "NTEXT" => {
            TypeClass::Text(MatchKind::Contains)
        }
        "CHAR" | "CHARACTER" | "NCHAR" | "NATIVE CHARACTER" => TypeClass::FixedChar,
        "STRING" => TypeClass::Text(MatchKind::Exact),
        other if other.contains("VARCHAR") || other.contains("VARYING") => {
            TypeClass::Text(MatchKind::Exact)
        }
        // SQLite gives TEXT affinity to anything containing CHAR, CLOB or TEXT.
        other
            if other.contains("CLOB") || other.contains("TEXT") || other.contains("LARGE OBJECT") =>
        {
            TypeClass::Text(MatchKind::Contains)
        }
        other if other.contains("CHAR") => TypeClass::Text(MatchKind::Exact),
        _ => TypeClass::NotText,
    }
}
