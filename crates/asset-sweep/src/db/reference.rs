use crate::db::{ColumnRef, MatchKind, ReferenceStore, SchemaIndex};
use crate::error::{Result, SweepError};

/// One existence probe: OR of per-column predicates against a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistenceQuery {
    table: String,
    predicates: Vec<(String, MatchKind)>,
    needle: String,
}

impl ExistenceQuery {
    pub fn new(table: &str, columns: &[ColumnRef], needle: &str) -> Self {
        Self {
            table: table.to_string(),
            predicates: columns
                .iter()
                .map(|c| (c.column.clone(), c.match_kind))
                .collect(),
            needle: needle.to_string(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    pub fn predicates(&self) -> &[(String, MatchKind)] {
        &self.predicates
    }

    /// SQL with the needle bound as `?1`.
    ///
    /// Substring matches use `instr` so `%` and `_` in file names are literal
    /// and comparison stays case-sensitive.
    pub fn to_sql(&self) -> String {
        let clauses: Vec<String> = self
            .predicates
            .iter()
            .map(|(column, kind)| match kind {
                MatchKind::Exact => format!("{} = ?1", quote_ident(column)),
                MatchKind::Contains => format!("instr({}, ?1) > 0", quote_ident(column)),
            })
            .collect();

        format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {})",
            quote_ident(&self.table),
            clauses.join(" OR ")
        )
    }
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Answers "is this relative path referenced anywhere in the store".
pub struct ReferenceChecker<'a> {
    store: &'a dyn ReferenceStore,
    index: SchemaIndex,
}

impl<'a> ReferenceChecker<'a> {
    pub fn new(store: &'a dyn ReferenceStore, index: SchemaIndex) -> Self {
        Self { store, index }
    }

    /// Introspect the store once and keep the index for the checker's lifetime.
    pub fn build(store: &'a dyn ReferenceStore) -> Result<Self> {
        let index = SchemaIndex::build(store)?;
        Ok(Self::new(store, index))
    }

    pub fn index(&self) -> &SchemaIndex {
        &self.index
    }

    pub fn exists(&self, relative_path: &str) -> Result<bool> {
        Ok(self.find_reference(relative_path)?.is_some())
    }

    /// Name of the first table, in index order, holding a reference.
    ///
    /// Store failures surface as `ReferenceCheckFailed`; they never read as
    /// "not referenced".
    pub fn find_reference(&self, relative_path: &str) -> Result<Option<String>> {
        self.find_reference_with(relative_path, |_, _| {})
    }

    /// Like [`find_reference`](Self::find_reference), calling `on_miss` for each
    /// table probed without a match.
    pub fn find_reference_with<F>(&self, relative_path: &str, mut on_miss: F) -> Result<Option<String>>
    where
        F: FnMut(&str, &str),
    {
        for entry in self.index.tables() {
            if entry.columns.is_empty() {
                continue;
            }

            let query = ExistenceQuery::new(&entry.table, &entry.columns, relative_path);
            let found = self.store.any_row_matches(&query).map_err(|e| {
                SweepError::ReferenceCheckFailed {
                    path: relative_path.to_string(),
                    table: entry.table.clone(),
                    reason: e.to_string(),
                }
            })?;

            if found {
                return Ok(Some(entry.table.clone()));
            }
            on_miss(relative_path, &entry.table);
        }

        Ok(None)
    }
}
