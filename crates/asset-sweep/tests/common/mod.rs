#![allow(dead_code)]

use asset_sweep_lib::{
    ColumnInfo, Config, ExistenceQuery, ReferenceStore, Result, SqliteStore, SweepError,
};
use rusqlite::Connection;
use std::cell::Cell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A project root next to a SQLite database, plus trash and log dirs
/// outside the root.
pub struct SiteFixture {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub db_path: PathBuf,
}

impl SiteFixture {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("www");
        fs::create_dir_all(&root).unwrap();

        let db_path = temp_dir.path().join("site.db");
        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE media (
                id          INTEGER PRIMARY KEY,
                path        VARCHAR(255),
                mime        VARCHAR(64)
            );
            CREATE TABLE pages (
                id          INTEGER PRIMARY KEY,
                title       VARCHAR(255),
                body        TEXT,
                lang        CHAR(2)
            );
            CREATE TABLE counters (
                id          INTEGER PRIMARY KEY,
                hits        INTEGER
            );
            "#,
        )
        .unwrap();

        Self {
            temp_dir,
            root,
            db_path,
        }
    }

    pub fn file(&self, rel: &str, contents: &[u8]) -> PathBuf {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn dir(&self, rel: &str) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Store `path` verbatim in a VARCHAR column.
    pub fn reference(&self, path: &str) {
        let conn = Connection::open(&self.db_path).unwrap();
        conn.execute("INSERT INTO media (path, mime) VALUES (?1, 'image/png')", [path])
            .unwrap();
    }

    /// Store a page whose TEXT body embeds markup.
    pub fn page(&self, body: &str) {
        let conn = Connection::open(&self.db_path).unwrap();
        conn.execute("INSERT INTO pages (title, body, lang) VALUES ('p', ?1, 'en')", [body])
            .unwrap();
    }

    pub fn trash_dir(&self) -> PathBuf {
        self.temp_dir.path().join("trash")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.temp_dir.path().join("logs")
    }

    pub fn config(&self, dry_run: bool) -> Config {
        Config {
            project_root: Some(self.root.clone()),
            database: Some(self.db_path.clone()),
            ignore_paths: vec!["cache".to_string()],
            ignore_extensions: vec![".php".to_string()],
            verbose: false,
            dry_run,
            trash_dir: Some(self.trash_dir()),
            log_dir: Some(self.log_dir()),
        }
    }

    pub fn store(&self) -> SqliteStore {
        SqliteStore::open_read_only(&self.db_path).unwrap()
    }

    /// The single batch directory created under the trash dir.
    pub fn batch_dir(&self) -> PathBuf {
        let mut batches: Vec<PathBuf> = fs::read_dir(self.trash_dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(batches.len(), 1, "expected exactly one trash batch");
        batches.pop().unwrap()
    }
}

/// Wraps a real store, counts existence queries and can fail on the n-th one
/// or run a side effect right before it.
pub struct ScriptedStore<'a> {
    inner: &'a dyn ReferenceStore,
    calls: Cell<usize>,
    fail_on_call: Option<usize>,
    before_call: Option<(usize, Box<dyn Fn() + 'a>)>,
}

impl<'a> ScriptedStore<'a> {
    pub fn new(inner: &'a dyn ReferenceStore) -> Self {
        Self {
            inner,
            calls: Cell::new(0),
            fail_on_call: None,
            before_call: None,
        }
    }

    pub fn failing_on(inner: &'a dyn ReferenceStore, call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::new(inner)
        }
    }

    /// Run `hook` just before the `call`-th existence query.
    pub fn with_hook(inner: &'a dyn ReferenceStore, call: usize, hook: impl Fn() + 'a) -> Self {
        Self {
            before_call: Some((call, Box::new(hook))),
            ..Self::new(inner)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ReferenceStore for ScriptedStore<'_> {
    fn list_tables(&self) -> Result<Vec<String>> {
        self.inner.list_tables()
    }

    fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        self.inner.table_columns(table)
    }

    fn any_row_matches(&self, query: &ExistenceQuery) -> Result<bool> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if let Some((at, hook)) = &self.before_call {
            if *at == call {
                hook();
            }
        }
        if self.fail_on_call == Some(call) {
            return Err(SweepError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "database unavailable",
            )));
        }
        self.inner.any_row_matches(query)
    }
}

pub fn read_log(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}
