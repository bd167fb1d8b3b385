pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod rules;
pub mod sweep;
pub mod util;

pub use audit::{AuditLog, AuditRecord, RenderFormat, Severity};
pub use config::Config;
pub use db::{
    ColumnInfo, ColumnRef, ExistenceQuery, MatchKind, ReferenceChecker, ReferenceStore,
    SchemaIndex, SqliteStore,
};
pub use error::{Result, SweepError};
pub use rules::{FileIgnore, PathRules};
pub use sweep::{
    read_manifest, run_cleanup, CleanupRun, EntryKind, FileDecision, RunSummary, StagedFile,
    Listing, TrashStager, TreeWalker, WalkEntry,
};
