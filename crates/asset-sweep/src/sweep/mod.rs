pub mod run;
pub mod trash;
pub mod walker;

pub use run::{run_cleanup, CleanupRun, FileDecision, RunSummary};
pub use trash::{read_manifest, StagedFile, TrashStager};
pub use walker::{EntryKind, Listing, TreeWalker, WalkEntry};
