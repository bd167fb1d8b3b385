use crate::sweep::RunSummary;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Reference check for [{path}] failed in table {table}: {reason}")]
    ReferenceCheckFailed {
        path: String,
        table: String,
        reason: String,
    },

    #[error("Failed to stage {path}: {source}")]
    StageMoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("User input error: {0}")]
    UserInput(String),

    /// A run that stopped part way; the summary and audit log cover
    /// everything decided before the failure.
    #[error("Cleanup aborted: {source}")]
    Aborted {
        summary: Box<RunSummary>,
        #[source]
        source: Box<SweepError>,
    },
}

impl SweepError {
    /// Per-file staging failures are recovered locally; everything else stops the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SweepError::StageMoveFailed { .. })
    }

    /// Audit log of the aborted run, when there is one.
    pub fn log_path(&self) -> Option<&std::path::Path> {
        match self {
            SweepError::Aborted { summary, .. } => summary.log_path.as_deref(),
            _ => None,
        }
    }
}

impl From<dialoguer::Error> for SweepError {
    fn from(err: dialoguer::Error) -> Self {
        SweepError::UserInput(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;
