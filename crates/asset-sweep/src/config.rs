use crate::error::{Result, SweepError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use xdg::BaseDirectories;

pub const CONFIG_ENV: &str = "ASSET_SWEEP_CONFIG";
pub const CONFIG_FILE_NAME: &str = "asset-sweep.toml";

/// Settings for one cleanup run.
///
/// Loaded from TOML; command line flags are applied on top by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Public asset directory that traversal starts from.
    pub project_root: Option<PathBuf>,
    /// SQLite database whose rows may reference files under the root.
    pub database: Option<PathBuf>,
    /// Directories to skip, relative to the project root. Exact match.
    pub ignore_paths: Vec<String>,
    /// File extensions to skip, including the leading dot. Exact match.
    pub ignore_extensions: Vec<String>,
    pub verbose: bool,
    pub dry_run: bool,
    /// Where trash batches are created. Defaults to `<project_root>/trash`.
    pub trash_dir: Option<PathBuf>,
    /// Where audit logs are written. Defaults to `<project_root>/logs`.
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_root: None,
            database: None,
            ignore_paths: vec!["cache".to_string(), "trash".to_string()],
            ignore_extensions: vec![".php".to_string(), ".css".to_string(), ".js".to_string()],
            verbose: false,
            dry_run: true,
            trash_dir: None,
            log_dir: None,
        }
    }
}

impl Config {
    /// Resolve and load the configuration file.
    ///
    /// An explicit path must exist. Otherwise `ASSET_SWEEP_CONFIG` and then the
    /// XDG config directory are consulted, falling back to defaults.
    pub fn load(path_override: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path_override {
            return Self::from_file(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(env_path));
        }

        let found = BaseDirectories::with_prefix("asset-sweep")
            .ok()
            .and_then(|xdg| xdg.find_config_file(CONFIG_FILE_NAME));

        match found {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            SweepError::ConfigInvalid(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(toml_str)
            .map_err(|e| SweepError::ConfigInvalid(format!("Failed to parse TOML: {}", e)))?;
        config.normalize();
        Ok(config)
    }

    /// Trim list entries and drop the empty ones.
    pub fn normalize(&mut self) {
        self.ignore_paths = clean_entries(&self.ignore_paths);
        self.ignore_extensions = clean_entries(&self.ignore_extensions);
    }

    /// Full validation, including the database file.
    pub fn validate(&self) -> Result<()> {
        self.validate_root()?;

        let database = self
            .database
            .as_ref()
            .ok_or_else(|| SweepError::ConfigInvalid("database is not set".to_string()))?;
        if !database.is_file() {
            return Err(SweepError::ConfigInvalid(format!(
                "database {} does not exist",
                database.display()
            )));
        }

        Ok(())
    }

    /// Checks everything a run needs before traversal besides the store.
    pub fn validate_root(&self) -> Result<()> {
        let root = self
            .project_root
            .as_ref()
            .ok_or_else(|| SweepError::ConfigInvalid("project_root is not set".to_string()))?;

        let metadata = fs::metadata(root).map_err(|e| {
            SweepError::ConfigInvalid(format!(
                "project root {} is not accessible: {}",
                root.display(),
                e
            ))
        })?;
        if !metadata.is_dir() {
            return Err(SweepError::ConfigInvalid(format!(
                "project root {} is not a directory",
                root.display()
            )));
        }
        if metadata.permissions().readonly() {
            return Err(SweepError::ConfigInvalid(format!(
                "project root {} is not writable",
                root.display()
            )));
        }

        if let Some(bad) = self.ignore_extensions.iter().find(|e| !e.starts_with('.')) {
            return Err(SweepError::ConfigInvalid(format!(
                "ignored extension '{}' must start with '.'",
                bad
            )));
        }

        Ok(())
    }

    /// Project root, or `ConfigInvalid` when unset.
    pub fn root(&self) -> Result<&Path> {
        self.project_root
            .as_deref()
            .ok_or_else(|| SweepError::ConfigInvalid("project_root is not set".to_string()))
    }

    pub fn trash_dir(&self) -> Result<PathBuf> {
        match &self.trash_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.root()?.join("trash")),
        }
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.root()?.join("logs")),
        }
    }
}

fn clean_entries(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_string())
        .collect()
}
