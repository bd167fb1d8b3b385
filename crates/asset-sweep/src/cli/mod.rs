pub mod check;
pub mod run;
pub mod schema;

use asset_sweep_lib::{Config, Result, SqliteStore, SweepError};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "asset-sweep")]
#[command(about = "Find static assets no database row references and stage them for removal", long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Path to the SQLite database")]
    pub db: Option<PathBuf>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output and debug audit records")]
    pub verbose: bool,

    #[arg(long, short = 'q', global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Walk the project root and detect unreferenced files")]
    Run {
        #[arg(long, help = "Project root (public asset directory)")]
        root: Option<PathBuf>,

        #[arg(long, conflicts_with = "execute", help = "Only report orphans (default)")]
        dry_run: bool,

        #[arg(long, help = "Move orphans into the trash batch")]
        execute: bool,

        #[arg(long, short = 'y', help = "Do not ask for confirmation before moving files")]
        yes: bool,

        #[arg(long, help = "Print the full audit log when done")]
        show_log: bool,

        #[arg(long, requires = "show_log", help = "Render the audit log as HTML")]
        html: bool,

        #[arg(long, help = "Print the run summary as JSON")]
        json: bool,
    },

    #[command(about = "Show which columns are checked for file references")]
    Schema,

    #[command(about = "Check whether a single relative path is referenced")]
    Check {
        #[arg(help = "Path relative to the project root, e.g. images/logo.png")]
        path: String,
    },
}

/// Load the config file and apply global flag overrides.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.clone())?;
    if let Some(db) = &cli.db {
        config.database = Some(db.clone());
    }
    if cli.verbose {
        config.verbose = true;
    }
    Ok(config)
}

pub fn open_store(config: &Config) -> Result<SqliteStore> {
    let database = config
        .database
        .as_deref()
        .ok_or_else(|| SweepError::ConfigInvalid("database is not set (use --db)".to_string()))?;
    if !database.is_file() {
        return Err(SweepError::ConfigInvalid(format!(
            "database {} does not exist",
            database.display()
        )));
    }
    SqliteStore::open_read_only(Path::new(database))
}
