use crate::audit::{AuditLog, RenderFormat, Severity};
use crate::config::Config;
use crate::db::{ReferenceChecker, ReferenceStore, SqliteStore};
use crate::error::{Result, SweepError};
use crate::rules::{FileIgnore, PathRules};
use crate::sweep::trash::TrashStager;
use crate::sweep::walker::{EntryKind, TreeWalker, WalkEntry};
use crate::util::format::{format_bytes, format_timestamp};
use chrono::{DateTime, Local};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome for one regular file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileDecision {
    IgnoredHidden,
    IgnoredExtension,
    Referenced { table: String },
    OrphanStaged { staged_as: String },
    OrphanDetectedDryRun,
    /// Orphan whose relocation failed; the file is still in place.
    OrphanStageFailed { reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub dry_run: bool,
    pub directories_scanned: usize,
    pub directories_skipped: usize,
    pub files_scanned: usize,
    pub files_ignored_hidden: usize,
    pub files_ignored_extension: usize,
    pub files_referenced: usize,
    pub orphans_found: usize,
    pub orphans_staged: usize,
    pub bytes_staged: u64,
    pub stage_failures: usize,
    pub symlinks_skipped: usize,
    pub unreadable_entries: usize,
    /// Orphan paths relative to the project root, in traversal order.
    pub orphans: Vec<String>,
    pub log_path: Option<PathBuf>,
    pub staging_dir: Option<PathBuf>,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: Option<DateTime<Local>>,
}

impl RunSummary {
    fn count(&mut self, decision: &FileDecision) {
        match decision {
            FileDecision::IgnoredHidden => self.files_ignored_hidden += 1,
            FileDecision::IgnoredExtension => self.files_ignored_extension += 1,
            FileDecision::Referenced { .. } => self.files_referenced += 1,
            FileDecision::OrphanStaged { .. } => {
                self.orphans_found += 1;
                self.orphans_staged += 1;
            }
            FileDecision::OrphanDetectedDryRun => self.orphans_found += 1,
            FileDecision::OrphanStageFailed { .. } => {
                self.orphans_found += 1;
                self.stage_failures += 1;
            }
        }
    }
}

/// One cleanup run: owns the queue, the audit log and the trash batch.
///
/// Nothing here is shared between runs, so several runs can coexist in one
/// process.
pub struct CleanupRun<'a> {
    config: Config,
    rules: PathRules,
    store: &'a dyn ReferenceStore,
    log: AuditLog,
    progress: Option<ProgressBar>,
    started_at: DateTime<Local>,
    summary: RunSummary,
}

impl<'a> CleanupRun<'a> {
    /// Validate the configuration and open the run's audit log file.
    pub fn new(config: Config, store: &'a dyn ReferenceStore) -> Result<Self> {
        config.validate_root()?;
        let started_at = Local::now();
        let log = AuditLog::create(&config.log_dir()?, started_at, config.verbose)?;
        Self::with_log(config, store, log, started_at)
    }

    pub fn with_log(
        config: Config,
        store: &'a dyn ReferenceStore,
        log: AuditLog,
        started_at: DateTime<Local>,
    ) -> Result<Self> {
        config.validate_root()?;
        let rules = PathRules::from_config(&config);
        let summary = RunSummary {
            dry_run: config.dry_run,
            log_path: log.path().map(Path::to_path_buf),
            started_at: Some(started_at),
            ..Default::default()
        };

        Ok(Self {
            config,
            rules,
            store,
            log,
            progress: None,
            started_at,
            summary,
        })
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn log(&self) -> &AuditLog {
        &self.log
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn render_log(&self, format: RenderFormat) -> String {
        self.log.render(format)
    }

    /// Walk the tree and decide every file.
    ///
    /// A fatal error is recorded as a critical audit entry before it is
    /// returned; the partial log and summary stay available on `self`.
    pub fn execute(&mut self) -> Result<RunSummary> {
        let result = self.run_queue();
        self.summary.finished_at = Some(Local::now());

        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }

        match result {
            Ok(()) => {
                self.log_summary()?;
                Ok(self.summary.clone())
            }
            Err(e) => {
                let _ = self.log.record(format!("Run aborted: {}", e), Severity::Critical, false);
                if let Some(path) = self.log.path().map(Path::to_path_buf) {
                    let _ = self.log.info(format!("Logs saved to: {}", path.display()));
                }
                Err(e)
            }
        }
    }

    fn run_queue(&mut self) -> Result<()> {
        let root = self.config.root()?.to_path_buf();

        self.log.info(format!(
            "Cleanup started at: {}",
            format_timestamp(&self.started_at)
        ))?;
        self.log.info(format!(
            "Project root: {} ({})",
            root.display(),
            if self.config.dry_run { "dry run" } else { "staging orphans" }
        ))?;

        let checker = ReferenceChecker::build(self.store)?;
        self.log.info(format!(
            "Schema index: {} tables, {} eligible columns",
            checker.index().tables().len(),
            checker.index().eligible_column_count()
        ))?;
        for entry in checker.index().tables().iter().filter(|t| t.columns.is_empty()) {
            self.log
                .debug(format!("Table {} has no text columns. [skipped]", entry.table))?;
        }

        let mut stager = if self.config.dry_run {
            None
        } else {
            let stager = TrashStager::prepare(&self.config.trash_dir()?, &root, self.started_at)?;
            self.log
                .notice(format!("Created trash path: {}", stager.batch_dir().display()))?;
            self.summary.staging_dir = Some(stager.batch_dir().to_path_buf());
            Some(stager)
        };

        let reserved: Vec<String> = [self.config.trash_dir()?, self.config.log_dir()?]
            .iter()
            .filter_map(|dir| reserved_relative(&root, dir))
            .collect();

        let mut walker = TreeWalker::new(&root);
        self.log.debug(format!("Enqueued item: {}", root.display()))?;

        while let Some(dir) = walker.dequeue() {
            self.log.debug(format!("Dequeued item: {}", dir.display()))?;
            self.expand_directory(&mut walker, &dir, &reserved, &checker, &mut stager)?;
        }

        Ok(())
    }

    fn expand_directory(
        &mut self,
        walker: &mut TreeWalker,
        dir: &Path,
        reserved: &[String],
        checker: &ReferenceChecker<'_>,
        stager: &mut Option<TrashStager>,
    ) -> Result<()> {
        let relative = walker.relative(dir);
        self.log.notice(format!("Reading dir: {}", display_dir(&relative)))?;
        self.summary.directories_scanned += 1;

        let listing = match walker.expand(dir) {
            Ok(listing) => listing,
            Err(e) => {
                self.log
                    .error(format!("Cannot read dir {}: {}", display_dir(&relative), e))?;
                self.summary.unreadable_entries += 1;
                return Ok(());
            }
        };

        for e in &listing.errors {
            self.log
                .error(format!("Cannot read entry in {}: {}", display_dir(&relative), e))?;
            self.summary.unreadable_entries += 1;
        }

        for entry in listing.entries {
            match entry.kind {
                EntryKind::Symlink => {
                    self.log
                        .warning(format!("Skipped symbolic link: {}", entry.relative))?;
                    self.summary.symlinks_skipped += 1;
                }
                EntryKind::Directory => {
                    if reserved.contains(&entry.relative) {
                        self.log.debug(format!(
                            "path [{}] is reserved for this tool. [skipped]",
                            entry.relative
                        ))?;
                    } else if self.rules.is_directory_ignored(&entry.relative) {
                        self.log.warning(format!(
                            "path [{}] is ignored. [skipped]",
                            entry.relative
                        ))?;
                        self.summary.directories_skipped += 1;
                    } else {
                        self.log.debug(format!("Enqueued item: {}", entry.path.display()))?;
                        walker.enqueue(entry.path);
                    }
                }
                EntryKind::File => {
                    let decision = self.decide(&entry, checker, stager)?;
                    self.summary.count(&decision);
                }
                EntryKind::Other => {
                    self.log
                        .debug(format!("{} is not a regular file. [skipped]", entry.relative))?;
                }
            }
        }

        Ok(())
    }

    fn decide(
        &mut self,
        entry: &WalkEntry,
        checker: &ReferenceChecker<'_>,
        stager: &mut Option<TrashStager>,
    ) -> Result<FileDecision> {
        let relative = entry.relative.as_str();
        self.summary.files_scanned += 1;
        if let Some(progress) = &self.progress {
            progress.set_message(relative.to_string());
            progress.inc(1);
        }

        match self.rules.file_ignore_reason(relative, &entry.name) {
            Some(FileIgnore::Hidden) => {
                self.log
                    .warning(format!("{} is a restricted file. [skipped]", relative))?;
                return Ok(FileDecision::IgnoredHidden);
            }
            Some(FileIgnore::Extension) => {
                self.log
                    .warning(format!("file extension ignored in [{}]. [skipped]", relative))?;
                return Ok(FileDecision::IgnoredExtension);
            }
            None => {}
        }

        let mut misses = Vec::new();
        let found = checker.find_reference_with(relative, |_, table| misses.push(table.to_string()));
        for table in &misses {
            self.log
                .debug(format!("{} not found in table: {}", relative, table))?;
        }

        if let Some(table) = found? {
            self.log
                .notice(format!("{} exists in table: {}", relative, table))?;
            return Ok(FileDecision::Referenced { table });
        }

        self.summary.orphans.push(relative.to_string());

        let Some(stager) = stager.as_mut() else {
            self.log.notice(format!(
                "File [{}] was not found in database. [dry run, not moved]",
                relative
            ))?;
            return Ok(FileDecision::OrphanDetectedDryRun);
        };

        match stager.stage(relative) {
            Ok(staged) => {
                self.summary.bytes_staged += staged.bytes;
                self.log.notice(format!(
                    "File [{}] was not found in database. Moved to trash [{}] ({})",
                    relative,
                    stager.batch_dir().join(&staged.staged_as).display(),
                    format_bytes(staged.bytes)
                ))?;
                Ok(FileDecision::OrphanStaged {
                    staged_as: staged.staged_as,
                })
            }
            Err(e) if !e.is_fatal() => {
                self.log
                    .error(format!("File [{}] could not be moved to trash: {}", relative, e))?;
                Ok(FileDecision::OrphanStageFailed {
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    fn log_summary(&mut self) -> Result<()> {
        let s = self.summary.clone();
        self.log.info(format!(
            "Scanned {} files in {} directories",
            s.files_scanned, s.directories_scanned
        ))?;
        self.log.info(format!(
            "Skipped {} ignored directories, {} hidden files, {} ignored extensions, {} symbolic links",
            s.directories_skipped, s.files_ignored_hidden, s.files_ignored_extension, s.symlinks_skipped
        ))?;
        self.log.info(format!(
            "Referenced: {}, orphans found: {}, orphans staged: {}, staging failures: {}",
            s.files_referenced, s.orphans_found, s.orphans_staged, s.stage_failures
        ))?;
        if let Some(finished) = &s.finished_at {
            self.log
                .info(format!("Cleanup finished at: {}", format_timestamp(finished)))?;
        }
        if let Some(path) = self.log.path().map(Path::to_path_buf) {
            self.log.info(format!("Logs saved to: {}", path.display()))?;
        }
        Ok(())
    }
}

fn display_dir(relative: &str) -> String {
    if relative.is_empty() {
        "./".to_string()
    } else {
        format!("{}/", relative)
    }
}

/// `dir` relative to `root` when it lies inside it.
///
/// Both sides are canonicalized when they exist, so `./www/trash` and a
/// relative `trash_dir` resolve to the same entry the walker reports.
fn reserved_relative(root: &Path, dir: &Path) -> Option<String> {
    let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    let dir = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    let rel = dir.strip_prefix(&root).ok()?;
    let rel = crate::sweep::walker::relative_to(Path::new(""), rel);
    if rel.is_empty() {
        None
    } else {
        Some(rel)
    }
}

/// Open the configured database read-only and run one cleanup.
///
/// A failure after traversal started comes back as `SweepError::Aborted`,
/// carrying the partial summary (and with it the audit log path).
pub fn run_cleanup(config: Config) -> Result<RunSummary> {
    config.validate()?;
    let database = config
        .database
        .clone()
        .ok_or_else(|| SweepError::ConfigInvalid("database is not set".to_string()))?;
    let store = SqliteStore::open_read_only(&database)?;

    let mut run = CleanupRun::new(config, &store)?;
    run.execute().map_err(|source| SweepError::Aborted {
        summary: Box::new(run.summary().clone()),
        source: Box::new(source),
    })
}
