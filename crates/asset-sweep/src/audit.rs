//! Append-only audit trail of a cleanup run.
//!
//! Every accepted record is written and flushed to the log file as it is
//! emitted, so an interrupted run still leaves a usable trail behind.

use crate::error::{Result, SweepError};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, LineWriter, Write};
use std::path::{Path, PathBuf};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Used in file and directory names created by a run.
pub const STAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Notice => "NOTICE",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    fn log_level(&self) -> log::Level {
        match self {
            Severity::Debug => log::Level::Debug,
            Severity::Info | Severity::Notice => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Error | Severity::Critical => log::Level::Error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    pub message: String,
    pub debug_only: bool,
}

impl AuditRecord {
    pub fn to_line(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.severity.as_str(),
            self.message
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Text,
    Html,
}

pub struct AuditLog {
    path: Option<PathBuf>,
    writer: Option<LineWriter<File>>,
    records: Vec<AuditRecord>,
    verbose: bool,
}

impl AuditLog {
    /// Create `<dir>/cleanup-<stamp>.log`, creating `dir` as needed.
    ///
    /// An existing file is never appended to; a `-N` suffix is chosen instead.
    pub fn create(dir: &Path, started_at: DateTime<Local>, verbose: bool) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|source| SweepError::DirectoryCreateFailed {
            path: dir.to_path_buf(),
            source,
        })?;

        let stem = format!("cleanup-{}", started_at.format(STAMP_FORMAT));
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{}.log", stem)
            } else {
                format!("{}-{}.log", stem, attempt)
            };
            let path = dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    return Ok(Self {
                        path: Some(path),
                        writer: Some(LineWriter::new(file)),
                        records: Vec::new(),
                        verbose,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// A log that keeps records only in memory.
    pub fn in_memory(verbose: bool) -> Self {
        Self {
            path: None,
            writer: None,
            records: Vec::new(),
            verbose,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Append a record. Debug-only records are dropped unless verbose.
    pub fn record(&mut self, message: impl Into<String>, severity: Severity, debug_only: bool) -> Result<()> {
        if debug_only && !self.verbose {
            return Ok(());
        }

        let record = AuditRecord {
            timestamp: Local::now(),
            severity,
            message: message.into(),
            debug_only,
        };

        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", record.to_line())?;
            writer.flush()?;
        }

        log::log!(echo_level(record.severity, self.verbose), "{}", record.message);
        self.records.push(record);
        Ok(())
    }

    pub fn notice(&mut self, message: impl Into<String>) -> Result<()> {
        self.record(message, Severity::Notice, false)
    }

    pub fn info(&mut self, message: impl Into<String>) -> Result<()> {
        self.record(message, Severity::Info, false)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> Result<()> {
        self.record(message, Severity::Warning, false)
    }

    pub fn error(&mut self, message: impl Into<String>) -> Result<()> {
        self.record(message, Severity::Error, false)
    }

    pub fn debug(&mut self, message: impl Into<String>) -> Result<()> {
        self.record(message, Severity::Debug, true)
    }

    /// The accumulated log as a presentable artifact.
    pub fn render(&self, format: RenderFormat) -> String {
        let mut text = String::new();
        for record in &self.records {
            text.push_str(&record.to_line());
            text.push('\n');
        }

        match format {
            RenderFormat::Text => text,
            RenderFormat::Html => format!("<pre>\n{}</pre>\n", escape_html(&text)),
        }
    }
}

/// Level a record is echoed at through `log`.
///
/// Outside verbose mode only errors surface at their own level; the rest stay
/// at debug so they do not write over a progress display.
fn echo_level(severity: Severity, verbose: bool) -> log::Level {
    match severity {
        Severity::Error | Severity::Critical => severity.log_level(),
        _ if verbose => severity.log_level(),
        _ => log::Level::Debug,
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
