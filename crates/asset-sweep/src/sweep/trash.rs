use crate::audit::STAMP_FORMAT;
use crate::error::{Result, SweepError};
use crate::rules::extension_of;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, ErrorKind, LineWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Per-batch record of everything that was moved, one JSON object per line.
pub const MANIFEST_NAME: &str = ".staged.jsonl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFile {
    /// Path relative to the project root before staging.
    pub original: String,
    /// File name inside the batch directory.
    pub staged_as: String,
    pub bytes: u64,
    pub blake3: String,
    pub staged_at: DateTime<Local>,
}

/// One quarantine directory for one run.
///
/// Files are flattened to their base name. When a name is already taken the
/// newcomer gets a `-N` suffix before its extension; nothing is overwritten.
pub struct TrashStager {
    project_root: PathBuf,
    batch_dir: PathBuf,
    manifest: LineWriter<File>,
}

impl TrashStager {
    /// Create `<trash_dir>/<stamp>`. A batch directory is never reused.
    pub fn prepare(trash_dir: &Path, project_root: &Path, started_at: DateTime<Local>) -> Result<Self> {
        fs::create_dir_all(trash_dir).map_err(|source| SweepError::DirectoryCreateFailed {
            path: trash_dir.to_path_buf(),
            source,
        })?;

        let stamp = started_at.format(STAMP_FORMAT).to_string();
        let mut attempt = 0u32;
        let batch_dir = loop {
            let name = if attempt == 0 {
                stamp.clone()
            } else {
                format!("{}-{}", stamp, attempt)
            };
            let candidate = trash_dir.join(name);

            match fs::create_dir(&candidate) {
                Ok(()) => break candidate,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(source) => {
                    return Err(SweepError::DirectoryCreateFailed {
                        path: candidate,
                        source,
                    })
                }
            }
        };

        let manifest_path = batch_dir.join(MANIFEST_NAME);
        let manifest = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&manifest_path)
            .map_err(|source| SweepError::DirectoryCreateFailed {
                path: manifest_path.clone(),
                source,
            })?;

        log::debug!("Prepared trash batch {}", batch_dir.display());

        Ok(Self {
            project_root: project_root.to_path_buf(),
            batch_dir,
            manifest: LineWriter::new(manifest),
        })
    }

    pub fn batch_dir(&self) -> &Path {
        &self.batch_dir
    }

    /// Move `<project_root>/<relative_path>` into the batch.
    ///
    /// Filesystem failures come back as `StageMoveFailed` with the source left
    /// in place.
    pub fn stage(&mut self, relative_path: &str) -> Result<StagedFile> {
        let source = self.project_root.join(relative_path);
        let stage_err = |e: io::Error| SweepError::StageMoveFailed {
            path: source.clone(),
            source: e,
        };

        let basename = Path::new(relative_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| stage_err(io::Error::new(ErrorKind::InvalidInput, "path has no file name")))?;

        let bytes = fs::metadata(&source).map_err(stage_err)?.len();
        let hash = compute_blake3_hash(&source).map_err(stage_err)?;
        let target = unique_target(&self.batch_dir, &basename);

        move_file(&source, &target, &hash).map_err(stage_err)?;

        let staged = StagedFile {
            original: relative_path.to_string(),
            staged_as: target
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or(basename),
            bytes,
            blake3: hash,
            staged_at: Local::now(),
        };

        writeln!(self.manifest, "{}", serde_json::to_string(&staged)?)?;
        self.manifest.flush()?;

        Ok(staged)
    }
}

/// Read back a batch manifest.
pub fn read_manifest(batch_dir: &Path) -> Result<Vec<StagedFile>> {
    let contents = fs::read_to_string(batch_dir.join(MANIFEST_NAME))?;
    let mut staged = Vec::new();
    for line in contents.lines().filter(|l| !l.trim().is_empty()) {
        staged.push(serde_json::from_str(line)?);
    }
    Ok(staged)
}

fn unique_target(batch_dir: &Path, basename: &str) -> PathBuf {
    let first = batch_dir.join(basename);
    if !first.exists() {
        return first;
    }

    let (stem, ext) = match extension_of(basename) {
        Some(ext) if ext.len() < basename.len() => (&basename[..basename.len() - ext.len()], ext),
        _ => (basename, ""),
    };

    let mut n = 1u32;
    loop {
        let candidate = batch_dir.join(format!("{}-{}{}", stem, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Rename, or copy + verify + remove when rename is not possible
/// (for instance across filesystems).
fn move_file(source: &Path, target: &Path, expected_hash: &str) -> io::Result<()> {
    match fs::rename(source, target) {
        Ok(()) => return Ok(()),
        Err(e) => log::debug!(
            "rename {} -> {} failed ({}), falling back to copy",
            source.display(),
            target.display(),
            e
        ),
    }

    fs::copy(source, target)?;

    let copied_hash = match compute_blake3_hash(target) {
        Ok(hash) => hash,
        Err(e) => {
            let _ = fs::remove_file(target);
            return Err(e);
        }
    };
    if copied_hash != expected_hash {
        let _ = fs::remove_file(target);
        return Err(io::Error::new(
            ErrorKind::InvalidData,
            format!("copy verification failed for {}", target.display()),
        ));
    }

    if let Err(e) = fs::remove_file(source) {
        let _ = fs::remove_file(target);
        return Err(e);
    }

    Ok(())
}

pub fn compute_blake3_hash<P: AsRef<Path>>(path: P) -> io::Result<String> {
    let file = File::open(path.as_ref())?;

    let mut reader = BufReader::new(file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}
