use std::collections::VecDeque;
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// Sockets, fifos, devices.
    Other,
}

#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub path: PathBuf,
    /// Path relative to the walk root, `/`-separated.
    pub relative: String,
    pub name: String,
    pub kind: EntryKind,
}

/// Immediate children of one directory.
///
/// Entries that could not be read are kept apart so the caller can report
/// them and still process their siblings.
#[derive(Debug, Default)]
pub struct Listing {
    pub entries: Vec<WalkEntry>,
    pub errors: Vec<walkdir::Error>,
}

/// Breadth-first, queue-driven traversal state.
///
/// The walker only lists and classifies; deciding what to enqueue is left to
/// the caller. Symlinks are reported as such and never resolved.
pub struct TreeWalker {
    root: PathBuf,
    queue: VecDeque<PathBuf>,
}

impl TreeWalker {
    /// Seed the queue with `root`.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        let mut queue = VecDeque::new();
        queue.push_back(root.clone());
        Self { root, queue }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn enqueue(&mut self, dir: PathBuf) {
        self.queue.push_back(dir);
    }

    pub fn dequeue(&mut self) -> Option<PathBuf> {
        self.queue.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Immediate children of `dir`, sorted by name.
    ///
    /// Fails only when `dir` itself cannot be opened.
    pub fn expand(&self, dir: &Path) -> io::Result<Listing> {
        let mut listing = Listing::default();

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    let kind = if file_type.is_symlink() {
                        EntryKind::Symlink
                    } else if file_type.is_dir() {
                        EntryKind::Directory
                    } else if file_type.is_file() {
                        EntryKind::File
                    } else {
                        EntryKind::Other
                    };

                    listing.entries.push(WalkEntry {
                        relative: self.relative(entry.path()),
                        name: entry.file_name().to_string_lossy().to_string(),
                        path: entry.into_path(),
                        kind,
                    });
                }
                Err(e) if e.depth() == 0 || e.path() == Some(dir) => return Err(e.into()),
                Err(e) => listing.errors.push(e),
            }
        }

        Ok(listing)
    }

    /// `path` relative to the root; the root itself is `""`.
    pub fn relative(&self, path: &Path) -> String {
        relative_to(&self.root, path)
    }
}

pub fn relative_to(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
