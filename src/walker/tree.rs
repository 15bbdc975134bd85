//! Iterative directory tree walker
//!
//! Produces every regular file under a root as a lazy sequence of absolute
//! paths. Pending directories live on an explicit stack, so deep trees never
//! grow the call stack. Symlinks are never followed: a symlink (to a file or a
//! directory) is counted as a skipped entry, which also rules out cycles.

use crate::error::{WalkError, WalkResult};
use crate::report::ScanReporter;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Counters collected while walking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Directories fully listed
    pub dirs_scanned: u64,

    /// Directories that could not be listed
    pub dirs_skipped: u64,

    /// Regular files yielded
    pub files: u64,

    /// Symlinks, sockets, devices and FIFOs
    pub special_skipped: u64,

    /// Files left out because the scan itself owns them
    pub excluded: u64,
}

/// Directory tree walker rooted at an existing directory
#[derive(Clone)]
pub struct Walker {
    root: PathBuf,
    excluded: Arc<HashSet<PathBuf>>,
    reporter: Arc<dyn ScanReporter>,
}

impl Walker {
    /// Create a walker for `root`
    ///
    /// The root is canonicalized so every yielded path is absolute.
    pub fn new(root: &Path, reporter: Arc<dyn ScanReporter>) -> WalkResult<Self> {
        let meta = fs::metadata(root).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => WalkError::RootNotFound {
                path: root.to_path_buf(),
            },
            _ => WalkError::RootUnreadable {
                path: root.to_path_buf(),
                source: e,
            },
        })?;

        if !meta.is_dir() {
            return Err(WalkError::RootNotADirectory {
                path: root.to_path_buf(),
            });
        }

        let root = fs::canonicalize(root).map_err(|e| WalkError::RootUnreadable {
            path: root.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            root,
            excluded: Arc::new(HashSet::new()),
            reporter,
        })
    }

    /// Leave these exact file paths out of the walk
    pub fn exclude<I>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.excluded = Arc::new(paths.into_iter().collect());
        self
    }

    /// Canonical root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a fresh traversal
    pub fn iter(&self) -> WalkIter {
        WalkIter {
            stack: vec![self.root.clone()],
            pending: VecDeque::new(),
            excluded: Arc::clone(&self.excluded),
            reporter: Arc::clone(&self.reporter),
            stats: WalkStats::default(),
        }
    }
}

impl IntoIterator for &Walker {
    type Item = PathBuf;
    type IntoIter = WalkIter;

    fn into_iter(self) -> WalkIter {
        self.iter()
    }
}

/// One traversal over the tree
pub struct WalkIter {
    stack: Vec<PathBuf>,
    pending: VecDeque<PathBuf>,
    excluded: Arc<HashSet<PathBuf>>,
    reporter: Arc<dyn ScanReporter>,
    stats: WalkStats,
}

impl WalkIter {
    /// Counters so far
    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    /// List one directory: files go to `pending`, subdirectories to `stack`
    fn list_dir(&mut self, dir: PathBuf) {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.stats.dirs_skipped += 1;
                self.reporter.directory_skipped(&dir, &e.to_string());
                return;
            }
        };

        let mut files = Vec::new();
        let mut subdirs = Vec::new();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.reporter.directory_skipped(&dir, &e.to_string());
                    continue;
                }
            };

            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(e) => {
                    self.reporter.directory_skipped(&entry.path(), &e.to_string());
                    self.stats.special_skipped += 1;
                    continue;
                }
            };

            let path = entry.path();
            if file_type.is_dir() {
                subdirs.push(path);
            } else if file_type.is_file() {
                if self.excluded.contains(&path) {
                    self.stats.excluded += 1;
                } else {
                    files.push(path);
                }
            } else {
                self.stats.special_skipped += 1;
            }
        }

        files.sort();
        // Reverse so the stack pops subdirectories in name order
        subdirs.sort_by(|a, b| b.cmp(a));

        self.stats.dirs_scanned += 1;
        self.reporter.directory_scanned(&dir, files.len());

        self.pending.extend(files);
        self.stack.extend(subdirs);
    }
}

impl Iterator for WalkIter {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            if let Some(path) = self.pending.pop_front() {
                self.stats.files += 1;
                return Some(path);
            }

            let dir = self.stack.pop()?;
            self.list_dir(dir);
        }
    }
}
