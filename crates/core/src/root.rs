// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Root-confined filesystem access
//!
//! All path traversal in the core goes through a [`RootedDir`], which
//! resolves relative paths against a canonicalized root and refuses any
//! path whose cleaned form lands outside it.

use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RootError {
    #[error("path escapes the root directory: {}", path.display())]
    Escape { path: PathBuf },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A directory handle that confines all access to its subtree.
#[derive(Debug, Clone)]
pub struct RootedDir {
    root: PathBuf,
}

impl RootedDir {
    /// Open a root. The directory must exist; the stored root is
    /// canonicalized so prefix checks are symlink-stable.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self {
            root: fs::canonicalize(root)?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a path (relative to the root, or absolute) to an absolute
    /// path inside the root. `..` components are cleaned lexically; a
    /// result outside the root subtree is an error.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, RootError> {
        let path = path.as_ref();
        let candidate = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let mut clean = PathBuf::new();
        for component in candidate.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    clean.pop();
                }
                other => clean.push(other),
            }
        }
        if clean.starts_with(&self.root) {
            Ok(clean)
        } else {
            Err(RootError::Escape {
                path: path.to_path_buf(),
            })
        }
    }

    pub fn stat(&self, path: impl AsRef<Path>) -> Result<fs::Metadata, RootError> {
        Ok(fs::metadata(self.resolve(path)?)?)
    }

    pub fn open(&self, path: impl AsRef<Path>) -> Result<fs::File, RootError> {
        Ok(fs::File::open(self.resolve(path)?)?)
    }

    pub fn read_to_string(&self, path: impl AsRef<Path>) -> Result<String, RootError> {
        Ok(fs::read_to_string(self.resolve(path)?)?)
    }

    /// List a directory's entries, sorted by file name.
    pub fn read_dir(&self, path: impl AsRef<Path>) -> Result<Vec<fs::DirEntry>, RootError> {
        let abs = self.resolve(path)?;
        let mut entries: Vec<fs::DirEntry> =
            fs::read_dir(abs)?.collect::<Result<_, std::io::Error>>()?;
        entries.sort_by_key(|e| e.file_name());
        Ok(entries)
    }

    /// Collect all regular files under a directory, recursively, as
    /// absolute paths in sorted order. Directories that fail to read are
    /// skipped.
    pub fn walk_files(&self, path: impl AsRef<Path>) -> Result<Vec<PathBuf>, RootError> {
        let start = self.resolve(path)?;
        let mut files = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::debug!(dir = %dir.display(), error = %err, "skipping unreadable directory");
                    continue;
                }
            };
            for entry in entries.flatten() {
                let Ok(file_type) = entry.file_type() else {
                    continue;
                };
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    files.push(entry.path());
                }
            }
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
#[path = "root_tests.rs"]
mod tests;
