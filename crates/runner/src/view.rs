// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rule-aware filtered projection of the source tree
//!
//! `read_dir` exposes only entries that can satisfy at least one rule: a
//! file some rule matches directly, or a directory whose subtree (within
//! the depth budget) contains one. Non-enumeration methods delegate to
//! the rooted handle unfiltered.

use kiln_config::Rule;
use kiln_core::{RootError, RootedDir};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory descent budget for the subtree probe. Deeper content is
/// reported as "no allowed content".
pub const MAX_FILTER_DEPTH: usize = 10;

#[derive(Debug)]
pub struct FilteredView {
    root: RootedDir,
    rules: Vec<Rule>,
    max_depth: usize,
}

impl FilteredView {
    pub fn new(root: RootedDir, rules: Vec<Rule>) -> Self {
        Self {
            root,
            rules,
            max_depth: MAX_FILTER_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn root(&self) -> &RootedDir {
        &self.root
    }

    /// List a directory, keeping only entries justified by the rules.
    pub fn read_dir(&self, path: impl AsRef<Path>) -> Result<Vec<fs::DirEntry>, RootError> {
        let dir_abs = self.root.resolve(path.as_ref())?;
        let entries = self.root.read_dir(path.as_ref())?;
        Ok(entries
            .into_iter()
            .filter(|entry| {
                let Ok(file_type) = entry.file_type() else {
                    return false;
                };
                if file_type.is_dir() {
                    self.dir_allowed(&entry.path(), self.max_depth)
                } else if file_type.is_file() {
                    self.file_allowed(&dir_abs, &entry.path())
                } else {
                    false
                }
            })
            .collect())
    }

    pub fn stat(&self, path: impl AsRef<Path>) -> Result<fs::Metadata, RootError> {
        self.root.stat(path)
    }

    pub fn open(&self, path: impl AsRef<Path>) -> Result<fs::File, RootError> {
        self.root.open(path)
    }

    pub fn read_to_string(&self, path: impl AsRef<Path>) -> Result<String, RootError> {
        self.root.read_to_string(path)
    }

    fn file_allowed(&self, dir: &Path, file: &Path) -> bool {
        let dir = dir.to_string_lossy();
        let files = vec![file.to_string_lossy().into_owned()];
        self.rules.iter().any(|rule| rule.match_files(&dir, &files))
    }

    /// A directory is allowed when its direct file listing satisfies a
    /// rule, one of its files does individually, or a subdirectory is
    /// allowed within the remaining budget. Unreadable directories and an
    /// exhausted budget count as "no allowed content".
    fn dir_allowed(&self, dir: &Path, budget: usize) -> bool {
        if budget == 0 {
            return false;
        }
        let Ok(entries) = fs::read_dir(dir) else {
            return false;
        };
        let mut files: Vec<PathBuf> = Vec::new();
        let mut subdirs: Vec<PathBuf> = Vec::new();
        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                subdirs.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();

        if !files.is_empty() {
            let dir_str = dir.to_string_lossy();
            let file_strs: Vec<String> = files
                .iter()
                .map(|f| f.to_string_lossy().into_owned())
                .collect();
            if self
                .rules
                .iter()
                .any(|rule| rule.match_files(&dir_str, &file_strs))
            {
                return true;
            }
            if files.iter().any(|file| self.file_allowed(dir, file)) {
                return true;
            }
        }

        subdirs.sort();
        subdirs.iter().any(|sub| self.dir_allowed(sub, budget - 1))
    }
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;
