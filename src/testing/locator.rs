//! Test file discovery
//!
//! Tests for a state live next to it in the local fileserver cache:
//!
//! ```text
//! <root>/apache/
//!               init.sls
//!               config.sls
//!               saltcheck-tests/
//!                               pkg_and_mods.tst
//!                               config.tst
//! ```
//!
//! Before the test directory is read it is replaced with a fresh copy from
//! the master, so edits made since the last cache sync are picked up.

use std::fs;
use std::path::{Path, PathBuf};

use crate::common::paths::state_to_path;
use crate::common::Result;
use crate::host::CacheSync;

/// A discovered test file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFile {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Path relative to the state's directory, e.g. `saltcheck-tests/config.tst`
    pub relative: PathBuf,
}

pub struct TestFileLocator<'a, S: CacheSync + ?Sized> {
    sync: &'a S,
    roots: Vec<PathBuf>,
    dir_name: String,
    extension: String,
}

impl<'a, S: CacheSync + ?Sized> TestFileLocator<'a, S> {
    pub fn new(sync: &'a S, roots: Vec<PathBuf>, dir_name: &str, extension: &str) -> Self {
        Self {
            sync,
            roots,
            dir_name: dir_name.to_string(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Absolute paths of every test file for `state`
    pub fn locate(&self, state: &str) -> Result<Vec<PathBuf>> {
        Ok(self.locate_files(state)?.into_iter().map(|f| f.path).collect())
    }

    /// Test files for `state` across all roots, in root then traversal order
    pub fn locate_files(&self, state: &str) -> Result<Vec<TestFile>> {
        let relative = state_to_path(state);
        let mut files = Vec::new();

        for root in &self.roots {
            let state_dir = std::path::absolute(root.join(&relative))?;
            if !state_dir.is_dir() {
                tracing::debug!(path = %state_dir.display(), "path is not a directory");
                continue;
            }
            tracing::debug!(path = %state_dir.display(), "searching path");

            // Only the state's own directory is inspected; nested states
            // have their own test directories.
            let test_dir = state_dir.join(&self.dir_name);
            if !test_dir.is_dir() {
                tracing::debug!(path = %state_dir.display(), "no test directory");
                continue;
            }

            let source = format!("salt://{}/{}", state.replace('.', "/"), self.dir_name);
            self.sync.refresh_cache(&source, &test_dir)?;

            if !test_dir.is_dir() {
                continue;
            }
            let mut found = Vec::new();
            self.collect(&test_dir, &mut found)?;
            tracing::debug!(state, count = found.len(), dir = %test_dir.display(), "found test files");

            files.extend(found.into_iter().map(|path| {
                let relative = path
                    .strip_prefix(&state_dir)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| path.clone());
                TestFile { path, relative }
            }));
        }
        Ok(files)
    }

    /// Walk `dir` top-down: its own files first, then each subdirectory
    fn collect(&self, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        let suffix = format!(".{}", self.extension);
        let mut subdirs = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                subdirs.push(path);
            } else if entry.file_name().to_string_lossy().ends_with(&suffix) {
                out.push(path);
            }
        }

        for subdir in subdirs {
            self.collect(&subdir, out)?;
        }
        Ok(())
    }
}
