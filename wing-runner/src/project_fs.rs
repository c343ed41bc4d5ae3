// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The project under test: its root directory and which of its files are tests.
//!
//! A process-wide instance is set up once at startup with [`ProjectFs::init`] and read with
//! [`ProjectFs::get`]. Pipeline components take a `&ProjectFs` explicitly, so they can also be
//! driven by locally constructed instances.

use crate::{
    errors::{PathOutsideRootError, ProjectFsError},
    paths::{AbsPath, RelPath},
};
use camino::Utf8PathBuf;
use globset::{GlobBuilder, GlobMatcher};
use std::sync::OnceLock;
use tracing::debug;
use walkdir::WalkDir;

static PROJECT_FS: OnceLock<ProjectFs> = OnceLock::new();

/// Directory names never descended into while discovering test files.
static SKIPPED_DIRS: &[&str] = &[".git"];

/// The project root together with the optional test-file pattern.
#[derive(Clone, Debug)]
pub struct ProjectFs {
    root: AbsPath,
    test_file_glob: Option<TestFileGlob>,
}

#[derive(Clone, Debug)]
struct TestFileGlob {
    pattern: String,
    matcher: GlobMatcher,
}

impl ProjectFs {
    /// Creates a new `ProjectFs`.
    ///
    /// An empty `test_file_glob` is treated the same as `None`. In the glob, `*` does not match
    /// across directory separators while `**` does.
    pub fn new(root: AbsPath, test_file_glob: Option<&str>) -> Result<Self, ProjectFsError> {
        let test_file_glob = match test_file_glob {
            Some(pattern) if !pattern.is_empty() => {
                let glob = GlobBuilder::new(pattern)
                    .literal_separator(true)
                    .build()
                    .map_err(|error| ProjectFsError::InvalidTestFileGlob {
                        pattern: pattern.to_owned(),
                        error,
                    })?;
                Some(TestFileGlob {
                    pattern: pattern.to_owned(),
                    matcher: glob.compile_matcher(),
                })
            }
            _ => None,
        };

        Ok(Self {
            root,
            test_file_glob,
        })
    }

    /// Installs `fs` as the process-wide project filesystem.
    ///
    /// Returns an error if one was already installed.
    pub fn init(fs: ProjectFs) -> Result<&'static ProjectFs, ProjectFsError> {
        let root = fs.root.as_path().to_owned();
        PROJECT_FS
            .set(fs)
            .map_err(|_| ProjectFsError::AlreadyInitialized { root })?;
        Ok(Self::get())
    }

    /// Returns the process-wide project filesystem.
    ///
    /// # Panics
    ///
    /// Panics if [`ProjectFs::init`] has not been called.
    pub fn get() -> &'static ProjectFs {
        PROJECT_FS
            .get()
            .expect("ProjectFs::init must be called before ProjectFs::get")
    }

    /// Returns the process-wide project filesystem, or `None` if it has not been initialized.
    pub fn try_get() -> Option<&'static ProjectFs> {
        PROJECT_FS.get()
    }

    /// Returns the project root.
    pub fn root(&self) -> &AbsPath {
        &self.root
    }

    /// Returns the test file pattern, if one was configured.
    pub fn test_file_glob(&self) -> Option<&str> {
        self.test_file_glob
            .as_ref()
            .map(|glob| glob.pattern.as_str())
    }

    /// Resolves a project-relative path to an absolute one.
    pub fn abs(&self, rel: &RelPath) -> AbsPath {
        self.root.join(rel)
    }

    /// Returns the path of `abs` relative to the project root.
    ///
    /// The root itself is returned as `.`.
    pub fn rel(&self, abs: &AbsPath) -> Result<RelPath, PathOutsideRootError> {
        // Both paths are cleaned, so a component-wise prefix check is enough: `/tmp/projector`
        // does not lie under `/tmp/project`.
        let stripped = abs
            .as_path()
            .strip_prefix(self.root.as_path())
            .map_err(|_| PathOutsideRootError::new(abs.as_path(), self.root.as_path()))?;
        let stripped = if stripped.as_str().is_empty() {
            "."
        } else {
            stripped.as_str()
        };
        RelPath::new(stripped)
            .map_err(|_| PathOutsideRootError::new(abs.as_path(), self.root.as_path()))
    }

    /// Returns true if `abs` is the project root or lies beneath it.
    pub fn is_project_file(&self, abs: &AbsPath) -> bool {
        self.rel(abs).is_ok()
    }

    /// Returns true if `abs` is a project file that matches the test file pattern.
    ///
    /// Always false if no pattern was configured.
    pub fn is_test_file(&self, abs: &AbsPath) -> bool {
        let Some(glob) = &self.test_file_glob else {
            return false;
        };
        match self.rel(abs) {
            Ok(rel) => glob.matcher.is_match(rel.as_str()),
            Err(_) => false,
        }
    }

    /// Walks the project and returns every test file, relative to the root, in sorted order.
    ///
    /// Returns an empty list if no test file pattern was configured.
    pub fn test_files(&self) -> Result<Vec<RelPath>, ProjectFsError> {
        let Some(glob) = &self.test_file_glob else {
            return Ok(Vec::new());
        };

        let mut test_files = Vec::new();
        let walker = WalkDir::new(self.root.as_path()).into_iter().filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| SKIPPED_DIRS.contains(&name)))
        });

        for entry in walker {
            let entry = entry.map_err(|error| ProjectFsError::Walk {
                root: self.root.as_path().to_owned(),
                error,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(path) = Utf8PathBuf::try_from(entry.into_path()) else {
                debug!("skipping non-UTF-8 path while discovering test files");
                continue;
            };
            let Ok(abs) = AbsPath::new(path.as_str()) else {
                continue;
            };
            if let Ok(rel) = self.rel(&abs)
                && glob.matcher.is_match(rel.as_str())
            {
                test_files.push(rel);
            }
        }

        test_files.sort();
        Ok(test_files)
    }
}
