// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Marks stack frames whose lines were recently changed in version control.
//!
//! Three depths are examined, from most to least recent:
//!
//! | Reason                              | Diff                               | Intensity |
//! |-------------------------------------|------------------------------------|-----------|
//! | [`ChangeReason::Uncommitted`]       | working tree against `HEAD`        | 3         |
//! | [`ChangeReason::LastCommit`]        | `HEAD~1` against the working tree  | 2         |
//! | [`ChangeReason::PreviousCommit`]    | `HEAD~2` against `HEAD~1`          | 1         |
//!
//! When a line appears at several depths, the most recent one wins. Diffs that cannot be
//! obtained (no repository, not enough history, missing `git`) contribute nothing.

use crate::{
    backtrace::{Backtrace, ChangeReason},
    errors::DiffUnavailableError,
    paths::AbsPath,
    test_result::TestResult,
};
use regex::Regex;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt, io,
    sync::LazyLock,
};
use tracing::{debug, trace};

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("hunk header regex is valid")
});

/// A source of unified diffs.
pub trait DiffSource: fmt::Debug {
    /// Returns the zero-context unified diff of `file` at the given depth.
    fn diff(&self, file: &AbsPath, depth: ChangeReason) -> Result<String, DiffUnavailableError>;
}

impl<T: DiffSource + ?Sized> DiffSource for &T {
    fn diff(&self, file: &AbsPath, depth: ChangeReason) -> Result<String, DiffUnavailableError> {
        (**self).diff(file, depth)
    }
}

impl<T: DiffSource + ?Sized> DiffSource for Box<T> {
    fn diff(&self, file: &AbsPath, depth: ChangeReason) -> Result<String, DiffUnavailableError> {
        (**self).diff(file, depth)
    }
}

/// Obtains diffs by running `git diff` in the project root.
#[derive(Clone, Debug)]
pub struct GitDiffSource {
    root: AbsPath,
}

impl GitDiffSource {
    /// Creates a new `GitDiffSource` for the repository at `root`.
    pub fn new(root: AbsPath) -> Self {
        Self { root }
    }

    fn args(file: &AbsPath, depth: ChangeReason) -> Vec<&str> {
        let mut args = vec!["diff"];
        match depth {
            ChangeReason::Uncommitted => {}
            ChangeReason::LastCommit => args.push("HEAD~1"),
            ChangeReason::PreviousCommit => args.extend(["HEAD~2", "HEAD~1"]),
        }
        args.extend(["--unified=0", "--", file.as_str()]);
        args
    }
}

impl DiffSource for GitDiffSource {
    fn diff(&self, file: &AbsPath, depth: ChangeReason) -> Result<String, DiffUnavailableError> {
        let expression =
            duct::cmd("git", Self::args(file, depth)).dir(self.root.as_path().as_std_path());
        trace!("executing command: {:?}", expression);
        let output = expression
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|error| DiffUnavailableError::new(file.as_path(), depth, error))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DiffUnavailableError::new(
                file.as_path(),
                depth,
                io::Error::other(format!("{}: {}", output.status, stderr.trim())),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Returns the new-side line numbers touched by the hunks of a zero-context unified diff.
///
/// For a hunk header `@@ -A,B +C,D @@`, lines `C` through `C + max(D, 1) - 1` are returned. An
/// omitted count means 1. Anything that is not a hunk header is ignored.
pub fn parse_diff_hunks(diff: &str) -> BTreeSet<u32> {
    let mut lines = BTreeSet::new();
    for line in diff.lines() {
        let Some(captures) = HUNK_HEADER.captures(line) else {
            continue;
        };
        let Some(start) = captures.get(3).and_then(|m| m.as_str().parse::<u32>().ok()) else {
            continue;
        };
        let count = captures
            .get(4)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(1)
            .max(1);
        lines.extend((0..count).map_while(|offset| start.checked_add(offset)));
    }
    lines
}

/// The changed lines of a set of files, by depth.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeMap {
    changes: BTreeMap<AbsPath, BTreeMap<ChangeReason, BTreeSet<u32>>>,
}

impl ChangeMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `lines` of `file` changed at the given depth.
    pub fn insert(&mut self, file: AbsPath, depth: ChangeReason, lines: BTreeSet<u32>) {
        if lines.is_empty() {
            return;
        }
        self.changes
            .entry(file)
            .or_default()
            .entry(depth)
            .or_default()
            .extend(lines);
    }

    /// Returns the most recent reason `line` of `file` changed, if it did.
    pub fn reason_for(&self, file: &AbsPath, line: u32) -> Option<ChangeReason> {
        let by_depth = self.changes.get(file)?;
        ChangeReason::ALL
            .into_iter()
            .find(|depth| by_depth.get(depth).is_some_and(|lines| lines.contains(&line)))
    }

    /// Returns the number of files with at least one changed line.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns true if no changes were recorded.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Annotates failures with change information from a [`DiffSource`].
#[derive(Clone, Debug)]
pub struct ChangeDetector<D> {
    source: D,
}

impl<D: DiffSource> ChangeDetector<D> {
    /// Creates a new detector.
    pub fn new(source: D) -> Self {
        Self { source }
    }

    /// Collects the changed lines of `files` at every depth.
    pub fn detect<'a>(&self, files: impl IntoIterator<Item = &'a AbsPath>) -> ChangeMap {
        let mut map = ChangeMap::new();
        for file in files {
            for depth in ChangeReason::ALL {
                match self.source.diff(file, depth) {
                    Ok(diff) => map.insert(file.clone(), depth, parse_diff_hunks(&diff)),
                    Err(error) => debug!("no changes recorded: {error}"),
                }
            }
        }
        map
    }

    /// Sets the change reason on every frame of every failed result.
    ///
    /// Only files that appear in the filtered backtraces of failures are diffed. Frames outside
    /// the project never are, and keep no change reason.
    pub fn annotate(&self, results: &mut [TestResult]) {
        let files: BTreeSet<&AbsPath> = results
            .iter()
            .filter(|result| result.is_failed())
            .flat_map(|result| result.filtered_backtrace.iter())
            .filter_map(|frame| frame.file_path.as_ref())
            .collect();
        if files.is_empty() {
            return;
        }
        let map = self.detect(files);
        debug!(changed_files = map.len(), "detected recent changes");
        assign_intensities(results, &map);
    }
}

/// Sets the change reason on the frames of failed results from a precomputed map.
///
/// Frames without a path or with an unknown line are left unchanged.
pub fn assign_intensities(results: &mut [TestResult], map: &ChangeMap) {
    for result in results.iter_mut().filter(|result| result.is_failed()) {
        assign_backtrace(&mut result.full_backtrace, map);
        assign_backtrace(&mut result.filtered_backtrace, map);
    }
}

fn assign_backtrace(backtrace: &mut Backtrace, map: &ChangeMap) {
    for frame in backtrace.frames_mut() {
        let Some(path) = &frame.file_path else {
            continue;
        };
        if frame.line == 0 {
            continue;
        }
        if let Some(reason) = map.reason_for(path, frame.line) {
            frame.change = Some(reason);
        }
    }
}
