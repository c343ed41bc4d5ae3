// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assigns a [`FailureCause`] to failed tests.
//!
//! Classification looks at two things, in order:
//!
//! 1. The failure message. Assertion libraries word their messages in a recognizable way
//!    ("expected ... to eq ..."), so those become [`FailureCause::AssertionFailure`].
//! 2. The bottom frame of the backtrace, where the error surfaced. If it lies in test code, the
//!    test itself is broken ([`FailureCause::TestDefinitionError`]); otherwise the error came
//!    from application code ([`FailureCause::ProductionCodeError`]).

use crate::{
    paths::AbsPath,
    project_fs::ProjectFs,
    test_result::{FailureCause, TestResult},
};
use camino::Utf8Component;

/// Lowercased substrings that mark a failure message as coming from an assertion.
static ASSERTION_KEYWORDS: &[&str] = &["expected", "to equal", "to eq", "to be", "assert"];

/// Directory names that hold test code.
static TEST_DIRS: &[&str] = &["test", "tests", "spec", "specs"];

/// File stem suffixes of test files.
static TEST_FILE_SUFFIXES: &[&str] = &["_test", "_spec"];

/// Assigns failure causes.
#[derive(Clone, Copy, Debug)]
pub struct FailureClassifier<'fs> {
    fs: &'fs ProjectFs,
}

impl<'fs> FailureClassifier<'fs> {
    /// Creates a new classifier.
    pub fn new(fs: &'fs ProjectFs) -> Self {
        Self { fs }
    }

    /// Returns the cause of a failure.
    ///
    /// Meaningful only for failed tests.
    pub fn classify(&self, result: &TestResult) -> FailureCause {
        let message = result.failure_details.to_lowercase();
        if ASSERTION_KEYWORDS
            .iter()
            .any(|keyword| message.contains(keyword))
        {
            return FailureCause::AssertionFailure;
        }

        match result
            .effective_backtrace()
            .last()
            .and_then(|frame| frame.file_path.as_ref())
        {
            Some(path) if !self.is_test_code(path) => FailureCause::ProductionCodeError,
            _ => FailureCause::TestDefinitionError,
        }
    }

    /// Sets `failure_cause` on every failed result. Other results are left alone.
    pub fn classify_all(&self, results: &mut [TestResult]) {
        for result in results.iter_mut().filter(|result| result.is_failed()) {
            result.failure_cause = Some(self.classify(result));
        }
    }

    fn is_test_code(&self, path: &AbsPath) -> bool {
        if self.fs.is_test_file(path) {
            return true;
        }

        let stem_is_test = path
            .as_path()
            .file_stem()
            .is_some_and(|stem| TEST_FILE_SUFFIXES.iter().any(|suffix| stem.ends_with(suffix)));
        if stem_is_test {
            return true;
        }

        // Only look at directories inside the project, so that a project checked out under
        // e.g. `/home/me/tests/` isn't all considered test code.
        match self.fs.rel(path) {
            Ok(rel) => has_test_dir(rel.as_path().components()),
            Err(_) => has_test_dir(path.as_path().components()),
        }
    }
}

fn has_test_dir<'a>(mut components: impl Iterator<Item = Utf8Component<'a>>) -> bool {
    components.any(|component| match component {
        Utf8Component::Normal(name) => TEST_DIRS.contains(&name),
        _ => false,
    })
}
