// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The normalized record of a single test case.

use crate::{backtrace::Backtrace, paths::AbsPath, project_fs::ProjectFs, test_run::TestPattern};
use std::{fmt, time::Duration};

/// The outcome of a test case.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TestStatus {
    /// The test passed.
    Pass,

    /// The test failed or errored.
    Fail,

    /// The test was skipped.
    Skip,
}

impl TestStatus {
    /// Returns the string form of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Pass => "pass",
            TestStatus::Fail => "fail",
            TestStatus::Skip => "skip",
        }
    }

    /// Returns a one-letter abbreviation, suitable for compact listings.
    pub fn abbreviation(self) -> &'static str {
        match self {
            TestStatus::Pass => "P",
            TestStatus::Fail => "F",
            TestStatus::Skip => "S",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The likely cause of a test failure.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FailureCause {
    /// An assertion in the test did not hold.
    AssertionFailure,

    /// The error originated in test code.
    TestDefinitionError,

    /// The error originated in application code.
    ProductionCodeError,
}

impl FailureCause {
    /// Returns the string form of the cause.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureCause::AssertionFailure => "assertion_failure",
            FailureCause::TestDefinitionError => "test_definition_error",
            FailureCause::ProductionCodeError => "production_code_error",
        }
    }

    /// Returns a one-letter abbreviation, suitable for compact listings.
    pub fn abbreviation(self) -> &'static str {
        match self {
            FailureCause::AssertionFailure => "A",
            FailureCause::TestDefinitionError => "T",
            FailureCause::ProductionCodeError => "C",
        }
    }

    /// Returns a human-readable description of the cause.
    pub fn description(self) -> &'static str {
        match self {
            FailureCause::AssertionFailure => "Assertion Failure",
            FailureCause::TestDefinitionError => "Test Definition Error",
            FailureCause::ProductionCodeError => "Production Code Error",
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized record of one test case.
///
/// A passing test has no failure cause, empty failure details and empty backtraces. The filtered
/// backtrace is always a subsequence of the full one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestResult {
    /// Unique within a run, starting at 1 in document order.
    pub id: usize,

    /// The group (class, module or describe block) the test belongs to. May be empty.
    pub group_name: String,

    /// The name of the test case.
    pub test_case_name: String,

    /// The outcome.
    pub status: TestStatus,

    /// The likely cause of the failure. Only set for failed tests, after classification.
    pub failure_cause: Option<FailureCause>,

    /// The failure message.
    pub failure_details: String,

    /// Where the failure happened.
    pub failure_file_path: Option<AbsPath>,

    /// The line the failure happened on, or 0 if unknown.
    pub failure_line_number: u32,

    /// The file the test is defined in.
    pub test_file_path: Option<AbsPath>,

    /// The line the test is defined on, or 0 if unknown.
    pub test_line_number: u32,

    /// Every frame extracted from the failure output.
    pub full_backtrace: Backtrace,

    /// The frames of `full_backtrace` that lie within the project.
    pub filtered_backtrace: Backtrace,

    /// How long the test took.
    pub duration: Duration,
}

impl TestResult {
    /// Creates a new result with the given name and status and everything else empty.
    pub fn new(
        id: usize,
        group_name: impl Into<String>,
        test_case_name: impl Into<String>,
        status: TestStatus,
    ) -> Self {
        Self {
            id,
            group_name: group_name.into(),
            test_case_name: test_case_name.into(),
            status,
            failure_cause: None,
            failure_details: String::new(),
            failure_file_path: None,
            failure_line_number: 0,
            test_file_path: None,
            test_line_number: 0,
            full_backtrace: Backtrace::new(),
            filtered_backtrace: Backtrace::new(),
            duration: Duration::ZERO,
        }
    }

    /// Returns the display name: `group.test` if there is a group, otherwise just the test name.
    pub fn name(&self) -> String {
        if self.group_name.is_empty() {
            self.test_case_name.clone()
        } else {
            format!("{}.{}", self.group_name, self.test_case_name)
        }
    }

    /// Returns true if the test failed.
    pub fn is_failed(&self) -> bool {
        self.status == TestStatus::Fail
    }

    /// Returns the backtrace to use for grouping and classification: the filtered one, unless it
    /// is empty.
    pub fn effective_backtrace(&self) -> &Backtrace {
        if self.filtered_backtrace.is_empty() {
            &self.full_backtrace
        } else {
            &self.filtered_backtrace
        }
    }

    /// Returns a pattern that selects this test on re-run, if its file is known and lies within
    /// the project.
    pub fn rerun_pattern(&self, fs: &ProjectFs) -> Option<TestPattern> {
        let path = self.test_file_path.as_ref()?;
        let rel = fs.rel(path).ok()?;
        let line = (self.test_line_number > 0).then_some(self.test_line_number);
        Some(TestPattern::from_location(&rel, line))
    }
}
