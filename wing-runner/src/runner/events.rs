// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    grouper::FailureGroup,
    parser::TestSummary,
    test_result::{TestResult, TestStatus},
    test_run::{TestRunId, TestRunState},
};
use std::time::Duration;

/// The outcome of a completed test run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestExecutionResult {
    /// One result per test case, in document order.
    pub test_results: Vec<TestResult>,

    /// Failures grouped by where they surfaced, largest group first.
    pub failure_groups: Vec<FailureGroup>,

    /// How long the test command ran for.
    pub execution_time: Duration,

    /// Everything the test command printed: standard output followed by standard error.
    pub command_output: String,

    /// Totals as reported by the test suites.
    pub totals: TestSummary,
}

impl TestExecutionResult {
    /// Returns totals counted from the results themselves.
    pub fn summary(&self) -> ExecutionSummary {
        let mut summary = ExecutionSummary {
            total: self.test_results.len(),
            failure_groups: self.failure_groups.len(),
            ..Default::default()
        };
        for result in &self.test_results {
            match result.status {
                TestStatus::Pass => summary.passed += 1,
                TestStatus::Fail => summary.failed += 1,
                TestStatus::Skip => summary.skipped += 1,
            }
        }
        summary
    }

    /// Iterates over the failed results.
    pub fn failed_tests(&self) -> impl Iterator<Item = &TestResult> {
        self.test_results.iter().filter(|result| result.is_failed())
    }
}

/// Totals for a completed run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// The number of test cases.
    pub total: usize,

    /// The number of test cases that passed.
    pub passed: usize,

    /// The number of test cases that failed.
    pub failed: usize,

    /// The number of test cases that were skipped.
    pub skipped: usize,

    /// The number of failure groups.
    pub failure_groups: usize,
}

/// An event published by [`TestRunner::execute`](super::TestRunner::execute).
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum RunEvent {
    /// The test command is about to start.
    Started {
        /// The run being executed.
        run_id: TestRunId,

        /// The command line.
        command: String,
    },

    /// The run moved to an intermediate state.
    StateChanged {
        /// The run being executed.
        run_id: TestRunId,

        /// The new state.
        state: TestRunState,
    },

    /// The run completed and its result was recorded.
    Finished {
        /// The run that completed.
        run_id: TestRunId,

        /// Totals for the run.
        summary: ExecutionSummary,
    },

    /// The run failed and the error was recorded.
    Failed {
        /// The run that failed.
        run_id: TestRunId,

        /// The error, as recorded on the run.
        error: String,
    },
}
