// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns JUnit XML into [`TestResult`]s.

use crate::{
    backtrace::{Backtrace, StackFrame},
    errors::ParseError,
    paths::AbsPath,
    project_fs::ProjectFs,
    test_result::{TestResult, TestStatus},
};
use tracing::debug;
use wing_junit::{Report, Testcase, TestcaseStatus};

/// The maximum number of frames kept per backtrace.
pub const MAX_BACKTRACE_FRAMES: usize = 50;

/// Lines whose trimmed form starts with one of these are headings, never frames.
static SKIPPED_LINE_PREFIXES: &[&str] = &["Error:", "Failure:"];

/// A frame line must contain one of these.
static SOURCE_FILE_MARKERS: &[&str] = &[".rb:", ".py:", ".js:"];

/// The indentation that marks a line as part of a stack trace.
static FRAME_INDENT: &str = "    ";

/// Message used when a testcase's `status` attribute is not recognized.
pub static UNKNOWN_STATUS_MESSAGE: &str = "Unknown test status";

/// Run totals as reported by the test suites.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TestSummary {
    /// The number of tests.
    pub total: usize,

    /// The number of tests that passed.
    pub passed: usize,

    /// The number of tests that failed or errored.
    pub failed: usize,

    /// The number of tests that were skipped.
    pub skipped: usize,
}

impl TestSummary {
    fn from_report(report: &Report) -> Self {
        let failed = report.failures + report.errors;
        let skipped = report.skipped;
        // Suites can report inconsistent counts. Keep total = passed + failed + skipped.
        let total = report.tests.max(failed + skipped);
        Self {
            total,
            passed: total - failed - skipped,
            failed,
            skipped,
        }
    }
}

/// The output of [`ResultsParser::parse`].
#[derive(Clone, Debug)]
pub struct ParsedResults {
    /// One result per `<testcase>`, in document order.
    pub results: Vec<TestResult>,

    /// Totals from the suites.
    pub summary: TestSummary,
}

/// Reads JUnit XML into [`TestResult`]s, resolving paths against a project.
#[derive(Clone, Copy, Debug)]
pub struct ResultsParser<'fs> {
    fs: &'fs ProjectFs,
}

impl<'fs> ResultsParser<'fs> {
    /// Creates a new parser.
    pub fn new(fs: &'fs ProjectFs) -> Self {
        Self { fs }
    }

    /// Parses a JUnit document.
    ///
    /// Output printed around the document is ignored. Fails if the input is not a JUnit document
    /// or contains no test cases.
    pub fn parse(&self, input: &[u8]) -> Result<ParsedResults, ParseError> {
        let input = String::from_utf8_lossy(input);
        let report = Report::deserialize_from_str(&input)?;

        let results: Vec<_> = report
            .testcases()
            .enumerate()
            .map(|(index, testcase)| self.parse_testcase(index + 1, testcase))
            .collect();
        if results.is_empty() {
            return Err(ParseError::NoTestCases);
        }

        debug!(
            testcases = results.len(),
            testsuites = report.testsuites.len(),
            "parsed JUnit report"
        );

        Ok(ParsedResults {
            results,
            summary: TestSummary::from_report(&report),
        })
    }

    fn parse_testcase(&self, id: usize, testcase: &Testcase) -> TestResult {
        let group_name = match &testcase.classname {
            Some(classname) if *classname != testcase.name => classname.clone(),
            _ => String::new(),
        };
        let (status, unknown_status) = status_of(testcase);
        let mut result = TestResult::new(id, group_name, testcase.name.clone(), status);
        result.duration = testcase.time.unwrap_or_default();

        if let Some(file) = testcase.extra_attribute("file") {
            result.test_file_path = AbsPath::resolve(self.fs.root(), file).ok();
        }
        result.test_line_number = testcase
            .extra_attribute("line")
            .or_else(|| testcase.extra_attribute("lineno"))
            .and_then(|line| line.trim().parse().ok())
            .unwrap_or(0);

        if status != TestStatus::Fail {
            return result;
        }

        result.failure_details = if unknown_status {
            UNKNOWN_STATUS_MESSAGE.to_owned()
        } else {
            testcase.status.message().unwrap_or_default().to_owned()
        };

        let mut backtrace = Backtrace::new();
        let bodies = [
            testcase.status.description(),
            testcase.system_err.as_ref().map(|output| output.as_str()),
        ];
        for body in bodies.into_iter().flatten() {
            for line in extract_backtrace_lines(body) {
                let frame = StackFrame::parse(line, self.fs);
                if frame.file_path.is_some() {
                    backtrace.push(frame);
                }
            }
        }
        backtrace.truncate(MAX_BACKTRACE_FRAMES);

        let failure_frame = backtrace
            .iter()
            .find(|frame| {
                frame
                    .file_path
                    .as_ref()
                    .is_some_and(|path| self.fs.is_project_file(path))
            })
            .or_else(|| backtrace.first());
        if let Some(frame) = failure_frame {
            result.failure_file_path = frame.file_path.clone();
            result.failure_line_number = frame.line;
        }

        result.full_backtrace = backtrace;
        result
    }
}

/// Returns the status of a testcase, and whether it came from an unrecognized `status`
/// attribute.
fn status_of(testcase: &Testcase) -> (TestStatus, bool) {
    if let Some(status) = testcase.extra_attribute("status") {
        return match status.trim().to_ascii_lowercase().as_str() {
            "passed" | "pass" | "success" => (TestStatus::Pass, false),
            "skipped" | "skip" | "pending" => (TestStatus::Skip, false),
            "failed" | "fail" | "failure" | "error" => (TestStatus::Fail, false),
            _ => (TestStatus::Fail, true),
        };
    }

    let status = match testcase.status {
        TestcaseStatus::Success => TestStatus::Pass,
        TestcaseStatus::NonSuccess { .. } => TestStatus::Fail,
        TestcaseStatus::Skipped { .. } => TestStatus::Skip,
    };
    (status, false)
}

/// Picks out the stack frame lines of a failure body.
///
/// A frame line is indented by at least four spaces and names a Ruby, Python or JavaScript
/// source file followed by a colon. Returned lines are trimmed.
pub fn extract_backtrace_lines(text: &str) -> Vec<&str> {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty()
                && !SKIPPED_LINE_PREFIXES
                    .iter()
                    .any(|prefix| trimmed.starts_with(prefix))
                && line.starts_with(FRAME_INDENT)
                && SOURCE_FILE_MARKERS.iter().any(|marker| line.contains(marker))
        })
        .map(str::trim)
        .collect()
}
