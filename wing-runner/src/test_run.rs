// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test run requests and their history.

use crate::{
    errors::{HistoryNotFoundError, TestRunModeParseError},
    paths::RelPath,
    runner::TestExecutionResult,
};
use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};

/// Identifies a test run. Assigned by [`TestRunHistory`], starting at 1.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestRunId(u64);

impl TestRunId {
    /// Returns the id as an integer.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TestRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Selects a subset of tests, such as `test/worker_test.rb:21`.
///
/// Patterns are passed through to the test command as-is. Ordering follows the string form.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestPattern(String);

impl TestPattern {
    /// Creates a new pattern from its string form.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// Creates a pattern selecting a file, or a single line in it.
    pub fn from_location(path: &RelPath, line: Option<u32>) -> Self {
        match line {
            Some(line) => Self(format!("{path}:{line}")),
            None => Self(path.to_string()),
        }
    }

    /// Returns the path portion of the pattern.
    pub fn path(&self) -> &str {
        self.split().0
    }

    /// Returns the line number, if the pattern ends in `:N`.
    pub fn line(&self) -> Option<u32> {
        self.split().1
    }

    /// Returns the pattern as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn split(&self) -> (&str, Option<u32>) {
        match self.0.rsplit_once(':') {
            Some((path, line)) if !path.is_empty() => match line.parse() {
                Ok(line) => (path, Some(line)),
                Err(_) => (self.0.as_str(), None),
            },
            _ => (self.0.as_str(), None),
        }
    }
}

impl fmt::Display for TestPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TestPattern {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// What a test run was requested for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TestRunMode {
    /// Run every test.
    RunWholeSuite,

    /// Run the tests selected by the run's patterns.
    RunSelectedPatterns,

    /// Re-run one failing test.
    RerunSingleFailure,

    /// Re-run every failing test from a previous run.
    RerunAllFailures,
}

impl TestRunMode {
    /// Returns the string form of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            TestRunMode::RunWholeSuite => "run_whole_suite",
            TestRunMode::RunSelectedPatterns => "run_selected_patterns",
            TestRunMode::RerunSingleFailure => "rerun_single_failure",
            TestRunMode::RerunAllFailures => "rerun_all_failures",
        }
    }
}

impl fmt::Display for TestRunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestRunMode {
    type Err = TestRunModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = match s {
            "run_whole_suite" => TestRunMode::RunWholeSuite,
            "run_selected_patterns" => TestRunMode::RunSelectedPatterns,
            "rerun_single_failure" => TestRunMode::RerunSingleFailure,
            "rerun_all_failures" => TestRunMode::RerunAllFailures,
            other => return Err(TestRunModeParseError::new(other)),
        };
        Ok(mode)
    }
}

/// Where a test run is in its lifecycle.
///
/// ```text
/// created -> running -> parsed -> annotated -> complete
///    |          |          |
///    +----------+----------+----> failed
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TestRunState {
    /// The run was requested but has not started.
    Created,

    /// The test command is running.
    Running,

    /// The test command exited and its results were parsed.
    Parsed,

    /// Results were normalized, classified and annotated with change information.
    Annotated,

    /// The run finished and its result is available.
    Complete,

    /// The run could not be completed. See [`TestRun::error`].
    Failed,
}

impl TestRunState {
    /// Returns true if the run will not change further.
    pub fn is_terminal(self) -> bool {
        matches!(self, TestRunState::Complete | TestRunState::Failed)
    }
}

impl fmt::Display for TestRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestRunState::Created => "created",
            TestRunState::Running => "running",
            TestRunState::Parsed => "parsed",
            TestRunState::Annotated => "annotated",
            TestRunState::Complete => "complete",
            TestRunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A request to run tests, along with its outcome once known.
#[derive(Clone, Debug)]
pub struct TestRun {
    id: TestRunId,
    patterns: Vec<TestPattern>,
    mode: TestRunMode,
    state: TestRunState,
    command: Option<String>,
    result: Option<Arc<TestExecutionResult>>,
    error: Option<String>,
}

impl TestRun {
    /// Returns the run's id.
    pub fn id(&self) -> TestRunId {
        self.id
    }

    /// Returns the patterns selecting which tests to run. Empty means the whole suite.
    pub fn patterns(&self) -> &[TestPattern] {
        &self.patterns
    }

    /// Returns what the run was requested for.
    pub fn mode(&self) -> TestRunMode {
        self.mode
    }

    /// Returns the run's lifecycle state.
    pub fn state(&self) -> TestRunState {
        self.state
    }

    /// Returns the command line the run executed, once it has started.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Returns the outcome, if the run completed.
    pub fn result(&self) -> Option<&Arc<TestExecutionResult>> {
        self.result.as_ref()
    }

    /// Returns why the run failed, if it did.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Every test run requested in this session, keyed by id.
///
/// The history has a single writer, the runner. Readers receive shared references or clones.
#[derive(Clone, Debug, Default)]
pub struct TestRunHistory {
    runs: BTreeMap<TestRunId, TestRun>,
    last_id: u64,
}

impl TestRunHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new run request and returns it.
    pub fn add(&mut self, patterns: Vec<TestPattern>, mode: TestRunMode) -> &TestRun {
        self.last_id += 1;
        let id = TestRunId(self.last_id);
        let run = TestRun {
            id,
            patterns,
            mode,
            state: TestRunState::Created,
            command: None,
            result: None,
            error: None,
        };
        self.runs.entry(id).or_insert(run)
    }

    /// Looks up a run by id.
    pub fn get(&self, id: TestRunId) -> Result<&TestRun, HistoryNotFoundError> {
        self.runs.get(&id).ok_or(HistoryNotFoundError::new(id))
    }

    /// Returns the run with the largest id.
    pub fn most_recent(&self) -> Option<&TestRun> {
        self.runs.values().next_back()
    }

    /// Returns every run, most recent first.
    pub fn all_recent_first(&self) -> impl Iterator<Item = &TestRun> {
        self.runs.values().rev()
    }

    /// Returns the number of runs.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Returns true if no runs have been requested.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Attaches the outcome of a run and marks it complete.
    pub fn update_result(
        &mut self,
        id: TestRunId,
        result: TestExecutionResult,
    ) -> Result<&TestRun, HistoryNotFoundError> {
        let run = self.get_mut(id)?;
        run.result = Some(Arc::new(result));
        run.error = None;
        run.state = TestRunState::Complete;
        Ok(run)
    }

    /// Records why a run failed and marks it failed.
    pub fn update_error(
        &mut self,
        id: TestRunId,
        error: impl Into<String>,
    ) -> Result<&TestRun, HistoryNotFoundError> {
        let run = self.get_mut(id)?;
        run.error = Some(error.into());
        run.result = None;
        run.state = TestRunState::Failed;
        Ok(run)
    }

    /// Records the command line a run executes.
    pub fn set_command(
        &mut self,
        id: TestRunId,
        command: impl Into<String>,
    ) -> Result<&TestRun, HistoryNotFoundError> {
        let run = self.get_mut(id)?;
        run.command = Some(command.into());
        Ok(run)
    }

    /// Moves a run to an intermediate state.
    pub fn update_state(
        &mut self,
        id: TestRunId,
        state: TestRunState,
    ) -> Result<&TestRun, HistoryNotFoundError> {
        let run = self.get_mut(id)?;
        run.state = state;
        Ok(run)
    }

    fn get_mut(&mut self, id: TestRunId) -> Result<&mut TestRun, HistoryNotFoundError> {
        self.runs.get_mut(&id).ok_or(HistoryNotFoundError::new(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;
    use test_strategy::proptest;

    #[test_case("spec/a_spec.rb:10", "spec/a_spec.rb", Some(10) ; "with line")]
    #[test_case("spec/a_spec.rb", "spec/a_spec.rb", None ; "without line")]
    #[test_case("spec/a_spec.rb:abc", "spec/a_spec.rb:abc", None ; "non numeric suffix")]
    #[test_case(":10", ":10", None ; "line only")]
    fn pattern_parts(input: &str, path: &str, line: Option<u32>) {
        let pattern = TestPattern::new(input);
        assert_eq!(pattern.path(), path);
        assert_eq!(pattern.line(), line);
        assert_eq!(pattern.to_string(), input);
    }

    #[test]
    fn pattern_from_location() {
        let rel = RelPath::new("test/worker_test.rb").expect("valid path");
        assert_eq!(
            TestPattern::from_location(&rel, Some(21)).as_str(),
            "test/worker_test.rb:21"
        );
        assert_eq!(
            TestPattern::from_location(&rel, None).as_str(),
            "test/worker_test.rb"
        );
    }

    #[test]
    fn run_mode_round_trip() {
        for mode in [
            TestRunMode::RunWholeSuite,
            TestRunMode::RunSelectedPatterns,
            TestRunMode::RerunSingleFailure,
            TestRunMode::RerunAllFailures,
        ] {
            assert_eq!(mode.to_string().parse::<TestRunMode>(), Ok(mode));
        }
        "whole_suite"
            .parse::<TestRunMode>()
            .expect_err("unknown mode is rejected");
    }

    #[test]
    fn history_operations() {
        let mut history = TestRunHistory::new();
        assert!(history.most_recent().is_none());

        let first = history.add(vec![], TestRunMode::RunWholeSuite).id();
        let second = history
            .add(vec!["spec/a_spec.rb:10".into()], TestRunMode::RunSelectedPatterns)
            .id();
        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 2);

        let run = history.get(second).expect("run exists");
        assert_eq!(run.mode(), TestRunMode::RunSelectedPatterns);
        assert_eq!(run.state(), TestRunState::Created);
        assert_eq!(run.patterns(), [TestPattern::new("spec/a_spec.rb:10")]);
        assert_eq!(run.command(), None);
        let run = history
            .set_command(second, "rspec \"spec/a_spec.rb:10\"")
            .expect("run exists");
        assert_eq!(run.command(), Some("rspec \"spec/a_spec.rb:10\""));

        assert_eq!(history.most_recent().map(|run| run.id()), Some(second));
        assert_eq!(
            history.all_recent_first().map(|run| run.id()).collect::<Vec<_>>(),
            [second, first],
        );

        let failed = history
            .update_error(first, "cancelled")
            .expect("run exists");
        assert_eq!(failed.error(), Some("cancelled"));
        assert_eq!(failed.state(), TestRunState::Failed);
        assert!(failed.state().is_terminal());

        let missing = TestRunId(42);
        assert_eq!(
            history.get(missing).map(|run| run.id()),
            Err(HistoryNotFoundError::new(missing))
        );
        history
            .update_error(missing, "nope")
            .expect_err("missing run cannot be updated");
        history
            .update_state(missing, TestRunState::Running)
            .expect_err("missing run cannot be updated");
    }

    #[proptest]
    fn run_ids_increase(#[strategy(1usize..20)] count: usize) {
        let mut history = TestRunHistory::new();
        let ids: Vec<_> = (0..count)
            .map(|_| history.add(vec![], TestRunMode::RunWholeSuite).id())
            .collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(history.len(), count);
    }
}
