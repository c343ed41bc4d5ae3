// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text rendering of test runs.

use crate::{
    backtrace::StackFrame,
    file_snippet::FileSnippet,
    grouper::FailureGroup,
    helpers::{plural, usize_decimal_char_width},
    paths::AbsPath,
    project_fs::ProjectFs,
    runner::TestExecutionResult,
    test_run::{TestRun, TestRunHistory, TestRunState},
};
use owo_colors::{OwoColorize, Style};
use std::io::{self, Write};
use tracing::debug;

/// Writes test runs out as text.
#[derive(Debug)]
pub struct RunReporter<'a> {
    fs: &'a ProjectFs,
    styles: Styles,
    snippet_lines: Option<u32>,
}

impl<'a> RunReporter<'a> {
    /// Creates a new reporter. Paths within `fs` are shown relative to its root.
    pub fn new(fs: &'a ProjectFs) -> Self {
        Self {
            fs,
            styles: Styles::default(),
            snippet_lines: None,
        }
    }

    /// Colorizes output.
    pub fn colorize(&mut self) -> &mut Self {
        self.styles.colorize();
        self
    }

    /// Shows `lines` lines of source on either side of each failure group's location.
    pub fn set_snippet_lines(&mut self, lines: Option<u32>) -> &mut Self {
        self.snippet_lines = lines;
        self
    }

    /// Writes every run in the history, most recent first.
    pub fn write_history(&self, history: &TestRunHistory, mut writer: impl Write) -> io::Result<()> {
        for (index, run) in history.all_recent_first().enumerate() {
            if index > 0 {
                writeln!(writer)?;
            }
            self.write_run(run, &mut writer)?;
        }
        Ok(())
    }

    /// Writes a single run.
    pub fn write_run(&self, run: &TestRun, mut writer: impl Write) -> io::Result<()> {
        let state_style = match run.state() {
            TestRunState::Complete => self.styles.pass,
            TestRunState::Failed => self.styles.fail,
            _ => self.styles.bold,
        };
        writeln!(
            writer,
            "{:>12} {}: {}",
            format!("Run {}", run.id()).style(self.styles.bold),
            run.mode(),
            run.state().style(state_style),
        )?;
        if let Some(command) = run.command() {
            writeln!(writer, "{:>12} {command}", "Command".style(self.styles.bold))?;
        }
        if let Some(error) = run.error() {
            let mut lines = error.lines();
            writeln!(
                writer,
                "{:>12} {}",
                "Error".style(self.styles.fail),
                lines.next().unwrap_or_default(),
            )?;
            for line in lines {
                writeln!(writer, "{:>12} {line}", "")?;
            }
        }
        if let Some(result) = run.result() {
            self.write_result(result, &mut writer)?;
        }
        Ok(())
    }

    fn write_result(&self, result: &TestExecutionResult, mut writer: impl Write) -> io::Result<()> {
        let summary = result.summary();
        writeln!(
            writer,
            "{:>12} {} {} run: {} passed, {} failed, {} skipped ({} failure {}) in {:.3}s",
            "Summary".style(self.styles.bold),
            summary.total.style(self.styles.bold),
            plural::tests_str(summary.total),
            summary.passed.style(self.styles.pass),
            summary.failed.style(self.styles.fail),
            summary.skipped.style(self.styles.skip),
            summary.failure_groups,
            plural::groups_str(summary.failure_groups),
            result.execution_time.as_secs_f64(),
        )?;

        let width = usize_decimal_char_width(result.failure_groups.len());
        for (index, group) in result.failure_groups.iter().enumerate() {
            writeln!(writer)?;
            self.write_group(index + 1, width, group, &mut writer)?;
        }
        Ok(())
    }

    fn write_group(
        &self,
        number: usize,
        width: usize,
        group: &FailureGroup,
        mut writer: impl Write,
    ) -> io::Result<()> {
        let location = group
            .normalized_backtrace
            .last()
            .map_or_else(|| group.key.clone(), |frame| self.frame_location(frame));
        writeln!(
            writer,
            "{:>12} [{number:>width$}] {} {}: {}",
            "FAIL".style(self.styles.fail),
            group.count().style(self.styles.bold),
            plural::failures_str(group.count()),
            location.style(self.styles.path),
        )?;

        let indent = " ".repeat(13);
        for line in group.error_message.lines() {
            writeln!(writer, "{indent}{line}")?;
        }
        for member in &group.members {
            let cause = member
                .failure_cause
                .map_or("?", |cause| cause.abbreviation());
            writeln!(
                writer,
                "{indent}- [{}] {}",
                cause.style(self.styles.cause),
                member.name(),
            )?;
        }
        for frame in &group.normalized_backtrace {
            writeln!(
                writer,
                "{indent}  {:>3} {}",
                heat_marker(frame).style(self.styles.heat),
                self.frame_display(frame),
            )?;
        }

        if let Some(size) = self.snippet_lines
            && let Some(frame) = group.normalized_backtrace.last()
            && let Some(path) = &frame.file_path
        {
            self.write_snippet(path, frame.line, size, &indent, &mut writer)?;
        }
        Ok(())
    }

    fn write_snippet(
        &self,
        path: &AbsPath,
        line: u32,
        size: u32,
        indent: &str,
        mut writer: impl Write,
    ) -> io::Result<()> {
        let snippet = match FileSnippet::extract(path.as_path(), line, size) {
            Ok(snippet) => snippet,
            Err(error) => {
                debug!(%path, line, "no source snippet: {error}");
                return Ok(());
            }
        };
        let last = snippet.lines().last().map_or(0, |line| line.number);
        let width = usize_decimal_char_width(last as usize);
        for line in snippet.lines() {
            let marker = if line.is_center { ">" } else { " " };
            let number = format!("{marker} {:>width$} |", line.number);
            let style = if line.is_center {
                self.styles.fail
            } else {
                self.styles.dim
            };
            writeln!(writer, "{indent}{} {}", number.style(style), line.content)?;
        }
        Ok(())
    }

    fn frame_location(&self, frame: &StackFrame) -> String {
        match &frame.file_path {
            Some(path) => format!("{}:{}", self.display_path(path), frame.line),
            None => "<unknown>".to_owned(),
        }
    }

    fn frame_display(&self, frame: &StackFrame) -> String {
        let location = self.frame_location(frame);
        if frame.function.is_empty() {
            location
        } else {
            format!("{location} in {}", frame.function)
        }
    }

    fn display_path(&self, path: &AbsPath) -> String {
        match self.fs.rel(path) {
            Ok(rel) => rel.to_string(),
            Err(_) => path.to_string(),
        }
    }
}

/// Returns `***`, `**`, `*` or nothing depending on how recently the frame's line changed.
fn heat_marker(frame: &StackFrame) -> &'static str {
    match frame.change_intensity() {
        0 => "",
        1 => "*",
        2 => "**",
        _ => "***",
    }
}

#[derive(Debug, Default)]
struct Styles {
    bold: Style,
    pass: Style,
    fail: Style,
    skip: Style,
    path: Style,
    cause: Style,
    heat: Style,
    dim: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.bold = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow().bold();
        self.path = Style::new().cyan();
        self.cause = Style::new().magenta();
        self.heat = Style::new().red();
        self.dim = Style::new().dimmed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backtrace::{Backtrace, ChangeReason},
        grouper::Grouper,
        parser::TestSummary,
        test_result::{FailureCause, TestResult, TestStatus},
        test_run::TestRunMode,
    };
    use camino_tempfile::Utf8TempDir;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn project() -> (Utf8TempDir, ProjectFs) {
        let temp_dir = Utf8TempDir::new().expect("temp dir created");
        let root = AbsPath::new(temp_dir.path().as_str()).expect("absolute");
        let fs = ProjectFs::new(root, None).expect("valid fs");
        (temp_dir, fs)
    }

    fn failing(fs: &ProjectFs, id: usize, name: &str) -> TestResult {
        let root = fs.root();
        let mut frame = StackFrame::new(
            AbsPath::new(format!("{root}/app/models/cart.rb")).expect("absolute"),
            3,
            "total",
        );
        frame.change = Some(ChangeReason::Uncommitted);
        let backtrace = Backtrace::from(vec![
            StackFrame::new(
                AbsPath::new(format!("{root}/spec/cart_spec.rb")).expect("absolute"),
                8,
                "block (2 levels)",
            ),
            frame,
        ]);

        let mut result = TestResult::new(id, "Cart", name, TestStatus::Fail);
        result.failure_cause = Some(FailureCause::ProductionCodeError);
        result.failure_details = "undefined method `price' for nil".to_owned();
        result.full_backtrace = backtrace.clone();
        result.filtered_backtrace = backtrace;
        result
    }

    fn complete_run(fs: &ProjectFs) -> TestRunHistory {
        let test_results = vec![
            failing(fs, 1, "total"),
            TestResult::new(2, "Cart", "empty", TestStatus::Pass),
            failing(fs, 3, "discount"),
            TestResult::new(4, "Cart", "tax", TestStatus::Skip),
        ];
        let failure_groups = Grouper::new().group(&test_results);

        let mut history = TestRunHistory::new();
        let run_id = history.add(Vec::new(), TestRunMode::RunWholeSuite).id();
        history
            .set_command(run_id, "bundle exec rspec")
            .expect("run exists");
        history
            .update_result(
                run_id,
                TestExecutionResult {
                    test_results,
                    failure_groups,
                    execution_time: Duration::from_millis(1500),
                    command_output: String::new(),
                    totals: TestSummary::default(),
                },
            )
            .expect("run exists");
        history
    }

    #[test]
    fn complete_run_output() {
        let (_temp_dir, fs) = project();
        let history = complete_run(&fs);

        let mut buf = Vec::new();
        RunReporter::new(&fs)
            .write_history(&history, &mut buf)
            .expect("writing to a Vec succeeds");
        let output = String::from_utf8(buf).expect("output is UTF-8");

        assert_eq!(
            output.lines().collect::<Vec<_>>(),
            [
                "      Run #1 run_whole_suite: complete",
                "     Command bundle exec rspec",
                "     Summary 4 tests run: 1 passed, 2 failed, 1 skipped (1 failure group) in 1.500s",
                "",
                "        FAIL [1] 2 failures: app/models/cart.rb:3",
                "             undefined method `price' for nil",
                "             - [C] Cart.total",
                "             - [C] Cart.discount",
                "                   spec/cart_spec.rb:8 in block (2 levels)",
                "               *** app/models/cart.rb:3 in total",
            ]
        );
    }

    #[test]
    fn snippet_output() {
        let (temp_dir, fs) = project();
        let models = temp_dir.path().join("app/models");
        std::fs::create_dir_all(&models).expect("dir created");
        std::fs::write(
            models.join("cart.rb"),
            "class Cart\n  def total\n    items.sum(&:price)\n  end\nend\n",
        )
        .expect("file written");
        let history = complete_run(&fs);

        let mut buf = Vec::new();
        let mut reporter = RunReporter::new(&fs);
        reporter.set_snippet_lines(Some(1));
        reporter
            .write_history(&history, &mut buf)
            .expect("writing to a Vec succeeds");
        let output = String::from_utf8(buf).expect("output is UTF-8");

        let snippet: Vec<_> = output.lines().skip_while(|line| !line.contains("|")).collect();
        assert_eq!(
            snippet,
            [
                "               2 |   def total",
                "             > 3 |     items.sum(&:price)",
                "               4 |   end",
            ]
        );
    }

    #[test]
    fn failed_runs_show_the_error() {
        let (_temp_dir, fs) = project();
        let mut history = TestRunHistory::new();
        let first = history.add(Vec::new(), TestRunMode::RunWholeSuite).id();
        history
            .update_error(
                first,
                "failed to parse test results\n  caused by:\n  - no test cases found",
            )
            .expect("run exists");
        history.add(
            vec!["spec/cart_spec.rb:8".into()],
            TestRunMode::RerunAllFailures,
        );

        let mut buf = Vec::new();
        RunReporter::new(&fs)
            .write_history(&history, &mut buf)
            .expect("writing to a Vec succeeds");
        let output = String::from_utf8(buf).expect("output is UTF-8");

        assert_eq!(
            output.lines().collect::<Vec<_>>(),
            [
                "      Run #2 rerun_all_failures: created",
                "",
                "      Run #1 run_whole_suite: failed",
                "       Error failed to parse test results",
                "               caused by:",
                "               - no test cases found",
            ]
        );
    }

    #[test]
    fn heat_markers() {
        let mut frame = StackFrame::new(AbsPath::new("/repo/x.rb").expect("absolute"), 1, "");
        let tests = [
            (None, ""),
            (Some(ChangeReason::PreviousCommit), "*"),
            (Some(ChangeReason::LastCommit), "**"),
            (Some(ChangeReason::Uncommitted), "***"),
        ];
        for (change, expected) in tests {
            frame.change = change;
            assert_eq!(heat_marker(&frame), expected, "for {change:?}");
        }
    }
}
