// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{ExecutionSummary, RunCanceller, RunEvent, TestExecutionResult, TestFramework};
use crate::{
    change_detector::{ChangeDetector, DiffSource, GitDiffSource},
    classifier::FailureClassifier,
    errors::{
        CommandNotFoundError, ConfigError, DisplayErrorChain, HistoryNotFoundError, ParseError,
        RunError, TestRunnerBuildError,
    },
    grouper::Grouper,
    normalizer::BacktraceNormalizer,
    parser::ResultsParser,
    project_fs::ProjectFs,
    test_command::{CommandBuilder, CommandStyle},
    test_run::{TestRunHistory, TestRunId, TestRunState},
};
use camino::Utf8PathBuf;
use std::{
    borrow::Cow,
    env, fs, io,
    process::{ExitStatus, Stdio},
    time::Instant,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, Command},
    runtime::Runtime,
};
use tracing::debug;

/// Test runner options.
#[derive(Debug, Default)]
pub struct TestRunnerBuilder {
    framework: Option<String>,
    command: Option<String>,
    command_style: CommandStyle,
    results_path: Option<Utf8PathBuf>,
    diff_source: Option<Box<dyn DiffSource>>,
}

impl TestRunnerBuilder {
    /// Sets the test framework by name.
    ///
    /// If unset, the framework is inferred from the command.
    pub fn set_framework(&mut self, framework: impl Into<String>) -> &mut Self {
        self.framework = Some(framework.into());
        self
    }

    /// Sets the test command template.
    pub fn set_command(&mut self, command: impl Into<String>) -> &mut Self {
        self.command = Some(command.into());
        self
    }

    /// Sets how test patterns are appended to the command.
    pub fn set_command_style(&mut self, style: CommandStyle) -> &mut Self {
        self.command_style = style;
        self
    }

    /// Reads JUnit results from this file after the command exits, rather than from the
    /// command's output. Relative paths are resolved against the project root.
    pub fn set_results_path(&mut self, path: impl Into<Utf8PathBuf>) -> &mut Self {
        self.results_path = Some(path.into());
        self
    }

    /// Sets where version-control diffs come from. Defaults to running `git` in the project
    /// root.
    pub fn set_diff_source(&mut self, source: impl DiffSource + 'static) -> &mut Self {
        self.diff_source = Some(Box::new(source));
        self
    }

    /// Creates a new test runner.
    ///
    /// Fails if the framework is unknown or cannot be inferred, if the command is unset, or if the
    /// command's program cannot be found.
    pub fn build(self, fs: &ProjectFs) -> Result<TestRunner<'_>, TestRunnerBuildError> {
        let command = self
            .command
            .filter(|command| !command.trim().is_empty());

        let framework = match &self.framework {
            Some(name) => name.parse::<TestFramework>()?,
            None => command
                .as_deref()
                .and_then(TestFramework::infer_from_command)
                .ok_or(ConfigError::FrameworkUnset)?,
        };
        let command = command.ok_or(ConfigError::CommandUnset)?;

        let words = shell_words::split(&command).map_err(|error| {
            TestRunnerBuildError::CommandParse {
                command: command.clone(),
                error,
            }
        })?;
        let program = words.first().map(String::as_str).unwrap_or_default();
        // Relative program paths are looked up from the project root, where the command runs.
        let program_path = which::which_in(program, env::var_os("PATH"), fs.root().as_path())
            .map_err(|error| {
                debug!(program, "test command not found: {error}");
                CommandNotFoundError::new(program)
            })?;
        debug!(%framework, program = %program_path.display(), "test command found");

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TestRunnerBuildError::TokioRuntimeCreate)?;

        let mut command_builder = CommandBuilder::new(command);
        command_builder.set_style(self.command_style);

        let results_path = self
            .results_path
            .map(|path| fs.root().as_path().join(path));
        let diff_source = self
            .diff_source
            .unwrap_or_else(|| Box::new(GitDiffSource::new(fs.root().clone())));

        Ok(TestRunner {
            fs,
            framework,
            command_builder,
            results_path,
            change_detector: ChangeDetector::new(diff_source),
            runtime,
        })
    }
}

/// Context for running tests.
///
/// Created using [`TestRunnerBuilder::build`].
#[derive(Debug)]
pub struct TestRunner<'a> {
    fs: &'a ProjectFs,
    framework: TestFramework,
    command_builder: CommandBuilder,
    results_path: Option<Utf8PathBuf>,
    change_detector: ChangeDetector<Box<dyn DiffSource>>,
    runtime: Runtime,
}

impl<'a> TestRunner<'a> {
    /// Returns the test framework.
    pub fn framework(&self) -> TestFramework {
        self.framework
    }

    /// Returns the command line that would run `run_id`'s patterns.
    pub fn command_for(
        &self,
        history: &TestRunHistory,
        run_id: TestRunId,
    ) -> Result<String, HistoryNotFoundError> {
        Ok(self.command_builder.build(history.get(run_id)?.patterns()))
    }

    /// Executes a run from the history and records its outcome there.
    ///
    /// The callback is called as the run progresses. Failures of the run itself (the command
    /// could not be started, its results could not be parsed, the run was cancelled) are recorded
    /// on the run and published as [`RunEvent::Failed`]; they are not returned.
    ///
    /// Returns an error if `run_id` is not in the history.
    pub fn execute<F>(
        &self,
        history: &mut TestRunHistory,
        run_id: TestRunId,
        canceller: &RunCanceller,
        mut callback: F,
    ) -> Result<(), HistoryNotFoundError>
    where
        F: FnMut(RunEvent),
    {
        let command = self.command_for(history, run_id)?;
        history.set_command(run_id, command.clone())?;
        history.update_state(run_id, TestRunState::Running)?;
        callback(RunEvent::Started {
            run_id,
            command: command.clone(),
        });

        let outcome = {
            let mut on_state = |state: TestRunState| {
                if history.update_state(run_id, state).is_ok() {
                    callback(RunEvent::StateChanged { run_id, state });
                }
            };
            self.run_pipeline(&command, canceller, &mut on_state)
        };

        match outcome {
            Ok(result) => {
                let summary: ExecutionSummary = result.summary();
                debug!(
                    %run_id,
                    total = summary.total,
                    failed = summary.failed,
                    groups = summary.failure_groups,
                    "test run complete"
                );
                history.update_result(run_id, result)?;
                callback(RunEvent::Finished { run_id, summary });
            }
            Err(error) => {
                let error = DisplayErrorChain::new(error).to_string();
                debug!(%run_id, "test run failed: {error}");
                history.update_error(run_id, error.clone())?;
                callback(RunEvent::Failed { run_id, error });
            }
        }

        Ok(())
    }

    fn run_pipeline(
        &self,
        command: &str,
        canceller: &RunCanceller,
        on_state: &mut dyn FnMut(TestRunState),
    ) -> Result<TestExecutionResult, RunError> {
        if command.is_empty() {
            return Err(RunError::EmptyCommand);
        }

        let start = Instant::now();
        let output = self.runtime.block_on(self.run_command(command, canceller))?;
        let execution_time = start.elapsed();

        let input = match &self.results_path {
            Some(path) => Cow::Owned(fs::read(path).map_err(|error| ParseError::ReadResults {
                path: path.clone(),
                error,
            })?),
            None => Cow::Borrowed(output.combined.as_slice()),
        };
        let parsed = ResultsParser::new(self.fs).parse(&input)?;
        on_state(TestRunState::Parsed);

        let mut test_results = BacktraceNormalizer::new(self.fs).normalize(&parsed.results);
        FailureClassifier::new(self.fs).classify_all(&mut test_results);
        self.change_detector.annotate(&mut test_results);
        on_state(TestRunState::Annotated);

        let failure_groups = Grouper::new().group(&test_results);

        Ok(TestExecutionResult {
            test_results,
            failure_groups,
            execution_time,
            command_output: String::from_utf8_lossy(&output.combined).into_owned(),
            totals: parsed.summary,
        })
    }

    async fn run_command(
        &self,
        command: &str,
        canceller: &RunCanceller,
    ) -> Result<CommandOutput, RunError> {
        let words = shell_words::split(command).map_err(|error| RunError::CommandParse {
            command: command.to_owned(),
            error,
        })?;
        let Some((program, args)) = words.split_first() else {
            return Err(RunError::EmptyCommand);
        };
        if canceller.is_cancelled() {
            return Err(RunError::Cancelled);
        }

        // Relative program paths are relative to the project root, whatever the platform does
        // when the working directory changes.
        let program = if program.contains('/') {
            self.fs.root().as_path().join(program).into_string()
        } else {
            program.clone()
        };

        let mut child = Command::new(&program)
            .args(args)
            .current_dir(self.fs.root().as_path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|error| RunError::Spawn {
                command: command.to_owned(),
                error,
            })?;
        debug!(command, pid = ?child.id(), "test command started");

        let outcome = tokio::select! {
            // Prefer the command's result if both are ready: cancelling a finished run is a no-op.
            biased;
            res = collect_output(&mut child) => Some(res),
            () = canceller.cancelled() => None,
        };

        match outcome {
            Some(Ok((status, output))) => {
                // Failing tests make the command exit non-zero, so the status is informational.
                debug!(command, %status, "test command exited");
                Ok(output)
            }
            Some(Err(error)) => Err(RunError::Collect {
                command: command.to_owned(),
                error,
            }),
            None => {
                debug!(command, "cancelling test command");
                if let Err(error) = child.start_kill() {
                    debug!("failed to kill test command: {error}");
                }
                // Reap the child so it doesn't linger as a zombie.
                let _ = child.wait().await;
                Err(RunError::Cancelled)
            }
        }
    }
}

#[derive(Debug, Default)]
struct CommandOutput {
    /// Standard output followed by standard error.
    combined: Vec<u8>,
}

async fn collect_output(child: &mut Child) -> io::Result<(ExitStatus, CommandOutput)> {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    tokio::try_join!(
        read_all(child.stdout.take(), &mut stdout),
        read_all(child.stderr.take(), &mut stderr),
    )?;
    let status = child.wait().await?;

    stdout.extend_from_slice(&stderr);
    Ok((status, CommandOutput { combined: stdout }))
}

async fn read_all(reader: Option<impl AsyncRead + Unpin>, buf: &mut Vec<u8>) -> io::Result<()> {
    if let Some(mut reader) = reader {
        reader.read_to_end(buf).await?;
    }
    Ok(())
}
