// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line parsing and command routing.

use crate::{
    ExpectedError, Result, WingExitCode,
    output::{DEBUG_LOG_FILE, OutputContext, OutputOpts, OutputWriter, debug_log_dir},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Subcommand};
use std::io::Write;
use tracing::{debug, info, warn};
use wing_runner::{
    config::ProjectConfig,
    errors::ProjectFsError,
    helpers::plural,
    paths::{AbsPath, RelPath},
    project_fs::ProjectFs,
    reporter::RunReporter,
    runner::{RunCanceller, RunEvent, TestRunner, TestRunnerBuilder},
    test_command::CommandStyle,
    test_run::{TestPattern, TestRunHistory, TestRunId, TestRunMode, TestRunState},
};

/// Triage failing tests.
///
/// Runs a project's test command, reads the JUnit XML it produces, and shows the failures
/// grouped by where they surfaced.
#[derive(Debug, clap::Parser)]
#[command(
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct WingCommanderApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[clap(subcommand)]
    command: Command,
}

impl WingCommanderApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        match &self.command {
            Command::Start(opts) => self
                .output
                .init(&debug_log_dir(opts.project_path.as_deref())),
        }
    }

    /// Executes the app.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Command::Start(opts) => opts.exec(output, output_writer),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the tests and report the failures
    Start(Box<StartOpts>),
}

#[derive(Debug, Args)]
struct StartOpts {
    /// The project directory [default: the current directory]
    #[arg(value_name = "PROJECT_PATH")]
    project_path: Option<Utf8PathBuf>,

    /// The test command, such as "bundle exec rspec"
    ///
    /// Required unless `test_command` is set in the config file.
    #[arg(long, short = 'c', value_name = "CMD")]
    command: Option<String>,

    /// Glob matching test files, relative to the project directory
    #[arg(long, short = 's', value_name = "GLOB")]
    search_pattern: Option<String>,

    /// The test framework: rspec, minitest, pytest or jest [default: inferred from the command]
    #[arg(long, short = 'f', value_name = "NAME")]
    framework: Option<String>,

    /// Config file [default: .wing_commander/config.toml in the project directory]
    #[arg(long, value_name = "PATH")]
    config: Option<Utf8PathBuf>,

    /// Run only these tests, such as spec/models/user_spec.rb:12
    #[arg(long = "pattern", short = 'p', value_name = "PATTERN")]
    patterns: Vec<String>,

    /// Rerun the failing tests once more after the first run
    #[arg(long)]
    rerun_failures: bool,

    /// Show this many lines of source around each failure
    #[arg(long, value_name = "N")]
    snippet_lines: Option<u32>,

    /// Read JUnit XML from this file rather than from the command's output
    #[arg(long, value_name = "PATH")]
    results_path: Option<Utf8PathBuf>,

    /// How test patterns are passed to the command: quoted_block or separate_args
    #[arg(long, value_name = "STYLE")]
    command_style: Option<CommandStyle>,
}

impl StartOpts {
    fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let root = resolve_project_path(self.project_path.as_deref())?;
        if output.debug {
            info!("writing debug logs to {}", root.as_path().join(DEBUG_LOG_FILE));
        }

        let config = match &self.config {
            Some(path) => ProjectConfig::from_path(path)?,
            None => ProjectConfig::from_default_location(&root)?,
        };

        let test_file_glob = self
            .search_pattern
            .as_deref()
            .or(config.test_file_pattern.as_deref());
        let fs = ProjectFs::init(ProjectFs::new(root, test_file_glob)?)?;

        let mut builder = TestRunnerBuilder::default();
        config.apply_to(&mut builder);
        if let Some(framework) = &self.framework {
            builder.set_framework(framework.clone());
        }
        if let Some(command) = &self.command {
            builder.set_command(command.clone());
        }
        if let Some(style) = self.command_style {
            builder.set_command_style(style);
        }
        if let Some(path) = &self.results_path {
            builder.set_results_path(path.clone());
        }
        let runner = builder.build(fs)?;
        debug!(framework = %runner.framework(), "test runner ready");

        let mut history = TestRunHistory::new();
        let canceller = RunCanceller::new();

        let (patterns, mode) = if self.patterns.is_empty() {
            (Vec::new(), TestRunMode::RunWholeSuite)
        } else {
            let patterns: Vec<_> = self.patterns.iter().map(TestPattern::new).collect();
            if let Some(glob) = fs.test_file_glob() {
                for pattern in unmatched_patterns(fs, &patterns)? {
                    warn!("pattern `{pattern}` does not select a test file matching `{glob}`");
                }
            }
            (patterns, TestRunMode::RunSelectedPatterns)
        };
        let first = history.add(patterns, mode).id();
        execute(&runner, &mut history, first, &canceller)?;

        if self.rerun_failures {
            let failures: Vec<_> = history
                .get(first)?
                .result()
                .map(|result| {
                    result
                        .failed_tests()
                        .filter_map(|failure| failure.rerun_pattern(fs))
                        .collect()
                })
                .unwrap_or_default();
            if failures.is_empty() {
                info!("no failures to rerun");
            } else {
                info!(
                    "rerunning {} {}",
                    failures.len(),
                    plural::failures_str(failures.len())
                );
                let rerun = history.add(failures, TestRunMode::RerunAllFailures).id();
                execute(&runner, &mut history, rerun, &canceller)?;
            }
        }

        debug!(
            "reporting {} {}",
            history.len(),
            plural::runs_str(history.len())
        );
        let mut reporter = RunReporter::new(fs);
        reporter.set_snippet_lines(self.snippet_lines);
        if output.color.should_colorize(supports_color::Stream::Stdout) {
            reporter.colorize();
        }
        let mut writer = output_writer.stdout_writer();
        reporter
            .write_history(&history, &mut writer)
            .map_err(ExpectedError::write_error)?;
        writer.flush().map_err(ExpectedError::write_error)?;

        if let Some(failed) = history
            .all_recent_first()
            .find(|run| run.state() == TestRunState::Failed)
        {
            return Err(ExpectedError::RunFailed {
                run_id: failed.id(),
            });
        }
        Ok(WingExitCode::OK)
    }
}

fn execute(
    runner: &TestRunner<'_>,
    history: &mut TestRunHistory,
    run_id: TestRunId,
    canceller: &RunCanceller,
) -> Result<()> {
    runner.execute(history, run_id, canceller, |event| match event {
        RunEvent::Started { run_id, command } => info!("run {run_id}: running `{command}`"),
        RunEvent::StateChanged { run_id, state } => debug!(%run_id, %state, "run state changed"),
        RunEvent::Finished { run_id, summary } => info!(
            "run {run_id}: {} {} run, {} failed in {} {}",
            summary.total,
            plural::tests_str(summary.total),
            summary.failed,
            summary.failure_groups,
            plural::groups_str(summary.failure_groups),
        ),
        RunEvent::Failed { run_id, .. } => debug!(%run_id, "run failed"),
        _ => {}
    })?;
    Ok(())
}

/// Returns the patterns whose path is not one of the project's test files.
///
/// Without a test file pattern there is nothing to check against, and no pattern is returned.
fn unmatched_patterns<'a>(
    fs: &ProjectFs,
    patterns: &'a [TestPattern],
) -> Result<Vec<&'a TestPattern>, ProjectFsError> {
    if fs.test_file_glob().is_none() {
        return Ok(Vec::new());
    }
    let test_files = fs.test_files()?;
    Ok(patterns
        .iter()
        .filter(|pattern| {
            !RelPath::new(pattern.path()).is_ok_and(|path| test_files.contains(&path))
        })
        .collect())
}

/// Returns the absolute path of the project directory, checking that it is a directory.
fn resolve_project_path(path: Option<&Utf8Path>) -> Result<AbsPath> {
    let path = match path {
        Some(path) => path.to_owned(),
        None => {
            let cwd = std::env::current_dir()
                .map_err(|err| ExpectedError::CurrentDirFailed { err })?;
            Utf8PathBuf::try_from(cwd).map_err(|err| ExpectedError::ProjectPathNotUtf8 {
                path: err.into_path_buf(),
            })?
        }
    };

    let canonical = path
        .canonicalize_utf8()
        .map_err(|err| ExpectedError::ProjectPathNotFound {
            path: path.clone(),
            err,
        })?;
    if !canonical.is_dir() {
        return Err(ExpectedError::ProjectPathNotDirectory { path });
    }
    Ok(AbsPath::new(canonical.as_str())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Color;
    use camino_tempfile::Utf8TempDir;
    use clap::{CommandFactory, Parser};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn verify_app() {
        WingCommanderApp::command().debug_assert();
    }

    #[test]
    fn parse_start() {
        let app = WingCommanderApp::try_parse_from([
            "wing-commander",
            "start",
            "proj",
            "-c",
            "bundle exec rspec",
            "-p",
            "spec/a_spec.rb:3",
            "--pattern",
            "spec/b_spec.rb",
            "--rerun-failures",
            "--snippet-lines",
            "2",
            "--command-style",
            "separate_args",
            "--debug",
            "--color",
            "never",
        ])
        .expect("valid arguments");

        assert!(app.output.debug);
        assert_eq!(app.output.color, Color::Never);
        let Command::Start(opts) = app.command;
        assert_eq!(opts.project_path.as_deref(), Some(Utf8Path::new("proj")));
        assert_eq!(opts.command.as_deref(), Some("bundle exec rspec"));
        assert_eq!(opts.patterns, ["spec/a_spec.rb:3", "spec/b_spec.rb"]);
        assert!(opts.rerun_failures);
        assert_eq!(opts.snippet_lines, Some(2));
        assert_eq!(opts.command_style, Some(CommandStyle::SeparateArgs));
        assert_eq!(opts.framework, None);
    }

    #[test]
    fn command_may_come_from_config() {
        let app = WingCommanderApp::try_parse_from(["wing-commander", "start"])
            .expect("--command is optional");
        let Command::Start(opts) = app.command;
        assert_eq!(opts.command, None);

        let app = WingCommanderApp::command();
        let help = app
            .find_subcommand("start")
            .and_then(|start| start.get_arguments().find(|arg| arg.get_id() == "command"))
            .and_then(|arg| arg.get_long_help())
            .expect("--command has long help")
            .to_string();
        assert!(
            help.contains("Required unless `test_command` is set in the config file"),
            "{help}"
        );
    }

    #[test]
    fn parse_errors() {
        let tests: &[&[&str]] = &[
            &["wing-commander"],
            &["wing-commander", "start", "--snippet-lines", "many"],
            &["wing-commander", "start", "--command-style", "nope"],
            &["wing-commander", "start", "--color", "sometimes"],
        ];
        for args in tests {
            WingCommanderApp::try_parse_from(*args).expect_err("invalid arguments");
        }
    }

    #[test]
    fn project_path_validation() {
        let temp_dir = Utf8TempDir::new().expect("temp dir created");
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, "").expect("file written");

        let root = resolve_project_path(Some(temp_dir.path())).expect("directory is valid");
        assert!(root.as_path().is_absolute());

        let err = resolve_project_path(Some(&file)).expect_err("file is not a directory");
        assert!(
            matches!(&err, ExpectedError::ProjectPathNotDirectory { path } if *path == file),
            "{err:?}"
        );
        assert_eq!(err.process_exit_code(), WingExitCode::SETUP_ERROR);

        let err = resolve_project_path(Some(&temp_dir.path().join("missing")))
            .expect_err("path does not exist");
        assert!(
            matches!(err, ExpectedError::ProjectPathNotFound { .. }),
            "{err:?}"
        );
    }

    #[test]
    fn patterns_checked_against_test_files() {
        let temp_dir = Utf8TempDir::new().expect("temp dir created");
        std::fs::create_dir_all(temp_dir.path().join("spec/models")).expect("dirs created");
        std::fs::write(temp_dir.path().join("spec/models/cart_spec.rb"), "").expect("spec written");
        std::fs::write(temp_dir.path().join("spec/spec_helper.rb"), "").expect("helper written");
        let root = resolve_project_path(Some(temp_dir.path())).expect("directory is valid");

        let patterns: Vec<_> = [
            "spec/models/cart_spec.rb:12",
            "./spec/models/cart_spec.rb",
            "spec/spec_helper.rb",
            "spec/models/missing_spec.rb:3",
        ]
        .into_iter()
        .map(TestPattern::new)
        .collect();

        let fs = ProjectFs::new(root.clone(), Some("spec/**/*_spec.rb")).expect("valid fs");
        let unmatched: Vec<_> = unmatched_patterns(&fs, &patterns)
            .expect("project walked")
            .into_iter()
            .map(TestPattern::as_str)
            .collect();
        assert_eq!(
            unmatched,
            ["spec/spec_helper.rb", "spec/models/missing_spec.rb:3"]
        );

        let fs = ProjectFs::new(root, None).expect("valid fs");
        assert!(
            unmatched_patterns(&fs, &patterns)
                .expect("nothing to walk")
                .is_empty()
        );
    }

    // The project filesystem can only be initialized once per process, so this is the only test
    // that runs `start` to completion.
    #[cfg(unix)]
    #[test]
    fn start_and_rerun_failures() {
        let temp_dir = Utf8TempDir::new().expect("temp dir created");
        std::fs::write(
            temp_dir.path().join("results.xml"),
            indoc! {r#"
                <testsuite name="pytest" tests="2" failures="1">
                  <testcase classname="tests.test_math" name="test_add" file="tests/test_math.py" line="3"/>
                  <testcase classname="tests.test_math" name="test_div" file="tests/test_math.py" line="7">
                    <failure message="ZeroDivisionError: division by zero">Traceback:
                    src/math.py:4: in div
                  </failure>
                  </testcase>
                </testsuite>
            "#},
        )
        .expect("results written");

        let app = WingCommanderApp::try_parse_from([
            "wing-commander",
            "start",
            temp_dir.path().as_str(),
            "--command",
            "cat results.xml",
            "--framework",
            "pytest",
            "--rerun-failures",
            "--color",
            "never",
        ])
        .expect("valid arguments");
        let output = OutputContext {
            debug: false,
            color: Color::Never,
        };
        let mut writer = OutputWriter::Test { stdout: Vec::new() };
        let code = app.exec(output, &mut writer).expect("runs complete");
        assert_eq!(code, WingExitCode::OK);

        let OutputWriter::Test { stdout } = writer else {
            unreachable!("writer is a test writer");
        };
        let stdout = String::from_utf8(stdout).expect("output is UTF-8");
        let headers: Vec<_> = stdout
            .lines()
            .filter(|line| line.trim_start().starts_with("Run #"))
            .map(str::trim)
            .collect();
        assert_eq!(
            headers,
            [
                "Run #2 rerun_all_failures: complete",
                "Run #1 run_whole_suite: complete",
            ]
        );
        assert!(
            stdout.contains("Command cat results.xml \"tests/test_math.py:7\""),
            "rerun command selects the failure:\n{stdout}"
        );
    }
}
