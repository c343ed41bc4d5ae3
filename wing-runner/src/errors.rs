// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by wing-runner.

use crate::{backtrace::ChangeReason, runner::TestFramework, test_run::TestRunId};
use camino::Utf8PathBuf;
use std::{error::Error, fmt, io};
use thiserror::Error;
use wing_junit::DeserializeError;

/// An error that occurred while constructing an [`AbsPath`](crate::paths::AbsPath) or a
/// [`RelPath`](crate::paths::RelPath).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum PathError {
    /// The input was empty.
    #[error("path is empty")]
    Empty,

    /// An absolute path was required.
    #[error("path `{path}` is not absolute")]
    NotAbsolute {
        /// The path after cleaning.
        path: Utf8PathBuf,
    },

    /// A relative path was required.
    #[error("path `{path}` is not relative")]
    NotRelative {
        /// The path after cleaning.
        path: Utf8PathBuf,
    },
}

/// An attempt was made to relativize a path that lies outside the project root.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("path `{path}` is outside the project root `{root}`")]
pub struct PathOutsideRootError {
    path: Utf8PathBuf,
    root: Utf8PathBuf,
}

impl PathOutsideRootError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            root: root.into(),
        }
    }

    /// Returns the path that was outside the root.
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }
}

/// An error that occurred while setting up or querying the project filesystem.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProjectFsError {
    /// The project filesystem was already initialized for this process.
    #[error("project filesystem is already initialized (root: `{root}`)")]
    AlreadyInitialized {
        /// The root it was initialized with.
        root: Utf8PathBuf,
    },

    /// The test file glob could not be compiled.
    #[error("invalid test file pattern `{pattern}`")]
    InvalidTestFileGlob {
        /// The pattern as provided.
        pattern: String,

        /// The underlying error.
        #[source]
        error: globset::Error,
    },

    /// Walking the project directory failed.
    #[error("error walking project directory `{root}`")]
    Walk {
        /// The project root.
        root: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: walkdir::Error,
    },
}

/// An error that occurred while reading test results.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The output was not a JUnit document, or the XML was malformed.
    #[error("failed to parse JUnit XML")]
    Junit(#[from] DeserializeError),

    /// The document was well-formed but contained no test cases.
    #[error("no test cases found in JUnit XML")]
    NoTestCases,

    /// A results file could not be read.
    #[error("failed to read test results from `{path}`")]
    ReadResults {
        /// The path of the results file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// A version-control diff could not be obtained for a file at a given depth.
///
/// This error is never fatal: a missing diff contributes no changed lines.
#[derive(Debug, Error)]
#[error("`git diff` for `{file}` ({depth}) failed")]
pub struct DiffUnavailableError {
    file: Utf8PathBuf,
    depth: ChangeReason,
    #[source]
    error: io::Error,
}

impl DiffUnavailableError {
    /// Creates a new `DiffUnavailableError`.
    pub fn new(file: impl Into<Utf8PathBuf>, depth: ChangeReason, error: io::Error) -> Self {
        Self {
            file: file.into(),
            depth,
            error,
        }
    }
}

/// A test run with the given id does not exist in the history.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("test run {id} not found")]
pub struct HistoryNotFoundError {
    id: TestRunId,
}

impl HistoryNotFoundError {
    pub(crate) fn new(id: TestRunId) -> Self {
        Self { id }
    }

    /// Returns the id that was looked up.
    pub fn id(&self) -> TestRunId {
        self.id
    }
}

/// Error returned while parsing a [`TestRunMode`](crate::test_run::TestRunMode) from a string.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error(
    "unrecognized test run mode: {input}\n(known modes: run_whole_suite, run_selected_patterns, \
     rerun_single_failure, rerun_all_failures)"
)]
pub struct TestRunModeParseError {
    input: String,
}

impl TestRunModeParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error that occurred while loading the project configuration file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProjectConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file `{path}` not found")]
    NotFound {
        /// The path of the config file.
        path: Utf8PathBuf,
    },

    /// The config file could not be read.
    #[error("failed to read config file `{path}`")]
    Read {
        /// The path of the config file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The config file is not valid TOML, or has values of the wrong type.
    #[error("failed to parse config file `{path}`")]
    Parse {
        /// The path of the config file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: toml::de::Error,
    },
}

/// The test configuration is incomplete or invalid.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// No test framework was specified, and it could not be inferred from the command.
    #[error("test framework not specified (set `test_framework` in the config or pass --framework)")]
    FrameworkUnset,

    /// No test command was specified.
    #[error("test command not specified (set `test_command` in the config or pass --command)")]
    CommandUnset,

    /// The test framework is not one of the recognized kinds.
    #[error("unsupported test framework: {name} (supported: {})", TestFramework::variants().join(", "))]
    UnknownFramework {
        /// The framework name as provided.
        name: String,
    },
}

/// The test command's program could not be found on the executable search path.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("test command not found: `{program}` (make sure it is installed and in PATH)")]
pub struct CommandNotFoundError {
    program: String,
}

impl CommandNotFoundError {
    pub(crate) fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Returns the program that was looked up.
    pub fn program(&self) -> &str {
        &self.program
    }
}

/// An error that occurred while building a [`TestRunner`](crate::runner::TestRunner).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestRunnerBuildError {
    /// The test configuration was invalid.
    #[error("invalid test configuration")]
    Config(#[from] ConfigError),

    /// The test command could not be found.
    #[error("test command is not executable")]
    CommandNotFound(#[from] CommandNotFoundError),

    /// The test command could not be split into words.
    #[error("failed to split test command `{command}` into arguments")]
    CommandParse {
        /// The command as provided.
        command: String,

        /// The underlying error.
        #[source]
        error: shell_words::ParseError,
    },

    /// An error occurred while creating the Tokio runtime.
    #[error("error creating Tokio runtime")]
    TokioRuntimeCreate(#[source] io::Error),
}

/// An error that caused a single test run to fail.
///
/// These are recorded on the [`TestRun`](crate::test_run::TestRun) rather than returned, so
/// that the user can see them alongside the run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// The command line was empty.
    #[error("test command is empty")]
    EmptyCommand,

    /// The command line could not be split into words.
    #[error("failed to split test command `{command}` into arguments")]
    CommandParse {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        error: shell_words::ParseError,
    },

    /// The test process could not be started.
    #[error("failed to start test command `{command}`")]
    Spawn {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// An error occurred while collecting the test process's output.
    #[error("error collecting output of test command `{command}`")]
    Collect {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The run was cancelled before the test process exited.
    #[error("cancelled")]
    Cancelled,

    /// The test results could not be parsed.
    #[error("failed to parse test results")]
    Parse(#[from] ParseError),
}

/// An editor command line could not be built.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum EditorError {
    /// The editor setting could not be split into words, or was empty.
    #[error("invalid editor command `{value}`")]
    InvalidCommand {
        /// The editor setting as provided.
        value: String,
    },

    /// No file path was given.
    #[error("file path is empty")]
    EmptyPath,

    /// Line numbers start at 1.
    #[error("invalid line number {line} for `{path}` (must be at least 1)")]
    InvalidLine {
        /// The file path.
        path: Utf8PathBuf,

        /// The line number as provided.
        line: u32,
    },
}

/// A snippet of a source file could not be extracted.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FileSnippetError {
    /// Line numbers start at 1.
    #[error("invalid line number {line} (must be at least 1)")]
    InvalidLine {
        /// The line number as provided.
        line: u32,
    },

    /// The centre line lies past the end of the file.
    #[error("line {line} is past the end of `{path}` ({line_count} lines)")]
    LineOutOfRange {
        /// The file path.
        path: Utf8PathBuf,

        /// The line number as provided.
        line: u32,

        /// The number of lines in the file.
        line_count: usize,
    },

    /// The file could not be read.
    #[error("failed to read `{path}`")]
    Read {
        /// The file path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// Displays an error along with its chain of causes.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut source = self.error.source();
        if source.is_some() {
            write!(f, "\n  caused by:")?;
        }
        while let Some(error) = source {
            write!(f, "\n  - {error}")?;
            source = error.source();
        }

        Ok(())
    }
}
