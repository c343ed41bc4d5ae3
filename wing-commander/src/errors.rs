// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::{error::Error, io, path::PathBuf};
use thiserror::Error;
use tracing::error;
use wing_runner::{
    errors::{
        HistoryNotFoundError, PathError, ProjectConfigError, ProjectFsError, TestRunnerBuildError,
    },
    test_run::TestRunId,
};

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// Documented exit codes for `wing-commander` failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum WingExitCode {}

impl WingExitCode {
    /// No errors occurred and wing-commander exited normally. Failing tests are not an error.
    pub const OK: i32 = 0;

    /// A user issue happened while setting up: a bad project path, configuration or arguments.
    pub const SETUP_ERROR: i32 = 96;

    /// A test run could not be executed, or its results could not be parsed.
    pub const RUN_FAILED: i32 = 100;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that is expected to happen in normal use, as opposed to a bug.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the current directory")]
    CurrentDirFailed {
        #[source]
        err: io::Error,
    },
    #[error("project path is not valid UTF-8")]
    ProjectPathNotUtf8 { path: PathBuf },
    #[error("project path not found")]
    ProjectPathNotFound {
        path: Utf8PathBuf,
        #[source]
        err: io::Error,
    },
    #[error("project path is not a directory")]
    ProjectPathNotDirectory { path: Utf8PathBuf },
    #[error("project path is invalid")]
    ProjectPathInvalid {
        #[from]
        err: PathError,
    },
    #[error("config load error")]
    ConfigLoad {
        #[from]
        err: ProjectConfigError,
    },
    #[error("project filesystem setup error")]
    ProjectFsSetup {
        #[from]
        err: ProjectFsError,
    },
    #[error("test runner build error")]
    TestRunnerBuild {
        #[from]
        err: TestRunnerBuildError,
    },
    #[error("test run not found")]
    RunNotFound {
        #[from]
        err: HistoryNotFoundError,
    },
    #[error("test run failed")]
    RunFailed { run_id: TestRunId },
    #[error("error writing output")]
    WriteError {
        #[source]
        err: io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn write_error(err: io::Error) -> Self {
        Self::WriteError { err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::ProjectPathNotUtf8 { .. }
            | Self::ProjectPathNotFound { .. }
            | Self::ProjectPathNotDirectory { .. }
            | Self::ProjectPathInvalid { .. }
            | Self::ConfigLoad { .. }
            | Self::ProjectFsSetup { .. }
            | Self::TestRunnerBuild { .. } => WingExitCode::SETUP_ERROR,
            Self::RunNotFound { .. } | Self::RunFailed { .. } => WingExitCode::RUN_FAILED,
            Self::WriteError { .. } => WingExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirFailed { err } => {
                error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::ProjectPathNotUtf8 { path } => {
                error!(
                    "project path `{}` is not valid UTF-8",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::ProjectPathNotFound { path, err } => {
                error!("project path `{}` not found", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::ProjectPathNotDirectory { path } => {
                error!(
                    "project path `{}` is not a directory",
                    path.style(styles.bold)
                );
                None
            }
            Self::ProjectPathInvalid { err } => {
                error!("invalid project path: {err}");
                err.source()
            }
            Self::ConfigLoad { err } => {
                error!("{err}");
                err.source()
            }
            Self::ProjectFsSetup { err } => {
                error!("{err}");
                err.source()
            }
            Self::TestRunnerBuild { err } => {
                error!("{err}");
                err.source()
            }
            Self::RunNotFound { err } => {
                error!("{err}");
                None
            }
            Self::RunFailed { run_id } => {
                error!("test run {} failed", run_id.style(styles.bold));
                None
            }
            Self::WriteError { err } => {
                error!("error writing output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
