// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for wing-commander, a tool for triaging failing tests.
//!
//! A test run flows through the following stages:
//!
//! 1. [`TestRunner`](runner::TestRunner) builds the command line with a
//!    [`CommandBuilder`](test_command::CommandBuilder) and runs it.
//! 2. [`ResultsParser`](parser::ResultsParser) turns the JUnit XML it produced into
//!    [`TestResult`](test_result::TestResult)s.
//! 3. [`BacktraceNormalizer`](normalizer::BacktraceNormalizer) drops frames outside the project.
//! 4. [`FailureClassifier`](classifier::FailureClassifier) tags each failure with its likely cause.
//! 5. [`ChangeDetector`](change_detector::ChangeDetector) marks frames that point at recently
//!    edited lines.
//! 6. [`Grouper`](grouper::Grouper) clusters failures by where they surfaced.
//!
//! The outcome is recorded in a [`TestRunHistory`](test_run::TestRunHistory).

pub mod backtrace;
pub mod change_detector;
pub mod classifier;
pub mod config;
pub mod editor;
pub mod errors;
pub mod file_snippet;
pub mod grouper;
pub mod helpers;
pub mod normalizer;
pub mod parser;
pub mod paths;
pub mod project_fs;
pub mod reporter;
pub mod runner;
pub mod test_command;
pub mod test_result;
pub mod test_run;
