// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test runner.
//!
//! [`TestRunnerBuilder`] validates the test configuration and produces a [`TestRunner`], which
//! executes a [`TestRun`](crate::test_run::TestRun) from the history: it runs the test command,
//! feeds the output through the pipeline, and records the outcome.

mod canceller;
mod events;
mod framework;
mod imp;

pub use canceller::*;
pub use events::*;
pub use framework::*;
pub use imp::*;
