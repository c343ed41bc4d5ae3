// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Triage failing tests from the command line.
//!
//! `wing-commander start` runs a project's test command, reads the JUnit XML it produces, and
//! prints the failures grouped by where they surfaced, with the lines that changed recently
//! marked in each backtrace.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter};
