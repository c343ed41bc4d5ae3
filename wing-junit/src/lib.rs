// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read JUnit reports in Rust.
//!
//! Test runners for many languages can emit their results as JUnit-style XML. This crate
//! provides a data model for those reports along with a lenient reader that tolerates the noise
//! test runners tend to print around the document.
//!
//! # Examples
//!
//! ```
//! use wing_junit::{Report, TestcaseStatus};
//!
//! let xml = r#"<testsuite name="models" tests="1">
//!     <testcase classname="User" name="is valid"/>
//! </testsuite>"#;
//! let report = Report::deserialize_from_str(xml).unwrap();
//! assert_eq!(report.tests, 1);
//! assert!(matches!(
//!     report.testsuites[0].testcases[0].status,
//!     TestcaseStatus::Success
//! ));
//! ```

mod deserialize;
mod errors;
mod report;

pub use errors::*;
pub use report::*;
