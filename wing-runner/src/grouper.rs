// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Clusters failures that share a root cause.

use crate::{backtrace::Backtrace, test_result::TestResult};
use indexmap::IndexMap;

/// Computes the key that failures are grouped by.
pub trait GroupingStrategy {
    /// Returns the group key for a backtrace. Failures with equal keys end up in one group.
    fn group_key(&self, backtrace: &Backtrace) -> String;
}

/// Groups by the location where the error surfaced: the bottom frame's `path:line`.
///
/// Failures without a usable bottom frame get the empty key.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorLocationStrategy;

impl GroupingStrategy for ErrorLocationStrategy {
    fn group_key(&self, backtrace: &Backtrace) -> String {
        backtrace
            .last()
            .and_then(|frame| frame.location())
            .unwrap_or_default()
    }
}

/// A set of failures that share a group key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureGroup {
    /// The key the members share.
    pub key: String,

    /// The failure message of the first member.
    pub error_message: String,

    /// The effective backtrace of the first member.
    pub normalized_backtrace: Backtrace,

    /// The failed tests in this group, in input order.
    pub members: Vec<TestResult>,
}

impl FailureGroup {
    /// Returns the number of failed tests in the group.
    pub fn count(&self) -> usize {
        self.members.len()
    }
}

/// Groups failed tests by a [`GroupingStrategy`].
#[derive(Clone, Debug, Default)]
pub struct Grouper<S = ErrorLocationStrategy> {
    strategy: S,
}

impl Grouper {
    /// Creates a grouper that groups by error location.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: GroupingStrategy> Grouper<S> {
    /// Creates a grouper with a custom strategy.
    pub fn with_strategy(strategy: S) -> Self {
        Self { strategy }
    }

    /// Groups the failed results in `results`; passing and skipped ones are ignored.
    ///
    /// Failures whose key is empty have no usable frame to group by, and are left out.
    ///
    /// Groups are returned largest first. Groups of equal size keep the order in which their
    /// first member appeared.
    pub fn group(&self, results: &[TestResult]) -> Vec<FailureGroup> {
        let mut groups: IndexMap<String, FailureGroup> = IndexMap::new();
        for result in results.iter().filter(|result| result.is_failed()) {
            let backtrace = result.effective_backtrace();
            let key = self.strategy.group_key(backtrace);
            if key.is_empty() {
                continue;
            }
            groups
                .entry(key)
                .or_insert_with_key(|key| FailureGroup {
                    key: key.clone(),
                    error_message: result.failure_details.clone(),
                    normalized_backtrace: backtrace.clone(),
                    members: Vec::new(),
                })
                .members
                .push(result.clone());
        }

        let mut groups: Vec<_> = groups.into_values().collect();
        // sort_by is stable.
        groups.sort_by(|a, b| b.count().cmp(&a.count()));
        groups
    }
}
