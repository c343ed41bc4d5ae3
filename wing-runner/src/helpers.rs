// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Miscellaneous helpers.

/// Utilities for pluralizing various words based on count or plurality.
pub mod plural {
    /// Returns "test" if `count` is 1, otherwise "tests".
    pub fn tests_str(count: usize) -> &'static str {
        if count == 1 { "test" } else { "tests" }
    }

    /// Returns "group" if `count` is 1, otherwise "groups".
    pub fn groups_str(count: usize) -> &'static str {
        if count == 1 { "group" } else { "groups" }
    }

    /// Returns "failure" if `count` is 1, otherwise "failures".
    pub fn failures_str(count: usize) -> &'static str {
        if count == 1 { "failure" } else { "failures" }
    }

    /// Returns "run" if `count` is 1, otherwise "runs".
    pub fn runs_str(count: usize) -> &'static str {
        if count == 1 { "run" } else { "runs" }
    }
}

/// Returns the number of decimal digits in `n`.
pub(crate) fn usize_decimal_char_width(n: usize) -> usize {
    // checked_ilog10 returns 0 for 1-9, 1 for 10-99, etc. (and None for 0)
    (n.checked_ilog10().unwrap_or(0) + 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decimal_char_width() {
        let tests = [(0, 1), (9, 1), (10, 2), (99, 2), (100, 3), (123_456, 6)];
        for (input, output) in tests {
            assert_eq!(usize_decimal_char_width(input), output, "width of {input}");
        }
    }

    #[test]
    fn plurals() {
        assert_eq!(plural::runs_str(1), "run");
        assert_eq!(plural::runs_str(2), "runs");
        assert_eq!(plural::tests_str(0), "tests");
        assert_eq!(plural::failures_str(1), "failure");
    }
}
