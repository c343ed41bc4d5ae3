// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filters backtraces down to project frames.

use crate::{project_fs::ProjectFs, test_result::TestResult};

/// Computes the filtered backtrace of each result.
#[derive(Clone, Copy, Debug)]
pub struct BacktraceNormalizer<'fs> {
    fs: &'fs ProjectFs,
}

impl<'fs> BacktraceNormalizer<'fs> {
    /// Creates a new normalizer.
    pub fn new(fs: &'fs ProjectFs) -> Self {
        Self { fs }
    }

    /// Returns a copy of `results` with `filtered_backtrace` set to the project frames of
    /// `full_backtrace`. Everything else is unchanged.
    pub fn normalize(&self, results: &[TestResult]) -> Vec<TestResult> {
        results
            .iter()
            .map(|result| {
                let mut result = result.clone();
                self.normalize_one(&mut result);
                result
            })
            .collect()
    }

    /// Sets `filtered_backtrace` on a single result in place.
    pub fn normalize_one(&self, result: &mut TestResult) {
        result.filtered_backtrace = result.full_backtrace.project_only(self.fs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backtrace::{Backtrace, StackFrame},
        paths::AbsPath,
        test_result::TestStatus,
    };
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_strategy::proptest;

    fn frame(path: &str, line: u32) -> StackFrame {
        StackFrame::new(AbsPath::new(path).expect("valid path"), line, "")
    }

    #[cfg(unix)]
    #[test]
    fn keeps_project_frames_in_order() {
        let fs = ProjectFs::new(AbsPath::new("/repo").expect("valid"), None).expect("valid fs");
        let mut result = TestResult::new(1, "User", "saves", TestStatus::Fail);
        result.full_backtrace = Backtrace::from(vec![
            frame("/gems/rspec-core/example.rb", 100),
            frame("/repo/spec/user_spec.rb", 7),
            frame("/usr/lib/ruby/kernel.rb", 1),
            frame("/repo/app/models/user.rb", 42),
            StackFrame::default(),
        ]);
        let passing = TestResult::new(2, "User", "loads", TestStatus::Pass);

        let normalized = BacktraceNormalizer::new(&fs).normalize(&[result.clone(), passing.clone()]);
        assert_eq!(
            normalized[0].filtered_backtrace,
            Backtrace::from(vec![
                frame("/repo/spec/user_spec.rb", 7),
                frame("/repo/app/models/user.rb", 42),
            ])
        );
        assert_eq!(normalized[0].full_backtrace, result.full_backtrace);
        assert_eq!(normalized[1], passing);
    }

    #[cfg(unix)]
    #[proptest]
    fn filtered_is_subsequence_of_full(
        #[strategy(proptest::collection::vec((any::<bool>(), 1..500u32), 0..20))] frames: Vec<(
            bool,
            u32,
        )>,
    ) {
        let fs = ProjectFs::new(AbsPath::new("/repo").expect("valid"), None).expect("valid fs");
        let mut result = TestResult::new(1, "", "t", TestStatus::Fail);
        result.full_backtrace = frames
            .iter()
            .map(|&(in_project, line)| {
                if in_project {
                    frame("/repo/lib/a.rb", line)
                } else {
                    frame("/gems/b.rb", line)
                }
            })
            .collect();

        let normalizer = BacktraceNormalizer::new(&fs);
        let once = normalizer.normalize(std::slice::from_ref(&result));
        let filtered = once[0].filtered_backtrace.frames();

        let mut full = result.full_backtrace.iter();
        for frame in filtered {
            prop_assert!(full.any(|f| f == frame), "{frame} is not in order in the full backtrace");
            prop_assert!(frame.file_path.as_ref().is_some_and(|p| fs.is_project_file(p)));
        }
        prop_assert_eq!(
            filtered.len(),
            frames.iter().filter(|(in_project, _)| *in_project).count()
        );

        let twice = normalizer.normalize(&once);
        prop_assert_eq!(twice, once);
    }
}
