// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};
use wing_runner::{
    runner::{ExecutionSummary, RunCanceller, RunEvent, TestRunnerBuilder},
    test_result::{FailureCause, TestStatus},
    test_run::{TestPattern, TestRunHistory, TestRunMode, TestRunState},
};

#[cfg(unix)]
#[test]
fn whole_suite_run() -> Result<()> {
    test_init();
    let project = CartProject::new()?;
    let fs = project.fs()?;

    let mut builder = TestRunnerBuilder::default();
    builder
        .set_framework("rspec")
        .set_command("cat results.xml")
        .set_diff_source(cart_diffs(&project));
    let runner = builder.build(&fs)?;

    let mut history = TestRunHistory::new();
    let run_id = history.add(Vec::new(), TestRunMode::RunWholeSuite).id();
    let mut events = Vec::new();
    runner.execute(&mut history, run_id, &RunCanceller::new(), |event| {
        events.push(event)
    })?;

    let expected_summary = ExecutionSummary {
        total: 6,
        passed: 1,
        failed: 4,
        skipped: 1,
        failure_groups: 3,
    };
    assert_eq!(
        events,
        [
            RunEvent::Started {
                run_id,
                command: "cat results.xml".to_owned(),
            },
            RunEvent::StateChanged {
                run_id,
                state: TestRunState::Parsed,
            },
            RunEvent::StateChanged {
                run_id,
                state: TestRunState::Annotated,
            },
            RunEvent::Finished {
                run_id,
                summary: expected_summary,
            },
        ]
    );

    let run = history.get(run_id)?;
    assert_eq!(run.state(), TestRunState::Complete);
    assert_eq!(run.error(), None);
    let result = run.result().expect("complete run has a result");
    assert_eq!(result.summary(), expected_summary);
    assert_eq!(result.totals.total, 6);
    assert_eq!(result.totals.failed, 4);
    assert!(
        result.command_output.starts_with("Randomized with seed 1234"),
        "command output is kept verbatim"
    );

    let ids: Vec<_> = result.test_results.iter().map(|r| r.id).collect();
    assert_eq!(ids, [1, 2, 3, 4, 5, 6]);

    let outcomes: Vec<_> = result
        .test_results
        .iter()
        .map(|r| (r.test_case_name.as_str(), r.status, r.failure_cause))
        .collect();
    assert_eq!(
        outcomes,
        [
            (
                "Cart sums prices",
                TestStatus::Fail,
                Some(FailureCause::AssertionFailure)
            ),
            ("Cart is empty by default", TestStatus::Pass, None),
            (
                "Cart applies discounts",
                TestStatus::Fail,
                Some(FailureCause::ProductionCodeError)
            ),
            (
                "Cart computes tax",
                TestStatus::Fail,
                Some(FailureCause::ProductionCodeError)
            ),
            ("Cart ships abroad", TestStatus::Skip, None),
            (
                "Cart builds items",
                TestStatus::Fail,
                Some(FailureCause::TestDefinitionError)
            ),
        ]
    );

    // Gem frames are dropped from the filtered backtrace only.
    let discounts = &result.test_results[2];
    assert_eq!(discounts.full_backtrace.len(), 2);
    assert_eq!(discounts.filtered_backtrace.len(), 1);
    assert_eq!(
        discounts.failure_file_path.as_ref().map(|p| p.as_path()),
        Some(project.path("app/models/cart.rb").as_path())
    );
    assert_eq!(discounts.failure_line_number, 3);

    let groups: Vec<_> = result
        .failure_groups
        .iter()
        .map(|group| {
            let key = relative(&project, group.key.as_ref()).to_string();
            let names: Vec<_> = group
                .members
                .iter()
                .map(|member| member.test_case_name.as_str())
                .collect();
            (key, names)
        })
        .collect();
    assert_eq!(
        groups,
        [
            (
                "app/models/cart.rb:3".to_owned(),
                vec!["Cart applies discounts", "Cart computes tax"]
            ),
            (
                "spec/models/cart_spec.rb:9".to_owned(),
                vec!["Cart sums prices"]
            ),
            (
                "spec/models/cart_spec.rb:27".to_owned(),
                vec!["Cart builds items"]
            ),
        ]
    );

    // Change heat: the cart model has uncommitted edits, the spec was touched two commits ago.
    let heat: Vec<_> = result
        .failure_groups
        .iter()
        .map(|group| {
            let frame = group
                .normalized_backtrace
                .last()
                .expect("every group has a location");
            (frame.change_intensity(), frame.change_reason())
        })
        .collect();
    assert_eq!(heat, [(3, "uncommitted"), (0, ""), (1, "previous_commit")]);

    Ok(())
}

#[cfg(unix)]
#[test]
fn rerun_failures() -> Result<()> {
    test_init();
    let project = CartProject::new()?;
    let fs = project.fs()?;

    let mut builder = TestRunnerBuilder::default();
    builder
        .set_framework("rspec")
        .set_command("cat results.xml")
        .set_diff_source(FixtureDiffs::default());
    let runner = builder.build(&fs)?;

    let mut history = TestRunHistory::new();
    let first = history.add(Vec::new(), TestRunMode::RunWholeSuite).id();
    runner.execute(&mut history, first, &RunCanceller::new(), |_| {})?;

    let result = history
        .get(first)?
        .result()
        .cloned()
        .expect("first run completed");
    let patterns: Vec<TestPattern> = result
        .failed_tests()
        .filter_map(|failure| failure.rerun_pattern(&fs))
        .collect();
    assert_eq!(
        patterns,
        [
            TestPattern::new("spec/models/cart_spec.rb:8"),
            TestPattern::new("spec/models/cart_spec.rb:14"),
            TestPattern::new("spec/models/cart_spec.rb:20"),
            TestPattern::new("spec/models/cart_spec.rb:26"),
        ]
    );

    let second = history.add(patterns, TestRunMode::RerunAllFailures).id();
    let expected_command = "cat results.xml \"spec/models/cart_spec.rb:8 spec/models/cart_spec.rb:14 \
                            spec/models/cart_spec.rb:20 spec/models/cart_spec.rb:26\"";
    assert_eq!(runner.command_for(&history, second)?, expected_command);

    // cat complains about the pattern block on stderr, after printing the results.
    runner.execute(&mut history, second, &RunCanceller::new(), |_| {})?;
    let run = history.get(second)?;
    assert_eq!(run.state(), TestRunState::Complete, "error: {:?}", run.error());
    assert_eq!(run.command(), Some(expected_command));
    assert_eq!(run.mode(), TestRunMode::RerunAllFailures);

    let ids: Vec<_> = history.all_recent_first().map(|run| run.id()).collect();
    assert_eq!(ids, [second, first]);
    assert_eq!(history.most_recent().map(|run| run.id()), Some(second));

    Ok(())
}

#[cfg(unix)]
#[test]
fn results_file() -> Result<()> {
    test_init();
    let project = CartProject::new()?;
    project.write("tmp/rspec.xml", RESULTS_XML)?;
    let fs = project.fs()?;

    let mut builder = TestRunnerBuilder::default();
    builder
        .set_framework("rspec")
        .set_command("echo finished")
        .set_results_path("tmp/rspec.xml")
        .set_diff_source(FixtureDiffs::default());
    let runner = builder.build(&fs)?;

    let mut history = TestRunHistory::new();
    let run_id = history.add(Vec::new(), TestRunMode::RunWholeSuite).id();
    runner.execute(&mut history, run_id, &RunCanceller::new(), |_| {})?;

    let run = history.get(run_id)?;
    assert_eq!(run.state(), TestRunState::Complete, "error: {:?}", run.error());
    let result = run.result().expect("complete run has a result");
    assert_eq!(result.summary().failed, 4);
    assert_eq!(result.command_output, "finished\n");

    Ok(())
}

#[cfg(unix)]
#[test]
fn missing_results_file() -> Result<()> {
    test_init();
    let project = CartProject::new()?;
    let fs = project.fs()?;

    let mut builder = TestRunnerBuilder::default();
    builder
        .set_framework("rspec")
        .set_command("echo finished")
        .set_results_path("tmp/missing.xml")
        .set_diff_source(FixtureDiffs::default());
    let runner = builder.build(&fs)?;

    let mut history = TestRunHistory::new();
    let run_id = history.add(Vec::new(), TestRunMode::RunWholeSuite).id();
    let mut events = Vec::new();
    runner.execute(&mut history, run_id, &RunCanceller::new(), |event| {
        events.push(event)
    })?;

    let run = history.get(run_id)?;
    assert_eq!(run.state(), TestRunState::Failed);
    assert!(run.result().is_none());
    let error = run.error().expect("failed run has an error");
    ensure!(
        error.contains("failed to read test results from"),
        "unexpected error: {error}"
    );
    assert!(
        matches!(events.last(), Some(RunEvent::Failed { error: e, .. }) if e == error),
        "{events:?}"
    );

    Ok(())
}

#[cfg(unix)]
#[test]
fn cancel_running_command() -> Result<()> {
    test_init();
    let project = CartProject::new()?;
    let fs = project.fs()?;

    let mut builder = TestRunnerBuilder::default();
    builder
        .set_framework("rspec")
        .set_command("sleep 30")
        .set_diff_source(FixtureDiffs::default());
    let runner = builder.build(&fs)?;

    let mut history = TestRunHistory::new();
    let run_id = history.add(Vec::new(), TestRunMode::RunWholeSuite).id();

    let canceller = RunCanceller::new();
    let handle = {
        let canceller = canceller.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            canceller.cancel();
        })
    };

    let start = Instant::now();
    let mut events = Vec::new();
    runner.execute(&mut history, run_id, &canceller, |event| events.push(event))?;
    let elapsed = start.elapsed();
    handle.join().expect("cancel thread exited");

    ensure!(
        elapsed < Duration::from_secs(20),
        "cancellation took too long: {elapsed:?}"
    );
    let run = history.get(run_id)?;
    assert_eq!(run.state(), TestRunState::Failed);
    assert_eq!(run.error(), Some("cancelled"));
    assert!(run.result().is_none());
    assert_eq!(
        events.last(),
        Some(&RunEvent::Failed {
            run_id,
            error: "cancelled".to_owned(),
        })
    );

    Ok(())
}
