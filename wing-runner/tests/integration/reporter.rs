// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::Result;
use pretty_assertions::assert_eq;
use wing_runner::{
    reporter::RunReporter,
    runner::{RunCanceller, TestRunnerBuilder},
    test_run::{TestRunHistory, TestRunMode},
};

#[cfg(unix)]
#[test]
fn report_with_snippets() -> Result<()> {
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
    runner.execute(&mut history, run_id, &RunCanceller::new(), |_| {})?;

    let mut reporter = RunReporter::new(&fs);
    reporter.set_snippet_lines(Some(1));
    let mut buf = Vec::new();
    reporter.write_history(&history, &mut buf)?;
    let output = String::from_utf8(buf)?;

    // The summary line ends with the elapsed time, which varies.
    let lines: Vec<_> = output
        .lines()
        .map(|line| {
            if line.trim_start().starts_with("Summary") {
                line.rsplit_once(" in ").map_or(line, |(head, _)| head)
            } else {
                line
            }
        })
        .collect();
    assert_eq!(
        lines,
        [
            "      Run #1 run_whole_suite: complete",
            "     Command cat results.xml",
            "     Summary 6 tests run: 1 passed, 4 failed, 1 skipped (3 failure groups)",
            "",
            "        FAIL [1] 2 failures: app/models/cart.rb:3",
            "             undefined method 'price' for nil",
            "             - [C] spec.models.cart_spec.Cart applies discounts",
            "             - [C] spec.models.cart_spec.Cart computes tax",
            "               *** app/models/cart.rb:3 in Cart#total",
            "               2 |   def total",
            "             > 3 |     items.sum(&:price)",
            "               4 |   end",
            "",
            "        FAIL [2] 1 failure: spec/models/cart_spec.rb:9",
            "             expected: 30",
            "                  got: 25",
            "             - [A] spec.models.cart_spec.Cart sums prices",
            "                   spec/models/cart_spec.rb:9 in block (2 levels) in <top (required)>",
            "                8 |   it \"sums prices\" do",
            "             >  9 |     expect(cart.total).to eq(30)",
            "               10 |   end",
            "",
            "        FAIL [3] 1 failure: spec/models/cart_spec.rb:27",
            "             uninitialized constant Item",
            "             - [T] spec.models.cart_spec.Cart builds items",
            "                 * spec/models/cart_spec.rb:27 in block (2 levels) in <top (required)>",
            "               26 |   it \"builds items\" do",
            "             > 27 |     expect(Item.build(cart)).to be_valid",
            "               28 |   end",
        ]
    );

    Ok(())
}
