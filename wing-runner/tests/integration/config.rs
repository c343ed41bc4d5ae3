// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::Result;
use indoc::indoc;
use pretty_assertions::assert_eq;
use wing_runner::{
    config::{CONFIG_PATH, ProjectConfig},
    errors::{ConfigError, TestRunnerBuildError},
    runner::{RunCanceller, TestFramework, TestRunnerBuilder},
    test_command::CommandStyle,
    test_run::{TestPattern, TestRunHistory, TestRunMode, TestRunState},
};

#[cfg(unix)]
#[test]
fn runner_from_project_config() -> Result<()> {
    test_init();
    let project = CartProject::new()?;
    project.write("tmp/results.xml", RESULTS_XML)?;
    project.write(
        CONFIG_PATH,
        indoc! {r#"
            test_command = "echo bin/rspec"
            test_results_path = "tmp/results.xml"
            command_style = "separate_args"
        "#},
    )?;
    let fs = project.fs()?;

    let config = ProjectConfig::from_default_location(project.root())?;
    assert_eq!(config.command_style, Some(CommandStyle::SeparateArgs));

    let mut builder = TestRunnerBuilder::default();
    config.apply_to(&mut builder);
    // Command-line values are applied last and win.
    builder
        .set_framework("minitest")
        .set_diff_source(FixtureDiffs::default());
    let runner = builder.build(&fs)?;
    assert_eq!(runner.framework(), TestFramework::Minitest);

    let mut history = TestRunHistory::new();
    let run_id = history
        .add(
            vec![
                TestPattern::new("spec/models/cart_spec.rb:8"),
                TestPattern::new("spec/models/cart spec.rb"),
            ],
            TestRunMode::RunSelectedPatterns,
        )
        .id();
    assert_eq!(
        runner.command_for(&history, run_id)?,
        "echo bin/rspec spec/models/cart_spec.rb:8 'spec/models/cart spec.rb'"
    );

    runner.execute(&mut history, run_id, &RunCanceller::new(), |_| {})?;
    let run = history.get(run_id)?;
    assert_eq!(run.state(), TestRunState::Complete, "error: {:?}", run.error());
    let result = run.result().expect("complete run has a result");
    assert_eq!(
        result.command_output,
        "bin/rspec spec/models/cart_spec.rb:8 spec/models/cart spec.rb\n"
    );
    assert_eq!(result.summary().total, 6);

    Ok(())
}

#[test]
fn framework_inferred_from_config_command() -> Result<()> {
    test_init();
    let project = CartProject::new()?;
    project.write(CONFIG_PATH, "test_command = \"rspec --format progress\"\n")?;
    let fs = project.fs()?;

    let config = ProjectConfig::from_default_location(project.root())?;
    let mut builder = TestRunnerBuilder::default();
    config.apply_to(&mut builder);
    // rspec is unlikely to be installed here: inference happens before the lookup.
    match builder.build(&fs) {
        Ok(runner) => assert_eq!(runner.framework(), TestFramework::Rspec),
        Err(TestRunnerBuildError::CommandNotFound(err)) => assert_eq!(err.program(), "rspec"),
        Err(other) => return Err(other.into()),
    }

    project.write(CONFIG_PATH, "test_command = \"make test\"\n")?;
    let config = ProjectConfig::from_default_location(project.root())?;
    let mut builder = TestRunnerBuilder::default();
    config.apply_to(&mut builder);
    let err = builder
        .build(&fs)
        .expect_err("framework cannot be inferred from make");
    assert!(
        matches!(err, TestRunnerBuildError::Config(ConfigError::FrameworkUnset)),
        "{err:?}"
    );

    Ok(())
}
