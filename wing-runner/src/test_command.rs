// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds the command line that runs a selection of tests.

use crate::test_run::TestPattern;
use serde::Deserialize;
use std::{fmt, str::FromStr};

/// How test patterns are appended to the command template.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStyle {
    /// All patterns as one double-quoted, space-separated argument: `template "p1 p2"`.
    ///
    /// Patterns are inserted verbatim, so they must not contain double quotes.
    #[default]
    QuotedBlock,

    /// Each pattern as its own shell-quoted argument: `template p1 'p 2'`.
    SeparateArgs,
}

impl CommandStyle {
    /// Returns the string form of the style, as used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            CommandStyle::QuotedBlock => "quoted_block",
            CommandStyle::SeparateArgs => "separate_args",
        }
    }
}

impl fmt::Display for CommandStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quoted_block" => Ok(CommandStyle::QuotedBlock),
            "separate_args" => Ok(CommandStyle::SeparateArgs),
            other => Err(format!(
                "unrecognized command style: {other} (known styles: quoted_block, separate_args)"
            )),
        }
    }
}

/// Combines a command template with test patterns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandBuilder {
    template: String,
    style: CommandStyle,
}

impl CommandBuilder {
    /// Creates a builder with the default style.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            style: CommandStyle::default(),
        }
    }

    /// Sets the style used to append patterns.
    pub fn set_style(&mut self, style: CommandStyle) -> &mut Self {
        self.style = style;
        self
    }

    /// Returns the command template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the command line that runs `patterns`.
    ///
    /// An empty template yields an empty command. With no patterns, the template is returned
    /// unchanged.
    pub fn build(&self, patterns: &[TestPattern]) -> String {
        if self.template.is_empty() {
            return String::new();
        }
        if patterns.is_empty() {
            return self.template.clone();
        }

        match self.style {
            CommandStyle::QuotedBlock => {
                let joined = patterns
                    .iter()
                    .map(TestPattern::as_str)
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{} \"{joined}\"", self.template)
            }
            CommandStyle::SeparateArgs => {
                let joined = shell_words::join(patterns.iter().map(TestPattern::as_str));
                format!("{} {joined}", self.template)
            }
        }
    }
}
