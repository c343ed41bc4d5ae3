// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::ConfigError;
use camino::Utf8Path;
use std::{fmt, str::FromStr};

/// A recognized test framework.
///
/// The framework is informational: the pipeline treats every framework's JUnit output the same
/// way.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TestFramework {
    /// RSpec (Ruby).
    Rspec,

    /// Minitest (Ruby).
    Minitest,

    /// pytest (Python).
    Pytest,

    /// Jest (JavaScript).
    Jest,
}

impl TestFramework {
    /// Returns the names of all recognized frameworks.
    pub fn variants() -> &'static [&'static str] {
        &["rspec", "minitest", "pytest", "jest"]
    }

    /// Returns the name of the framework, as used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            TestFramework::Rspec => "rspec",
            TestFramework::Minitest => "minitest",
            TestFramework::Pytest => "pytest",
            TestFramework::Jest => "jest",
        }
    }

    /// Guesses the framework from the words of a test command.
    ///
    /// Returns the framework named by the first word that identifies one, looking only at file
    /// names (so `bin/rspec` counts as `rspec`).
    pub fn infer_from_command(command: &str) -> Option<Self> {
        let words = shell_words::split(command)
            .unwrap_or_else(|_| command.split_whitespace().map(str::to_owned).collect());
        words.iter().find_map(|word| {
            let name = Utf8Path::new(word).file_name().unwrap_or(word.as_str());
            match name {
                "rspec" => Some(TestFramework::Rspec),
                "minitest" | "rake" => Some(TestFramework::Minitest),
                "pytest" | "py.test" => Some(TestFramework::Pytest),
                "jest" => Some(TestFramework::Jest),
                _ => None,
            }
        })
    }
}

impl fmt::Display for TestFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestFramework {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rspec" => Ok(TestFramework::Rspec),
            "minitest" => Ok(TestFramework::Minitest),
            "pytest" => Ok(TestFramework::Pytest),
            "jest" => Ok(TestFramework::Jest),
            _ => Err(ConfigError::UnknownFramework { name: s.to_owned() }),
        }
    }
}
