// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-project configuration, read from `.wing_commander/config.toml`.
//!
//! ```toml
//! test_framework = "rspec"
//! test_command = "bundle exec rspec --format RspecJunitFormatter"
//! test_file_pattern = "spec/**/*_spec.rb"
//! test_results_path = "tmp/rspec.xml"
//! command_style = "quoted_block"
//! exclude_patterns = ["vendor/**"]
//! ```
//!
//! Every key is optional. Values given on the command line take precedence.

use crate::{
    errors::ProjectConfigError, paths::AbsPath, runner::TestRunnerBuilder,
    test_command::CommandStyle,
};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::{collections::BTreeSet, io};
use tracing::{debug, warn};

/// The location of the config file, relative to the project root.
pub const CONFIG_PATH: &str = ".wing_commander/config.toml";

/// Per-project configuration.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// The test framework name.
    #[serde(default)]
    pub test_framework: Option<String>,

    /// The test command template.
    #[serde(default)]
    pub test_command: Option<String>,

    /// A glob selecting test files, relative to the project root.
    #[serde(default)]
    pub test_file_pattern: Option<String>,

    /// A file the test command writes JUnit XML to, if it doesn't print it.
    #[serde(default)]
    pub test_results_path: Option<Utf8PathBuf>,

    /// How test patterns are appended to the command.
    #[serde(default)]
    pub command_style: Option<CommandStyle>,

    /// Accepted for compatibility. Project membership alone decides which frames are kept.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

impl ProjectConfig {
    /// Loads the config file at [`CONFIG_PATH`] under `root`.
    ///
    /// Returns the default configuration if the file does not exist.
    pub fn from_default_location(root: &AbsPath) -> Result<Self, ProjectConfigError> {
        let path = root.as_path().join(CONFIG_PATH);
        Ok(Self::from_path_with_warnings(&path, &mut DefaultConfigWarnings)?.unwrap_or_default())
    }

    /// Loads a config file that must exist.
    pub fn from_path(path: &Utf8Path) -> Result<Self, ProjectConfigError> {
        Self::from_path_with_warnings(path, &mut DefaultConfigWarnings)?.ok_or_else(|| {
            ProjectConfigError::NotFound {
                path: path.to_owned(),
            }
        })
    }

    /// Applies the configured values to a runner builder.
    ///
    /// Call this before applying command-line values, so that those override these.
    pub fn apply_to(&self, builder: &mut TestRunnerBuilder) {
        if let Some(framework) = &self.test_framework {
            builder.set_framework(framework.clone());
        }
        if let Some(command) = &self.test_command {
            builder.set_command(command.clone());
        }
        if let Some(style) = self.command_style {
            builder.set_command_style(style);
        }
        if let Some(path) = &self.test_results_path {
            builder.set_results_path(path.clone());
        }
    }

    /// Returns `Ok(None)` if the file does not exist.
    fn from_path_with_warnings(
        path: &Utf8Path,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Option<Self>, ProjectConfigError> {
        debug!("project config: attempting to load from {path}");
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("project config: file does not exist at {path}");
                return Ok(None);
            }
            Err(error) => {
                return Err(ProjectConfigError::Read {
                    path: path.to_owned(),
                    error,
                });
            }
        };

        let (config, unknown) =
            Self::deserialize_toml(&contents).map_err(|error| ProjectConfigError::Parse {
                path: path.to_owned(),
                error,
            })?;

        if !unknown.is_empty() {
            warnings.unknown_config_keys(path, &unknown);
        }

        debug!("project config: loaded successfully from {path}");
        Ok(Some(config))
    }

    fn deserialize_toml(contents: &str) -> Result<(Self, BTreeSet<String>), toml::de::Error> {
        let deserializer = toml::Deserializer::parse(contents)?;
        let mut unknown = BTreeSet::new();
        let config: ProjectConfig = serde_ignored::deserialize(deserializer, |path| {
            unknown.insert(path.to_string());
        })?;
        Ok((config, unknown))
    }
}

/// Handling for problems in a config file that don't prevent it from loading.
trait ConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>);
}

/// Logs warnings through `tracing`.
struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
        let mut unknown_str = String::new();
        if let (1, Some(key)) = (unknown.len(), unknown.first()) {
            // Print this on the same line.
            unknown_str.push_str("key: ");
            unknown_str.push_str(key);
        } else {
            unknown_str.push_str("keys:\n");
            for ignored_key in unknown {
                unknown_str.push('\n');
                unknown_str.push_str("  - ");
                unknown_str.push_str(ignored_key);
            }
        }

        warn!("in config file {config_file}, ignoring unknown configuration {unknown_str}");
    }
}
