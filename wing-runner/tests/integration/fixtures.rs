// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::Result;
use std::{io, sync::Once};
use wing_runner::{
    backtrace::ChangeReason, change_detector::DiffSource, errors::DiffUnavailableError,
    paths::AbsPath, project_fs::ProjectFs,
};

pub(crate) static RESULTS_XML: &str = include_str!("../fixtures/cart/results.xml");
static CART_RB: &str = include_str!("../fixtures/cart/cart.rb");
static CART_SPEC_RB: &str = include_str!("../fixtures/cart/cart_spec.rb");

pub(crate) fn test_init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = color_eyre::install();
    });
}

/// A temporary Ruby project with a results file at its root.
pub(crate) struct CartProject {
    // Held so that the directory lives as long as the project.
    _temp_dir: Utf8TempDir,
    root: AbsPath,
}

impl CartProject {
    pub(crate) fn new() -> Result<Self> {
        let temp_dir = Utf8TempDir::new()?;
        let root = AbsPath::new(temp_dir.path().as_str())?;
        let project = Self {
            _temp_dir: temp_dir,
            root,
        };
        project.write("results.xml", RESULTS_XML)?;
        project.write("app/models/cart.rb", CART_RB)?;
        project.write("spec/models/cart_spec.rb", CART_SPEC_RB)?;
        Ok(project)
    }

    pub(crate) fn root(&self) -> &AbsPath {
        &self.root
    }

    pub(crate) fn path(&self, rel: &str) -> Utf8PathBuf {
        self.root.as_path().join(rel)
    }

    pub(crate) fn write(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub(crate) fn fs(&self) -> Result<ProjectFs> {
        Ok(ProjectFs::new(self.root.clone(), Some("spec/**/*_spec.rb"))?)
    }
}

/// Serves canned diffs, keyed by absolute path and depth. Anything else is unavailable.
#[derive(Clone, Debug, Default)]
pub(crate) struct FixtureDiffs {
    diffs: Vec<(Utf8PathBuf, ChangeReason, &'static str)>,
}

impl FixtureDiffs {
    pub(crate) fn with_diff(
        mut self,
        path: impl Into<Utf8PathBuf>,
        depth: ChangeReason,
        diff: &'static str,
    ) -> Self {
        self.diffs.push((path.into(), depth, diff));
        self
    }
}

impl DiffSource for FixtureDiffs {
    fn diff(&self, file: &AbsPath, depth: ChangeReason) -> Result<String, DiffUnavailableError> {
        self.diffs
            .iter()
            .find(|(path, d, _)| path.as_path() == file.as_path() && *d == depth)
            .map(|(_, _, diff)| (*diff).to_owned())
            .ok_or_else(|| {
                DiffUnavailableError::new(
                    file.as_path(),
                    depth,
                    io::Error::new(io::ErrorKind::NotFound, "no canned diff"),
                )
            })
    }
}

/// The diffs used by most tests: line 3 of the cart model has uncommitted changes.
pub(crate) fn cart_diffs(project: &CartProject) -> FixtureDiffs {
    FixtureDiffs::default()
        .with_diff(
            project.path("app/models/cart.rb"),
            ChangeReason::Uncommitted,
            "diff --git a/app/models/cart.rb b/app/models/cart.rb\n@@ -3 +3 @@\n-    items.sum(&:cost)\n+    items.sum(&:price)\n",
        )
        .with_diff(
            project.path("spec/models/cart_spec.rb"),
            ChangeReason::PreviousCommit,
            "@@ -25,0 +26,2 @@\n",
        )
}

pub(crate) fn relative<'a>(project: &CartProject, path: &'a Utf8Path) -> &'a Utf8Path {
    path.strip_prefix(project.root().as_path()).unwrap_or(path)
}
