// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validated absolute and relative paths.
//!
//! Both path types are *cleaned* on construction: `.` segments are removed, `..` segments are
//! resolved lexically, and repeated separators are collapsed. No filesystem access is performed.

use crate::errors::PathError;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::fmt;

/// An absolute, cleaned filesystem path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AbsPath(Utf8PathBuf);

impl AbsPath {
    /// Creates a new `AbsPath`, failing if the input is empty or not absolute.
    pub fn new(path: impl AsRef<str>) -> Result<Self, PathError> {
        let path = path.as_ref();
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        let cleaned = clean(Utf8Path::new(path));
        if cleaned.is_absolute() {
            Ok(Self(cleaned))
        } else {
            Err(PathError::NotAbsolute { path: cleaned })
        }
    }

    /// Creates a new `AbsPath`, resolving a relative input against `base`.
    pub fn resolve(base: &AbsPath, path: impl AsRef<str>) -> Result<Self, PathError> {
        let path = path.as_ref();
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        if Utf8Path::new(path).is_absolute() {
            Self::new(path)
        } else {
            Ok(Self(clean(&base.0.join(path))))
        }
    }

    /// Joins a relative path onto this one.
    pub fn join(&self, rel: &RelPath) -> AbsPath {
        AbsPath(clean(&self.0.join(&rel.0)))
    }

    /// Returns the path as a [`Utf8Path`].
    pub fn as_path(&self) -> &Utf8Path {
        &self.0
    }

    /// Returns the path as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the final component of the path, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name()
    }
}

impl AsRef<Utf8Path> for AbsPath {
    fn as_ref(&self) -> &Utf8Path {
        &self.0
    }
}

impl fmt::Display for AbsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A relative, cleaned filesystem path.
///
/// The cleaned form may start with `..` segments: `RelPath` only guarantees that the path is
/// not absolute.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelPath(Utf8PathBuf);

impl RelPath {
    /// Creates a new `RelPath`, failing if the input is empty or absolute.
    pub fn new(path: impl AsRef<str>) -> Result<Self, PathError> {
        let path = path.as_ref();
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        let cleaned = clean(Utf8Path::new(path));
        if cleaned.is_absolute() {
            Err(PathError::NotRelative { path: cleaned })
        } else {
            Ok(Self(cleaned))
        }
    }

    /// Returns true if the path starts with a `..` segment.
    pub fn escapes_root(&self) -> bool {
        matches!(self.0.components().next(), Some(Utf8Component::ParentDir))
    }

    /// Returns the path as a [`Utf8Path`].
    pub fn as_path(&self) -> &Utf8Path {
        &self.0
    }

    /// Returns the path as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<Utf8Path> for RelPath {
    fn as_ref(&self) -> &Utf8Path {
        &self.0
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lexically cleans a path.
///
/// An empty relative result is returned as `.`. `..` segments directly under the root are
/// dropped, since the root's parent is the root itself.
pub(crate) fn clean(path: &Utf8Path) -> Utf8PathBuf {
    let mut prefix = Utf8PathBuf::new();
    let mut has_root = false;
    let mut parts: Vec<&str> = Vec::new();

    for component in path.components() {
        match component {
            Utf8Component::Prefix(p) => prefix.push(p.as_str()),
            Utf8Component::RootDir => has_root = true,
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if has_root => {}
                _ => parts.push(".."),
            },
            Utf8Component::Normal(part) => parts.push(part),
        }
    }

    let mut cleaned = prefix;
    if has_root {
        cleaned.push(std::path::MAIN_SEPARATOR_STR);
    }
    for part in parts {
        cleaned.push(part);
    }
    if cleaned.as_str().is_empty() {
        cleaned.push(".");
    }
    cleaned
}
