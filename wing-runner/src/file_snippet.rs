// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::FileSnippetError;
use camino::{Utf8Path, Utf8PathBuf};

/// A line of a [`FileSnippet`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnippetLine {
    /// The 1-based line number.
    pub number: u32,

    /// The line's text, without its line terminator.
    pub content: String,

    /// True for the line the snippet is centred on.
    pub is_center: bool,
}

/// A range of lines around a line of interest in a source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSnippet {
    path: Utf8PathBuf,
    lines: Vec<SnippetLine>,
}

impl FileSnippet {
    /// Reads up to `size` lines on either side of `center` (1-based) from the file at `path`.
    ///
    /// The range is clipped to the start and end of the file.
    pub fn extract(path: &Utf8Path, center: u32, size: u32) -> Result<Self, FileSnippetError> {
        if center < 1 {
            return Err(FileSnippetError::InvalidLine { line: center });
        }
        let contents = std::fs::read_to_string(path).map_err(|error| FileSnippetError::Read {
            path: path.to_owned(),
            error,
        })?;
        Self::from_contents(path, &contents, center, size)
    }

    fn from_contents(
        path: &Utf8Path,
        contents: &str,
        center: u32,
        size: u32,
    ) -> Result<Self, FileSnippetError> {
        let line_count = contents.lines().count();
        if center as usize > line_count {
            return Err(FileSnippetError::LineOutOfRange {
                path: path.to_owned(),
                line: center,
                line_count,
            });
        }

        let first = center.saturating_sub(size).max(1);
        let last = center.saturating_add(size);
        let lines = (1..)
            .zip(contents.lines())
            .skip_while(|&(number, _)| number < first)
            .take_while(|&(number, _)| number <= last)
            .map(|(number, content)| SnippetLine {
                number,
                content: content.to_owned(),
                is_center: number == center,
            })
            .collect();

        Ok(Self {
            path: path.to_owned(),
            lines,
        })
    }

    /// Returns the path the snippet was read from.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the lines of the snippet, in order.
    pub fn lines(&self) -> &[SnippetLine] {
        &self.lines
    }
}
