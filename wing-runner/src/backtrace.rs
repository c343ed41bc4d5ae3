// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stack frames and backtraces extracted from test failures.

use crate::{
    paths::{AbsPath, RelPath},
    project_fs::ProjectFs,
};
use camino::Utf8Path;
use std::fmt;
use tracing::warn;

/// Why a frame's line is considered recently changed.
///
/// Variants are ordered by priority: when a line was touched at several depths, the highest one
/// wins.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeReason {
    /// The line was changed in the commit before the last one.
    PreviousCommit,

    /// The line was changed in the last commit.
    LastCommit,

    /// The line has uncommitted changes.
    Uncommitted,
}

impl ChangeReason {
    /// All reasons, highest priority first.
    pub const ALL: [ChangeReason; 3] = [
        ChangeReason::Uncommitted,
        ChangeReason::LastCommit,
        ChangeReason::PreviousCommit,
    ];

    /// Returns the change intensity associated with this reason, from 1 to 3.
    pub fn intensity(self) -> u8 {
        match self {
            ChangeReason::Uncommitted => 3,
            ChangeReason::LastCommit => 2,
            ChangeReason::PreviousCommit => 1,
        }
    }

    /// Returns the string form of the reason.
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeReason::Uncommitted => "uncommitted",
            ChangeReason::LastCommit => "last_commit",
            ChangeReason::PreviousCommit => "previous_commit",
        }
    }
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parsed backtrace entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackFrame {
    /// The file the frame points at. `None` for malformed frames.
    pub file_path: Option<AbsPath>,

    /// The line number, or 0 if unknown.
    pub line: u32,

    /// The function name, possibly empty.
    pub function: String,

    /// Set if the frame's line was recently changed.
    pub change: Option<ChangeReason>,
}

impl StackFrame {
    /// Creates a frame with no change information.
    pub fn new(file_path: AbsPath, line: u32, function: impl Into<String>) -> Self {
        Self {
            file_path: Some(file_path),
            line,
            function: function.into(),
            change: None,
        }
    }

    /// Parses a frame as printed by a test runner.
    ///
    /// Recognized shapes:
    ///
    /// * `path:line:in 'function'` (with backticks or single quotes, and with or without `in`)
    /// * `path:line`
    /// * `File "path", line N, in function`: kept whole as the path, with line 0
    /// * anything else: kept whole as the path, with line 0
    ///
    /// Relative paths are resolved against the project root. Frames that cannot be resolved get
    /// an empty path and a warning is logged.
    pub fn parse(raw: &str, fs: &ProjectFs) -> Self {
        if raw.is_empty() {
            warn!("empty stack frame");
            return Self::default();
        }

        let (path, line, function) = if raw.starts_with("File \"") {
            (raw, 0, "")
        } else {
            let mut parts = raw.splitn(3, ':');
            let path = parts.next().unwrap_or_default();
            let line = parts.next().map(parse_leading_number).unwrap_or(0);
            let function = parts.next().map(parse_function).unwrap_or_default();
            (path, line, function)
        };

        let file_path = resolve_frame_path(path, fs);
        if file_path.is_none() {
            warn!(frame = %raw, "failed to parse stack frame");
        }

        Self {
            file_path,
            line,
            function: function.to_owned(),
            change: None,
        }
    }

    /// Returns the change intensity: 0 if unchanged, otherwise 1 to 3.
    pub fn change_intensity(&self) -> u8 {
        self.change.map_or(0, ChangeReason::intensity)
    }

    /// Returns the change reason as a string, empty if unchanged.
    pub fn change_reason(&self) -> &'static str {
        self.change.map_or("", ChangeReason::as_str)
    }

    /// Returns the frame's location as `path:line`, or `None` for malformed frames.
    pub fn location(&self) -> Option<String> {
        self.file_path
            .as_ref()
            .map(|path| format!("{path}:{}", self.line))
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file_path {
            Some(path) => write!(f, "{path}:{}", self.line)?,
            None => f.write_str("<unknown>")?,
        }
        if !self.function.is_empty() {
            write!(f, " in {}", self.function)?;
        }
        Ok(())
    }
}

fn parse_leading_number(s: &str) -> u32 {
    let s = s.trim_start();
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    s[..end].parse().unwrap_or(0)
}

fn parse_function(s: &str) -> &str {
    let s = s.trim();
    let s = s.strip_prefix("in ").unwrap_or(s).trim();
    let s = s
        .strip_prefix('`')
        .or_else(|| s.strip_prefix('\''))
        .unwrap_or(s);
    s.strip_suffix('\'')
        .or_else(|| s.strip_suffix('`'))
        .unwrap_or(s)
}

fn resolve_frame_path(path: &str, fs: &ProjectFs) -> Option<AbsPath> {
    if path.is_empty() {
        return None;
    }
    if Utf8Path::new(path).is_absolute() {
        AbsPath::new(path).ok()
    } else {
        RelPath::new(path).ok().map(|rel| fs.abs(&rel))
    }
}

/// An ordered sequence of stack frames, most recent call first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Backtrace {
    frames: Vec<StackFrame>,
}

impl Backtrace {
    /// Creates an empty backtrace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `raw` and appends the resulting frame.
    ///
    /// An empty string appends an all-default frame, so that indexes stay aligned with the
    /// input.
    pub fn append(&mut self, raw: &str, fs: &ProjectFs) {
        self.frames.push(StackFrame::parse(raw, fs));
    }

    /// Appends an already-parsed frame.
    pub fn push(&mut self, frame: StackFrame) {
        self.frames.push(frame);
    }

    /// Returns a new backtrace with only the frames that lie within the project.
    pub fn project_only(&self, fs: &ProjectFs) -> Backtrace {
        let frames = self
            .frames
            .iter()
            .filter(|frame| {
                frame
                    .file_path
                    .as_ref()
                    .is_some_and(|path| fs.is_project_file(path))
            })
            .cloned()
            .collect();
        Backtrace { frames }
    }

    /// Shortens the backtrace to at most `len` frames, keeping the first ones.
    pub fn truncate(&mut self, len: usize) {
        self.frames.truncate(len);
    }

    /// Returns the frames.
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Returns the frames mutably.
    pub fn frames_mut(&mut self) -> &mut [StackFrame] {
        &mut self.frames
    }

    /// Returns the number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if there are no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the top (most recent) frame.
    pub fn first(&self) -> Option<&StackFrame> {
        self.frames.first()
    }

    /// Returns the bottom frame, where the error surfaced.
    pub fn last(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    /// Iterates over the frames, top first.
    pub fn iter(&self) -> std::slice::Iter<'_, StackFrame> {
        self.frames.iter()
    }
}

impl From<Vec<StackFrame>> for Backtrace {
    fn from(frames: Vec<StackFrame>) -> Self {
        Self { frames }
    }
}

impl FromIterator<StackFrame> for Backtrace {
    fn from_iter<I: IntoIterator<Item = StackFrame>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Backtrace {
    type Item = &'a StackFrame;
    type IntoIter = std::slice::Iter<'a, StackFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
