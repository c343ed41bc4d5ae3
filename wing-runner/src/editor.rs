// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command lines for opening a file at a line in the user's editor.
//!
//! Editors disagree on how a line number is passed, so the arguments depend on which family the
//! editor belongs to:
//!
//! | Family | Arguments |
//! |--------|-----------|
//! | vim, nvim, vi, nano | `path +N` |
//! | VS Code | `--goto path:N` |
//! | Sublime Text, Atom, Zed | `path:N` |
//! | Emacs | `+N path` |
//! | anything else | `path +N` |

use crate::errors::EditorError;
use camino::Utf8Path;
use tracing::debug;

/// The editor used when neither `EDITOR` nor `VISUAL` is set.
pub const FALLBACK_EDITOR: &str = "vi";

/// How an editor expects to be told which line to open.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum EditorFamily {
    /// `path +N`, like vim.
    Vim,

    /// `--goto path:N`.
    VsCode,

    /// `path:N`, like Sublime Text.
    ColonSuffix,

    /// `+N path`.
    Emacs,

    /// Unrecognized editors get `path +N`.
    Other,
}

impl EditorFamily {
    /// Determines the family from the editor's program name.
    pub fn from_program(program: &str) -> Self {
        let name = Utf8Path::new(program).file_name().unwrap_or(program);
        let name = name.strip_suffix(".exe").unwrap_or(name);
        match name {
            "vi" | "vim" | "nvim" | "gvim" | "mvim" | "nano" => EditorFamily::Vim,
            "code" | "code-insiders" | "codium" => EditorFamily::VsCode,
            "subl" | "sublime_text" | "atom" | "zed" => EditorFamily::ColonSuffix,
            "emacs" | "emacsclient" => EditorFamily::Emacs,
            _ => EditorFamily::Other,
        }
    }
}

/// An editor command, as configured by the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorCommand {
    program: String,
    extra_args: Vec<String>,
}

impl EditorCommand {
    /// Reads the editor from `EDITOR`, then `VISUAL`, falling back to [`FALLBACK_EDITOR`].
    pub fn from_env() -> Result<Self, EditorError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Parses an editor setting such as `code --wait`.
    pub fn from_editor(value: &str) -> Result<Self, EditorError> {
        let invalid = || EditorError::InvalidCommand {
            value: value.to_owned(),
        };
        let mut words = shell_words::split(value).map_err(|_| invalid())?;
        if words.is_empty() {
            return Err(invalid());
        }
        let program = words.remove(0);
        Ok(Self {
            program,
            extra_args: words,
        })
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EditorError> {
        let value = ["EDITOR", "VISUAL"].into_iter().find_map(|name| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .inspect(|value| debug!("using editor `{value}` from {name}"))
        });
        Self::from_editor(value.as_deref().unwrap_or(FALLBACK_EDITOR))
    }

    /// Returns the editor program.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the editor's family.
    pub fn family(&self) -> EditorFamily {
        EditorFamily::from_program(&self.program)
    }

    /// Returns the arguments that open `path` at `line`, after any configured arguments.
    pub fn open_at(&self, path: &Utf8Path, line: u32) -> Result<Vec<String>, EditorError> {
        if path.as_str().is_empty() {
            return Err(EditorError::EmptyPath);
        }
        if line < 1 {
            return Err(EditorError::InvalidLine {
                path: path.to_owned(),
                line,
            });
        }

        let mut args = self.extra_args.clone();
        match self.family() {
            EditorFamily::Vim | EditorFamily::Other => {
                args.extend([path.to_string(), format!("+{line}")]);
            }
            EditorFamily::VsCode => {
                args.extend(["--goto".to_owned(), format!("{path}:{line}")]);
            }
            EditorFamily::ColonSuffix => args.push(format!("{path}:{line}")),
            EditorFamily::Emacs => args.extend([format!("+{line}"), path.to_string()]),
        }
        Ok(args)
    }

    /// Returns an expression that runs the editor on `path` at `line`.
    ///
    /// The expression inherits the terminal, so that terminal editors work.
    pub fn expression(&self, path: &Utf8Path, line: u32) -> Result<duct::Expression, EditorError> {
        let args = self.open_at(path, line)?;
        Ok(duct::cmd(self.program.as_str(), args))
    }
}
