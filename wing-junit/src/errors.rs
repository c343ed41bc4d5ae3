// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use quick_xml::events::attributes::AttrError;
use std::io;
use thiserror::Error;

/// An error that occurs while reading a [`Report`](crate::Report).
///
/// Returned by [`Report::deserialize`](crate::Report::deserialize) and
/// [`Report::deserialize_from_str`](crate::Report::deserialize_from_str).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeserializeError {
    /// The input was empty or contained only whitespace.
    #[error("input is empty")]
    Empty,

    /// No `<testsuites>` or `<testsuite>` element was found in the input.
    #[error("no <testsuites> or <testsuite> element found in input")]
    NoRoot,

    /// The document's root element was something other than `<testsuites>` or `<testsuite>`.
    #[error("unexpected root element <{name}>, expected <testsuites> or <testsuite>")]
    UnexpectedRoot {
        /// The name of the element.
        name: String,
    },

    /// The input ended before an element was closed.
    #[error("unexpected end of input inside <{element}>")]
    UnexpectedEof {
        /// The innermost element that was still open.
        element: String,
    },

    /// An attribute had a value that could not be interpreted.
    #[error("invalid value `{value}` for attribute `{attribute}` on <{element}>")]
    InvalidAttribute {
        /// The element the attribute was found on.
        element: &'static str,
        /// The name of the attribute.
        attribute: &'static str,
        /// The raw value.
        value: String,
    },

    /// The XML itself was malformed.
    #[error("malformed XML")]
    Xml(#[from] quick_xml::Error),

    /// An attribute was malformed.
    #[error("malformed XML attribute")]
    Attribute(#[from] AttrError),

    /// An error occurred while reading the input.
    #[error("error reading JUnit input")]
    Io(#[from] io::Error),
}
