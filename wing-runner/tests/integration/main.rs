// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the test-run pipeline.

mod basic;
mod config;
mod fixtures;
mod reporter;
