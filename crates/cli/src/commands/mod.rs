// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod config;
pub mod operate;
pub mod watch;

use std::path::PathBuf;

use crate::config::default_config_path;

/// The config file named on the command line, or the default location.
pub(crate) fn config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(default_config_path)
}
