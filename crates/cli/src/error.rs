// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::store::StoreError;
use crate::sync::{SyncError, TransportError};

/// All possible errors that can occur in the kenscore library.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid match file: {0}")]
    MatchFile(String),

    #[error("unknown command: '{0}'\n  hint: type 'help' for the list of commands")]
    UnknownCommand(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for kenscore operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
