// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! kenscore - live kendo bout scoring with real-time display sync.
//!
//! This crate provides the operator side of the system: a coordinator task
//! that owns the match state and mirrors it to public displays over two
//! independent transports, plus the `kenscore` console and display commands.
//!
//! # Main Components
//!
//! - [`sync::Coordinator`] - single-writer task owning the match and both transports
//! - [`sync::CoordinatorHandle`] - cloneable, non-blocking front end to the coordinator
//! - [`Config`] - operator configuration (`kenscore.toml`)
//! - [`store`] - the persisted session id
//! - [`Error`] - Error types for all operations
//!
//! # Embedding
//!
//! ```rust,ignore
//! use kenscore::store::FileStore;
//! use kenscore::sync::{Coordinator, WebSocketConnector};
//!
//! let config = Config::load(&path)?;
//! let connector = Arc::new(WebSocketConnector::new(config.session.relay_url.clone()));
//! let store = Box::new(FileStore::new(config.state_dir()));
//! let (handle, task) = Coordinator::spawn(config.sync_settings(), connector, None, store);
//! handle.initialize_match(init)?;
//! handle.set_penalty(Slot::A, 2)?;
//! ```

mod cli;
mod commands;

pub mod config;
pub mod console;
pub mod display;
pub mod error;
pub mod match_file;
pub mod store;
pub mod sync;

pub use cli::{Cli, Command, ConfigCommand, OperateArgs, WatchArgs};
pub use config::Config;
pub use error::{Error, Result};

/// Execute a CLI command. This is the main entry point for library users
/// and provides a testable way to run commands without process execution.
pub async fn run(command: Command) -> Result<()> {
    match command {
        Command::Operate(args) => commands::operate::run(args).await,
        Command::Watch(args) => commands::watch::run(args).await,
        Command::Config(cmd) => commands::config::run(cmd),
    }
}
