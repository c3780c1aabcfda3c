// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ks-relay: WebSocket relay for kenscore display sessions.
//!
//! The relay holds one presentation session. The operator console attaches
//! as presenter and pushes snapshots; any number of displays connect, receive
//! every snapshot and may ask the presenter for a fresh one.

pub mod server;
pub mod state;

pub use server::{run, serve};
pub use state::{Frame, RelayState, ResumeError, SessionInfo};
