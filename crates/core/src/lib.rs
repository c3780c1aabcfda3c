// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ks-core: Shared library for kenscore
//!
//! This crate provides the bout state machine, the penalty scoring rules,
//! the display snapshot wire format and the control protocol used by both
//! the `kenscore` operator console and the `ks-relay` server.

pub mod names;
pub mod protocol;
pub mod rules;
pub mod snapshot;
pub mod state;

pub use names::{resolve_display_names, Player};
pub use protocol::{DisplayMessage, PresenterFrame, PresenterMessage, RelayMessage};
pub use snapshot::{PlayerView, Snapshot};
pub use state::{
    Change, Competitor, MatchInit, MatchRecord, MatchResult, MatchState, Phase, ResolvedPlayer,
    Slot, TimerMode, ViewMode, Visibility,
};
