// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Control messages exchanged between operator, relay and displays.
//!
//! Snapshots themselves travel as bare [`Snapshot`](crate::Snapshot) JSON.
//! Everything else is a small message tagged by `type`:
//! - Displays send [`DisplayMessage`] to ask for a fresh snapshot
//! - The operator sends [`PresenterMessage`] to open, resume or end a relay session
//! - The relay answers with [`RelayMessage`]

use serde::{Deserialize, Serialize};

/// Messages sent by a display, over either transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisplayMessage {
    /// Ask the operator to re-send the current snapshot.
    ///
    /// Sent by displays that just joined or reloaded.
    RequestSnapshot,
}

/// Messages sent by the operator to the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresenterMessage {
    /// Start a new session, replacing any previous one.
    Open,

    /// Re-attach to an existing session after a reload.
    Resume {
        /// Id handed out by the relay when the session was opened.
        session_id: String,
    },

    /// End the session for good. Displays are told to blank.
    Terminate,
}

/// Messages sent by the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayMessage {
    /// The presenter is attached to this session.
    Session { session_id: String },

    /// An open or resume request was refused.
    Rejected { reason: String },

    /// A display asked for a fresh snapshot.
    RequestSnapshot,

    /// The session was terminated by its presenter.
    Terminated,
}

impl DisplayMessage {
    pub fn request_snapshot() -> Self {
        DisplayMessage::RequestSnapshot
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl PresenterMessage {
    pub fn open() -> Self {
        PresenterMessage::Open
    }

    pub fn resume(session_id: impl Into<String>) -> Self {
        PresenterMessage::Resume {
            session_id: session_id.into(),
        }
    }

    pub fn terminate() -> Self {
        PresenterMessage::Terminate
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl RelayMessage {
    pub fn session(session_id: impl Into<String>) -> Self {
        RelayMessage::Session {
            session_id: session_id.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        RelayMessage::Rejected {
            reason: reason.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// A text frame sent by the presenter: either a control message or a
/// snapshot to relay verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterFrame {
    Control(PresenterMessage),
    Snapshot(String),
}

impl PresenterFrame {
    /// Classifies a presenter text frame.
    ///
    /// Snapshots carry no `type` tag, so anything that is not a control
    /// message is passed through as a snapshot.
    pub fn classify(text: &str) -> Self {
        match PresenterMessage::from_json(text) {
            Ok(msg) => PresenterFrame::Control(msg),
            Err(_) => PresenterFrame::Snapshot(text.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
