// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Relay state.
//!
//! The relay holds at most one presentation session. A session is opened by
//! a presenter connection and outlives it: when the presenter drops, the
//! session stays resumable by id until it is terminated or replaced.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::{broadcast, mpsc, Mutex};

use ks_core::RelayMessage;

/// Something every display connection must forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Snapshot JSON, relayed verbatim.
    Snapshot(Arc<str>),
    /// The session ended; displays should blank.
    Terminated,
}

/// Public view of the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: String,
    pub opened_at: DateTime<Utc>,
    pub presenter_attached: bool,
}

/// Why a resume was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeError {
    NoSession,
    UnknownSession,
}

impl std::fmt::Display for ResumeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResumeError::NoSession => f.write_str("no active session"),
            ResumeError::UnknownSession => f.write_str("unknown session"),
        }
    }
}

struct Presenter {
    conn_id: u64,
    tx: mpsc::UnboundedSender<RelayMessage>,
}

struct Session {
    id: String,
    opened_at: DateTime<Utc>,
    presenter: Option<Presenter>,
    latest: Option<Arc<str>>,
}

/// Shared relay state.
#[derive(Clone)]
pub struct RelayState {
    inner: Arc<RelayStateInner>,
}

struct RelayStateInner {
    session: Mutex<Option<Session>>,
    frames_tx: broadcast::Sender<Frame>,
    next_conn: AtomicU64,
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayState {
    pub fn new() -> Self {
        let (frames_tx, _) = broadcast::channel(256);
        RelayState {
            inner: Arc::new(RelayStateInner {
                session: Mutex::new(None),
                frames_tx,
                next_conn: AtomicU64::new(1),
            }),
        }
    }

    /// Allocates an id for a new connection.
    pub fn next_connection_id(&self) -> u64 {
        self.inner.next_conn.fetch_add(1, Ordering::Relaxed)
    }

    /// Opens a new session presented by `conn_id`, replacing any existing
    /// one. The replaced presenter and all displays are told it ended.
    pub async fn open(&self, conn_id: u64, tx: mpsc::UnboundedSender<RelayMessage>) -> String {
        let opened_at = Utc::now();
        let id = generate_session_id(conn_id, &opened_at);
        let mut session = self.inner.session.lock().await;
        if let Some(old) = session.take() {
            tracing::info!(session_id = %old.id, "session replaced");
            if let Some(presenter) = old.presenter {
                if presenter.conn_id != conn_id {
                    let _ = presenter.tx.send(RelayMessage::Terminated);
                }
            }
            let _ = self.inner.frames_tx.send(Frame::Terminated);
        }
        *session = Some(Session {
            id: id.clone(),
            opened_at,
            presenter: Some(Presenter { conn_id, tx }),
            latest: None,
        });
        tracing::info!(session_id = %id, conn_id, "session opened");
        id
    }

    /// Re-attaches `conn_id` as presenter of session `id`. A presenter still
    /// attached on another connection is displaced.
    pub async fn resume(
        &self,
        conn_id: u64,
        tx: mpsc::UnboundedSender<RelayMessage>,
        id: &str,
    ) -> Result<(), ResumeError> {
        let mut session = self.inner.session.lock().await;
        let session = session.as_mut().ok_or(ResumeError::NoSession)?;
        if session.id != id {
            return Err(ResumeError::UnknownSession);
        }
        if let Some(old) = session.presenter.replace(Presenter { conn_id, tx }) {
            if old.conn_id != conn_id {
                tracing::info!(old = old.conn_id, new = conn_id, "presenter displaced");
                let _ = old.tx.send(RelayMessage::Terminated);
            }
        }
        tracing::info!(session_id = %id, conn_id, "session resumed");
        Ok(())
    }

    /// Forgets `conn_id` as presenter; the session stays resumable.
    pub async fn detach(&self, conn_id: u64) {
        let mut session = self.inner.session.lock().await;
        if let Some(session) = session.as_mut() {
            if session.presenter.as_ref().map(|p| p.conn_id) == Some(conn_id) {
                session.presenter = None;
                tracing::info!(session_id = %session.id, "presenter detached");
            }
        }
    }

    /// Ends the session if `conn_id` presents it. Returns whether it did.
    pub async fn terminate(&self, conn_id: u64) -> bool {
        let mut session = self.inner.session.lock().await;
        let presents = session
            .as_ref()
            .and_then(|s| s.presenter.as_ref())
            .map(|p| p.conn_id)
            == Some(conn_id);
        if !presents {
            return false;
        }
        if let Some(ended) = session.take() {
            tracing::info!(session_id = %ended.id, "session terminated");
        }
        let _ = self.inner.frames_tx.send(Frame::Terminated);
        true
    }

    /// Relays a snapshot from the presenter to every display.
    ///
    /// Frames from connections that do not present the session are dropped.
    pub async fn publish(&self, conn_id: u64, snapshot: Arc<str>) -> bool {
        let mut session = self.inner.session.lock().await;
        let Some(session) = session.as_mut() else {
            return false;
        };
        if session.presenter.as_ref().map(|p| p.conn_id) != Some(conn_id) {
            return false;
        }
        session.latest = Some(Arc::clone(&snapshot));
        let _ = self.inner.frames_tx.send(Frame::Snapshot(snapshot));
        true
    }

    /// Asks the presenter, if attached, to push a fresh snapshot.
    pub async fn request_snapshot(&self) -> bool {
        let session = self.inner.session.lock().await;
        match session.as_ref().and_then(|s| s.presenter.as_ref()) {
            Some(presenter) => presenter.tx.send(RelayMessage::RequestSnapshot).is_ok(),
            None => false,
        }
    }

    /// The last snapshot relayed in the current session.
    pub async fn latest_snapshot(&self) -> Option<Arc<str>> {
        let session = self.inner.session.lock().await;
        session.as_ref().and_then(|s| s.latest.clone())
    }

    pub async fn session_info(&self) -> Option<SessionInfo> {
        let session = self.inner.session.lock().await;
        session.as_ref().map(|s| SessionInfo {
            id: s.id.clone(),
            opened_at: s.opened_at,
            presenter_attached: s.presenter.is_some(),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.inner.frames_tx.subscribe()
    }
}

/// Session id: first 16 hex chars of SHA256(connection id + open time).
fn generate_session_id(conn_id: u64, opened_at: &DateTime<Utc>) -> String {
    let input = format!(
        "{}{}{}",
        conn_id,
        opened_at.to_rfc3339(),
        opened_at.timestamp_subsec_nanos()
    );
    let hash = Sha256::digest(input.as_bytes());
    hex::encode(&hash[..8])
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
