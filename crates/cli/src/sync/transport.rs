// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction shared by the session and broadcast channels.
//!
//! A transport pushes snapshot JSON out and reports inbound display messages
//! and closures back through an [`Inbound`] handle given to it on connect.
//! The coordinator depends only on this trait, so tests can swap in mocks.
//!
//! Sending never waits on the medium. Each transport owns a writer task fed
//! through an [`Outbox`] that holds only the latest snapshot, so a stalled
//! peer can neither block the caller nor queue up stale state.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ks_core::DisplayMessage;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The medium does not exist here (no relay configured, socket unbindable).
    #[error("transport not supported: {0}")]
    Unavailable(String),

    /// A connect or resume was refused or failed.
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// A connect or resume did not finish in time.
    #[error("connection timed out")]
    Timeout,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Operation needs a live connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// How long `close` and `terminate` wait for a writer to drain.
pub const WRITER_GRACE: Duration = Duration::from_secs(2);

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = TransportResult<T>> + Send + 'a>>;

/// Which of the two channels a transport implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Session,
    Broadcast,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Session => "session",
            TransportKind::Broadcast => "broadcast",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    Connecting,
    Connected,
    #[default]
    Closed,
    /// Ended on purpose; will not be resumed.
    Terminated,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closed => "closed",
            ConnectionState::Terminated => "terminated",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Connecting => 0,
            ConnectionState::Connected => 1,
            ConnectionState::Closed => 2,
            ConnectionState::Terminated => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Connected,
            3 => ConnectionState::Terminated,
            _ => ConnectionState::Closed,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection state shared between a transport and its reader task.
///
/// Uses an atomic so the coordinator can read it without locking.
#[derive(Debug, Clone, Default)]
pub struct StateCell {
    state: Arc<AtomicU8>,
}

impl StateCell {
    pub fn new() -> Self {
        let cell = StateCell {
            state: Arc::new(AtomicU8::new(0)),
        };
        cell.set(ConnectionState::Closed);
        cell
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ConnectionState) {
        self.state.store(state.to_u8(), Ordering::Release);
    }

    /// Moves to `to` only if the current state is `from`.
    pub fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.state
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Why a transport stopped delivering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The connection dropped or the peer closed it.
    Closed,
    /// The session was ended for good.
    Terminated,
}

/// Something a transport observed after connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message {
        kind: TransportKind,
        link: u64,
        message: DisplayMessage,
    },
    Closed {
        kind: TransportKind,
        link: u64,
        reason: CloseReason,
    },
    /// A queued write failed. Followed by `Closed` when the connection is lost.
    Failed {
        kind: TransportKind,
        link: u64,
        error: String,
    },
}

/// Callback handle a transport uses to report inbound traffic.
///
/// `link` identifies one particular connection so the receiver can drop
/// events from connections it has already replaced.
#[derive(Clone)]
pub struct Inbound {
    kind: TransportKind,
    link: u64,
    sink: Arc<dyn Fn(TransportEvent) + Send + Sync>,
}

impl Inbound {
    pub fn new(
        kind: TransportKind,
        link: u64,
        sink: impl Fn(TransportEvent) + Send + Sync + 'static,
    ) -> Self {
        Inbound {
            kind,
            link,
            sink: Arc::new(sink),
        }
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    pub fn link(&self) -> u64 {
        self.link
    }

    pub fn message(&self, message: DisplayMessage) {
        (self.sink)(TransportEvent::Message {
            kind: self.kind,
            link: self.link,
            message,
        });
    }

    pub fn closed(&self, reason: CloseReason) {
        (self.sink)(TransportEvent::Closed {
            kind: self.kind,
            link: self.link,
            reason,
        });
    }

    pub fn failed(&self, error: &TransportError) {
        (self.sink)(TransportEvent::Failed {
            kind: self.kind,
            link: self.link,
            error: error.to_string(),
        });
    }
}

impl std::fmt::Debug for Inbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inbound")
            .field("kind", &self.kind)
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}

/// Next instruction for a transport's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Idle,
    Snapshot(Arc<str>),
    /// Close the connection, leaving any remote session resumable.
    Close,
    /// End the remote session, then close.
    Terminate,
}

/// Latest-only queue between a transport and its writer task.
///
/// [`Outbox::push`] never waits. A snapshot the writer has not picked up yet
/// is replaced by the newer one.
#[derive(Debug)]
pub struct Outbox {
    tx: watch::Sender<Outbound>,
    writer: JoinHandle<()>,
}

impl Outbox {
    /// Spawns `writer` with the receiving end of a fresh outbox.
    pub fn spawn<F, Fut>(writer: F) -> Self
    where
        F: FnOnce(watch::Receiver<Outbound>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = watch::channel(Outbound::Idle);
        let writer = tokio::spawn(writer(rx));
        Outbox { tx, writer }
    }

    pub fn push(&self, payload: Arc<str>) -> TransportResult<()> {
        if self.writer.is_finished() {
            return Err(TransportError::ConnectionClosed);
        }
        self.tx.send_replace(Outbound::Snapshot(payload));
        Ok(())
    }

    /// Hands the writer its last instruction and waits up to `grace` for it
    /// to finish. A writer still stuck after that is aborted.
    pub async fn finish(mut self, last: Outbound, grace: Duration) -> TransportResult<()> {
        self.tx.send_replace(last);
        match tokio::time::timeout(grace, &mut self.writer).await {
            Ok(_) => Ok(()),
            Err(_) => {
                self.writer.abort();
                Err(TransportError::Timeout)
            }
        }
    }
}

impl Drop for Outbox {
    fn drop(&mut self) {
        self.writer.abort();
    }
}

/// Waits for the next instruction, skipping `Idle`. `None` once the outbox
/// is gone.
pub async fn next_outbound(rx: &mut watch::Receiver<Outbound>) -> Option<Outbound> {
    loop {
        rx.changed().await.ok()?;
        let next = rx.borrow_and_update().clone();
        if next != Outbound::Idle {
            return Some(next);
        }
    }
}

/// One channel to the displays.
///
/// Implementations are driven by a single owner: `connect` once, then any
/// number of `send`s, then `close` or `terminate`.
pub trait Transport: Send {
    fn kind(&self) -> TransportKind;

    fn connection_state(&self) -> ConnectionState;

    /// Id that lets a later process resume this connection, if the medium
    /// supports resuming.
    fn connection_id(&self) -> Option<String> {
        None
    }

    /// Establishes the connection. Inbound messages and closures are
    /// reported through `inbound` until the transport is closed.
    fn connect(&mut self, inbound: Inbound) -> TransportFuture<'_, ()>;

    /// Queues one snapshot payload for the writer and returns at once.
    ///
    /// Write failures surface later through [`Inbound::failed`].
    fn send(&mut self, payload: Arc<str>) -> TransportResult<()>;

    /// Closes the connection, leaving any remote session resumable.
    fn close(&mut self) -> TransportFuture<'_, ()>;

    /// Ends the connection for good. Media without sessions just close.
    fn terminate(&mut self) -> TransportFuture<'_, ()> {
        self.close()
    }
}

/// Creates session transports.
///
/// A connector decides where the session medium lives; the coordinator only
/// decides when to connect and whether to resume.
pub trait SessionConnector: Send + Sync {
    /// Builds an unconnected session transport, resuming `resume` if given.
    ///
    /// Returns [`TransportError::Unavailable`] when there is no session medium.
    fn create(&self, resume: Option<String>) -> TransportResult<Box<dyn Transport>>;
}
