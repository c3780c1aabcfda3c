// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Live display synchronization.
//!
//! # Architecture
//!
//! ```text
//!  operator ──► CoordinatorHandle ──► ┌─────────────┐ ──► Session   ──► ks-relay ──► displays
//!                                     │ Coordinator │     (WebSocket)
//!  TickScheduler ───── tick ────────► │ (one task)  │ ──► Broadcast ──────────────► displays
//!                                     └─────────────┘     (UDP)
//!                                            ▲
//!            request_snapshot / close ───────┘
//! ```
//!
//! # Features
//!
//! - Single-writer coordinator task owning the match state
//! - Full snapshot on every visible change, timer-only pushes coalesced
//! - Session transport resumable across restarts via a stored session id
//! - Best-effort broadcast mirror independent of the session transport
//! - Per-transport writer tasks, so a stalled peer never blocks the coordinator
//! - Injectable transport, connector and store traits for testing

mod broadcast;
mod coordinator;
mod limiter;
mod session;
mod tick;
mod transport;

pub use broadcast::UdpBroadcastTransport;
pub use coordinator::{
    ConnectResult, Coordinator, CoordinatorHandle, SyncError, SyncSettings, SyncStatus,
    TransportStatus,
};
pub use limiter::{PushDecision, PushLimiter};
pub use session::{WebSocketConnector, WebSocketSessionTransport};
pub use tick::TickScheduler;
pub use transport::{
    next_outbound, CloseReason, ConnectionState, Inbound, Outbound, Outbox, SessionConnector,
    StateCell, Transport, TransportError, TransportEvent, TransportFuture, TransportKind,
    TransportResult, WRITER_GRACE,
};

#[cfg(test)]
pub(crate) mod test_helpers;
