// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ks_core::{DisplayMessage, MatchInit, MatchRecord, ResolvedPlayer, Snapshot};

use super::transport::{
    CloseReason, ConnectionState, Inbound, SessionConnector, Transport, TransportError,
    TransportFuture, TransportKind, TransportResult,
};

#[derive(Default)]
struct MockShared {
    sent: Vec<String>,
    inbound: Option<Inbound>,
    state: ConnectionState,
    connection_id: Option<String>,
    connect_error: Option<TransportError>,
    connect_delay: Option<Duration>,
    fail_sends: bool,
    lose_on_failed_send: bool,
    close_during_connect: bool,
    stalled: bool,
    queued: Option<String>,
    connects: u32,
    closes: u32,
    terminates: u32,
}

/// In-memory transport. Clones share state, so a test keeps one clone to
/// drive and inspect the one owned by the coordinator.
#[derive(Clone)]
pub struct MockTransport {
    kind: TransportKind,
    shared: Arc<Mutex<MockShared>>,
}

impl MockTransport {
    pub fn new(kind: TransportKind) -> Self {
        MockTransport {
            kind,
            shared: Arc::new(Mutex::new(MockShared::default())),
        }
    }

    pub fn session(id: &str) -> Self {
        let mock = Self::new(TransportKind::Session);
        mock.lock().connection_id = Some(id.to_string());
        mock
    }

    pub fn broadcast() -> Self {
        Self::new(TransportKind::Broadcast)
    }

    fn lock(&self) -> MutexGuard<'_, MockShared> {
        self.shared.lock().unwrap()
    }

    pub fn fail_connect(&self, error: TransportError) {
        self.lock().connect_error = Some(error);
    }

    pub fn delay_connect(&self, delay: Duration) {
        self.lock().connect_delay = Some(delay);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    /// Fails the next send and drops the connection without reporting it,
    /// as a transport that only notices the loss while writing.
    pub fn lose_connection_on_send(&self) {
        let mut shared = self.lock();
        shared.fail_sends = true;
        shared.lose_on_failed_send = true;
    }

    /// Lets `connect` succeed but reports the connection closed before the
    /// connect result is delivered.
    pub fn close_during_connect(&self) {
        self.lock().close_during_connect = true;
    }

    /// Accepts sends without ever delivering them, as a peer that stopped
    /// reading. Only the newest payload stays queued.
    pub fn stall(&self) {
        self.lock().stalled = true;
    }

    /// The payload a stalled transport is still holding.
    pub fn queued(&self) -> Option<String> {
        self.lock().queued.clone()
    }

    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.lock().sent.len()
    }

    pub fn last_snapshot(&self) -> Option<Snapshot> {
        self.lock()
            .sent
            .last()
            .map(|json| Snapshot::from_json(json).unwrap())
    }

    pub fn connects(&self) -> u32 {
        self.lock().connects
    }

    pub fn closes(&self) -> u32 {
        self.lock().closes
    }

    pub fn terminates(&self) -> u32 {
        self.lock().terminates
    }

    /// Simulates a display sending `request_snapshot`.
    pub fn request_snapshot(&self) {
        let inbound = self.lock().inbound.clone();
        if let Some(inbound) = inbound {
            inbound.message(DisplayMessage::RequestSnapshot);
        }
    }

    /// Simulates the writer task reporting a failed write.
    pub fn report_failure(&self, message: &str) {
        let inbound = self.lock().inbound.clone();
        if let Some(inbound) = inbound {
            inbound.failed(&TransportError::SendFailed(message.to_string()));
        }
    }

    /// Simulates the medium going away underneath the transport.
    pub fn drop_connection(&self, reason: CloseReason) {
        let inbound = {
            let mut shared = self.lock();
            shared.state = match reason {
                CloseReason::Closed => ConnectionState::Closed,
                CloseReason::Terminated => ConnectionState::Terminated,
            };
            shared.inbound.take()
        };
        if let Some(inbound) = inbound {
            inbound.closed(reason);
        }
    }
}

impl Transport for MockTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn connection_state(&self) -> ConnectionState {
        self.lock().state
    }

    fn connection_id(&self) -> Option<String> {
        self.lock().connection_id.clone()
    }

    fn connect(&mut self, inbound: Inbound) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let delay = {
                let mut shared = self.lock();
                shared.connects += 1;
                shared.state = ConnectionState::Connecting;
                shared.connect_delay
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let mut shared = self.lock();
            if let Some(error) = shared.connect_error.take() {
                shared.state = ConnectionState::Closed;
                return Err(error);
            }
            if shared.close_during_connect {
                shared.state = ConnectionState::Closed;
                drop(shared);
                inbound.closed(CloseReason::Closed);
                return Ok(());
            }
            shared.state = ConnectionState::Connected;
            shared.inbound = Some(inbound);
            Ok(())
        })
    }

    fn send(&mut self, payload: Arc<str>) -> TransportResult<()> {
        let mut shared = self.lock();
        if shared.fail_sends {
            if shared.lose_on_failed_send {
                shared.state = ConnectionState::Closed;
                shared.inbound = None;
            }
            return Err(TransportError::SendFailed("mock failure".into()));
        }
        if shared.state != ConnectionState::Connected {
            return Err(TransportError::ConnectionClosed);
        }
        if shared.stalled {
            shared.queued = Some(payload.to_string());
            return Ok(());
        }
        shared.sent.push(payload.to_string());
        Ok(())
    }

    fn close(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let mut shared = self.lock();
            shared.closes += 1;
            shared.state = ConnectionState::Closed;
            shared.inbound = None;
            Ok(())
        })
    }

    fn terminate(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let mut shared = self.lock();
            shared.terminates += 1;
            shared.state = ConnectionState::Terminated;
            shared.inbound = None;
            Ok(())
        })
    }
}

#[derive(Default)]
struct ConnectorShared {
    queued: VecDeque<MockTransport>,
    requests: Vec<Option<String>>,
}

/// Hands out queued [`MockTransport`]s; reports the medium as unavailable
/// once the queue is empty.
#[derive(Clone, Default)]
pub struct MockConnector {
    shared: Arc<Mutex<ConnectorShared>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, transport: MockTransport) {
        self.shared.lock().unwrap().queued.push_back(transport);
    }

    /// The `resume` argument of every `create` call so far.
    pub fn requests(&self) -> Vec<Option<String>> {
        self.shared.lock().unwrap().requests.clone()
    }
}

impl SessionConnector for MockConnector {
    fn create(&self, resume: Option<String>) -> TransportResult<Box<dyn Transport>> {
        let mut shared = self.shared.lock().unwrap();
        shared.requests.push(resume);
        match shared.queued.pop_front() {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(TransportError::Unavailable("no mock session queued".into())),
        }
    }
}

/// A match between two unique names with nothing scored yet.
pub fn match_init(match_id: &str) -> MatchInit {
    MatchInit {
        record: MatchRecord {
            match_id: match_id.to_string(),
            ..MatchRecord::default()
        },
        tournament_name: "Spring Taikai".to_string(),
        court_name: "Court A".to_string(),
        round_name: "Semifinal".to_string(),
        player_a: ResolvedPlayer {
            display_name: "Sato".to_string(),
            team_name: "Kodokan".to_string(),
        },
        player_b: ResolvedPlayer {
            display_name: "Suzuki".to_string(),
            team_name: "Shubukan".to_string(),
        },
        ..MatchInit::default()
    }
}
