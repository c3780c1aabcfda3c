// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Broadcast transport: connectionless UDP mirror.
//!
//! Every snapshot is sent as one datagram to a fixed target address, which
//! may be unicast, broadcast or multicast. Displays ask for a fresh snapshot
//! by sending `{"type":"request_snapshot"}` to the listen address. Nothing
//! is acknowledged and nothing is retried; a failed send is reported and the
//! next snapshot is tried as usual.

use std::net::SocketAddr;
use std::sync::Arc;

use ks_core::DisplayMessage;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::transport::{
    next_outbound, CloseReason, ConnectionState, Inbound, Outbound, Outbox, StateCell, Transport,
    TransportError, TransportFuture, TransportKind, TransportResult, WRITER_GRACE,
};

/// Largest datagram accepted on the control socket.
const MAX_CONTROL_DATAGRAM: usize = 2048;

pub struct UdpBroadcastTransport {
    target: SocketAddr,
    listen: SocketAddr,
    state: StateCell,
    socket: Option<Arc<UdpSocket>>,
    outbox: Option<Outbox>,
    reader: Option<CancellationToken>,
}

impl UdpBroadcastTransport {
    pub fn new(target: SocketAddr, listen: SocketAddr) -> Self {
        UdpBroadcastTransport {
            target,
            listen,
            state: StateCell::new(),
            socket: None,
            outbox: None,
            reader: None,
        }
    }

    /// Address the control socket is bound to, once connected.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }
}

async fn read_loop(
    socket: Arc<UdpSocket>,
    inbound: Inbound,
    state: StateCell,
    token: CancellationToken,
) {
    let mut buf = vec![0u8; MAX_CONTROL_DATAGRAM];
    loop {
        let received = tokio::select! {
            _ = token.cancelled() => return,
            received = socket.recv_from(&mut buf) => received,
        };
        match received {
            Ok((len, from)) => match serde_json::from_slice::<DisplayMessage>(&buf[..len]) {
                Ok(message) => {
                    tracing::debug!(%from, "broadcast control message {:?}", message);
                    inbound.message(message);
                }
                Err(e) => tracing::debug!(%from, "ignoring datagram: {}", e),
            },
            // ICMP errors from earlier sends surface here on some platforms.
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => {}
            Err(e) => {
                tracing::warn!("broadcast control socket failed: {}", e);
                break;
            }
        }
    }
    if state.transition(ConnectionState::Connected, ConnectionState::Closed) {
        inbound.closed(CloseReason::Closed);
    }
}

async fn write_loop(
    socket: Arc<UdpSocket>,
    target: SocketAddr,
    mut rx: watch::Receiver<Outbound>,
    inbound: Inbound,
) {
    while let Some(next) = next_outbound(&mut rx).await {
        let Outbound::Snapshot(payload) = next else {
            return;
        };
        if let Err(e) = socket.send_to(payload.as_bytes(), target).await {
            let error = TransportError::SendFailed(e.to_string());
            tracing::warn!(%target, "broadcast send failed: {}", error);
            inbound.failed(&error);
        }
    }
}

impl Transport for UdpBroadcastTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Broadcast
    }

    fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    fn connect(&mut self, inbound: Inbound) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            self.state.set(ConnectionState::Connecting);
            let socket = match UdpSocket::bind(self.listen).await {
                Ok(socket) => socket,
                Err(e) => {
                    self.state.set(ConnectionState::Closed);
                    return Err(TransportError::Unavailable(format!(
                        "cannot bind {}: {}",
                        self.listen, e
                    )));
                }
            };
            if self.target.is_ipv4() {
                if let Err(e) = socket.set_broadcast(true) {
                    tracing::debug!("SO_BROADCAST not enabled: {}", e);
                }
            }
            let socket = Arc::new(socket);
            let token = CancellationToken::new();
            self.state.set(ConnectionState::Connected);
            tokio::spawn(read_loop(
                Arc::clone(&socket),
                inbound.clone(),
                self.state.clone(),
                token.clone(),
            ));
            let writer_socket = Arc::clone(&socket);
            let target = self.target;
            self.outbox = Some(Outbox::spawn(move |rx| {
                write_loop(writer_socket, target, rx, inbound)
            }));
            tracing::info!(target_addr = %self.target, listen = %self.listen, "broadcast ready");
            self.socket = Some(socket);
            self.reader = Some(token);
            Ok(())
        })
    }

    fn send(&mut self, payload: Arc<str>) -> TransportResult<()> {
        if self.state.get() != ConnectionState::Connected {
            return Err(TransportError::ConnectionClosed);
        }
        self.outbox
            .as_ref()
            .ok_or(TransportError::ConnectionClosed)?
            .push(payload)
    }

    fn close(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if let Some(token) = self.reader.take() {
                token.cancel();
            }
            self.socket = None;
            self.state.set(ConnectionState::Closed);
            match self.outbox.take() {
                Some(outbox) => outbox.finish(Outbound::Close, WRITER_GRACE).await,
                None => Ok(()),
            }
        })
    }
}

impl Drop for UdpBroadcastTransport {
    fn drop(&mut self) {
        if let Some(token) = self.reader.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
#[path = "broadcast_tests.rs"]
mod tests;
