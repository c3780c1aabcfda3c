// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session transport: a WebSocket presenter connection to `ks-relay`.
//!
//! Connecting sends `open` (or `resume` with a stored id) and waits for the
//! relay to answer with `session` or `rejected`. After that a reader task
//! forwards `request_snapshot` and termination back to the coordinator, and
//! a writer task drains the outbox into the socket.

use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use ks_core::{DisplayMessage, PresenterMessage, RelayMessage};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::transport::{
    next_outbound, CloseReason, ConnectionState, Inbound, Outbound, Outbox, SessionConnector,
    StateCell, Transport, TransportError, TransportFuture, TransportKind, TransportResult,
    WRITER_GRACE,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Presenter side of a relay session.
pub struct WebSocketSessionTransport {
    url: String,
    resume: Option<String>,
    state: StateCell,
    session_id: Option<String>,
    outbox: Option<Outbox>,
    reader: Option<CancellationToken>,
}

impl WebSocketSessionTransport {
    pub fn new(url: impl Into<String>, resume: Option<String>) -> Self {
        WebSocketSessionTransport {
            url: url.into(),
            resume,
            state: StateCell::new(),
            session_id: None,
            outbox: None,
            reader: None,
        }
    }

    async fn handshake(&mut self, inbound: Inbound) -> TransportResult<()> {
        let (ws, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        let hello = match &self.resume {
            Some(id) => PresenterMessage::resume(id.clone()),
            None => PresenterMessage::open(),
        };
        let hello = hello
            .to_json()
            .map_err(|e| TransportError::Serialization(e.to_string()))?;
        sink.send(Message::Text(hello.into()))
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        let session_id = await_session(&mut stream).await?;
        tracing::info!(url = %self.url, session_id = %session_id, "relay session attached");

        let token = CancellationToken::new();
        self.state.set(ConnectionState::Connected);
        tokio::spawn(read_loop(
            stream,
            inbound.clone(),
            self.state.clone(),
            token.clone(),
        ));
        let state = self.state.clone();
        self.outbox = Some(Outbox::spawn(move |rx| write_loop(sink, rx, inbound, state)));
        self.session_id = Some(session_id);
        self.reader = Some(token);
        Ok(())
    }

    async fn shutdown(&mut self, last: Outbound, final_state: ConnectionState) -> TransportResult<()> {
        if let Some(token) = self.reader.take() {
            token.cancel();
        }
        self.state.set(final_state);
        match self.outbox.take() {
            Some(outbox) => outbox.finish(last, WRITER_GRACE).await,
            None => Ok(()),
        }
    }
}

/// Waits for the relay's answer to `open`/`resume`.
async fn await_session(stream: &mut SplitStream<WsStream>) -> TransportResult<String> {
    while let Some(frame) = stream.next().await {
        let frame = frame.map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        match frame {
            Message::Text(text) => match RelayMessage::from_json(&text) {
                Ok(RelayMessage::Session { session_id }) => return Ok(session_id),
                Ok(RelayMessage::Rejected { reason }) => {
                    return Err(TransportError::ConnectFailed(reason))
                }
                Ok(other) => tracing::debug!("ignoring {:?} before session", other),
                Err(e) => tracing::debug!("ignoring unparseable relay frame: {}", e),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err(TransportError::ConnectFailed(
        "relay closed the connection".to_string(),
    ))
}

async fn read_loop(
    mut stream: SplitStream<WsStream>,
    inbound: Inbound,
    state: StateCell,
    token: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = token.cancelled() => return,
            frame = stream.next() => frame,
        };
        match frame {
            Some(Ok(Message::Text(text))) => match RelayMessage::from_json(&text) {
                Ok(RelayMessage::RequestSnapshot) => {
                    inbound.message(DisplayMessage::RequestSnapshot);
                }
                Ok(RelayMessage::Terminated) => {
                    if state.transition(ConnectionState::Connected, ConnectionState::Terminated) {
                        inbound.closed(CloseReason::Terminated);
                    }
                    return;
                }
                Ok(other) => tracing::debug!("ignoring relay message {:?}", other),
                Err(e) => tracing::debug!("ignoring unparseable relay frame: {}", e),
            },
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::debug!("relay connection error: {}", e);
                break;
            }
        }
    }
    if state.transition(ConnectionState::Connected, ConnectionState::Closed) {
        inbound.closed(CloseReason::Closed);
    }
}

/// Drains the outbox into the socket. A failed write loses the connection.
async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut rx: watch::Receiver<Outbound>,
    inbound: Inbound,
    state: StateCell,
) {
    while let Some(next) = next_outbound(&mut rx).await {
        let frame = match next {
            Outbound::Snapshot(payload) => payload.to_string(),
            Outbound::Terminate => {
                match PresenterMessage::terminate().to_json() {
                    Ok(json) => {
                        if let Err(e) = sink.send(Message::Text(json.into())).await {
                            tracing::warn!("failed to send terminate: {}", e);
                        }
                    }
                    Err(e) => tracing::warn!("failed to encode terminate: {}", e),
                }
                break;
            }
            Outbound::Close | Outbound::Idle => break,
        };
        if let Err(e) = sink.send(Message::Text(frame.into())).await {
            let error = TransportError::SendFailed(e.to_string());
            tracing::warn!("relay write failed: {}", error);
            if state.transition(ConnectionState::Connected, ConnectionState::Closed) {
                inbound.failed(&error);
                inbound.closed(CloseReason::Closed);
            }
            return;
        }
    }
    if let Err(e) = sink.close().await {
        tracing::debug!("closing relay connection: {}", e);
    }
}

impl Transport for WebSocketSessionTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Session
    }

    fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    fn connection_id(&self) -> Option<String> {
        self.session_id.clone()
    }

    fn connect(&mut self, inbound: Inbound) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            self.state.set(ConnectionState::Connecting);
            let result = self.handshake(inbound).await;
            if result.is_err() {
                self.state.set(ConnectionState::Closed);
            }
            result
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
        Box::pin(self.shutdown(Outbound::Close, ConnectionState::Closed))
    }

    fn terminate(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(self.shutdown(Outbound::Terminate, ConnectionState::Terminated))
    }
}

impl Drop for WebSocketSessionTransport {
    fn drop(&mut self) {
        if let Some(token) = self.reader.take() {
            token.cancel();
        }
    }
}

/// Builds session transports pointed at a relay URL.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    url: Option<String>,
}

impl WebSocketConnector {
    /// `None` means no relay is configured; every connect then reports
    /// [`TransportError::Unavailable`].
    pub fn new(url: Option<String>) -> Self {
        WebSocketConnector { url }
    }
}

impl SessionConnector for WebSocketConnector {
    fn create(&self, resume: Option<String>) -> TransportResult<Box<dyn Transport>> {
        let url = self
            .url
            .as_ref()
            .ok_or_else(|| TransportError::Unavailable("no relay configured".to_string()))?;
        Ok(Box::new(WebSocketSessionTransport::new(url.clone(), resume)))
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
