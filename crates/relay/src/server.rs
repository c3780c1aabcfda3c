// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket server implementation.
//!
//! Every connection starts out as a display. Sending `open` or `resume`
//! turns it into the presenter of the session; from then on its non-control
//! text frames are snapshots, fanned out to every display.
//!
//! # Coverage Notes
//!
//! Due to LLVM coverage instrumentation limitations with async Rust:
//! - `handle_text`: Fully covered (all routing logic)
//! - `serve`, `handle_connection`: Async plumbing exercised by tests but not instrumented

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use ks_core::{DisplayMessage, PresenterFrame, PresenterMessage, RelayMessage};

use crate::state::{Frame, RelayState};

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Run the relay on the given address.
pub async fn run(addr: SocketAddr, state: RelayState) -> Result<(), BoxError> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on: {}", listener.local_addr()?);
    serve(listener, state).await
}

/// Accept connections on an already bound listener until it fails.
pub async fn serve(listener: TcpListener, state: RelayState) -> Result<(), BoxError> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Display,
    Presenter,
}

/// What the connection loop should do after a text frame.
#[derive(Debug, PartialEq, Eq)]
enum Next {
    Continue,
    Close,
}

struct Connection {
    conn_id: u64,
    peer_addr: SocketAddr,
    role: Role,
    state: RelayState,
    presenter_tx: mpsc::UnboundedSender<RelayMessage>,
    frames: Option<broadcast::Receiver<Frame>>,
}

/// Handle a single WebSocket connection.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: RelayState,
) -> Result<(), BoxError> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let conn_id = state.next_connection_id();
    info!(conn_id, "New WebSocket connection from: {}", peer_addr);

    let (mut ws_sink, mut ws_stream) = ws_stream.split();
    // The connection keeps its own sender so `presenter_rx` never closes.
    let (presenter_tx, mut presenter_rx) = mpsc::unbounded_channel();
    let mut conn = Connection {
        conn_id,
        peer_addr,
        role: Role::Display,
        frames: Some(state.subscribe()),
        state,
        presenter_tx,
    };

    let result = conn_loop(&mut conn, &mut ws_sink, &mut ws_stream, &mut presenter_rx).await;

    if conn.role == Role::Presenter {
        conn.state.detach(conn_id).await;
    }
    info!(conn_id, "Connection closed: {}", peer_addr);
    result
}

async fn conn_loop(
    conn: &mut Connection,
    ws_sink: &mut WsSink,
    ws_stream: &mut futures_util::stream::SplitStream<WebSocketStream<TcpStream>>,
    presenter_rx: &mut mpsc::UnboundedReceiver<RelayMessage>,
) -> Result<(), BoxError> {
    loop {
        tokio::select! {
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if handle_text(conn, ws_sink, &text).await? == Next::Close {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} disconnected", conn.peer_addr);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        ws_sink.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(_)) => {
                        // Ignore other message types (Binary, Pong, Frame)
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", conn.peer_addr, e);
                        break;
                    }
                    None => {
                        info!("Client {} stream ended", conn.peer_addr);
                        break;
                    }
                }
            }

            frame = next_frame(&mut conn.frames) => {
                match frame {
                    Ok(Frame::Snapshot(json)) => {
                        if let Err(e) = ws_sink.send(Message::Text(json.to_string().into())).await {
                            warn!("Failed to send snapshot to {}: {}", conn.peer_addr, e);
                            break;
                        }
                    }
                    Ok(Frame::Terminated) => {
                        send_message(ws_sink, &RelayMessage::Terminated).await?;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Displays only need the newest snapshot, which is still queued.
                        warn!("Client {} lagged by {} frames", conn.peer_addr, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            Some(msg) = presenter_rx.recv() => {
                send_message(ws_sink, &msg).await?;
                if msg == RelayMessage::Terminated {
                    // Displaced by another presenter.
                    conn.role = Role::Display;
                    break;
                }
            }
        }
    }
    Ok(())
}

async fn next_frame(
    frames: &mut Option<broadcast::Receiver<Frame>>,
) -> Result<Frame, broadcast::error::RecvError> {
    match frames {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn send_message(ws_sink: &mut WsSink, msg: &RelayMessage) -> Result<(), BoxError> {
    let json = msg.to_json()?;
    ws_sink.send(Message::Text(json.into())).await?;
    Ok(())
}

/// Routes one text frame according to the connection's role.
async fn handle_text(
    conn: &mut Connection,
    ws_sink: &mut WsSink,
    text: &str,
) -> Result<Next, BoxError> {
    match PresenterFrame::classify(text) {
        PresenterFrame::Control(PresenterMessage::Open) => {
            let session_id = conn
                .state
                .open(conn.conn_id, conn.presenter_tx.clone())
                .await;
            become_presenter(conn);
            send_message(ws_sink, &RelayMessage::session(session_id)).await?;
        }
        PresenterFrame::Control(PresenterMessage::Resume { session_id }) => {
            match conn
                .state
                .resume(conn.conn_id, conn.presenter_tx.clone(), &session_id)
                .await
            {
                Ok(()) => {
                    become_presenter(conn);
                    send_message(ws_sink, &RelayMessage::session(session_id)).await?;
                }
                Err(e) => {
                    debug!(conn_id = conn.conn_id, "resume rejected: {}", e);
                    send_message(ws_sink, &RelayMessage::rejected(e.to_string())).await?;
                }
            }
        }
        PresenterFrame::Control(PresenterMessage::Terminate) => {
            if conn.role == Role::Presenter && conn.state.terminate(conn.conn_id).await {
                conn.role = Role::Display;
                return Ok(Next::Close);
            }
            debug!(conn_id = conn.conn_id, "ignoring terminate from non-presenter");
        }
        PresenterFrame::Snapshot(json) => match conn.role {
            Role::Presenter => {
                if !conn.state.publish(conn.conn_id, Arc::from(json)).await {
                    debug!(conn_id = conn.conn_id, "dropping snapshot from stale presenter");
                }
            }
            Role::Display => handle_display_text(conn, ws_sink, &json).await?,
        },
    }
    Ok(Next::Continue)
}

async fn handle_display_text(
    conn: &Connection,
    ws_sink: &mut WsSink,
    text: &str,
) -> Result<(), BoxError> {
    match DisplayMessage::from_json(text) {
        Ok(DisplayMessage::RequestSnapshot) => {
            if conn.state.request_snapshot().await {
                debug!(conn_id = conn.conn_id, "snapshot request forwarded");
            } else if let Some(latest) = conn.state.latest_snapshot().await {
                // No presenter attached; serve the last known snapshot.
                ws_sink.send(Message::Text(latest.to_string().into())).await?;
            }
        }
        Err(e) => debug!(conn_id = conn.conn_id, "ignoring display frame: {}", e),
    }
    Ok(())
}

fn become_presenter(conn: &mut Connection) {
    conn.role = Role::Presenter;
    conn.frames = None;
}
