// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `kenscore watch`: a passive display.
//!
//! Joins over either transport, asks for a snapshot and prints every
//! snapshot it receives. Displays never send anything but snapshot requests.

use std::io::Write;
use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::UdpSocket;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use ks_core::{DisplayMessage, RelayMessage, Snapshot};

use crate::cli::WatchArgs;
use crate::display::{render_line, BLANK_LINE};
use crate::error::{Error, Result};
use crate::sync::TransportError;

/// Largest datagram accepted from the broadcast transport.
const MAX_DATAGRAM: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WatchOptions {
    pub json: bool,
    pub once: bool,
}

pub async fn run(args: WatchArgs) -> Result<()> {
    let options = WatchOptions {
        json: args.json,
        once: args.once,
    };
    let mut out = std::io::stdout();
    let follow = async move {
        match (args.relay, args.udp, args.control) {
            (Some(url), _, _) => watch_relay(&url, options, &mut out).await,
            (None, Some(listen), Some(control)) => {
                watch_udp(listen, control, options, &mut out).await
            }
            _ => Err(Error::InvalidCommand(
                "watch needs --relay, or --udp with --control".to_string(),
            )),
        }
    };
    tokio::select! {
        result = follow => result,
        _ = tokio::signal::ctrl_c() => Ok(()),
    }
}

/// Prints one frame. Returns whether it was a snapshot.
pub(crate) fn show(text: &str, options: WatchOptions, out: &mut impl Write) -> Result<bool> {
    if let Ok(snapshot) = Snapshot::from_json(text) {
        if options.json {
            writeln!(out, "{}", text)?;
        } else {
            writeln!(out, "{}", render_line(&snapshot))?;
        }
        out.flush()?;
        return Ok(true);
    }
    match RelayMessage::from_json(text) {
        Ok(RelayMessage::Terminated) => {
            writeln!(out, "{}", BLANK_LINE)?;
            out.flush()?;
        }
        Ok(other) => debug!("ignoring relay message: {:?}", other),
        Err(e) => debug!("ignoring unreadable frame: {}", e),
    }
    Ok(false)
}

pub(crate) async fn watch_relay(
    url: &str,
    options: WatchOptions,
    out: &mut impl Write,
) -> Result<()> {
    let (ws, _) = connect_async(url).await.map_err(|e| {
        Error::Transport(TransportError::ConnectFailed(format!("{}: {}", url, e)))
    })?;
    info!("joined relay at {}", url);
    let (mut sink, mut stream) = ws.split();

    let request = DisplayMessage::request_snapshot().to_json()?;
    sink.send(Message::Text(request.into()))
        .await
        .map_err(|e| TransportError::SendFailed(e.to_string()))?;

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if show(&text, options, out)? && options.once {
                    break;
                }
            }
            Ok(Message::Ping(data)) => {
                sink.send(Message::Pong(data))
                    .await
                    .map_err(|e| TransportError::SendFailed(e.to_string()))?;
            }
            Ok(Message::Close(_)) => {
                info!("relay closed the connection");
                break;
            }
            Ok(_) => {}
            Err(e) => return Err(TransportError::ConnectFailed(e.to_string()).into()),
        }
    }
    let _ = sink.close().await;
    Ok(())
}

pub(crate) async fn watch_udp(
    listen: SocketAddr,
    control: SocketAddr,
    options: WatchOptions,
    out: &mut impl Write,
) -> Result<()> {
    let socket = UdpSocket::bind(listen).await?;
    watch_socket(socket, control, options, out).await
}

/// Follows snapshots arriving on an already bound socket.
pub(crate) async fn watch_socket(
    socket: UdpSocket,
    control: SocketAddr,
    options: WatchOptions,
    out: &mut impl Write,
) -> Result<()> {
    info!("listening for snapshots on {}", socket.local_addr()?);

    let request = DisplayMessage::request_snapshot().to_json()?;
    socket.send_to(request.as_bytes(), control).await?;

    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (len, from) = socket.recv_from(&mut buf).await?;
        let Ok(text) = std::str::from_utf8(&buf[..len]) else {
            debug!("ignoring non-utf8 datagram from {}", from);
            continue;
        };
        if show(text, options, out)? && options.once {
            return Ok(());
        }
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
