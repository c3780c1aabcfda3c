// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end tests for the session transport.
//!
//! These run a coordinator with the real `WebSocketSessionTransport`
//! against an in-process `ks-relay`, with bare WebSocket clients playing
//! the public displays.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use kenscore::store::{KeyValueStore, MemoryStore, SESSION_ID_KEY};
use kenscore::sync::{
    ConnectionState, Coordinator, CoordinatorHandle, SyncSettings, WebSocketConnector,
};
use ks_core::{
    DisplayMessage, MatchInit, MatchRecord, RelayMessage, ResolvedPlayer, Slot, Snapshot,
};
use ks_relay::RelayState;

const WAIT: Duration = Duration::from_secs(5);

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_relay() -> (String, RelayState) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let state = RelayState::new();
    tokio::spawn(ks_relay::serve(listener, state.clone()));
    (url, state)
}

fn match_init(match_id: &str) -> MatchInit {
    MatchInit {
        record: MatchRecord {
            match_id: match_id.to_string(),
            ..MatchRecord::default()
        },
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

fn spawn_coordinator(url: &str, store: &MemoryStore) -> CoordinatorHandle {
    let connector = Arc::new(WebSocketConnector::new(Some(url.to_string())));
    let (handle, _task) = Coordinator::spawn(
        SyncSettings::default(),
        connector,
        None,
        Box::new(store.clone()),
    );
    handle
}

/// A public display joined through the relay.
struct Display {
    sink: SplitSink<Ws, Message>,
    stream: SplitStream<Ws>,
}

impl Display {
    async fn join(url: &str) -> Self {
        let (ws, _) = connect_async(url).await.unwrap();
        let (sink, stream) = ws.split();
        Display { sink, stream }
    }

    async fn request_snapshot(&mut self) {
        let json = DisplayMessage::request_snapshot().to_json().unwrap();
        self.sink.send(Message::Text(json.into())).await.unwrap();
    }

    async fn next_text(&mut self) -> String {
        loop {
            match timeout(WAIT, self.stream.next()).await.expect("display timed out") {
                Some(Ok(Message::Text(text))) => return text.to_string(),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                other => panic!("expected text frame, got {:?}", other),
            }
        }
    }

    async fn next_snapshot(&mut self) -> Snapshot {
        Snapshot::from_json(&self.next_text().await).unwrap()
    }

    /// Skips frames until one satisfies `pred`.
    async fn snapshot_where(&mut self, pred: impl Fn(&Snapshot) -> bool) -> Snapshot {
        loop {
            let snapshot = self.next_snapshot().await;
            if pred(&snapshot) {
                return snapshot;
            }
        }
    }
}

async fn current(handle: &CoordinatorHandle) -> Snapshot {
    Snapshot::clone(&handle.snapshot().await.unwrap().expect("match initialized"))
}

async fn wait_connected(handle: &CoordinatorHandle) -> String {
    timeout(WAIT, async {
        loop {
            let status = handle.status().await.unwrap();
            if status.session.state == ConnectionState::Connected {
                return status.session.connection_id.expect("connected session has an id");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session never connected")
}

#[tokio::test]
async fn start_sync_pushes_full_snapshot_to_displays() {
    let (url, relay) = start_relay().await;
    let mut display = Display::join(&url).await;
    let store = MemoryStore::new();
    let handle = spawn_coordinator(&url, &store);

    handle.initialize_match(match_init("m1")).unwrap();
    handle.set_score(Slot::A, 1).unwrap();
    let session_id = timeout(WAIT, handle.start_sync().unwrap())
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let snapshot = display.next_snapshot().await;
    assert_eq!(snapshot, current(&handle).await);
    assert_eq!(snapshot.player_a.score, 1);
    assert_eq!(relay.session_info().await.unwrap().id, session_id);
    assert_eq!(store.get(SESSION_ID_KEY).unwrap(), Some(session_id));
}

#[tokio::test]
async fn mutations_and_requests_reach_displays() {
    let (url, _relay) = start_relay().await;
    let mut display = Display::join(&url).await;
    let handle = spawn_coordinator(&url, &MemoryStore::new());
    handle.initialize_match(match_init("m1")).unwrap();
    timeout(WAIT, handle.start_sync().unwrap())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    display.next_snapshot().await;

    // B reaches hansoku level 2, so A is awarded a point.
    handle.set_penalty(Slot::B, 2).unwrap();
    let snapshot = display.snapshot_where(|s| s.player_b.hansoku == 2).await;
    assert_eq!(snapshot.player_a.score, 1);

    // A display that reloads asks for the current state.
    let mut late = Display::join(&url).await;
    late.request_snapshot().await;
    assert_eq!(late.next_snapshot().await, current(&handle).await);
}

#[tokio::test]
async fn stop_sync_blanks_displays_and_forgets_session() {
    let (url, relay) = start_relay().await;
    let mut display = Display::join(&url).await;
    let store = MemoryStore::new();
    let handle = spawn_coordinator(&url, &store);
    handle.initialize_match(match_init("m1")).unwrap();
    timeout(WAIT, handle.start_sync().unwrap())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    display.next_snapshot().await;

    handle.stop_sync().unwrap();
    let text = display.next_text().await;
    assert_eq!(RelayMessage::from_json(&text).unwrap(), RelayMessage::Terminated);

    let status = handle.status().await.unwrap();
    assert_eq!(status.session.state, ConnectionState::Terminated);
    assert_eq!(store.get(SESSION_ID_KEY).unwrap(), None);

    timeout(WAIT, async {
        while relay.session_info().await.is_some() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("relay kept the session");
}

#[tokio::test]
async fn restart_resumes_stored_session() {
    let (url, relay) = start_relay().await;
    let store = MemoryStore::new();

    let first = spawn_coordinator(&url, &store);
    first.initialize_match(match_init("m1")).unwrap();
    let session_id = timeout(WAIT, first.start_sync().unwrap())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    first.shutdown().await.unwrap();
    assert_eq!(store.get(SESSION_ID_KEY).unwrap().as_deref(), Some(session_id.as_str()));

    let mut display = Display::join(&url).await;
    let second = spawn_coordinator(&url, &store);
    second.initialize_match(match_init("m2")).unwrap();

    assert_eq!(wait_connected(&second).await, session_id);
    let snapshot = display.snapshot_where(|s| s.match_id == "m2").await;
    assert_eq!(snapshot, current(&second).await);
    assert_eq!(relay.session_info().await.unwrap().id, session_id);
}

#[tokio::test]
async fn rejected_resume_discards_stored_session() {
    let (url, _relay) = start_relay().await;
    let mut store = MemoryStore::new();
    store.set(SESSION_ID_KEY, "0123456789abcdef").unwrap();

    let handle = spawn_coordinator(&url, &store);
    handle.initialize_match(match_init("m1")).unwrap();

    timeout(WAIT, async {
        while store.get(SESSION_ID_KEY).unwrap().is_some() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("stored session was kept");

    let status = handle.status().await.unwrap();
    assert_eq!(status.session.state, ConnectionState::Closed);
    assert!(status.session.last_error.is_some());
}
