// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

fn presenter() -> (
    mpsc::UnboundedSender<RelayMessage>,
    mpsc::UnboundedReceiver<RelayMessage>,
) {
    mpsc::unbounded_channel()
}

#[test]
fn session_ids_are_hex_and_vary_by_connection() {
    let now = Utc::now();
    let a = generate_session_id(1, &now);
    let b = generate_session_id(2, &now);
    assert_eq!(a.len(), 16);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
}

#[tokio::test]
async fn open_then_publish_reaches_subscribers() {
    let state = RelayState::new();
    let mut frames = state.subscribe();
    let (tx, _rx) = presenter();

    state.open(1, tx).await;
    assert!(state.publish(1, Arc::from("{\"matchId\":\"m1\"}")).await);

    assert_eq!(
        frames.recv().await.unwrap(),
        Frame::Snapshot(Arc::from("{\"matchId\":\"m1\"}"))
    );
    assert_eq!(
        state.latest_snapshot().await.as_deref(),
        Some("{\"matchId\":\"m1\"}")
    );
}

#[tokio::test]
async fn publish_from_non_presenter_is_dropped() {
    let state = RelayState::new();
    let (tx, _rx) = presenter();
    state.open(1, tx).await;

    assert!(!state.publish(2, Arc::from("{}")).await);
    assert_eq!(state.latest_snapshot().await, None);
}

#[tokio::test]
async fn detached_session_can_be_resumed() {
    let state = RelayState::new();
    let (tx, _rx) = presenter();
    let id = state.open(1, tx).await;
    state.detach(1).await;
    assert!(!state.session_info().await.unwrap().presenter_attached);

    let (tx2, _rx2) = presenter();
    state.resume(2, tx2, &id).await.unwrap();
    let info = state.session_info().await.unwrap();
    assert_eq!(info.id, id);
    assert!(info.presenter_attached);
}

#[tokio::test]
async fn resume_rejects_unknown_or_missing_session() {
    let state = RelayState::new();
    let (tx, _rx) = presenter();
    assert_eq!(
        state.resume(1, tx.clone(), "nope").await,
        Err(ResumeError::NoSession)
    );

    state.open(1, tx.clone()).await;
    assert_eq!(
        state.resume(2, tx, "nope").await,
        Err(ResumeError::UnknownSession)
    );
}

#[tokio::test]
async fn resume_displaces_attached_presenter() {
    let state = RelayState::new();
    let (tx1, mut rx1) = presenter();
    let id = state.open(1, tx1).await;

    let (tx2, _rx2) = presenter();
    state.resume(2, tx2, &id).await.unwrap();
    assert_eq!(rx1.recv().await, Some(RelayMessage::Terminated));
    assert!(!state.publish(1, Arc::from("{}")).await);
    assert!(state.publish(2, Arc::from("{}")).await);
}

#[tokio::test]
async fn open_replaces_previous_session() {
    let state = RelayState::new();
    let mut frames = state.subscribe();
    let (tx1, mut rx1) = presenter();
    let first = state.open(1, tx1).await;

    let (tx2, _rx2) = presenter();
    let second = state.open(2, tx2).await;
    assert_ne!(first, second);
    assert_eq!(rx1.recv().await, Some(RelayMessage::Terminated));
    assert_eq!(frames.recv().await.unwrap(), Frame::Terminated);
    assert_eq!(state.session_info().await.unwrap().id, second);
}

#[tokio::test]
async fn terminate_ends_session_and_blanks_displays() {
    let state = RelayState::new();
    let mut frames = state.subscribe();
    let (tx, _rx) = presenter();
    state.open(1, tx).await;

    assert!(!state.terminate(2).await);
    assert!(state.terminate(1).await);
    assert_eq!(frames.recv().await.unwrap(), Frame::Terminated);
    assert_eq!(state.session_info().await, None);
}

#[tokio::test]
async fn request_snapshot_forwards_to_presenter() {
    let state = RelayState::new();
    assert!(!state.request_snapshot().await);

    let (tx, mut rx) = presenter();
    state.open(1, tx).await;
    assert!(state.request_snapshot().await);
    assert_eq!(rx.recv().await, Some(RelayMessage::RequestSnapshot));
}
