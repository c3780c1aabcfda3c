// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::TempDir;
use yare::parameterized;

#[test]
fn file_store_set_get_remove() {
    let dir = TempDir::new().unwrap();
    let mut store = FileStore::new(dir.path().join("state"));

    assert_eq!(store.get(SESSION_ID_KEY).unwrap(), None);
    store.set(SESSION_ID_KEY, "abc123").unwrap();
    assert_eq!(store.get(SESSION_ID_KEY).unwrap().as_deref(), Some("abc123"));
    assert!(dir.path().join("state").join("session_id.txt").exists());

    store.remove(SESSION_ID_KEY).unwrap();
    assert_eq!(store.get(SESSION_ID_KEY).unwrap(), None);
}

#[test]
fn file_store_remove_missing_is_ok() {
    let dir = TempDir::new().unwrap();
    let mut store = FileStore::new(dir.path());
    store.remove(SESSION_ID_KEY).unwrap();
}

#[test]
fn file_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    FileStore::new(dir.path()).set("session_id", "s-1").unwrap();

    let reopened = FileStore::new(dir.path());
    assert_eq!(reopened.get("session_id").unwrap().as_deref(), Some("s-1"));
}

#[test]
fn file_store_ignores_surrounding_whitespace() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("session_id.txt"), "  s-2\n").unwrap();
    let store = FileStore::new(dir.path());
    assert_eq!(store.get("session_id").unwrap().as_deref(), Some("s-2"));
}

#[test]
fn file_store_blank_file_reads_as_missing() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("session_id.txt"), "\n").unwrap();
    let store = FileStore::new(dir.path());
    assert_eq!(store.get("session_id").unwrap(), None);
}

#[parameterized(
    empty = { "" },
    traversal = { "../escape" },
    separator = { "a/b" },
    dot = { "session.id" },
)]
fn file_store_rejects_bad_keys(key: &str) {
    let dir = TempDir::new().unwrap();
    let mut store = FileStore::new(dir.path());
    assert!(matches!(store.set(key, "x"), Err(StoreError::InvalidKey(_))));
}

#[test]
fn memory_store_clones_share_values() {
    let mut store = MemoryStore::new();
    let observer = store.clone();

    store.set(SESSION_ID_KEY, "shared").unwrap();
    assert_eq!(observer.get(SESSION_ID_KEY).unwrap().as_deref(), Some("shared"));

    store.remove(SESSION_ID_KEY).unwrap();
    assert_eq!(observer.get(SESSION_ID_KEY).unwrap(), None);
}
