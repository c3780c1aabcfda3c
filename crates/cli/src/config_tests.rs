// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use tempfile::TempDir;

#[test]
fn missing_file_yields_defaults() {
    let temp = TempDir::new().unwrap();
    let config = Config::load(&temp.path().join("kenscore.toml")).unwrap();
    assert_eq!(config.timer.default_match_time_secs, 180);
    assert_eq!(config.timer.default_mode, TimerMode::Countdown);
    assert_eq!(config.sync.tick_push_window_ms, 1000);
    assert!(config.session.relay_url.is_none());
    assert!(config.broadcast.enabled);
}

#[test]
fn partial_file_fills_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("kenscore.toml");
    fs::write(
        &path,
        r#"
[timer]
default_match_time_secs = 240
default_mode = "stopwatch"

[session]
relay_url = "ws://10.0.0.5:7891"
"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.timer.default_match_time_secs, 240);
    assert_eq!(config.timer.default_mode, TimerMode::Stopwatch);
    assert_eq!(config.session.relay_url.as_deref(), Some("ws://10.0.0.5:7891"));
    assert_eq!(config.session.connect_timeout_secs, 5);
    assert_eq!(config.broadcast.target.port(), 7892);
}

#[test]
fn save_then_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("kenscore.toml");
    let mut config = Config::default();
    config.broadcast.enabled = false;
    config.sync.state_dir = Some(temp.path().join("state"));
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert!(!loaded.broadcast.enabled);
    assert_eq!(loaded.state_dir(), temp.path().join("state"));
}

#[test]
fn rejects_zero_push_window() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("kenscore.toml");
    fs::write(&path, "[sync]\ntick_push_window_ms = 0\n").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("tick_push_window_ms"));
}

#[test]
fn rejects_non_websocket_relay() {
    let mut config = Config::default();
    config.session.relay_url = Some("http://relay.local".to_string());
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("ws://"));
}

#[test]
fn malformed_toml_is_a_config_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("kenscore.toml");
    fs::write(&path, "[timer\n").unwrap();
    assert!(matches!(Config::load(&path), Err(Error::Config(_))));
}

#[test]
fn sync_settings_follow_config() {
    let mut config = Config::default();
    config.timer.default_match_time_secs = 120;
    config.sync.tick_push_window_ms = 500;
    config.session.connect_timeout_secs = 2;

    let settings = config.sync_settings();
    assert_eq!(settings.default_match_time_secs, 120);
    assert_eq!(settings.push_window, Duration::from_millis(500));
    assert_eq!(settings.connect_timeout, Duration::from_secs(2));
    assert_eq!(settings.tick_interval, Duration::from_secs(1));
}
