// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Operator configuration.
//!
//! Configuration is stored in `kenscore.toml` and includes:
//! - `[timer]`: default match length and timer direction
//! - `[sync]`: tick push coalescing window and the state directory
//! - `[session]`: relay URL for the session transport (optional)
//! - `[broadcast]`: UDP target and control addresses

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ks_core::TimerMode;

use crate::error::{Error, Result};
use crate::sync::SyncSettings;

const CONFIG_DIR_NAME: &str = "kenscore";
const CONFIG_FILE_NAME: &str = "kenscore.toml";

/// Operator configuration stored in `kenscore.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
}

/// Defaults applied to every freshly initialized match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Match length in seconds when the match record does not carry one (default: 180).
    #[serde(default = "default_match_time_secs")]
    pub default_match_time_secs: u32,
    /// Timer direction for new matches (default: countdown).
    #[serde(default)]
    pub default_mode: TimerMode,
}

/// Coordinator behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// At most one timer-only push per window, in milliseconds (default: 1000).
    #[serde(default = "default_tick_push_window_ms")]
    pub tick_push_window_ms: u64,
    /// Directory holding the persisted session id. Defaults to the user data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

/// Session transport (relay) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Relay URL, `ws://...` or `wss://...`. Absent means the session
    /// transport is not available and only broadcast is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_url: Option<String>,
    /// Max time to wait for a connect or resume, in seconds (default: 5).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Broadcast transport (UDP) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Whether to mirror snapshots over UDP (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Where snapshot datagrams are sent; may be a broadcast or multicast address.
    #[serde(default = "default_broadcast_target")]
    pub target: SocketAddr,
    /// Local address that receives `request_snapshot` datagrams from displays.
    #[serde(default = "default_broadcast_listen")]
    pub listen: SocketAddr,
}

fn default_match_time_secs() -> u32 {
    180
}

fn default_tick_push_window_ms() -> u64 {
    1000
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_broadcast_target() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7892))
}

fn default_broadcast_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7893))
}

impl Default for TimerConfig {
    fn default() -> Self {
        TimerConfig {
            default_match_time_secs: default_match_time_secs(),
            default_mode: TimerMode::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            tick_push_window_ms: default_tick_push_window_ms(),
            state_dir: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            relay_url: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        BroadcastConfig {
            enabled: true,
            target: default_broadcast_target(),
            listen: default_broadcast_listen(),
        }
    }
}

impl Config {
    /// Loads configuration from the given file.
    ///
    /// A missing file yields the defaults; a file that exists but does not
    /// parse or validate is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config at {}, using defaults", path.display());
                return Ok(Config::default());
            }
            Err(e) => return Err(Error::Config(format!("failed to read config: {}", e))),
        };
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to the given file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Checks values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.sync.tick_push_window_ms == 0 {
            return Err(Error::Config(
                "sync.tick_push_window_ms must be greater than 0".to_string(),
            ));
        }
        if let Some(url) = &self.session.relay_url {
            if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                return Err(Error::Config(format!(
                    "invalid relay URL '{}': must be ws:// or wss://",
                    url
                )));
            }
        }
        Ok(())
    }

    /// Directory for persisted local state (the session id).
    pub fn state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.sync.state_dir {
            return dir.clone();
        }
        dirs::data_local_dir()
            .map(|d| d.join(CONFIG_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(".kenscore"))
    }

    /// Coordinator settings derived from this configuration.
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            default_match_time_secs: self.timer.default_match_time_secs,
            default_timer_mode: self.timer.default_mode,
            push_window: Duration::from_millis(self.sync.tick_push_window_ms),
            connect_timeout: Duration::from_secs(self.session.connect_timeout_secs),
            ..SyncSettings::default()
        }
    }
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(CONFIG_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_FILE_NAME)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
