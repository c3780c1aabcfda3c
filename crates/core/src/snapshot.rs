// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Display snapshot: the full, self-contained wire form of a match.
//!
//! The same JSON document is sent over every transport. Displays replace
//! whatever they showed with the latest snapshot they receive; there is no
//! diff protocol.

use serde::{Deserialize, Serialize};

use crate::state::{MatchResult, MatchState, Slot, TimerMode, ViewMode, Visibility};

/// One competitor as shown on a display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub display_name: String,
    pub team_name: String,
    pub score: u8,
    /// Penalty level, 0–4.
    pub hansoku: u8,
}

/// Immutable projection of a [`MatchState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub match_id: String,
    pub tournament_name: String,
    pub court_name: String,
    pub round_name: String,
    pub player_a: PlayerView,
    pub player_b: PlayerView,
    pub time_remaining: u32,
    pub is_timer_running: bool,
    pub timer_mode: TimerMode,
    pub is_public: bool,
    pub view_mode: ViewMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_result: Option<MatchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_match_results: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_matches: Option<serde_json::Value>,
}

impl Snapshot {
    /// Captures the current state of a match.
    pub fn capture(state: &MatchState) -> Self {
        Snapshot {
            match_id: state.match_id().to_string(),
            tournament_name: state.tournament_name().to_string(),
            court_name: state.court_name().to_string(),
            round_name: state.round_name().to_string(),
            player_a: player_view(state, Slot::A),
            player_b: player_view(state, Slot::B),
            time_remaining: state.time_remaining_secs(),
            is_timer_running: state.is_running(),
            timer_mode: state.timer_mode(),
            is_public: state.visibility() == Visibility::Public,
            view_mode: state.view_mode(),
            match_result: state.match_result(),
            team_match_results: state.team_match_results().cloned(),
            group_matches: state.group_matches().cloned(),
        }
    }

    pub fn player(&self, slot: Slot) -> &PlayerView {
        match slot {
            Slot::A => &self.player_a,
            Slot::B => &self.player_b,
        }
    }

    /// Serializes the snapshot to its wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a snapshot from its wire form.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

fn player_view(state: &MatchState, slot: Slot) -> PlayerView {
    let competitor = state.competitor(slot);
    PlayerView {
        display_name: competitor.display_name.clone(),
        team_name: competitor.team_name.clone(),
        score: competitor.score(),
        hansoku: competitor.penalty(),
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
