// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Match description files for the operator console.
//!
//! A match file stands in for the persistence layer: it carries the stored
//! match record plus each side's team roster, and the console resolves
//! display names from the rosters before initializing the match.
//!
//! ```json
//! {
//!   "match_id": "m-17",
//!   "tournament_name": "Spring Taikai",
//!   "court_name": "Court A",
//!   "round_name": "Final",
//!   "competitor_a": {
//!     "team_name": "Kodokan",
//!     "roster": [{ "first_name": "Kenji", "last_name": "Sato" }],
//!     "player": 0
//!   },
//!   "competitor_b": { "...": "..." }
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use ks_core::{resolve_display_names, MatchInit, MatchRecord, Player, ResolvedPlayer, ViewMode};

use crate::error::{Error, Result};

/// One side of the match: a team roster and who is fighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub team_name: String,
    pub roster: Vec<Player>,
    /// Index into `roster` of the player in this bout.
    #[serde(default)]
    pub player: usize,
}

impl Entry {
    /// Resolves the fighting player's display name against the whole roster.
    pub fn resolve(&self) -> Result<ResolvedPlayer> {
        let names = resolve_display_names(&self.roster);
        let display_name = names.get(self.player).cloned().ok_or_else(|| {
            Error::MatchFile(format!(
                "player {} is not on the {} roster ({} players)",
                self.player,
                if self.team_name.is_empty() {
                    "team"
                } else {
                    self.team_name.as_str()
                },
                self.roster.len()
            ))
        })?;
        Ok(ResolvedPlayer {
            display_name,
            team_name: self.team_name.clone(),
        })
    }
}

/// Contents of a match file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchFile {
    #[serde(flatten)]
    pub record: MatchRecord,
    #[serde(default)]
    pub tournament_name: String,
    #[serde(default)]
    pub court_name: String,
    #[serde(default)]
    pub round_name: String,
    pub competitor_a: Entry,
    pub competitor_b: Entry,
    /// Overrides the configured match length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_time_secs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_mode: Option<ViewMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_matches: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_match_results: Option<serde_json::Value>,
}

impl MatchFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::MatchFile(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::MatchFile(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Builds the match initialization, resolving both display names.
    pub fn into_init(self) -> Result<MatchInit> {
        if self.record.match_id.trim().is_empty() {
            return Err(Error::MatchFile("match_id must not be empty".to_string()));
        }
        let player_a = self.competitor_a.resolve()?;
        let player_b = self.competitor_b.resolve()?;
        Ok(MatchInit {
            record: self.record,
            tournament_name: self.tournament_name,
            court_name: self.court_name,
            round_name: self.round_name,
            player_a,
            player_b,
            default_match_time_secs: self.match_time_secs,
            group_matches: self.group_matches,
            team_match_results: self.team_match_results,
            initial_view_mode: self.view_mode,
        })
    }
}

#[cfg(test)]
#[path = "match_file_tests.rs"]
mod tests;
