// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Short display names for a team roster.
//!
//! Every player is shown by last name. Players sharing a last name get the
//! shortest common first-name prefix that tells them apart ("Sato K",
//! "Sato M"). When even full first names collide, the whole group falls back
//! to last name plus full first name.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub first_name: String,
    pub last_name: String,
}

impl Player {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Player {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

/// Assigns a display name to every player, in roster order.
pub fn resolve_display_names(players: &[Player]) -> Vec<String> {
    let mut names: Vec<String> = players.iter().map(|p| p.last_name.clone()).collect();

    let last_names: BTreeSet<&str> = players.iter().map(|p| p.last_name.as_str()).collect();
    for last_name in last_names {
        let group: Vec<usize> = players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.last_name == last_name)
            .map(|(i, _)| i)
            .collect();
        if group.len() < 2 {
            continue;
        }

        let longest = group
            .iter()
            .map(|&i| players[i].first_name.chars().count())
            .max()
            .unwrap_or(0);

        let resolved = (1..=longest).find_map(|len| {
            let candidates: Vec<String> = group
                .iter()
                .map(|&i| with_initials(&players[i], len))
                .collect();
            let distinct: BTreeSet<&String> = candidates.iter().collect();
            (distinct.len() == candidates.len()).then_some(candidates)
        });

        match resolved {
            Some(candidates) => {
                for (&i, name) in group.iter().zip(candidates) {
                    names[i] = name;
                }
            }
            None => {
                for &i in &group {
                    names[i] = format!("{} {}", players[i].last_name, players[i].first_name);
                }
            }
        }
    }

    names
}

fn with_initials(player: &Player, len: usize) -> String {
    let prefix: String = player.first_name.chars().take(len).collect();
    format!("{} {}", player.last_name, prefix)
}

#[cfg(test)]
#[path = "names_tests.rs"]
mod tests;
