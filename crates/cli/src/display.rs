// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One-line text rendering of snapshots and sync status.

use ks_core::{MatchResult, Phase, PlayerView, Snapshot, ViewMode};

use crate::sync::{SyncStatus, TransportStatus};

/// Shown by displays when there is nothing to show.
pub const BLANK_LINE: &str = "-- no match --";

/// Marker for one penalty level.
const HANSOKU_MARK: char = '▲';

/// Formats seconds as `M:SS`. Minutes are not wrapped into hours.
pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Parses `SS` or `M:SS` into seconds. A plain negative number is kept so
/// the caller can clamp it.
pub fn parse_clock(s: &str) -> Option<i64> {
    match s.split_once(':') {
        None => s.parse().ok(),
        Some((mins, secs)) => {
            if secs.len() != 2 {
                return None;
            }
            let mins: u32 = mins.parse().ok()?;
            let secs: u32 = secs.parse().ok()?;
            (secs < 60).then(|| i64::from(mins) * 60 + i64::from(secs))
        }
    }
}

fn hansoku(player: &PlayerView) -> String {
    HANSOKU_MARK.to_string().repeat(usize::from(player.hansoku))
}

/// Renders a snapshot as a single scoreboard line, e.g.
/// `Sato 1▲ - 0 Suzuki  2:59 ▶`.
pub fn render_line(snapshot: &Snapshot) -> String {
    let a = &snapshot.player_a;
    let b = &snapshot.player_b;
    let mut line = format!(
        "{} {}{} - {}{} {}  {} {}",
        a.display_name,
        a.score,
        hansoku(a),
        b.score,
        hansoku(b),
        b.display_name,
        format_clock(snapshot.time_remaining),
        if snapshot.is_timer_running { "▶" } else { "■" },
    );

    match snapshot.match_result {
        Some(MatchResult::PlayerA) => line.push_str(&format!(" | winner: {}", a.display_name)),
        Some(MatchResult::PlayerB) => line.push_str(&format!(" | winner: {}", b.display_name)),
        Some(MatchResult::Draw) => line.push_str(" | draw"),
        None => {}
    }
    match snapshot.view_mode {
        ViewMode::Match => {}
        ViewMode::TeamMatch => line.push_str(" [team match]"),
        ViewMode::GroupTable => line.push_str(" [group table]"),
    }
    if !snapshot.is_public {
        line.push_str(" (private)");
    }
    line
}

fn render_transport(status: &TransportStatus) -> String {
    let mut line = format!("{:<10} {}", status.kind.as_str(), status.state);
    if let Some(id) = &status.connection_id {
        line.push_str(&format!(" id={}", id));
    }
    if let Some(err) = &status.last_error {
        line.push_str(&format!(" last_error=\"{}\"", err));
    }
    line
}

/// Renders coordinator status, one line per item.
pub fn render_status(status: &SyncStatus) -> String {
    let phase = match status.phase {
        Some(Phase::Ongoing) => "ongoing",
        Some(Phase::Finished) => "finished",
        None => "no match",
    };
    format!(
        "match      {}\n{}\n{}",
        phase,
        render_transport(&status.session),
        render_transport(&status.broadcast)
    )
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
