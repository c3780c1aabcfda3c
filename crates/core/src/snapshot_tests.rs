// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::state::{MatchInit, MatchRecord, ResolvedPlayer};

fn state() -> MatchState {
    let init = MatchInit {
        record: MatchRecord {
            match_id: "m-42".to_string(),
            ..MatchRecord::default()
        },
        tournament_name: "Spring Open".to_string(),
        court_name: "Court B".to_string(),
        round_name: "Final".to_string(),
        player_a: ResolvedPlayer {
            display_name: "Suzuki K".to_string(),
            team_name: "Kita".to_string(),
        },
        player_b: ResolvedPlayer {
            display_name: "Ito".to_string(),
            team_name: "Minami".to_string(),
        },
        ..MatchInit::default()
    };
    MatchState::new(init, 180, TimerMode::Countdown)
}

#[test]
fn capture_reflects_state() {
    let mut state = state();
    state.set_penalty(Slot::B, 2);
    state.set_visibility(Visibility::Public);

    let snapshot = Snapshot::capture(&state);
    assert_eq!(snapshot.match_id, "m-42");
    assert_eq!(snapshot.player_a.score, 1);
    assert_eq!(snapshot.player_b.hansoku, 2);
    assert_eq!(snapshot.time_remaining, 180);
    assert!(snapshot.is_public);
    assert!(!snapshot.is_timer_running);
    assert_eq!(snapshot.match_result, None);
}

#[test]
fn wire_format_uses_display_field_names() {
    let mut state = state();
    state.set_score(Slot::A, 2);
    let json = Snapshot::capture(&state).to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["matchId"], "m-42");
    assert_eq!(value["tournamentName"], "Spring Open");
    assert_eq!(value["courtName"], "Court B");
    assert_eq!(value["roundName"], "Final");
    assert_eq!(value["playerA"]["displayName"], "Suzuki K");
    assert_eq!(value["playerA"]["teamName"], "Kita");
    assert_eq!(value["playerA"]["score"], 2);
    assert_eq!(value["playerB"]["hansoku"], 0);
    assert_eq!(value["timeRemaining"], 180);
    assert_eq!(value["isTimerRunning"], false);
    assert_eq!(value["timerMode"], "countdown");
    assert_eq!(value["isPublic"], false);
    assert_eq!(value["viewMode"], "match");
    assert_eq!(value["matchResult"], "playerA");
}

#[test]
fn absent_optional_fields_are_omitted() {
    let json = Snapshot::capture(&state()).to_json().unwrap();
    assert!(!json.contains("matchResult"));
    assert!(!json.contains("groupMatches"));
    assert!(!json.contains("teamMatchResults"));
}

#[test]
fn pass_through_payloads_survive_parsing() {
    let mut init = MatchInit {
        record: MatchRecord {
            match_id: "m-7".to_string(),
            ..MatchRecord::default()
        },
        ..MatchInit::default()
    };
    init.group_matches = Some(serde_json::json!([{ "matchId": "m-6", "scoreA": 1 }]));
    init.initial_view_mode = Some(ViewMode::GroupTable);
    let snapshot = Snapshot::capture(&MatchState::new(init, 120, TimerMode::Countdown));

    let parsed = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
    assert_eq!(parsed, snapshot);
    assert_eq!(parsed.view_mode, ViewMode::GroupTable);
}
