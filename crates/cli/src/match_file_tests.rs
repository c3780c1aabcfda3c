// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::TempDir;

const TEAM_FINAL: &str = r#"{
  "match_id": "m-17",
  "score_a": 1,
  "penalty_b": 1,
  "tournament_name": "Spring Taikai",
  "court_name": "Court A",
  "round_name": "Final",
  "match_time_secs": 240,
  "view_mode": "teamMatch",
  "team_match_results": [{"winner": "a"}],
  "competitor_a": {
    "team_name": "Kodokan",
    "roster": [
      {"first_name": "Kenji", "last_name": "Sato"},
      {"first_name": "Makoto", "last_name": "Sato"},
      {"first_name": "Hiro", "last_name": "Ito"}
    ],
    "player": 1
  },
  "competitor_b": {
    "team_name": "Shubukan",
    "roster": [{"first_name": "Taro", "last_name": "Suzuki"}]
  }
}"#;

#[test]
fn parses_full_match_file() {
    let file = MatchFile::parse(TEAM_FINAL).unwrap();
    assert_eq!(file.record.match_id, "m-17");
    assert_eq!(file.record.score_a, 1);
    assert_eq!(file.record.penalty_b, 1);
    assert_eq!(file.record.score_b, 0);
    assert_eq!(file.match_time_secs, Some(240));
    assert_eq!(file.view_mode, Some(ViewMode::TeamMatch));
    assert_eq!(file.competitor_a.player, 1);
    assert_eq!(file.competitor_b.player, 0);
}

#[test]
fn into_init_resolves_names_against_roster() {
    let init = MatchFile::parse(TEAM_FINAL).unwrap().into_init().unwrap();
    assert_eq!(init.player_a.display_name, "Sato M");
    assert_eq!(init.player_a.team_name, "Kodokan");
    assert_eq!(init.player_b.display_name, "Suzuki");
    assert_eq!(init.default_match_time_secs, Some(240));
    assert_eq!(init.initial_view_mode, Some(ViewMode::TeamMatch));
    assert!(init.team_match_results.is_some());
    assert!(init.group_matches.is_none());
}

#[test]
fn player_index_out_of_range() {
    let mut file = MatchFile::parse(TEAM_FINAL).unwrap();
    file.competitor_b.player = 3;
    let err = file.into_init().unwrap_err();
    assert!(matches!(err, Error::MatchFile(_)));
    assert!(err.to_string().contains("not on the Shubukan roster (1 players)"));
}

#[test]
fn empty_match_id_is_rejected() {
    let mut file = MatchFile::parse(TEAM_FINAL).unwrap();
    file.record.match_id = " ".to_string();
    assert!(matches!(file.into_init(), Err(Error::MatchFile(_))));
}

#[test]
fn load_reads_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("final.json");
    std::fs::write(&path, TEAM_FINAL).unwrap();

    let file = MatchFile::load(&path).unwrap();
    assert_eq!(file.round_name, "Final");
}

#[test]
fn load_reports_path_on_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.json");
    let err = MatchFile::load(&missing).unwrap_err();
    assert!(err.to_string().contains("missing.json"));

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{\"match_id\": ").unwrap();
    let err = MatchFile::load(&broken).unwrap_err();
    assert!(matches!(err, Error::MatchFile(_)));
    assert!(err.to_string().contains("broken.json"));
}
