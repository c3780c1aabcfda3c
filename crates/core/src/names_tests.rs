// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn roster(names: &[(&str, &str)]) -> Vec<Player> {
    names.iter().map(|(first, last)| Player::new(*first, *last)).collect()
}

#[test]
fn unique_last_names_stay_short() {
    let players = roster(&[("Kenji", "Tanaka"), ("Mai", "Sato"), ("Ryo", "Ito")]);
    assert_eq!(resolve_display_names(&players), vec!["Tanaka", "Sato", "Ito"]);
}

#[test]
fn shared_last_name_gets_one_initial() {
    let players = roster(&[("Kenji", "Sato"), ("Mai", "Sato"), ("Ryo", "Ito")]);
    assert_eq!(resolve_display_names(&players), vec!["Sato K", "Sato M", "Ito"]);
}

#[test]
fn prefix_grows_until_distinct() {
    let players = roster(&[("Kenta", "Sato"), ("Kenji", "Sato"), ("Mai", "Sato")]);
    // "Ken" is shared, so the whole group needs four characters.
    assert_eq!(
        resolve_display_names(&players),
        vec!["Sato Kent", "Sato Kenj", "Sato Mai"]
    );
}

#[test]
fn identical_full_names_fall_back_to_full_first_name() {
    let players = roster(&[("Kenji", "Sato"), ("Kenji", "Sato"), ("Mai", "Ito")]);
    assert_eq!(
        resolve_display_names(&players),
        vec!["Sato Kenji", "Sato Kenji", "Ito"]
    );
}

#[test]
fn prefixes_count_characters_not_bytes() {
    let players = roster(&[("健二", "佐藤"), ("健太", "佐藤")]);
    assert_eq!(resolve_display_names(&players), vec!["佐藤 健二", "佐藤 健太"]);
}

#[test]
fn groups_are_resolved_independently() {
    let players = roster(&[
        ("Kenji", "Sato"),
        ("Akira", "Ito"),
        ("Kaito", "Sato"),
        ("Aoi", "Ito"),
    ]);
    assert_eq!(
        resolve_display_names(&players),
        vec!["Sato Ke", "Ito Ak", "Sato Ka", "Ito Ao"]
    );
}

#[test]
fn empty_roster() {
    assert!(resolve_display_names(&[]).is_empty());
}
