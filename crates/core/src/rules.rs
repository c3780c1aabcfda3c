// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Penalty-to-score coupling.
//!
//! Penalty levels award points to the opponent:
//!
//! | level | meaning         | points to opponent |
//! |-------|-----------------|--------------------|
//! | 0     | none            | 0                  |
//! | 1     | yellow          | 0                  |
//! | 2     | red             | 1                  |
//! | 3     | red + yellow    | 1                  |
//! | 4     | red + red       | 2                  |
//!
//! Moving between two levels awards (or takes back) the difference, so a
//! correction that lowers the level reverses the earlier award.

/// Highest score a competitor can hold. Reaching it ends the match.
pub const MAX_SCORE: u8 = 2;

/// Highest penalty level. Reaching it ends the match.
pub const MAX_PENALTY: u8 = 4;

/// Points a penalty level is worth to the opponent.
pub fn points(level: u8) -> u8 {
    debug_assert!(level <= MAX_PENALTY, "penalty level {level} out of range");
    match level {
        0 | 1 => 0,
        2 | 3 => 1,
        _ => 2,
    }
}

/// Computes the opponent's new score after a penalty moves from `old_level`
/// to `new_level`.
///
/// Both levels must already be clamped to `0..=MAX_PENALTY`. The result is
/// always within `0..=MAX_SCORE`.
pub fn apply(old_level: u8, new_level: u8, opponent_score: u8) -> u8 {
    let awarded = i16::from(points(new_level)) - i16::from(points(old_level));
    let score = i16::from(opponent_score) + awarded;
    // Clamped to 0..=2 so the narrowing cast is lossless.
    score.clamp(0, i16::from(MAX_SCORE)) as u8
}

/// Clamps an operator-supplied score into range.
pub fn clamp_score(value: i64) -> u8 {
    value.clamp(0, i64::from(MAX_SCORE)) as u8
}

/// Clamps an operator-supplied penalty level into range.
pub fn clamp_penalty(value: i64) -> u8 {
    value.clamp(0, i64::from(MAX_PENALTY)) as u8
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
