// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory state machine for a single bout.
//!
//! A match is either ongoing or finished. It finishes the moment either
//! competitor reaches [`MAX_SCORE`] points or [`MAX_PENALTY`] penalties, and
//! the timer stops in the same transition. Only [`MatchState::reset_match`]
//! (or replacing the whole state) brings it back to ongoing.
//!
//! Operator input is never rejected: scores, penalties and times are clamped.
//! Every mutation reports a [`Change`] so the caller knows whether, and how
//! urgently, the new state has to be published.

use serde::{Deserialize, Serialize};

use crate::rules::{self, MAX_PENALTY, MAX_SCORE};

/// One side of the bout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub fn opponent(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::A => "a",
            Slot::B => "b",
        }
    }
}

/// Timer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    /// Counts down from the match length and stops at zero.
    #[default]
    Countdown,
    /// Counts up from zero without limit.
    Stopwatch,
}

/// Whether public displays should show the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

/// Layout the displays should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    /// Single bout scoreboard.
    #[default]
    Match,
    /// Scoreboard plus the running team match results.
    TeamMatch,
    /// Group (pool) standings.
    GroupTable,
}

/// Outcome recorded when a match finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchResult {
    PlayerA,
    PlayerB,
    Draw,
}

impl MatchResult {
    pub fn winner(self) -> Option<Slot> {
        match self {
            MatchResult::PlayerA => Some(Slot::A),
            MatchResult::PlayerB => Some(Slot::B),
            MatchResult::Draw => None,
        }
    }
}

/// Lifecycle of a match instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Ongoing,
    Finished,
}

/// What a mutation changed, from the point of view of displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Change {
    /// Nothing observable changed.
    None,
    /// Only the clock value moved.
    Timer,
    /// Anything else: scores, penalties, running state, visibility, reset.
    Substantive,
}

/// A competitor as tracked during the bout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Competitor {
    pub display_name: String,
    pub team_name: String,
    score: u8,
    penalty: u8,
}

impl Competitor {
    pub fn new(display_name: impl Into<String>, team_name: impl Into<String>) -> Self {
        Competitor {
            display_name: display_name.into(),
            team_name: team_name.into(),
            score: 0,
            penalty: 0,
        }
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn penalty(&self) -> u8 {
        self.penalty
    }
}

/// Display identity for one competitor, produced by the name resolver.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolvedPlayer {
    pub display_name: String,
    #[serde(default)]
    pub team_name: String,
}

/// Stored match record as supplied by the persistence layer.
///
/// Values are taken as-is from storage and clamped when the match is built.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: String,
    #[serde(default)]
    pub score_a: i64,
    #[serde(default)]
    pub penalty_a: i64,
    #[serde(default)]
    pub score_b: i64,
    #[serde(default)]
    pub penalty_b: i64,
}

/// Everything needed to build a fresh match.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchInit {
    pub record: MatchRecord,
    pub tournament_name: String,
    pub court_name: String,
    pub round_name: String,
    pub player_a: ResolvedPlayer,
    pub player_b: ResolvedPlayer,
    /// Match length; `None` uses the configured default.
    pub default_match_time_secs: Option<u32>,
    pub group_matches: Option<serde_json::Value>,
    pub team_match_results: Option<serde_json::Value>,
    pub initial_view_mode: Option<ViewMode>,
}

/// Authoritative state of one bout.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchState {
    match_id: String,
    tournament_name: String,
    court_name: String,
    round_name: String,
    competitor_a: Competitor,
    competitor_b: Competitor,
    match_length_secs: u32,
    time_remaining_secs: u32,
    timer_mode: TimerMode,
    is_running: bool,
    visibility: Visibility,
    view_mode: ViewMode,
    phase: Phase,
    match_result: Option<MatchResult>,
    group_matches: Option<serde_json::Value>,
    team_match_results: Option<serde_json::Value>,
}

impl MatchState {
    /// Builds a match from an init record.
    ///
    /// `fallback_time_secs` is used when the init carries no match length.
    /// A record that is already decided starts out finished.
    pub fn new(init: MatchInit, fallback_time_secs: u32, timer_mode: TimerMode) -> Self {
        let match_length_secs = init.default_match_time_secs.unwrap_or(fallback_time_secs);
        let MatchInit {
            record,
            tournament_name,
            court_name,
            round_name,
            player_a,
            player_b,
            group_matches,
            team_match_results,
            initial_view_mode,
            ..
        } = init;

        let mut competitor_a = Competitor::new(player_a.display_name, player_a.team_name);
        competitor_a.score = rules::clamp_score(record.score_a);
        competitor_a.penalty = rules::clamp_penalty(record.penalty_a);
        let mut competitor_b = Competitor::new(player_b.display_name, player_b.team_name);
        competitor_b.score = rules::clamp_score(record.score_b);
        competitor_b.penalty = rules::clamp_penalty(record.penalty_b);

        let mut state = MatchState {
            match_id: record.match_id,
            tournament_name,
            court_name,
            round_name,
            competitor_a,
            competitor_b,
            match_length_secs,
            time_remaining_secs: starting_time(timer_mode, match_length_secs),
            timer_mode,
            is_running: false,
            visibility: Visibility::default(),
            view_mode: initial_view_mode.unwrap_or_default(),
            phase: Phase::Ongoing,
            match_result: None,
            group_matches,
            team_match_results,
        };
        state.settle();
        state
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn tournament_name(&self) -> &str {
        &self.tournament_name
    }

    pub fn court_name(&self) -> &str {
        &self.court_name
    }

    pub fn round_name(&self) -> &str {
        &self.round_name
    }

    pub fn competitor(&self, slot: Slot) -> &Competitor {
        match slot {
            Slot::A => &self.competitor_a,
            Slot::B => &self.competitor_b,
        }
    }

    fn competitor_mut(&mut self, slot: Slot) -> &mut Competitor {
        match slot {
            Slot::A => &mut self.competitor_a,
            Slot::B => &mut self.competitor_b,
        }
    }

    pub fn time_remaining_secs(&self) -> u32 {
        self.time_remaining_secs
    }

    pub fn match_length_secs(&self) -> u32 {
        self.match_length_secs
    }

    pub fn timer_mode(&self) -> TimerMode {
        self.timer_mode
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn match_result(&self) -> Option<MatchResult> {
        self.match_result
    }

    pub fn group_matches(&self) -> Option<&serde_json::Value> {
        self.group_matches.as_ref()
    }

    pub fn team_match_results(&self) -> Option<&serde_json::Value> {
        self.team_match_results.as_ref()
    }

    /// Current leader: the higher score wins, equal scores are a draw.
    ///
    /// Meaningful as a final result once finished, and as a hint while the
    /// match is still running.
    pub fn leader(&self) -> MatchResult {
        match self.competitor_a.score.cmp(&self.competitor_b.score) {
            std::cmp::Ordering::Greater => MatchResult::PlayerA,
            std::cmp::Ordering::Less => MatchResult::PlayerB,
            std::cmp::Ordering::Equal => MatchResult::Draw,
        }
    }

    /// Sets a competitor's score, clamped to `0..=2`.
    pub fn set_score(&mut self, slot: Slot, value: i64) -> Change {
        let score = rules::clamp_score(value);
        let competitor = self.competitor_mut(slot);
        if competitor.score == score {
            return Change::None;
        }
        competitor.score = score;
        self.settle();
        Change::Substantive
    }

    /// Sets a competitor's penalty level, clamped to `0..=4`, and adjusts the
    /// opponent's score accordingly.
    pub fn set_penalty(&mut self, slot: Slot, value: i64) -> Change {
        let level = rules::clamp_penalty(value);
        let old_level = self.competitor(slot).penalty;
        if old_level == level {
            return Change::None;
        }
        self.competitor_mut(slot).penalty = level;
        let opponent = self.competitor_mut(slot.opponent());
        opponent.score = rules::apply(old_level, level, opponent.score);
        self.settle();
        Change::Substantive
    }

    /// Clears scores and penalties and reopens the match. The timer is left
    /// alone.
    pub fn reset_match(&mut self) -> Change {
        for slot in [Slot::A, Slot::B] {
            let competitor = self.competitor_mut(slot);
            competitor.score = 0;
            competitor.penalty = 0;
        }
        self.phase = Phase::Ongoing;
        self.match_result = None;
        Change::Substantive
    }

    /// Ends the match on the operator's decision, recording the current
    /// leader (or a draw) as the result.
    pub fn finish(&mut self) -> Change {
        if self.is_finished() {
            return Change::None;
        }
        self.finish_now();
        Change::Substantive
    }

    /// Starts the clock. Ignored once the match is finished.
    pub fn start_timer(&mut self) -> Change {
        if self.is_running || self.is_finished() {
            return Change::None;
        }
        if self.timer_mode == TimerMode::Countdown && self.time_remaining_secs == 0 {
            return Change::None;
        }
        self.is_running = true;
        Change::Substantive
    }

    pub fn stop_timer(&mut self) -> Change {
        if !self.is_running {
            return Change::None;
        }
        self.is_running = false;
        Change::Substantive
    }

    /// Manually sets the clock, clamped to `>= 0`. Allowed while running.
    pub fn set_time(&mut self, secs: i64) -> Change {
        let secs = secs.clamp(0, i64::from(u32::MAX)) as u32;
        if secs == self.time_remaining_secs {
            return Change::None;
        }
        self.time_remaining_secs = secs;
        Change::Substantive
    }

    /// Switches timer direction. Stops the clock and rewinds it to the
    /// mode's starting value.
    pub fn set_timer_mode(&mut self, mode: TimerMode) -> Change {
        if mode == self.timer_mode {
            return Change::None;
        }
        self.timer_mode = mode;
        self.is_running = false;
        self.time_remaining_secs = starting_time(mode, self.match_length_secs);
        Change::Substantive
    }

    pub fn set_visibility(&mut self, visibility: Visibility) -> Change {
        if visibility == self.visibility {
            return Change::None;
        }
        self.visibility = visibility;
        Change::Substantive
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) -> Change {
        if view_mode == self.view_mode {
            return Change::None;
        }
        self.view_mode = view_mode;
        Change::Substantive
    }

    /// Advances the clock by one second.
    ///
    /// Countdown stops the moment it reaches zero; stopwatch only counts up.
    /// A tick that stops the clock is reported as substantive.
    pub fn tick(&mut self) -> Change {
        if !self.is_running {
            return Change::None;
        }
        match self.timer_mode {
            TimerMode::Countdown => {
                if self.time_remaining_secs == 0 {
                    self.is_running = false;
                    return Change::Substantive;
                }
                self.time_remaining_secs -= 1;
                if self.time_remaining_secs == 0 {
                    self.is_running = false;
                    return Change::Substantive;
                }
                Change::Timer
            }
            TimerMode::Stopwatch => {
                self.time_remaining_secs = self.time_remaining_secs.saturating_add(1);
                Change::Timer
            }
        }
    }

    /// Finishes the match if a win condition holds. Once finished, keeps
    /// the recorded result in step with corrected scores.
    fn settle(&mut self) {
        if self.is_finished() {
            self.match_result = Some(self.leader());
            return;
        }
        let decided = [&self.competitor_a, &self.competitor_b]
            .iter()
            .any(|c| c.score >= MAX_SCORE || c.penalty >= MAX_PENALTY);
        if decided {
            self.finish_now();
        }
    }

    fn finish_now(&mut self) {
        self.phase = Phase::Finished;
        self.is_running = false;
        self.match_result = Some(self.leader());
    }
}

fn starting_time(mode: TimerMode, match_length_secs: u32) -> u32 {
    match mode {
        TimerMode::Countdown => match_length_secs,
        TimerMode::Stopwatch => 0,
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
