// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Operator console command language.
//!
//! One command per line. Keywords are case-insensitive; numbers may be
//! negative or out of range, since the match clamps them.

use ks_core::{Slot, TimerMode, ViewMode, Visibility};

use crate::display::parse_clock;
use crate::error::{Error, Result};

pub const HELP: &str = "\
Scoring:
  score <a|b> <0-2>       Set a competitor's score
  penalty <a|b> <0-4>     Set a competitor's hansoku level
  finish                  End the match on the current scores
  reset                   Clear scores and penalties

Timer:
  start | stop            Run or pause the clock
  time <secs|m:ss>        Set the clock
  mode <countdown|stopwatch>

Displays:
  public | private        Show or hide the match on public displays
  view <match|teamMatch|groupTable>
  sync start | sync stop  Open or end the relay session

Other:
  status                  Transport health
  snapshot                Print the current snapshot as JSON
  help                    This text
  quit                    Leave the console";

/// A parsed console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Score(Slot, i64),
    Penalty(Slot, i64),
    Finish,
    Reset,
    Start,
    Stop,
    Time(i64),
    Mode(TimerMode),
    Visibility(Visibility),
    View(ViewMode),
    SyncStart,
    SyncStop,
    Status,
    Snapshot,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parses one line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        let keyword = words[0].to_ascii_lowercase();
        let args = &words[1..];

        let command = match keyword.as_str() {
            "score" => {
                let (slot, value) = slot_and_value(&keyword, args)?;
                ConsoleCommand::Score(slot, value)
            }
            "penalty" | "hansoku" => {
                let (slot, value) = slot_and_value(&keyword, args)?;
                ConsoleCommand::Penalty(slot, value)
            }
            "finish" => no_args(&keyword, args, ConsoleCommand::Finish)?,
            "reset" => no_args(&keyword, args, ConsoleCommand::Reset)?,
            "start" => no_args(&keyword, args, ConsoleCommand::Start)?,
            "stop" => no_args(&keyword, args, ConsoleCommand::Stop)?,
            "time" => {
                let [value] = args else {
                    return Err(usage("time <secs|m:ss>"));
                };
                let secs = parse_clock(value).ok_or_else(|| {
                    Error::InvalidCommand(format!("'{}' is not a time", value))
                })?;
                ConsoleCommand::Time(secs)
            }
            "mode" => {
                let [value] = args else {
                    return Err(usage("mode <countdown|stopwatch>"));
                };
                ConsoleCommand::Mode(parse_timer_mode(value)?)
            }
            "public" => no_args(&keyword, args, ConsoleCommand::Visibility(Visibility::Public))?,
            "private" => no_args(
                &keyword,
                args,
                ConsoleCommand::Visibility(Visibility::Private),
            )?,
            "view" => {
                let [value] = args else {
                    return Err(usage("view <match|teamMatch|groupTable>"));
                };
                ConsoleCommand::View(parse_view_mode(value)?)
            }
            "sync" => match args {
                [sub] if sub.eq_ignore_ascii_case("start") => ConsoleCommand::SyncStart,
                [sub] if sub.eq_ignore_ascii_case("stop") => ConsoleCommand::SyncStop,
                _ => return Err(usage("sync <start|stop>")),
            },
            "status" => no_args(&keyword, args, ConsoleCommand::Status)?,
            "snapshot" => no_args(&keyword, args, ConsoleCommand::Snapshot)?,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            _ => return Err(Error::UnknownCommand(words[0].to_string())),
        };
        Ok(Some(command))
    }

    /// Whether the command changes the match.
    pub fn is_mutation(self) -> bool {
        !matches!(
            self,
            ConsoleCommand::SyncStart
                | ConsoleCommand::SyncStop
                | ConsoleCommand::Status
                | ConsoleCommand::Snapshot
                | ConsoleCommand::Help
                | ConsoleCommand::Quit
        )
    }
}

fn usage(text: &str) -> Error {
    Error::InvalidCommand(format!("usage: {}", text))
}

fn no_args(keyword: &str, args: &[&str], command: ConsoleCommand) -> Result<ConsoleCommand> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(Error::InvalidCommand(format!(
            "'{}' takes no arguments",
            keyword
        )))
    }
}

fn slot_and_value(keyword: &str, args: &[&str]) -> Result<(Slot, i64)> {
    let [slot, value] = args else {
        return Err(usage(&format!("{} <a|b> <value>", keyword)));
    };
    let slot = parse_slot(slot)?;
    let value = value
        .parse()
        .map_err(|_| Error::InvalidCommand(format!("'{}' is not a number", value)))?;
    Ok((slot, value))
}

fn parse_slot(s: &str) -> Result<Slot> {
    match s.to_ascii_lowercase().as_str() {
        "a" | "red" | "aka" => Ok(Slot::A),
        "b" | "white" | "shiro" => Ok(Slot::B),
        _ => Err(Error::InvalidCommand(format!(
            "unknown competitor '{}', expected a or b",
            s
        ))),
    }
}

fn parse_timer_mode(s: &str) -> Result<TimerMode> {
    match s.to_ascii_lowercase().as_str() {
        "countdown" | "down" => Ok(TimerMode::Countdown),
        "stopwatch" | "up" => Ok(TimerMode::Stopwatch),
        _ => Err(Error::InvalidCommand(format!("unknown timer mode '{}'", s))),
    }
}

fn parse_view_mode(s: &str) -> Result<ViewMode> {
    match s.to_ascii_lowercase().as_str() {
        "match" => Ok(ViewMode::Match),
        "teammatch" | "team" => Ok(ViewMode::TeamMatch),
        "grouptable" | "group" => Ok(ViewMode::GroupTable),
        _ => Err(Error::InvalidCommand(format!("unknown view '{}'", s))),
    }
}

#[cfg(test)]
#[path = "console_tests.rs"]
mod tests;
