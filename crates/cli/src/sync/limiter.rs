// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Coalescing of timer-only pushes.
//!
//! At most one timer-only push goes out per window, counted from the last
//! timer-only push. A tick that lands inside the window is deferred to the
//! end of it, where one push carries the latest clock. Substantive changes
//! always go out at once and cancel the deferred push, since they carry the
//! clock too.

use std::time::Duration;

use ks_core::Change;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushDecision {
    /// Push now.
    Now,
    /// Push at [`PushLimiter::deadline`].
    Deferred,
    /// Nothing to push.
    Skip,
}

#[derive(Debug, Clone)]
pub struct PushLimiter {
    window: Duration,
    last_timer_push: Option<Instant>,
    deferred_until: Option<Instant>,
}

impl PushLimiter {
    pub fn new(window: Duration) -> Self {
        PushLimiter {
            window,
            last_timer_push: None,
            deferred_until: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn decide(&mut self, change: Change, now: Instant) -> PushDecision {
        match change {
            Change::None => PushDecision::Skip,
            Change::Substantive => {
                self.deferred_until = None;
                PushDecision::Now
            }
            Change::Timer => match self.last_timer_push {
                Some(last) if now < last + self.window => {
                    if self.deferred_until.is_none() {
                        self.deferred_until = Some(last + self.window);
                    }
                    PushDecision::Deferred
                }
                _ => {
                    self.last_timer_push = Some(now);
                    self.deferred_until = None;
                    PushDecision::Now
                }
            },
        }
    }

    /// When the deferred push is due, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.deferred_until
    }

    /// Claims the deferred push if it is due at `now`.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deferred_until {
            Some(due) if due <= now => {
                self.deferred_until = None;
                self.last_timer_push = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Forgets all history, e.g. when a new match replaces the old one.
    pub fn reset(&mut self) {
        self.last_timer_push = None;
        self.deferred_until = None;
    }
}

#[cfg(test)]
#[path = "limiter_tests.rs"]
mod tests;
