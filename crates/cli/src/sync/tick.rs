// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic clock source for the match timer.
//!
//! The scheduler does not touch match state itself. Each tick is handed to a
//! callback together with the generation it belongs to; every `start` and
//! `stop` opens a new generation, so a tick that was already in flight when
//! the timer stopped can be recognised as stale and dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;

type TickCallback = Arc<dyn Fn(u64) + Send + Sync>;

pub struct TickScheduler {
    period: Duration,
    on_tick: TickCallback,
    generation: u64,
    running: Option<CancellationToken>,
}

impl TickScheduler {
    pub fn new(period: Duration, on_tick: impl Fn(u64) + Send + Sync + 'static) -> Self {
        TickScheduler {
            period,
            on_tick: Arc::new(on_tick),
            generation: 0,
            running: None,
        }
    }

    /// Starts ticking one period from now. No-op while running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }
        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();
        let period = self.period;
        let on_tick = Arc::clone(&self.on_tick);
        let cancelled = token.clone();
        tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => return,
                    _ = interval.tick() => on_tick(generation),
                }
            }
        });
        self.running = Some(token);
    }

    /// Stops ticking and invalidates any tick already delivered but not yet
    /// handled. No-op while stopped.
    pub fn stop(&mut self) {
        if let Some(token) = self.running.take() {
            token.cancel();
            self.generation += 1;
        }
    }

    /// Stops and invalidates outstanding ticks even if already stopped.
    pub fn reset(&mut self) {
        self.stop();
        self.generation += 1;
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a tick of `generation` should still be applied.
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_running() && generation == self.generation
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        if let Some(token) = self.running.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
#[path = "tick_tests.rs"]
mod tests;
