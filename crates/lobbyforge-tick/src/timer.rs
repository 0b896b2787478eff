//! Countdowns advanced by tick delta time.
//!
//! Neither type reads a clock. The owner feeds them the `dt` of each tick,
//! which keeps timeout behavior deterministic under test.

use std::time::Duration;

use rand::Rng;

// ---------------------------------------------------------------------------
// TimeoutTimer
// ---------------------------------------------------------------------------

/// A restartable one-shot countdown.
///
/// After [`start`](Self::start), [`advance`](Self::advance) returns `true`
/// exactly once, on the call that crosses the deadline. [`reset`](Self::reset)
/// before that point cancels the timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutTimer {
    duration: Duration,
    remaining: Duration,
    running: bool,
}

impl TimeoutTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            remaining: duration,
            running: false,
        }
    }

    /// Arms the timer with its full duration.
    ///
    /// Returns `false` and leaves the countdown untouched if it is already
    /// running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.remaining = self.duration;
        self.running = true;
        true
    }

    /// Advances the countdown. Returns `true` if the timer fired on this call.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if !self.running {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(dt);
        if self.remaining.is_zero() {
            self.running = false;
            return true;
        }
        false
    }

    /// Stops the countdown without firing.
    pub fn reset(&mut self) {
        self.running = false;
        self.remaining = self.duration;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

// ---------------------------------------------------------------------------
// Cadence
// ---------------------------------------------------------------------------

/// A repeating countdown for periodic work such as polls and heartbeats.
///
/// A new cadence is due on the first tick. Each time it comes due the next
/// period is drawn uniformly from `min..=max`, so peers that started
/// together drift apart instead of polling in lockstep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cadence {
    min: Duration,
    max: Duration,
    remaining: Duration,
}

impl Cadence {
    /// A cadence with a fixed period.
    pub fn fixed(period: Duration) -> Self {
        Self::jittered(period, period)
    }

    /// A cadence whose period is redrawn from `min..=max` every cycle.
    pub fn jittered(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
            remaining: Duration::ZERO,
        }
    }

    /// Advances the countdown. Returns `true` when the work is due, and
    /// starts the next period.
    pub fn tick(&mut self, dt: Duration) -> bool {
        self.remaining = self.remaining.saturating_sub(dt);
        if !self.remaining.is_zero() {
            return false;
        }
        self.remaining = self.next_period();
        true
    }

    /// Makes the cadence due on the next tick.
    pub fn trigger(&mut self) {
        self.remaining = Duration::ZERO;
    }

    /// Time left until the work is due.
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    fn next_period(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::rng().random_range(self.min..=self.max)
    }
}
