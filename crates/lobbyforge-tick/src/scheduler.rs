//! Drives the lobby client at a fixed rate and reports elapsed time.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, trace, warn};

/// How often the client driver ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Ticks per second. Kept within `1..=TickConfig::MAX_RATE_HZ`.
    pub rate_hz: u32,
    /// Upper bound for the random delay before the first tick, so clients
    /// launched together do not poll the lobby service in lockstep.
    pub start_jitter_ms: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            rate_hz: 20,
            start_jitter_ms: 250,
        }
    }
}

impl TickConfig {
    pub const MAX_RATE_HZ: u32 = 128;

    pub fn with_rate(rate_hz: u32) -> Self {
        Self {
            rate_hz,
            ..Self::default()
        }
    }

    /// The same config with the rate brought into range.
    pub fn validated(mut self) -> Self {
        let clamped = self.rate_hz.clamp(1, Self::MAX_RATE_HZ);
        if clamped != self.rate_hz {
            warn!(requested = self.rate_hz, using = clamped, "tick rate out of range");
            self.rate_hz = clamped;
        }
        self
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(1) / self.rate_hz.clamp(1, Self::MAX_RATE_HZ)
    }
}

/// One fired tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// 1 for the first tick after start.
    pub number: u64,
    /// Time since the previous tick (or since start / resume).
    pub dt: Duration,
    /// Whole periods that passed without a tick.
    pub missed: u64,
}

/// Fixed-rate tick source for the client's `select!` loop.
///
/// Backed by a tokio [`Interval`] that skips missed ticks instead of
/// bursting. Late ticks carry the full elapsed time in `dt`, so countdowns
/// advanced by it stay accurate. Paused time is never reported.
pub struct TickScheduler {
    period: Duration,
    interval: Interval,
    last: Instant,
    fired: u64,
    paused: bool,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let period = config.period();
        let jitter = match config.start_jitter_ms {
            0 => Duration::ZERO,
            max => Duration::from_millis(rand::rng().random_range(0..max)),
        };

        let now = Instant::now();
        let mut interval = time::interval_at(now + jitter + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(rate_hz = config.rate_hz, jitter_ms = jitter.as_millis() as u64, "tick scheduler ready");

        Self {
            period,
            interval,
            last: now + jitter,
            fired: 0,
            paused: false,
        }
    }

    pub fn with_rate(rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(rate_hz))
    }

    /// Resolves at the next tick. Pends forever while paused.
    pub async fn next_tick(&mut self) -> Tick {
        if self.paused {
            std::future::pending::<()>().await;
        }

        let at = self.interval.tick().await;
        let now = Instant::now().max(at);
        let dt = now.saturating_duration_since(self.last);
        self.last = now;
        self.fired += 1;

        let missed = (dt.as_nanos() / self.period.as_nanos().max(1)).saturating_sub(1) as u64;
        if missed > 0 {
            warn!(tick = self.fired, missed, "driver fell behind");
        } else {
            trace!(tick = self.fired, "tick");
        }

        Tick {
            number: self.fired,
            dt,
            missed,
        }
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.fired, "ticking paused");
        }
    }

    /// Resumes one period from now.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.interval.reset();
            self.last = Instant::now();
            debug!(tick = self.fired, "ticking resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn ticks_fired(&self) -> u64 {
        self.fired
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}
