//! Fixed-timestep tick scheduler for Rally rooms.
//!
//! A [`TickScheduler`] is owned by one room actor and polled inside its
//! `tokio::select!` loop. It starts **paused**: a room only ticks while
//! both players are bound and the match is live, so the actor calls
//! [`TickScheduler::resume`] when play starts and
//! [`TickScheduler::pause`] when it stops.
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* inputs, votes, membership */ }
//!         _ = scheduler.wait_for_tick() => {
//!             step_and_broadcast(&mut state);
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```
//!
//! Missed ticks are skipped, never replayed: if the actor falls a whole
//! period behind, the scheduler logs the skip and re-anchors on `now`.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`TickScheduler`].
#[derive(Debug, Clone, PartialEq)]
pub struct TickConfig {
    /// Ticks per second. Clamped to `1..=MAX_TICK_RATE_HZ`.
    pub tick_rate_hz: u32,
    /// Fraction of the tick period (0.0–1.0) after which a slow tick is
    /// logged at `warn`.
    pub budget_warn_threshold: f64,
    /// Random delay (0–max µs) added to the first tick after the scheduler
    /// is started, so rooms paired in the same instant don't tick in
    /// lockstep.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            budget_warn_threshold: 0.80,
            initial_jitter_us: 2_000,
        }
    }
}

impl TickConfig {
    pub const MAX_TICK_RATE_HZ: u32 = 240;

    /// Config for a specific tick rate with default settings.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called by [`TickScheduler::new`].
    pub fn validated(mut self) -> Self {
        let clamped = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
        if clamped != self.tick_rate_hz {
            warn!(
                rate = self.tick_rate_hz,
                clamped, "tick_rate_hz out of range, clamping"
            );
            self.tick_rate_hz = clamped;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }

    /// Length of one tick period.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}

// ---------------------------------------------------------------------------
// Tick info and metrics
// ---------------------------------------------------------------------------

/// Returned by [`TickScheduler::wait_for_tick`] each time a tick fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickInfo {
    /// Tick number, starting at 1. Keeps counting across pause/resume.
    pub tick: u64,
    /// Whole periods that were skipped because this tick fired late.
    pub ticks_skipped: u64,
}

/// Counters kept by the scheduler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_skipped: u64,
    /// Longest time between `wait_for_tick` returning and
    /// `record_tick_end`.
    pub max_tick_time: Duration,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Pausable fixed-timestep scheduler. One per room actor.
pub struct TickScheduler {
    config: TickConfig,
    tick_duration: Duration,
    tick_count: u64,
    /// Deadline of the next tick. `None` while paused.
    next_tick: Option<Instant>,
    /// Set when a tick fires, consumed by `record_tick_end`.
    tick_start: Option<Instant>,
    /// Whether `resume` has ever run; jitter only applies to the first start.
    started: bool,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Create a paused scheduler. Nothing fires until [`resume`](Self::resume).
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();
        debug!(
            rate_hz = config.tick_rate_hz,
            period_ms = tick_duration.as_secs_f64() * 1000.0,
            "tick scheduler created"
        );
        Self {
            config,
            tick_duration,
            tick_count: 0,
            next_tick: None,
            tick_start: None,
            started: false,
            metrics: TickMetrics::default(),
        }
    }

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Wait until the next tick is due.
    ///
    /// While paused this future never resolves, so the other branches of
    /// the caller's `select!` keep running. Dropping it is always safe.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let Some(deadline) = self.next_tick else {
            return std::future::pending().await;
        };

        time::sleep_until(deadline).await;

        let now = Instant::now();
        let period = self.tick_duration;
        let late_by = now.saturating_duration_since(deadline);
        let ticks_skipped = (late_by.as_nanos() / period.as_nanos()) as u64;

        self.next_tick = Some(if ticks_skipped > 0 {
            warn!(
                tick = self.tick_count + 1,
                skipped = ticks_skipped,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "tick overrun, skipping ahead"
            );
            now + period
        } else {
            deadline + period
        });

        self.tick_count += 1;
        self.tick_start = Some(now);
        self.metrics.total_ticks += 1;
        self.metrics.total_skipped += ticks_skipped;

        trace!(tick = self.tick_count, "tick fired");

        TickInfo {
            tick: self.tick_count,
            ticks_skipped,
        }
    }

    /// Record that the work for the current tick is done.
    ///
    /// Logs a warning when the tick used more than the configured share
    /// of its period. A call without a preceding tick is ignored.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        self.metrics.max_tick_time = self.metrics.max_tick_time.max(elapsed);

        let utilization = elapsed.as_secs_f64() / self.tick_duration.as_secs_f64();
        if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = self.tick_duration.as_secs_f64() * 1000.0,
                "tick approaching budget limit"
            );
        }
    }

    /// Stop firing. Idempotent.
    pub fn pause(&mut self) {
        if self.next_tick.take().is_some() {
            self.tick_start = None;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Start (or restart) firing, one full period from now. Idempotent.
    pub fn resume(&mut self) {
        if self.next_tick.is_some() {
            return;
        }
        let mut first = Instant::now() + self.tick_duration;
        if !self.started && self.config.initial_jitter_us > 0 {
            let us = rand::rng().random_range(0..self.config.initial_jitter_us);
            first += Duration::from_micros(us);
        }
        self.started = true;
        self.next_tick = Some(first);
        debug!(tick = self.tick_count, "tick scheduler resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.next_tick.is_none()
    }

    /// Ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}
