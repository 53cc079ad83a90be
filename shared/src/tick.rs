//! Wall-clock tick source.
//!
//! The receiver thread owns a [`TickClock`]; whenever the accumulated
//! lag reaches one tick interval it advances the clock and signals the
//! simulation thread. Keeping the clock explicit makes the tick boundary
//! a testable unit instead of an ad hoc signal/wait pair.

use std::time::{Duration, Instant};

/// Interval between simulation ticks at the given rate.
pub fn tick_interval(rate: u32) -> Duration {
    Duration::from_millis(1000 / u64::from(rate.max(1)))
}

/// Tracks how far wall-clock time has run ahead of the last tick.
#[derive(Debug)]
pub struct TickClock {
    origin: Instant,
    consumed: Duration,
}

impl TickClock {
    pub fn start() -> Self {
        TickClock {
            origin: Instant::now(),
            consumed: Duration::ZERO,
        }
    }

    /// Time elapsed since the last `advance` (or since start).
    pub fn lag(&self) -> Duration {
        self.origin.elapsed().saturating_sub(self.consumed)
    }

    /// Marks the current moment as the most recent tick.
    pub fn advance(&mut self) {
        self.consumed = self.origin.elapsed();
    }

    /// True once at least one tick interval of lag has accumulated.
    pub fn due(&self, interval: Duration) -> bool {
        self.lag() >= interval
    }
}
