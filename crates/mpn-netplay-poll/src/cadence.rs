//! Fixed-interval cadence timer.
//!
//! A stripped-down tick scheduler: one deadline, advanced by a fixed
//! interval, with late wake-ups skipped rather than replayed. A poll that
//! comes back from a slow native call should not fire a burst of catch-up
//! polls.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// Information about a cycle, returned by [`Cadence::wait_for_cycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleInfo {
    /// Monotonically increasing cycle number (starts at 1).
    pub cycle: u64,
    /// `true` if this cycle fired more than 10% of an interval late.
    pub late: bool,
    /// Whole intervals skipped because the wake-up was late.
    pub skipped: u64,
}

/// Running totals for a cadence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CadenceStats {
    pub total_cycles: u64,
    pub total_late: u64,
    pub total_skipped: u64,
}

/// A fixed-interval timer for one poll loop.
pub struct Cadence {
    name: &'static str,
    interval: Duration,
    next: Instant,
    cycle: u64,
    stats: CadenceStats,
}

impl Cadence {
    /// Creates a cadence whose first cycle is one `interval` (plus up to
    /// `initial_jitter`) from now.
    pub fn new(
        name: &'static str,
        interval: Duration,
        initial_jitter: Duration,
    ) -> Self {
        let jitter = if initial_jitter.is_zero() {
            Duration::ZERO
        } else {
            let us = rand::rng()
                .random_range(0..initial_jitter.as_micros().max(1) as u64);
            Duration::from_micros(us)
        };

        debug!(
            cadence = name,
            interval_ms = interval.as_secs_f64() * 1000.0,
            "cadence created"
        );

        Self {
            name,
            interval,
            next: Instant::now() + interval + jitter,
            cycle: 0,
            stats: CadenceStats::default(),
        }
    }

    /// Waits until the next cycle is due.
    ///
    /// Cancel-safe: dropping the future before it resolves leaves the
    /// deadline untouched.
    pub async fn wait_for_cycle(&mut self) -> CycleInfo {
        time::sleep_until(self.next).await;

        let now = Instant::now();
        self.cycle += 1;

        let late_by = now.saturating_duration_since(self.next);
        let late = late_by > self.interval / 10;
        let mut skipped = 0;
        if late {
            skipped =
                (late_by.as_nanos() / self.interval.as_nanos().max(1)) as u64;
            if skipped > 0 {
                warn!(
                    cadence = self.name,
                    cycle = self.cycle,
                    skipped,
                    late_ms = late_by.as_secs_f64() * 1000.0,
                    "cadence overrun, skipping ahead"
                );
            }
            self.stats.total_late += 1;
        }
        // Schedule from now, not from the missed deadline.
        self.next = now + self.interval;

        self.stats.total_cycles += 1;
        self.stats.total_skipped += skipped;

        trace!(cadence = self.name, cycle = self.cycle, late, "cycle fired");

        CycleInfo {
            cycle: self.cycle,
            late,
            skipped,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle
    }

    pub fn stats(&self) -> &CadenceStats {
        &self.stats
    }
}
