//! Poller configuration.

use std::time::Duration;

use tracing::warn;

/// Timing for the two poll cadences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Time between roster refreshes. Default: 1000 ms.
    pub roster_interval: Duration,
    /// Time between message drains. Default: 500 ms.
    pub drain_interval: Duration,
    /// Random delay (0..max) added before each cadence's first cycle so
    /// the two don't fire in lockstep.
    pub initial_jitter: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            roster_interval: Duration::from_millis(1000),
            drain_interval: Duration::from_millis(500),
            initial_jitter: Duration::from_millis(20),
        }
    }
}

impl PollConfig {
    /// Shortest interval either cadence may run at.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

    /// Config from a single base interval in milliseconds: the roster
    /// refreshes every `interval_ms`, messages drain twice as often.
    pub fn from_interval_ms(interval_ms: u64) -> Self {
        Self {
            roster_interval: Duration::from_millis(interval_ms),
            drain_interval: Duration::from_millis(interval_ms / 2),
            ..Default::default()
        }
    }

    /// Clamp any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`BackgroundPoller::start`](crate::BackgroundPoller::start).
    /// Intervals below [`Self::MIN_INTERVAL`] are raised to it.
    pub fn validated(mut self) -> Self {
        if self.roster_interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.roster_interval.as_millis() as u64,
                "roster_interval below minimum, clamping"
            );
            self.roster_interval = Self::MIN_INTERVAL;
        }
        if self.drain_interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.drain_interval.as_millis() as u64,
                "drain_interval below minimum, clamping"
            );
            self.drain_interval = Self::MIN_INTERVAL;
        }
        self
    }

    /// Same config without jitter, for deterministic timing.
    pub fn without_jitter(self) -> Self {
        Self {
            initial_jitter: Duration::ZERO,
            ..self
        }
    }
}
