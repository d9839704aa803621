//! Engine configuration.

use std::time::Duration;

/// Tuning knobs for playback synchronization.
///
/// The defaults reproduce the behavior the engine was tuned with; none of
/// them is known to be optimal for all hardware, so every threshold is a
/// field rather than a constant.
#[derive(Clone, Debug)]
pub struct PlayConfig {
    /// Largest single correction applied per refill when creeping back
    /// into sync. Default: 12 ms.
    pub correction_step: Duration,
    /// Desync at which the engine resynchronizes hard instead of creeping.
    /// Default: 280 ms.
    pub desync_critical: Duration,
    /// Rolling-average desync below which no correction is applied.
    /// Default: 30 ms.
    pub desync_minor: Duration,
    /// Capacity of each player's event broadcast channel. Default: 64.
    pub event_channel_capacity: usize,
    /// Target amount of buffered-but-unplayed audio; refills trigger when
    /// the backlog drops below two thirds of this. Default: 500 ms.
    pub ideal_buffer: Duration,
    /// Scheduler wake interval. Default: 20 ms.
    pub tick_interval: Duration,
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            correction_step: Duration::from_millis(12),
            desync_critical: Duration::from_millis(280),
            desync_minor: Duration::from_millis(30),
            event_channel_capacity: 64,
            ideal_buffer: Duration::from_millis(500),
            tick_interval: Duration::from_millis(20),
        }
    }
}

impl PlayConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-refill correction step.
    #[must_use]
    pub fn with_correction_step(mut self, step: Duration) -> Self {
        self.correction_step = step;
        self
    }

    /// Set the hard-resynchronization threshold.
    #[must_use]
    pub fn with_desync_critical(mut self, threshold: Duration) -> Self {
        self.desync_critical = threshold;
        self
    }

    /// Set the rolling-average correction threshold.
    #[must_use]
    pub fn with_desync_minor(mut self, threshold: Duration) -> Self {
        self.desync_minor = threshold;
        self
    }

    /// Set the event broadcast channel capacity.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the buffered-audio target.
    #[must_use]
    pub fn with_ideal_buffer(mut self, ideal: Duration) -> Self {
        self.ideal_buffer = ideal;
        self
    }

    /// Set the scheduler wake interval.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }
}
