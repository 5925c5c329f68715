use std::time::Duration;

/// Minimum spacing between accepted advance requests
pub const DEFAULT_ADVANCE_INTERVAL_MS: u64 = 150;

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Collapses bursts of discrete "advance" requests into one.
///
/// The debouncer is stateless: the timestamp of the last accepted request
/// lives in the training state so a reset clears it with everything else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputDebouncer {
    min_interval: Duration,
}

impl InputDebouncer {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Whether a request at `now` may go through, given the time of the last
    /// accepted one.
    ///
    /// Clock readings are seconds as `f64`. The gap is compared in whole
    /// microseconds, so `1.15 - 1.0` counts as the full 150 ms.
    pub fn accept(&self, last_accepted: Option<f64>, now: f64) -> bool {
        let Some(last) = last_accepted else {
            return true;
        };
        let gap_us = ((now - last) * MICROS_PER_SEC).round();
        // NaN and backwards clocks never open the window
        gap_us >= 0.0 && gap_us as u128 >= self.min_interval.as_micros()
    }
}

impl Default for InputDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_ADVANCE_INTERVAL_MS)
    }
}
