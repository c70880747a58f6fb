pub const CLOCK_PERIOD_MIN_MS: u16 = 10;
pub const CLOCK_PERIOD_MAX_MS: u16 = 2000;
pub const CLOCK_PERIOD_STEP_MS: u16 = 10;

/// Taps further apart than this start a new tempo measurement.
pub const TAP_TIMEOUT_MS: u64 = 2000;

/// Intervals averaged by tap tempo.
const TAP_HISTORY: usize = 3;

indexed_enum! {
    pub enum ClockSource {
        /// Timer running at `period_ms`.
        Internal => "int",
        /// Rising edges on the clock input jack.
        External => "ext",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockSettings {
    pub source: ClockSource,
    period_ms: u16,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            source: ClockSource::Internal,
            period_ms: 500,
        }
    }
}

impl ClockSettings {
    pub fn period_ms(&self) -> u16 {
        self.period_ms
    }

    /// Set the internal tick period, clamped and rounded to the step.
    pub fn set_period_ms(&mut self, period_ms: i32) -> bool {
        let step = CLOCK_PERIOD_STEP_MS as i32;
        let clamped = period_ms.clamp(CLOCK_PERIOD_MIN_MS as i32, CLOCK_PERIOD_MAX_MS as i32);
        let period = ((clamped + step / 2) / step * step) as u16;
        let changed = period != self.period_ms;
        self.period_ms = period;
        changed
    }
}

/// Measures tempo from tap button presses.
#[derive(Debug, Clone, Default)]
pub struct TapTempo {
    last_tap_ms: Option<u64>,
    intervals: [u16; TAP_HISTORY],
    count: usize,
}

impl TapTempo {
    /// Register a tap. Returns the averaged period once at least two taps
    /// fell inside [`TAP_TIMEOUT_MS`] of each other.
    pub fn tap(&mut self, now_ms: u64) -> Option<u16> {
        let previous = self.last_tap_ms.replace(now_ms);
        let interval = match previous {
            Some(at) if now_ms > at && now_ms - at < TAP_TIMEOUT_MS => (now_ms - at) as u16,
            _ => {
                self.count = 0;
                return None;
            }
        };

        self.intervals.rotate_right(1);
        self.intervals[0] = interval;
        self.count = (self.count + 1).min(TAP_HISTORY);

        let sum: u32 = self.intervals[..self.count].iter().map(|&i| i as u32).sum();
        Some((sum / self.count as u32) as u16)
    }
}
