use super::{RawSample, SENSOR_COUNT};

/// Samples taken at boot to establish resting baselines.
pub const CALIBRATION_SAMPLES: u8 = 16;

/// Leading samples thrown away while the sensor settles.
pub const CALIBRATION_DISCARD: u8 = 8;

/// Averages the resting reading of every electrode.
///
/// Feed it consecutive samples with [`push`](Self::push); the baseline is
/// returned once, on the last calibration sample.
#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    seen: u8,
    sums: [u32; SENSOR_COUNT],
}

impl Calibrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.seen >= CALIBRATION_SAMPLES
    }

    pub fn push(&mut self, sample: &RawSample) -> Option<RawSample> {
        if self.is_complete() {
            return None;
        }
        self.seen += 1;
        if self.seen <= CALIBRATION_DISCARD {
            return None;
        }
        for (sum, &value) in self.sums.iter_mut().zip(sample.iter()) {
            *sum += value as u32;
        }
        if !self.is_complete() {
            return None;
        }

        let kept = (CALIBRATION_SAMPLES - CALIBRATION_DISCARD) as u32;
        let mut baseline = [0u16; SENSOR_COUNT];
        for (out, &sum) in baseline.iter_mut().zip(self.sums.iter()) {
            *out = (sum / kept) as u16;
        }

        #[cfg(feature = "defmt")]
        defmt::info!("touch calibration done: {}", baseline);

        Some(baseline)
    }
}
