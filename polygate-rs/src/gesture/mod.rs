//! Capacitive ring gesture decoding.
//!
//! Twelve touch electrodes form two concentric rings of six. Each poll
//! delivers one raw reading per electrode (lower = more touched); the
//! [`GestureDecoder`] turns that into an angle on one ring and, for a
//! continuing touch, an increment or decrement.
//!
//! ```text
//!            0°                 logical positions
//!        5       1              inner ring: 0..=5
//!   300°           60°          outer ring: 6..=11
//!        4       2              position p sits at (p % 6) * 60°
//!           180°
//! ```
//!
//! Baselines are captured once at boot with a [`Calibrator`].

mod calibration;
mod decoder;

pub use calibration::{Calibrator, CALIBRATION_DISCARD, CALIBRATION_SAMPLES};
pub use decoder::{
    GestureDecoder, CONTINUOUS_TOUCH_MS, DEFAULT_SENSOR_MAP, SENSITIVITY_DEGREES, TOUCH_THRESHOLD,
    WRAP_LIMIT_DEGREES,
};

/// Number of touch electrodes.
pub const SENSOR_COUNT: usize = 12;

/// Electrodes per ring.
pub const RING_SIZE: usize = 6;

/// Angular width of one electrode's sector.
pub const SECTOR_DEGREES: f32 = 60.0;

/// One raw reading per electrode, in wiring order.
pub type RawSample = [u16; SENSOR_COUNT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ring {
    Inner,
    Outer,
}

impl Ring {
    pub fn index(self) -> usize {
        match self {
            Ring::Inner => 0,
            Ring::Outer => 1,
        }
    }

    /// Ring owning a logical position (0..=11).
    pub fn of_position(position: u8) -> Self {
        if (position as usize) < RING_SIZE {
            Ring::Inner
        } else {
            Ring::Outer
        }
    }
}

/// Direction of a rotational gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Motion {
    /// Clockwise, increasing angle.
    Increment,
    Decrement,
}

/// Result of one decoded sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gesture {
    pub ring: Ring,
    /// Touch position in `0.0..360.0`.
    pub angle: f32,
    /// `None` for a fresh contact or a movement below the sensitivity
    /// threshold.
    pub motion: Option<Motion>,
}

impl Gesture {
    /// Angle rounded to whole degrees, in `0..360`.
    pub fn degrees(&self) -> u16 {
        let rounded = (self.angle + 0.5) as u16;
        rounded % 360
    }
}
