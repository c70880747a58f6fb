//! Input devices sampled by the polling tasks.

use polygate::config::CV_CHANNEL_COUNT;
use polygate::gesture::RawSample;
use polygate::{Event, Gesture};

use crate::error::IoError;

/// Twelve-electrode capacitive controller behind the two rings.
#[allow(async_fn_in_trait)]
pub trait TouchSensor {
    type Error;

    /// Check the device answers and start measuring.
    ///
    /// Returns [`IoError::DeviceAbsent`] when nothing is fitted.
    async fn detect(&mut self) -> Result<(), IoError<Self::Error>>;

    /// Filtered electrode readings in sensor-index order.
    async fn read_raw(&mut self) -> Result<RawSample, IoError<Self::Error>>;
}

/// The CV jacks, as raw 12-bit ADC readings.
#[allow(async_fn_in_trait)]
pub trait CvSource {
    type Error;

    async fn read_raw(&mut self) -> Result<[u16; CV_CHANNEL_COUNT], IoError<Self::Error>>;
}

/// Drops repeats of the same absolute touch while a finger rests still.
///
/// Increments and decrements always pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct TouchFilter {
    last: Option<Event>,
}

impl TouchFilter {
    pub fn filter(&mut self, gesture: Option<Gesture>) -> Option<Event> {
        let Some(gesture) = gesture else {
            self.last = None;
            return None;
        };
        let event = Event::from(gesture);
        if gesture.motion.is_none() && self.last == Some(event) {
            return None;
        }
        self.last = Some(event);
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polygate::{Motion, Ring};

    fn touch(angle: f32) -> Gesture {
        Gesture { ring: Ring::Inner, angle, motion: None }
    }

    #[test]
    fn resting_finger_reports_once() {
        let mut f = TouchFilter::default();
        assert!(f.filter(Some(touch(120.0))).is_some());
        assert_eq!(f.filter(Some(touch(120.2))), None);
        assert!(f.filter(Some(touch(130.0))).is_some());
    }

    #[test]
    fn lifting_resets() {
        let mut f = TouchFilter::default();
        f.filter(Some(touch(90.0)));
        assert_eq!(f.filter(None), None);
        assert!(f.filter(Some(touch(90.0))).is_some());
    }

    #[test]
    fn motions_always_pass() {
        let mut f = TouchFilter::default();
        let turn = Gesture { ring: Ring::Outer, angle: 10.0, motion: Some(Motion::Increment) };
        assert_eq!(f.filter(Some(turn)), Some(Event::RingIncrement(Ring::Outer)));
        assert_eq!(f.filter(Some(turn)), Some(Event::RingIncrement(Ring::Outer)));
    }
}
