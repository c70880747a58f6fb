use crate::gesture::{Gesture, Motion, Ring};

/// A discrete input event, already debounced and classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Startup finished; leaves [`UiState::Init`](super::UiState::Init).
    Init,
    MenuShort,
    MenuLong,
    /// Tap button short press; the timestamp feeds tap tempo.
    TapShort { at_ms: u64 },
    TapLong,
    RingIncrement(Ring),
    RingDecrement(Ring),
    /// Touch without rotation, at an absolute position.
    RingTouched { ring: Ring, degrees: u16 },
    /// Channel switch short press, carrying the channel index.
    SwitchShort(u8),
    SwitchLong(u8),
    /// Detented encoder step; handled like the outer ring.
    Encoder(Motion),
}

impl From<Gesture> for Event {
    fn from(gesture: Gesture) -> Self {
        match gesture.motion {
            Some(Motion::Increment) => Event::RingIncrement(gesture.ring),
            Some(Motion::Decrement) => Event::RingDecrement(gesture.ring),
            None => Event::RingTouched {
                ring: gesture.ring,
                degrees: gesture.degrees(),
            },
        }
    }
}
