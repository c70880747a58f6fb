use crate::rhythm::RhythmParameters;

use super::CHANNEL_COUNT;

/// Saved parameters of all channels. Holds no step or pattern state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Preset {
    pub channels: [RhythmParameters; CHANNEL_COUNT],
}
