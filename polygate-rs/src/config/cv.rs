use super::CHANNEL_COUNT;

/// A rising edge needs the input to drop below this first...
pub const EDGE_LOW_PERCENT: u8 = 40;
/// ...and then climb above this.
pub const EDGE_HIGH_PERCENT: u8 = 60;

/// Full-scale reading of the 12-bit ADC.
const ADC_MAX: u16 = 4095;

indexed_enum! {
    /// What a CV input does to its target channels.
    pub enum CvAction {
        None => "none",
        /// Zero the step on a rising edge.
        Reset => "reset",
        Beats => "beats",
        Pulses => "pulses",
        Rotation => "rotate",
        Probability => "prob",
        /// Toggle fill on a rising edge.
        Fill => "fill",
        /// Toggle mute on a rising edge.
        Mute => "mute",
    }
}

impl CvAction {
    /// Actions driven by edges rather than by the level.
    pub fn is_trigger(self) -> bool {
        matches!(self, CvAction::Reset | CvAction::Fill | CvAction::Mute)
    }
}

indexed_enum! {
    /// Input voltage window, mapped onto the ADC by the input stage
    /// (-10 V at 0, +10 V at full scale).
    pub enum VoltageRange {
        Unipolar5 => "0-5V",
        Unipolar10 => "0-10V",
        Bipolar5 => "+-5V",
        Bipolar10 => "+-10V",
    }
}

impl VoltageRange {
    /// Raw ADC readings at 0 % and 100 %.
    pub fn bounds(self) -> (u16, u16) {
        match self {
            VoltageRange::Unipolar5 => (2048, 2560),
            VoltageRange::Unipolar10 => (2048, ADC_MAX),
            VoltageRange::Bipolar5 => (1536, 2560),
            VoltageRange::Bipolar10 => (0, ADC_MAX),
        }
    }
}

/// Mapping of one CV input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CvChannelConfig {
    pub action: CvAction,
    /// Bit `n` selects rhythm channel `n`.
    pub target_mask: u8,
    pub voltage_range: VoltageRange,
}

impl Default for CvChannelConfig {
    fn default() -> Self {
        Self {
            action: CvAction::None,
            target_mask: 0b0001,
            voltage_range: VoltageRange::Unipolar5,
        }
    }
}

impl CvChannelConfig {
    pub const ALL_CHANNELS: u8 = (1 << CHANNEL_COUNT) - 1;

    pub fn set_target_mask(&mut self, mask: i32) -> bool {
        let mask = mask.clamp(0, Self::ALL_CHANNELS as i32) as u8;
        let changed = mask != self.target_mask;
        self.target_mask = mask;
        changed
    }

    pub fn targets(&self, channel: usize) -> bool {
        self.target_mask & (1 << channel) != 0
    }

    /// Scale a raw ADC reading to 0..=100 % of the selected window.
    pub fn normalize(&self, raw: u16) -> u8 {
        let (low, high) = self.voltage_range.bounds();
        let clamped = raw.clamp(low, high);
        let span = (high - low) as u32;
        (((clamped - low) as u32 * 100 + span / 2) / span) as u8
    }
}
