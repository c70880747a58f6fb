use super::CHANNEL_COUNT;

indexed_enum! {
    /// Long-press behaviour of the menu and tap buttons.
    pub enum LongPressAction {
        None => "none",
        Reset => "reset",
        SwitchPreset => "preset",
    }
}

indexed_enum! {
    /// What turning or touching a ring does while in `Live`.
    pub enum LiveAction {
        None => "none",
        RotateOffset => "rotate",
        AdjustPulses => "pulses",
        AdjustGateLength => "gate",
    }
}

indexed_enum! {
    /// Which channels a live ring action applies to.
    pub enum ChannelSelector {
        Channel1 => "1",
        Channel2 => "2",
        Channel3 => "3",
        Channel4 => "4",
        All => "all",
    }
}

impl ChannelSelector {
    /// Bit `n` set when channel `n` is selected.
    pub fn mask(self) -> u8 {
        match self {
            ChannelSelector::All => (1 << CHANNEL_COUNT) - 1,
            single => 1 << single.index(),
        }
    }
}

indexed_enum! {
    /// Touch-ring rotation threshold.
    pub enum Sensitivity {
        Low => "low",
        Medium => "mid",
        High => "high",
    }
}

/// Button and ring behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterfaceSettings {
    pub menu_long_press: LongPressAction,
    pub tap_long_press: LongPressAction,
    pub inner_action: LiveAction,
    pub inner_target: ChannelSelector,
    pub outer_action: LiveAction,
    pub outer_target: ChannelSelector,
    pub sensitivity: Sensitivity,
}

impl Default for InterfaceSettings {
    fn default() -> Self {
        Self {
            menu_long_press: LongPressAction::Reset,
            tap_long_press: LongPressAction::SwitchPreset,
            inner_action: LiveAction::RotateOffset,
            inner_target: ChannelSelector::All,
            outer_action: LiveAction::AdjustPulses,
            outer_target: ChannelSelector::Channel1,
            sensitivity: Sensitivity::Medium,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_masks() {
        assert_eq!(ChannelSelector::Channel1.mask(), 0b0001);
        assert_eq!(ChannelSelector::Channel4.mask(), 0b1000);
        assert_eq!(ChannelSelector::All.mask(), 0b1111);
    }

    #[test]
    fn sensitivity_index_matches_decoder_table() {
        assert_eq!(Sensitivity::Low.index(), 0);
        assert_eq!(Sensitivity::High.index(), 2);
        assert_eq!(Sensitivity::LABELS.len(), crate::gesture::SENSITIVITY_DEGREES.len());
    }
}
