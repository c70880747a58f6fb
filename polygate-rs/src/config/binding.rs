//! Getter/setter dispatch for menu terminals.

use crate::rhythm::RhythmEngine;

use super::clock::{ClockSettings, ClockSource};
use super::cv::{CvAction, CvChannelConfig, VoltageRange};
use super::interface::{ChannelSelector, InterfaceSettings, LiveAction, LongPressAction, Sensitivity};
use super::machine::ConfigStateMachine;
use super::menu::{Attr, Target};

impl ConfigStateMachine {
    /// Current value of `attr` on `target`, as the menu sees it: numbers
    /// for ranges, option index for choices. Mismatched pairs read as 0.
    pub(super) fn read_binding(&self, target: Option<Target>, attr: Attr) -> i32 {
        let value = match target {
            Some(Target::Channel(i)) => self.channels.get(i as usize).and_then(|e| read_channel(e, attr)),
            Some(Target::Cv(i)) => self.cv.get(i as usize).and_then(|c| read_cv(c, attr)),
            Some(Target::Interface) => read_interface(&self.interface, attr),
            Some(Target::Clock) => read_clock(&self.clock, attr),
            Some(Target::Presets) => match attr {
                Attr::SavePreset | Attr::LoadPreset => Some(self.load_preset_index as i32),
                _ => None,
            },
            None => None,
        };
        value.unwrap_or_else(|| {
            #[cfg(feature = "defmt")]
            defmt::warn!("no binding for {} on {}", attr, target);
            0
        })
    }

    /// Store `value` into `attr` on `target` through the clamping setter.
    /// Returns `true` if anything changed.
    pub(super) fn write_binding(&mut self, target: Option<Target>, attr: Attr, value: i32) -> bool {
        let written = match target {
            Some(Target::Channel(i)) => self
                .channels
                .get_mut(i as usize)
                .and_then(|e| write_channel(e, attr, value)),
            Some(Target::Cv(i)) => self
                .cv
                .get_mut(i as usize)
                .and_then(|c| write_cv(c, attr, value)),
            Some(Target::Interface) => write_interface(&mut self.interface, attr, value),
            Some(Target::Clock) => write_clock(&mut self.clock, attr, value),
            Some(Target::Presets) => {
                let index = value.clamp(0, super::PRESET_COUNT as i32 - 1) as usize;
                match attr {
                    Attr::SavePreset => self.save_preset(index).ok().map(|_| true),
                    Attr::LoadPreset => self.apply_preset(index).ok().map(|_| true),
                    _ => None,
                }
            }
            None => None,
        };
        written.unwrap_or_else(|| {
            #[cfg(feature = "defmt")]
            defmt::warn!("no binding for {} on {}", attr, target);
            false
        })
    }
}

fn read_channel(engine: &RhythmEngine, attr: Attr) -> Option<i32> {
    let p = engine.params();
    Some(match attr {
        Attr::Beats => p.beats() as i32,
        Attr::Pulses => p.pulses() as i32,
        Attr::Offset => p.offset() as i32,
        Attr::Probability => p.pulses_probability() as i32,
        Attr::Prescaler => p.prescaler_index() as i32,
        Attr::GateLength => p.gate_length_ms() as i32,
        Attr::RandomizeGate => p.randomize_gate_length() as i32,
        _ => return None,
    })
}

fn write_channel(engine: &mut RhythmEngine, attr: Attr, value: i32) -> Option<bool> {
    Some(match attr {
        Attr::Beats => engine.set_beats(value),
        Attr::Pulses => engine.set_pulses(value),
        Attr::Offset => engine.set_offset(value),
        Attr::Probability => engine.set_pulses_probability(value),
        Attr::Prescaler => engine.set_prescaler_index(value),
        Attr::GateLength => engine.set_gate_length_ms(value),
        Attr::RandomizeGate => engine.set_randomize_gate_length(value != 0),
        _ => return None,
    })
}

fn read_cv(cv: &CvChannelConfig, attr: Attr) -> Option<i32> {
    Some(match attr {
        Attr::CvAction => cv.action.index() as i32,
        Attr::CvTargets => cv.target_mask as i32,
        Attr::CvRange => cv.voltage_range.index() as i32,
        _ => return None,
    })
}

fn write_cv(cv: &mut CvChannelConfig, attr: Attr, value: i32) -> Option<bool> {
    match attr {
        Attr::CvAction => Some(replace(&mut cv.action, CvAction::from_index(value))),
        Attr::CvTargets => Some(cv.set_target_mask(value)),
        Attr::CvRange => Some(replace(&mut cv.voltage_range, VoltageRange::from_index(value))),
        _ => None,
    }
}

fn read_interface(settings: &InterfaceSettings, attr: Attr) -> Option<i32> {
    let index = match attr {
        Attr::MenuLongPress => settings.menu_long_press.index(),
        Attr::TapLongPress => settings.tap_long_press.index(),
        Attr::InnerAction => settings.inner_action.index(),
        Attr::InnerTarget => settings.inner_target.index(),
        Attr::OuterAction => settings.outer_action.index(),
        Attr::OuterTarget => settings.outer_target.index(),
        Attr::Sensitivity => settings.sensitivity.index(),
        _ => return None,
    };
    Some(index as i32)
}

fn write_interface(settings: &mut InterfaceSettings, attr: Attr, value: i32) -> Option<bool> {
    Some(match attr {
        Attr::MenuLongPress => replace(&mut settings.menu_long_press, LongPressAction::from_index(value)),
        Attr::TapLongPress => replace(&mut settings.tap_long_press, LongPressAction::from_index(value)),
        Attr::InnerAction => replace(&mut settings.inner_action, LiveAction::from_index(value)),
        Attr::InnerTarget => replace(&mut settings.inner_target, ChannelSelector::from_index(value)),
        Attr::OuterAction => replace(&mut settings.outer_action, LiveAction::from_index(value)),
        Attr::OuterTarget => replace(&mut settings.outer_target, ChannelSelector::from_index(value)),
        Attr::Sensitivity => replace(&mut settings.sensitivity, Sensitivity::from_index(value)),
        _ => return None,
    })
}

fn read_clock(clock: &ClockSettings, attr: Attr) -> Option<i32> {
    match attr {
        Attr::ClockSource => Some(clock.source.index() as i32),
        Attr::ClockPeriod => Some(clock.period_ms() as i32),
        _ => None,
    }
}

fn write_clock(clock: &mut ClockSettings, attr: Attr, value: i32) -> Option<bool> {
    match attr {
        Attr::ClockSource => Some(replace(&mut clock.source, ClockSource::from_index(value))),
        Attr::ClockPeriod => Some(clock.set_period_ms(value)),
        _ => None,
    }
}

/// Assign and report whether the value changed.
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    let changed = *slot != value;
    *slot = value;
    changed
}
