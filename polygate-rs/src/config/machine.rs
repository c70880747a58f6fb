use heapless::Vec;
use tinyrand::Rand;

use crate::gesture::{Motion, Ring};
use crate::rhythm::RhythmEngine;

use super::clock::{ClockSettings, ClockSource, TapTempo};
use super::cv::{CvAction, CvChannelConfig};
use super::error::ConfigError;
use super::event::Event;
use super::interface::{InterfaceSettings, LiveAction, LongPressAction};
use super::menu::{self, NodeKind, MENU_DEPTH};
use super::preset::Preset;
use super::{CHANNEL_COUNT, CV_CHANNEL_COUNT, PRESET_COUNT};

/// Top-level UI mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UiState {
    /// Booting; only [`Event::Init`] is accepted.
    #[default]
    Init,
    /// Patterns playing; rings run the configured live actions.
    Live,
    /// Browsing or editing the menu.
    Parameters,
    /// Editing one channel: outer ring = beats, inner ring = pulses.
    RhythmParamBeatsPulses,
    /// Editing one channel: inner ring = offset, outer ring = probability.
    RhythmParamOffsetProbability,
}

/// Owner of all channel, preset and interface state.
///
/// Every input reaches the machine through a short synchronous call
/// ([`on_event`](Self::on_event), [`apply_cv`](Self::apply_cv),
/// [`clock_tick`](Self::clock_tick)); none of them block or allocate, so
/// the whole machine can live behind a critical-section mutex.
///
/// # Dirty flags
///
/// `needs_redisplay` is raised by anything visible on screen, including
/// step advances. `needs_persist` is raised by user edits that belong in
/// the stored document; CV modulation and runtime flags (mute, fill, step
/// position) never raise it. Consumers read and clear the flags with
/// [`take_redisplay`](Self::take_redisplay) and
/// [`take_persist`](Self::take_persist).
#[derive(Debug, Clone)]
pub struct ConfigStateMachine {
    state: UiState,
    menu_path: Vec<u8, MENU_DEPTH>,
    menu_cursor: u8,
    menu_selected_value_index: u8,
    selected_channel: u8,
    pub(super) channels: [RhythmEngine; CHANNEL_COUNT],
    pub(super) presets: [Preset; PRESET_COUNT],
    pub(super) load_preset_index: u8,
    pub(super) cv: [CvChannelConfig; CV_CHANNEL_COUNT],
    pub(super) interface: InterfaceSettings,
    pub(super) clock: ClockSettings,
    tap: TapTempo,
    needs_redisplay: bool,
    needs_persist: bool,
}

impl Default for ConfigStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStateMachine {
    pub fn new() -> Self {
        Self {
            state: UiState::Init,
            menu_path: Vec::new(),
            menu_cursor: 0,
            menu_selected_value_index: 0,
            selected_channel: 0,
            channels: Default::default(),
            presets: Default::default(),
            load_preset_index: 0,
            cv: Default::default(),
            interface: InterfaceSettings::default(),
            clock: ClockSettings::default(),
            tap: TapTempo::default(),
            needs_redisplay: false,
            needs_persist: false,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn state(&self) -> UiState {
        self.state
    }

    pub fn selected_channel(&self) -> u8 {
        self.selected_channel
    }

    pub fn channel(&self, index: usize) -> Option<&RhythmEngine> {
        self.channels.get(index)
    }

    pub fn channels(&self) -> &[RhythmEngine; CHANNEL_COUNT] {
        &self.channels
    }

    pub fn preset(&self, index: usize) -> Option<&Preset> {
        self.presets.get(index)
    }

    pub fn load_preset_index(&self) -> u8 {
        self.load_preset_index
    }

    pub fn cv_config(&self, index: usize) -> Option<&CvChannelConfig> {
        self.cv.get(index)
    }

    pub fn interface(&self) -> &InterfaceSettings {
        &self.interface
    }

    pub fn clock(&self) -> &ClockSettings {
        &self.clock
    }

    /// Child indices from the menu root to the current node.
    pub fn menu_path(&self) -> &[u8] {
        &self.menu_path
    }

    pub fn menu_cursor(&self) -> u8 {
        self.menu_cursor
    }

    pub fn menu_selected_value_index(&self) -> u8 {
        self.menu_selected_value_index
    }

    /// Pick the channel edited by the rhythm parameter screens.
    pub fn select_channel(&mut self, index: usize) -> Result<(), ConfigError> {
        if index >= CHANNEL_COUNT {
            return Err(ConfigError::InvalidChannel);
        }
        self.selected_channel = index as u8;
        self.needs_redisplay = true;
        Ok(())
    }

    pub fn set_cv_config(&mut self, index: usize, config: CvChannelConfig) -> Result<(), ConfigError> {
        let slot = self.cv.get_mut(index).ok_or(ConfigError::InvalidCvChannel)?;
        *slot = config;
        self.needs_persist = true;
        Ok(())
    }

    pub fn set_interface(&mut self, interface: InterfaceSettings) {
        self.interface = interface;
        self.needs_persist = true;
    }

    // ── Dirty flags ──────────────────────────────────────────────────

    pub fn needs_redisplay(&self) -> bool {
        self.needs_redisplay
    }

    pub fn needs_persist(&self) -> bool {
        self.needs_persist
    }

    /// Read and clear `needs_redisplay`.
    pub fn take_redisplay(&mut self) -> bool {
        core::mem::take(&mut self.needs_redisplay)
    }

    /// Read and clear `needs_persist`.
    pub fn take_persist(&mut self) -> bool {
        core::mem::take(&mut self.needs_persist)
    }

    /// Raise `needs_redisplay` again, e.g. after a failed flush.
    pub fn request_redisplay(&mut self) {
        self.needs_redisplay = true;
    }

    pub(super) fn mark_redisplay(&mut self) {
        self.needs_redisplay = true;
    }

    // ── Event dispatch ───────────────────────────────────────────────

    /// Apply one input event.
    ///
    /// While in [`UiState::Init`] everything except [`Event::Init`] is
    /// dropped. Out-of-range switch indices are logged and ignored.
    /// `needs_redisplay` is raised only when the event changed something.
    pub fn on_event(&mut self, event: Event) {
        #[cfg(feature = "defmt")]
        defmt::debug!("event {} in {}", event, self.state);

        if self.state == UiState::Init {
            if event == Event::Init {
                self.state = UiState::Live;
                self.needs_redisplay = true;
            }
            return;
        }

        let changed = match event {
            Event::Init => false,
            Event::MenuShort => self.on_menu_press(),
            Event::MenuLong => self.on_long_press(self.interface.menu_long_press),
            Event::TapShort { at_ms } => self.on_tap_press(at_ms),
            Event::TapLong => self.on_long_press(self.interface.tap_long_press),
            Event::RingIncrement(ring) => self.on_motion(ring, Motion::Increment),
            Event::RingDecrement(ring) => self.on_motion(ring, Motion::Decrement),
            Event::Encoder(motion) => self.on_motion(Ring::Outer, motion),
            Event::RingTouched { ring, degrees } => self.on_touch(ring, degrees),
            Event::SwitchShort(channel) => self.on_switch_press(channel),
            Event::SwitchLong(channel) => self.on_switch_long_press(channel),
        };
        if changed {
            self.needs_redisplay = true;
        }
    }

    // Each handler returns whether it changed anything on screen.

    fn on_menu_press(&mut self) -> bool {
        match self.state {
            UiState::Live => {
                self.menu_path.clear();
                self.menu_cursor = 0;
                self.state = UiState::Parameters;
                true
            }
            UiState::Parameters => self.menu_select(),
            UiState::RhythmParamBeatsPulses | UiState::RhythmParamOffsetProbability => {
                self.needs_persist = true;
                self.state = UiState::Live;
                true
            }
            UiState::Init => false,
        }
    }

    fn on_tap_press(&mut self, at_ms: u64) -> bool {
        if self.state == UiState::Parameters {
            self.menu_back();
            return true;
        }
        let Some(period) = self.tap.tap(at_ms) else {
            return false;
        };
        self.clock.set_period_ms(period as i32);
        self.clock.source = ClockSource::Internal;
        self.needs_persist = true;

        #[cfg(feature = "defmt")]
        defmt::info!("tap tempo: {} ms", self.clock.period_ms());
        true
    }

    fn on_long_press(&mut self, action: LongPressAction) -> bool {
        match action {
            LongPressAction::None => return false,
            LongPressAction::Reset => self.reset_steps(),
            LongPressAction::SwitchPreset => {
                let next = (self.load_preset_index as usize + 1) % PRESET_COUNT;
                self.load_preset(next);
            }
        }
        true
    }

    fn on_switch_press(&mut self, channel: u8) -> bool {
        if channel as usize >= CHANNEL_COUNT {
            #[cfg(feature = "defmt")]
            defmt::warn!("switch {} out of bounds", channel);
            return false;
        }
        let same = channel == self.selected_channel;
        match self.state {
            UiState::Live => {
                self.selected_channel = channel;
                self.state = UiState::RhythmParamBeatsPulses;
            }
            UiState::RhythmParamBeatsPulses if same => {
                self.state = UiState::RhythmParamOffsetProbability;
            }
            UiState::RhythmParamOffsetProbability if same => {
                self.needs_persist = true;
                self.state = UiState::Live;
            }
            UiState::RhythmParamBeatsPulses | UiState::RhythmParamOffsetProbability => {
                self.selected_channel = channel;
                self.state = UiState::RhythmParamBeatsPulses;
            }
            UiState::Parameters | UiState::Init => return false,
        }
        true
    }

    fn on_switch_long_press(&mut self, channel: u8) -> bool {
        match self.channels.get_mut(channel as usize) {
            Some(engine) => {
                engine.toggle_mute();
                true
            }
            None => {
                #[cfg(feature = "defmt")]
                defmt::warn!("switch {} out of bounds", channel);
                false
            }
        }
    }

    fn on_motion(&mut self, ring: Ring, motion: Motion) -> bool {
        let up = motion == Motion::Increment;
        match self.state {
            UiState::Parameters => self.menu_step(if up { 1 } else { -1 }),
            UiState::Live => self.live_step(ring, up),
            UiState::RhythmParamBeatsPulses => {
                let engine = &mut self.channels[self.selected_channel as usize];
                match (ring, up) {
                    (Ring::Outer, true) => engine.increment_beats(),
                    (Ring::Outer, false) => engine.decrement_beats(),
                    (Ring::Inner, true) => engine.increment_pulses(),
                    (Ring::Inner, false) => engine.decrement_pulses(),
                }
            }
            UiState::RhythmParamOffsetProbability => {
                let engine = &mut self.channels[self.selected_channel as usize];
                match (ring, up) {
                    (Ring::Inner, true) => engine.increment_offset(),
                    (Ring::Inner, false) => engine.decrement_offset(),
                    (Ring::Outer, true) => engine.increment_probability(),
                    (Ring::Outer, false) => engine.decrement_probability(),
                }
            }
            UiState::Init => false,
        }
    }

    // ── Live ring actions ────────────────────────────────────────────

    fn live_binding(&self, ring: Ring) -> (LiveAction, u8) {
        match ring {
            Ring::Inner => (self.interface.inner_action, self.interface.inner_target.mask()),
            Ring::Outer => (self.interface.outer_action, self.interface.outer_target.mask()),
        }
    }

    fn live_step(&mut self, ring: Ring, up: bool) -> bool {
        let (action, mask) = self.live_binding(ring);
        let mut changed = false;
        for (i, engine) in self.channels.iter_mut().enumerate() {
            if mask & (1 << i) == 0 {
                continue;
            }
            changed |= match (action, up) {
                (LiveAction::None, _) => false,
                (LiveAction::RotateOffset, true) => engine.increment_offset(),
                (LiveAction::RotateOffset, false) => engine.decrement_offset(),
                (LiveAction::AdjustPulses, true) => engine.increment_pulses(),
                (LiveAction::AdjustPulses, false) => engine.decrement_pulses(),
                (LiveAction::AdjustGateLength, true) => engine.increment_gate_length(),
                (LiveAction::AdjustGateLength, false) => engine.decrement_gate_length(),
            };
        }
        if changed {
            self.needs_persist = true;
        }
        changed
    }

    /// Absolute edit from a ring position; only meaningful in `Live`.
    fn on_touch(&mut self, ring: Ring, degrees: u16) -> bool {
        if self.state != UiState::Live {
            return false;
        }
        let percent = (degrees.min(359) as u32 * 100 / 360) as u8;
        let (action, mask) = self.live_binding(ring);
        let mut changed = false;
        for (i, engine) in self.channels.iter_mut().enumerate() {
            if mask & (1 << i) == 0 {
                continue;
            }
            changed |= match action {
                LiveAction::None => false,
                LiveAction::RotateOffset => engine.set_offset_percent(percent),
                LiveAction::AdjustPulses => engine.set_pulses_percent(percent),
                LiveAction::AdjustGateLength => engine.set_gate_length_percent(percent),
            };
        }
        if changed {
            self.needs_persist = true;
        }
        changed
    }

    // ── Menu navigation ──────────────────────────────────────────────

    fn leave_menu(&mut self) {
        self.menu_path.clear();
        self.menu_cursor = 0;
        self.state = UiState::Live;
    }

    /// Menu press while browsing: descend into the node under the cursor,
    /// or commit the terminal being edited.
    fn menu_select(&mut self) -> bool {
        let Some((node, target)) = menu::resolve(&self.menu_path) else {
            self.leave_menu();
            return true;
        };
        match node.kind {
            NodeKind::Branch(children) => {
                let Some(child) = children.get(self.menu_cursor as usize) else {
                    return false;
                };
                if self.menu_path.push(self.menu_cursor).is_err() {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("menu path full");
                    return false;
                }
                self.menu_cursor = 0;
                if let NodeKind::Choice { attr, values } = child.kind {
                    let current = self.read_binding(child.target.or(target), attr);
                    self.menu_selected_value_index = current.clamp(0, values.len() as i32 - 1) as u8;
                }
            }
            NodeKind::Choice { attr, .. } => {
                self.write_binding(target, attr, self.menu_selected_value_index as i32);
                self.needs_persist = true;
                self.menu_back();
            }
            NodeKind::Range { .. } => {
                self.needs_persist = true;
                self.menu_back();
            }
        }
        true
    }

    /// Pop one level; an empty path returns to `Live`.
    fn menu_back(&mut self) {
        if let Some(index) = self.menu_path.pop() {
            self.menu_cursor = index;
        }
        if self.menu_path.is_empty() {
            self.leave_menu();
        }
    }

    fn menu_step(&mut self, delta: i32) -> bool {
        let Some((node, target)) = menu::resolve(&self.menu_path) else {
            self.leave_menu();
            return true;
        };
        match node.kind {
            NodeKind::Branch(children) => {
                let last = children.len() as i32 - 1;
                let cursor = (self.menu_cursor as i32 + delta).clamp(0, last) as u8;
                core::mem::replace(&mut self.menu_cursor, cursor) != cursor
            }
            NodeKind::Choice { values, .. } => {
                let last = values.len() as i32 - 1;
                let index = (self.menu_selected_value_index as i32 + delta).clamp(0, last) as u8;
                core::mem::replace(&mut self.menu_selected_value_index, index) != index
            }
            NodeKind::Range {
                attr,
                min,
                max,
                step,
            } => {
                let value = self.read_binding(target, attr) + delta * step;
                let written = self.write_binding(target, attr, value.clamp(min, max));
                if written {
                    self.needs_persist = true;
                }
                written
            }
        }
    }

    // ── Presets ──────────────────────────────────────────────────────

    /// Copy every channel's parameters into preset `index`.
    pub fn save_preset(&mut self, index: usize) -> Result<(), ConfigError> {
        let preset = self.presets.get_mut(index).ok_or(ConfigError::InvalidPreset)?;
        for (slot, engine) in preset.channels.iter_mut().zip(self.channels.iter()) {
            *slot = *engine.params();
        }
        self.needs_persist = true;

        #[cfg(feature = "defmt")]
        defmt::info!("saved preset {}", index);
        Ok(())
    }

    /// Make `index` the active preset and load it into every channel.
    pub fn apply_preset(&mut self, index: usize) -> Result<(), ConfigError> {
        if index >= PRESET_COUNT {
            return Err(ConfigError::InvalidPreset);
        }
        self.load_preset(index);
        Ok(())
    }

    fn load_preset(&mut self, index: usize) {
        self.load_preset_index = index as u8;
        let preset = self.presets[index];
        for (engine, params) in self.channels.iter_mut().zip(preset.channels.iter()) {
            engine.apply_parameters(params);
        }
        self.needs_persist = true;
        self.needs_redisplay = true;

        #[cfg(feature = "defmt")]
        defmt::info!("loaded preset {}", index);
    }

    // ── Runtime ──────────────────────────────────────────────────────

    /// Return every channel to step 0 without touching its pattern.
    pub fn reset_steps(&mut self) {
        for engine in self.channels.iter_mut() {
            engine.reset();
        }
        self.needs_redisplay = true;
    }

    /// Apply one CV input reading.
    ///
    /// `percent` is the normalized level; `rising_edge` is true on the
    /// reading that crossed the edge threshold. Level actions set the
    /// targeted parameter from the percentage. Trigger actions (reset,
    /// fill, mute) act only on a rising edge.
    pub fn apply_cv(&mut self, cv_channel: usize, percent: u8, rising_edge: bool) -> Result<(), ConfigError> {
        let config = *self.cv.get(cv_channel).ok_or(ConfigError::InvalidCvChannel)?;
        if config.action.is_trigger() && !rising_edge {
            return Ok(());
        }

        let mut changed = false;
        for (i, engine) in self.channels.iter_mut().enumerate() {
            if !config.targets(i) {
                continue;
            }
            changed |= match config.action {
                CvAction::None => false,
                CvAction::Reset => {
                    engine.reset();
                    true
                }
                CvAction::Beats => engine.set_beats_percent(percent),
                CvAction::Pulses => engine.set_pulses_percent(percent),
                CvAction::Rotation => engine.set_offset_percent(percent),
                CvAction::Probability => engine.set_probability_percent(percent),
                CvAction::Fill => {
                    engine.toggle_fill();
                    true
                }
                CvAction::Mute => {
                    engine.toggle_mute();
                    true
                }
            };
        }
        if changed {
            self.needs_redisplay = true;
        }
        Ok(())
    }

    /// Advance every channel by one incoming clock tick.
    ///
    /// Returns, per channel, the gate length to emit when that channel
    /// stepped onto a firing step.
    pub fn clock_tick(&mut self, rand: &mut impl Rand) -> [Option<u16>; CHANNEL_COUNT] {
        let mut gates = [None; CHANNEL_COUNT];
        for (gate, engine) in gates.iter_mut().zip(self.channels.iter_mut()) {
            if !engine.advance_step() {
                continue;
            }
            self.needs_redisplay = true;
            if engine.sample_current_step(rand) {
                *gate = Some(engine.fire_gate_length_ms(rand));
            }
        }
        gates
    }
}
