//! Persisted configuration document.
//!
//! Every stored field is optional and every container defaults to empty,
//! so a self-describing encoding that lacks a field deserializes to `None`
//! and the in-memory default survives. Values are restored through the
//! same clamping setters the UI uses, so a corrupt value can never break
//! an invariant.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::rhythm::{RhythmEngine, RhythmParameters};

use super::clock::{ClockSettings, ClockSource};
use super::cv::{CvAction, CvChannelConfig, VoltageRange};
use super::error::LoadReport;
use super::interface::{ChannelSelector, InterfaceSettings, LiveAction, LongPressAction, Sensitivity};
use super::machine::ConfigStateMachine;
use super::{CHANNEL_COUNT, CV_CHANNEL_COUNT, PRESET_COUNT};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredRhythm {
    pub beats: Option<u8>,
    pub pulses: Option<u8>,
    pub offset: Option<u8>,
    pub probability: Option<u8>,
    pub prescaler: Option<u8>,
    pub gate_length_ms: Option<u16>,
    pub randomize_gate_length: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredInterface {
    pub menu_long_press: Option<u8>,
    pub tap_long_press: Option<u8>,
    pub inner_action: Option<u8>,
    pub inner_target: Option<u8>,
    pub outer_action: Option<u8>,
    pub outer_target: Option<u8>,
    pub sensitivity: Option<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredCv {
    pub action: Option<u8>,
    pub target_mask: Option<u8>,
    pub voltage_range: Option<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredClock {
    pub source: Option<u8>,
    pub period_ms: Option<u16>,
}

/// Everything that survives a power cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedDocument {
    pub channels: Vec<StoredRhythm, CHANNEL_COUNT>,
    pub presets: Vec<Vec<StoredRhythm, CHANNEL_COUNT>, PRESET_COUNT>,
    pub load_preset_index: Option<u8>,
    pub interface: Option<StoredInterface>,
    pub cv: Vec<StoredCv, CV_CHANNEL_COUNT>,
    pub clock: Option<StoredClock>,
}

// ── Capture ──────────────────────────────────────────────────────────────

impl From<&RhythmParameters> for StoredRhythm {
    fn from(p: &RhythmParameters) -> Self {
        Self {
            beats: Some(p.beats()),
            pulses: Some(p.pulses()),
            offset: Some(p.offset()),
            probability: Some(p.pulses_probability()),
            prescaler: Some(p.prescaler()),
            gate_length_ms: Some(p.gate_length_ms()),
            randomize_gate_length: Some(p.randomize_gate_length()),
        }
    }
}

impl From<&InterfaceSettings> for StoredInterface {
    fn from(s: &InterfaceSettings) -> Self {
        Self {
            menu_long_press: Some(s.menu_long_press.index()),
            tap_long_press: Some(s.tap_long_press.index()),
            inner_action: Some(s.inner_action.index()),
            inner_target: Some(s.inner_target.index()),
            outer_action: Some(s.outer_action.index()),
            outer_target: Some(s.outer_target.index()),
            sensitivity: Some(s.sensitivity.index()),
        }
    }
}

impl From<&CvChannelConfig> for StoredCv {
    fn from(c: &CvChannelConfig) -> Self {
        Self {
            action: Some(c.action.index()),
            target_mask: Some(c.target_mask),
            voltage_range: Some(c.voltage_range.index()),
        }
    }
}

impl From<&ClockSettings> for StoredClock {
    fn from(c: &ClockSettings) -> Self {
        Self {
            source: Some(c.source.index()),
            period_ms: Some(c.period_ms()),
        }
    }
}

// ── Restore ──────────────────────────────────────────────────────────────

impl StoredRhythm {
    /// Overwrite the fields present in `self`. Beats go first so pulses and
    /// offset clamp against the stored length.
    fn restore(&self, params: &mut RhythmParameters, report: &mut LoadReport) {
        if let Some(v) = report.note(self.beats) {
            params.set_beats(v as i32);
        }
        if let Some(v) = report.note(self.pulses) {
            params.set_pulses(v as i32);
        }
        if let Some(v) = report.note(self.offset) {
            params.set_offset(v as i32);
        }
        if let Some(v) = report.note(self.probability) {
            params.set_pulses_probability(v as i32);
        }
        if let Some(v) = report.note(self.prescaler) {
            params.set_prescaler(v as i32);
        }
        if let Some(v) = report.note(self.gate_length_ms) {
            params.set_gate_length_ms(v as i32);
        }
        if let Some(v) = report.note(self.randomize_gate_length) {
            params.set_randomize_gate_length(v);
        }
    }

    fn restore_engine(&self, engine: &mut RhythmEngine, report: &mut LoadReport) {
        let mut params = *engine.params();
        self.restore(&mut params, report);
        engine.apply_parameters(&params);
    }
}

impl StoredInterface {
    fn restore(&self, s: &mut InterfaceSettings, report: &mut LoadReport) {
        if let Some(v) = report.note(self.menu_long_press) {
            s.menu_long_press = LongPressAction::from_index(v as i32);
        }
        if let Some(v) = report.note(self.tap_long_press) {
            s.tap_long_press = LongPressAction::from_index(v as i32);
        }
        if let Some(v) = report.note(self.inner_action) {
            s.inner_action = LiveAction::from_index(v as i32);
        }
        if let Some(v) = report.note(self.inner_target) {
            s.inner_target = ChannelSelector::from_index(v as i32);
        }
        if let Some(v) = report.note(self.outer_action) {
            s.outer_action = LiveAction::from_index(v as i32);
        }
        if let Some(v) = report.note(self.outer_target) {
            s.outer_target = ChannelSelector::from_index(v as i32);
        }
        if let Some(v) = report.note(self.sensitivity) {
            s.sensitivity = Sensitivity::from_index(v as i32);
        }
    }
}

impl StoredCv {
    fn restore(&self, c: &mut CvChannelConfig, report: &mut LoadReport) {
        if let Some(v) = report.note(self.action) {
            c.action = CvAction::from_index(v as i32);
        }
        if let Some(v) = report.note(self.target_mask) {
            c.set_target_mask(v as i32);
        }
        if let Some(v) = report.note(self.voltage_range) {
            c.voltage_range = VoltageRange::from_index(v as i32);
        }
    }
}

impl StoredClock {
    fn restore(&self, c: &mut ClockSettings, report: &mut LoadReport) {
        if let Some(v) = report.note(self.source) {
            c.source = ClockSource::from_index(v as i32);
        }
        if let Some(v) = report.note(self.period_ms) {
            c.set_period_ms(v as i32);
        }
    }
}

/// Count the records a fixed-size section is short of.
fn note_short(report: &mut LoadReport, stored: usize, expected: usize) {
    report.missing += expected.saturating_sub(stored) as u16;
}

impl ConfigStateMachine {
    /// Capture everything that belongs in storage.
    pub fn persisted_document(&self) -> PersistedDocument {
        let mut doc = PersistedDocument {
            load_preset_index: Some(self.load_preset_index),
            interface: Some(StoredInterface::from(&self.interface)),
            clock: Some(StoredClock::from(&self.clock)),
            ..Default::default()
        };
        for engine in self.channels.iter() {
            let _ = doc.channels.push(StoredRhythm::from(engine.params()));
        }
        for preset in self.presets.iter() {
            let mut stored = Vec::new();
            for params in preset.channels.iter() {
                let _ = stored.push(StoredRhythm::from(params));
            }
            let _ = doc.presets.push(stored);
        }
        for cv in self.cv.iter() {
            let _ = doc.cv.push(StoredCv::from(cv));
        }
        doc
    }

    /// Restore from a stored document, keeping defaults for anything the
    /// document lacks.
    ///
    /// The active preset index is restored without loading the preset;
    /// the live channel parameters are stored separately.
    pub fn load_document(&mut self, doc: &PersistedDocument) -> LoadReport {
        let mut report = LoadReport::default();

        note_short(&mut report, doc.channels.len(), CHANNEL_COUNT);
        for (stored, engine) in doc.channels.iter().zip(self.channels.iter_mut()) {
            stored.restore_engine(engine, &mut report);
        }

        note_short(&mut report, doc.presets.len(), PRESET_COUNT);
        for (stored, preset) in doc.presets.iter().zip(self.presets.iter_mut()) {
            note_short(&mut report, stored.len(), CHANNEL_COUNT);
            for (s, params) in stored.iter().zip(preset.channels.iter_mut()) {
                s.restore(params, &mut report);
            }
        }

        if let Some(index) = report.note(doc.load_preset_index) {
            self.load_preset_index = index.min(PRESET_COUNT as u8 - 1);
        }
        if let Some(interface) = report.note(doc.interface) {
            interface.restore(&mut self.interface, &mut report);
        }

        note_short(&mut report, doc.cv.len(), CV_CHANNEL_COUNT);
        for (stored, cv) in doc.cv.iter().zip(self.cv.iter_mut()) {
            stored.restore(cv, &mut report);
        }

        if let Some(clock) = report.note(doc.clock) {
            clock.restore(&mut self.clock, &mut report);
        }

        self.mark_redisplay();

        if report.is_partial() {
            #[cfg(feature = "defmt")]
            defmt::warn!("persisted document partial: {} missing", report.missing);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CvAction, Event};

    fn parse(json: &str) -> PersistedDocument {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn full_document_round_trips() {
        let mut source = ConfigStateMachine::new();
        source.channels[1].set_beats(12);
        source.channels[1].set_pulses(5);
        source.channels[1].set_prescaler(3);
        source.presets[1].channels[2].set_beats(7);
        source.load_preset_index = 1;
        source.cv[3].action = CvAction::Probability;
        source.interface.sensitivity = Sensitivity::High;
        source.clock.set_period_ms(250);

        let text = serde_json::to_string(&source.persisted_document()).unwrap();
        let mut target = ConfigStateMachine::new();
        let report = target.load_document(&parse(&text));

        assert!(!report.is_partial());
        assert_eq!(target.channels[1].params(), source.channels[1].params());
        assert_eq!(target.channels[1].pattern(), source.channels[1].pattern());
        assert_eq!(target.presets[1].channels[2].beats(), 7);
        assert_eq!(target.load_preset_index, 1);
        assert_eq!(target.cv[3].action, CvAction::Probability);
        assert_eq!(target.interface.sensitivity, Sensitivity::High);
        assert_eq!(target.clock.period_ms(), 250);
        assert_eq!(target.persisted_document(), source.persisted_document());
    }

    #[test]
    fn empty_document_keeps_defaults() {
        let mut m = ConfigStateMachine::new();
        let report = m.load_document(&parse("{}"));
        assert!(report.is_partial());
        assert_eq!(m.channels[0].params(), &RhythmParameters::default());
        assert_eq!(m.clock.period_ms(), 500);
    }

    #[test]
    fn missing_fields_keep_defaults() {
        let mut m = ConfigStateMachine::new();
        let report = m.load_document(&parse(r#"{"channels":[{"beats":8,"pulses":3}]}"#));
        assert!(report.is_partial());
        let p = m.channels[0].params();
        assert_eq!((p.beats(), p.pulses(), p.offset()), (8, 3, 0));
        assert_eq!(p.gate_length_ms(), 50);
        assert_eq!(m.channels[0].pattern().len(), 8);
        assert_eq!(m.channels[1].params().beats(), 16);
    }

    #[test]
    fn stored_values_are_clamped() {
        let mut m = ConfigStateMachine::new();
        let doc = parse(
            r#"{"channels":[{"beats":99,"pulses":50,"offset":40,"prescaler":5,"probability":101}],
                "load_preset_index":9,
                "clock":{"source":7,"period_ms":5}}"#,
        );
        m.load_document(&doc);
        let p = m.channels[0].params();
        assert_eq!((p.beats(), p.pulses(), p.offset()), (32, 32, 8));
        assert_eq!(p.prescaler(), 4);
        assert_eq!(p.pulses_probability(), 100);
        assert_eq!(m.load_preset_index, 1);
        assert_eq!(m.clock.source, ClockSource::External);
        assert_eq!(m.clock.period_ms(), 10);
    }

    #[test]
    fn complete_document_counts_nothing_missing() {
        let m = ConfigStateMachine::new();
        let doc = m.persisted_document();
        assert_eq!(doc.channels.len(), CHANNEL_COUNT);
        assert_eq!(doc.presets.len(), PRESET_COUNT);
        assert_eq!(doc.cv.len(), CV_CHANNEL_COUNT);
        let mut other = ConfigStateMachine::new();
        assert_eq!(other.load_document(&doc), LoadReport::default());
    }

    #[test]
    fn loading_does_not_change_ui_state() {
        let mut m = ConfigStateMachine::new();
        m.on_event(Event::Init);
        m.take_persist();
        m.load_document(&parse("{}"));
        assert_eq!(m.state(), crate::config::UiState::Live);
        assert!(!m.needs_persist());
        assert!(m.take_redisplay());
    }
}
