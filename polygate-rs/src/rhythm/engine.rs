use tinyrand::Rand;

use super::params::{
    RhythmParameters, GATE_LENGTH_MAX_MS, GATE_LENGTH_MIN_MS, GATE_LENGTH_STEP_MS, MAX_BEATS,
    PROBABILITY_STEP,
};
use super::pattern::Pattern;

/// Runtime state of one gate channel.
///
/// Owns the channel's [`RhythmParameters`], the [`Pattern`] generated from
/// them and the playback position. `beats` and `pulses` changes regenerate
/// the pattern immediately; offset changes only affect how steps are read.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RhythmEngine {
    params: RhythmParameters,
    pattern: Pattern,
    current_step: u8,
    prescaler_counter: u8,
    muted: bool,
    fill: bool,
}

impl Default for RhythmEngine {
    fn default() -> Self {
        Self::new(RhythmParameters::default())
    }
}

impl RhythmEngine {
    pub fn new(params: RhythmParameters) -> Self {
        Self {
            pattern: Pattern::euclidean(params.beats(), params.pulses()),
            params,
            current_step: 0,
            prescaler_counter: 0,
            muted: false,
            fill: false,
        }
    }

    pub fn params(&self) -> &RhythmParameters {
        &self.params
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn current_step(&self) -> u8 {
        self.current_step
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_fill(&self) -> bool {
        self.fill
    }

    /// Replace every saved parameter at once, e.g. when loading a preset.
    ///
    /// The play position is kept but pulled back inside the new length.
    pub fn apply_parameters(&mut self, params: &RhythmParameters) {
        self.params.assign(params);
        self.regenerate();
        self.current_step %= self.params.beats();
        self.prescaler_counter = self.prescaler_counter.min(self.params.prescaler() - 1);
    }

    fn regenerate(&mut self) {
        self.pattern = Pattern::euclidean(self.params.beats(), self.params.pulses());
        if self.current_step >= self.params.beats() {
            self.current_step = 0;
        }
    }

    // ── Clocking ─────────────────────────────────────────────────────

    /// Advance on one incoming clock tick.
    ///
    /// Every `prescaler` ticks the step moves forward by one (wrapping at
    /// `beats`) and `true` is returned. The first tick after a reset always
    /// steps.
    pub fn advance_step(&mut self) -> bool {
        if self.prescaler_counter == 0 {
            self.prescaler_counter = self.params.prescaler() - 1;
            self.current_step = (self.current_step + 1) % self.params.beats();
            true
        } else {
            self.prescaler_counter -= 1;
            false
        }
    }

    /// Whether the gate should fire on the current step.
    ///
    /// Muted channels never fire and filled channels always fire. Otherwise
    /// the pattern is read at the rotated position and an onset survives
    /// with `pulses_probability` percent chance.
    pub fn sample_current_step(&self, rand: &mut impl Rand) -> bool {
        if self.muted {
            return false;
        }
        if self.fill {
            return true;
        }
        let beats = self.params.beats();
        let step = (self.current_step + beats - self.params.offset()) % beats;
        if !self.pattern.is_onset(step) {
            return false;
        }
        rand.next_lim_u32(100) < self.params.pulses_probability() as u32
    }

    /// Gate length for a fired step, drawing a fresh random length when
    /// randomization is on.
    pub fn fire_gate_length_ms(&mut self, rand: &mut impl Rand) -> u16 {
        if self.params.randomize_gate_length() {
            self.params.refresh_randomized_gate_length(rand);
        }
        self.params.effective_gate_length_ms()
    }

    pub fn effective_gate_length_ms(&self) -> u16 {
        self.params.effective_gate_length_ms()
    }

    /// Return to step 0; the next tick steps immediately.
    pub fn reset(&mut self) {
        self.current_step = 0;
        self.prescaler_counter = 0;
    }

    // ── Runtime flags ────────────────────────────────────────────────

    pub fn set_muted(&mut self, muted: bool) -> bool {
        let changed = self.muted != muted;
        self.muted = muted;
        changed
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    pub fn set_fill(&mut self, fill: bool) -> bool {
        let changed = self.fill != fill;
        self.fill = fill;
        changed
    }

    pub fn toggle_fill(&mut self) {
        self.fill = !self.fill;
    }

    // ── Parameter edits ──────────────────────────────────────────────

    pub fn set_beats(&mut self, beats: i32) -> bool {
        let changed = self.params.set_beats(beats);
        if changed {
            self.regenerate();
        }
        changed
    }

    pub fn set_pulses(&mut self, pulses: i32) -> bool {
        let changed = self.params.set_pulses(pulses);
        if changed {
            self.regenerate();
        }
        changed
    }

    pub fn set_offset(&mut self, offset: i32) -> bool {
        self.params.set_offset(offset)
    }

    pub fn set_pulses_probability(&mut self, probability: i32) -> bool {
        self.params.set_pulses_probability(probability)
    }

    pub fn set_prescaler(&mut self, prescaler: i32) -> bool {
        let changed = self.params.set_prescaler(prescaler);
        if changed {
            self.prescaler_counter = self.prescaler_counter.min(self.params.prescaler() - 1);
        }
        changed
    }

    pub fn set_prescaler_index(&mut self, index: i32) -> bool {
        let changed = self.params.set_prescaler_index(index);
        if changed {
            self.prescaler_counter = self.prescaler_counter.min(self.params.prescaler() - 1);
        }
        changed
    }

    pub fn set_gate_length_ms(&mut self, gate_length_ms: i32) -> bool {
        self.params.set_gate_length_ms(gate_length_ms)
    }

    pub fn set_randomize_gate_length(&mut self, randomize: bool) -> bool {
        self.params.set_randomize_gate_length(randomize)
    }

    /// Offset moves by one and wraps around the pattern in both directions.
    pub fn increment_offset(&mut self) -> bool {
        self.set_offset(self.params.offset() as i32 + 1)
    }

    pub fn decrement_offset(&mut self) -> bool {
        self.set_offset(self.params.offset() as i32 - 1)
    }

    pub fn increment_pulses(&mut self) -> bool {
        self.set_pulses(self.params.pulses() as i32 + 1)
    }

    pub fn decrement_pulses(&mut self) -> bool {
        self.set_pulses(self.params.pulses() as i32 - 1)
    }

    pub fn increment_beats(&mut self) -> bool {
        self.set_beats(self.params.beats() as i32 + 1)
    }

    pub fn decrement_beats(&mut self) -> bool {
        self.set_beats(self.params.beats() as i32 - 1)
    }

    pub fn increment_gate_length(&mut self) -> bool {
        self.set_gate_length_ms(self.params.gate_length_ms() as i32 + GATE_LENGTH_STEP_MS as i32)
    }

    pub fn decrement_gate_length(&mut self) -> bool {
        self.set_gate_length_ms(self.params.gate_length_ms() as i32 - GATE_LENGTH_STEP_MS as i32)
    }

    pub fn increment_probability(&mut self) -> bool {
        self.set_pulses_probability(
            self.params.pulses_probability() as i32 + PROBABILITY_STEP as i32,
        )
    }

    pub fn decrement_probability(&mut self) -> bool {
        self.set_pulses_probability(
            self.params.pulses_probability() as i32 - PROBABILITY_STEP as i32,
        )
    }

    // ── Absolute (percentage) edits ──────────────────────────────────
    //
    // Used by CV inputs and ring touches. `percent` is clamped to 0..=100
    // and scaled onto the parameter's own range, rounding to nearest.

    pub fn set_beats_percent(&mut self, percent: u8) -> bool {
        let span = MAX_BEATS as u32 - 1;
        self.set_beats(1 + scale(percent, span) as i32)
    }

    pub fn set_pulses_percent(&mut self, percent: u8) -> bool {
        let span = self.params.beats() as u32 - 1;
        self.set_pulses(1 + scale(percent, span) as i32)
    }

    pub fn set_offset_percent(&mut self, percent: u8) -> bool {
        let span = self.params.beats() as u32 - 1;
        self.set_offset(scale(percent, span) as i32)
    }

    pub fn set_probability_percent(&mut self, percent: u8) -> bool {
        self.set_pulses_probability(percent.min(100) as i32)
    }

    pub fn set_gate_length_percent(&mut self, percent: u8) -> bool {
        let span = (GATE_LENGTH_MAX_MS - GATE_LENGTH_MIN_MS) as u32;
        self.set_gate_length_ms(GATE_LENGTH_MIN_MS as i32 + scale(percent, span) as i32)
    }
}

fn scale(percent: u8, span: u32) -> u32 {
    (percent.min(100) as u32 * span + 50) / 100
}
