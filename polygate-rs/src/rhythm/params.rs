use tinyrand::Rand;

/// Longest supported pattern; patterns are stored in a `u32`.
pub const MAX_BEATS: u8 = 32;

/// Allowed clock-division factors, in menu order.
pub const PRESCALERS: [u8; 6] = [1, 2, 3, 4, 8, 16];

/// Menu labels for [`PRESCALERS`].
pub const PRESCALER_LABELS: [&str; 6] = ["1", "2", "3", "4", "8", "16"];

/// Probability moves in steps of this many percent.
pub const PROBABILITY_STEP: u8 = 5;

pub const GATE_LENGTH_MIN_MS: u16 = 10;
pub const GATE_LENGTH_MAX_MS: u16 = 250;
pub const GATE_LENGTH_STEP_MS: u16 = 10;

/// The saved, user-editable part of a channel.
///
/// Every setter clamps its input to the valid range instead of failing, and
/// keeps the structural invariant `1 <= pulses <= beats <= 32`,
/// `offset < beats`. Setters return `true` when the stored value changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RhythmParameters {
    beats: u8,
    pulses: u8,
    offset: u8,
    pulses_probability: u8,
    prescaler: u8,
    gate_length_ms: u16,
    randomize_gate_length: bool,
    randomized_gate_length_ms: u16,
}

impl Default for RhythmParameters {
    fn default() -> Self {
        Self {
            beats: 16,
            pulses: 4,
            offset: 0,
            pulses_probability: 100,
            prescaler: 1,
            gate_length_ms: 50,
            randomize_gate_length: false,
            randomized_gate_length_ms: 50,
        }
    }
}

impl RhythmParameters {
    /// Build a parameter set from a beats/pulses/offset triple, clamped.
    pub fn new(beats: i32, pulses: i32, offset: i32) -> Self {
        let mut params = Self::default();
        params.set_beats(beats);
        params.set_pulses(pulses);
        params.set_offset(offset);
        params
    }

    pub fn beats(&self) -> u8 {
        self.beats
    }

    pub fn pulses(&self) -> u8 {
        self.pulses
    }

    pub fn offset(&self) -> u8 {
        self.offset
    }

    pub fn pulses_probability(&self) -> u8 {
        self.pulses_probability
    }

    pub fn prescaler(&self) -> u8 {
        self.prescaler
    }

    /// Position of the current prescaler in [`PRESCALERS`].
    pub fn prescaler_index(&self) -> u8 {
        PRESCALERS
            .iter()
            .position(|&p| p == self.prescaler)
            .unwrap_or(0) as u8
    }

    pub fn gate_length_ms(&self) -> u16 {
        self.gate_length_ms
    }

    pub fn randomize_gate_length(&self) -> bool {
        self.randomize_gate_length
    }

    pub fn randomized_gate_length_ms(&self) -> u16 {
        self.randomized_gate_length_ms
    }

    /// Gate length to use for the next fired step.
    pub fn effective_gate_length_ms(&self) -> u16 {
        if self.randomize_gate_length {
            self.randomized_gate_length_ms
        } else {
            self.gate_length_ms
        }
    }

    // ── Structural parameters ────────────────────────────────────────

    /// Set the pattern length. `pulses` is pulled down to the new length
    /// and `offset` is wrapped into it.
    pub fn set_beats(&mut self, beats: i32) -> bool {
        let beats = beats.clamp(1, MAX_BEATS as i32) as u8;
        if beats == self.beats {
            return false;
        }
        self.beats = beats;
        self.pulses = self.pulses.min(beats);
        self.offset %= beats;
        true
    }

    pub fn set_pulses(&mut self, pulses: i32) -> bool {
        let pulses = pulses.clamp(1, self.beats as i32) as u8;
        if pulses == self.pulses {
            return false;
        }
        self.pulses = pulses;
        true
    }

    /// Set the rotation; any value is taken modulo `beats`.
    pub fn set_offset(&mut self, offset: i32) -> bool {
        let offset = offset.rem_euclid(self.beats as i32) as u8;
        if offset == self.offset {
            return false;
        }
        self.offset = offset;
        true
    }

    // ── Step-time parameters ─────────────────────────────────────────

    /// Set the onset probability, rounded to the nearest [`PROBABILITY_STEP`].
    pub fn set_pulses_probability(&mut self, probability: i32) -> bool {
        let step = PROBABILITY_STEP as i32;
        let probability = ((probability.clamp(0, 100) + step / 2) / step * step) as u8;
        if probability == self.pulses_probability {
            return false;
        }
        self.pulses_probability = probability;
        true
    }

    /// Set the prescaler to the largest allowed factor not above `prescaler`.
    pub fn set_prescaler(&mut self, prescaler: i32) -> bool {
        let prescaler = PRESCALERS
            .iter()
            .rev()
            .copied()
            .find(|&p| p as i32 <= prescaler)
            .unwrap_or(PRESCALERS[0]);
        if prescaler == self.prescaler {
            return false;
        }
        self.prescaler = prescaler;
        true
    }

    /// Select a prescaler by its position in [`PRESCALERS`], clamped.
    pub fn set_prescaler_index(&mut self, index: i32) -> bool {
        let index = index.clamp(0, PRESCALERS.len() as i32 - 1) as usize;
        self.set_prescaler(PRESCALERS[index] as i32)
    }

    /// Set the gate length, rounded to [`GATE_LENGTH_STEP_MS`]. The
    /// randomized cache is pulled into the new half-to-full window.
    pub fn set_gate_length_ms(&mut self, gate_length_ms: i32) -> bool {
        let step = GATE_LENGTH_STEP_MS as i32;
        let clamped = gate_length_ms.clamp(GATE_LENGTH_MIN_MS as i32, GATE_LENGTH_MAX_MS as i32);
        let gate = ((clamped + step / 2) / step * step) as u16;
        if gate == self.gate_length_ms {
            return false;
        }
        self.gate_length_ms = gate;
        self.randomized_gate_length_ms = self
            .randomized_gate_length_ms
            .clamp(Self::randomized_floor(gate), gate);
        true
    }

    pub fn set_randomize_gate_length(&mut self, randomize: bool) -> bool {
        if randomize == self.randomize_gate_length {
            return false;
        }
        self.randomize_gate_length = randomize;
        true
    }

    /// Draw a new randomized gate length between half and all of
    /// `gate_length_ms`, never below 1 ms.
    pub fn refresh_randomized_gate_length(&mut self, rand: &mut impl Rand) {
        let floor = Self::randomized_floor(self.gate_length_ms);
        let span = (self.gate_length_ms - floor) as u32 + 1;
        self.randomized_gate_length_ms = floor + rand.next_lim_u32(span) as u16;
    }

    fn randomized_floor(gate_length_ms: u16) -> u16 {
        (gate_length_ms / 2).max(1)
    }

    /// Copy the saved fields from `other`, re-validating each one.
    ///
    /// Beats are applied first so pulses and offset clamp against the
    /// incoming length.
    pub fn assign(&mut self, other: &RhythmParameters) {
        self.set_beats(other.beats as i32);
        self.set_pulses(other.pulses as i32);
        self.set_offset(other.offset as i32);
        self.set_pulses_probability(other.pulses_probability as i32);
        self.set_prescaler(other.prescaler as i32);
        self.set_gate_length_ms(other.gate_length_ms as i32);
        self.set_randomize_gate_length(other.randomize_gate_length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinyrand::{Seeded, Wyrand};

    #[test]
    fn defaults_satisfy_invariants() {
        let p = RhythmParameters::default();
        assert!(1 <= p.pulses() && p.pulses() <= p.beats() && p.beats() <= MAX_BEATS);
        assert!(p.offset() < p.beats());
        assert!(PRESCALERS.contains(&p.prescaler()));
    }

    #[test]
    fn beats_clamp_to_range() {
        let mut p = RhythmParameters::default();
        p.set_beats(0);
        assert_eq!(p.beats(), 1);
        p.set_beats(99);
        assert_eq!(p.beats(), 32);
    }

    #[test]
    fn shrinking_beats_pulls_pulses_and_offset() {
        let mut p = RhythmParameters::new(16, 12, 10);
        p.set_beats(8);
        assert_eq!(p.pulses(), 8);
        assert_eq!(p.offset(), 2);
    }

    #[test]
    fn pulses_never_exceed_beats() {
        let mut p = RhythmParameters::new(5, 1, 0);
        p.set_pulses(9);
        assert_eq!(p.pulses(), 5);
        p.set_pulses(-3);
        assert_eq!(p.pulses(), 1);
    }

    #[test]
    fn offset_is_taken_modulo_beats() {
        let mut p = RhythmParameters::new(8, 3, 0);
        p.set_offset(8);
        assert_eq!(p.offset(), 0);
        p.set_offset(-1);
        assert_eq!(p.offset(), 7);
        p.set_offset(19);
        assert_eq!(p.offset(), 3);
    }

    #[test]
    fn probability_rounds_to_step() {
        let mut p = RhythmParameters::default();
        p.set_pulses_probability(42);
        assert_eq!(p.pulses_probability(), 40);
        p.set_pulses_probability(43);
        assert_eq!(p.pulses_probability(), 45);
        p.set_pulses_probability(150);
        assert_eq!(p.pulses_probability(), 100);
        p.set_pulses_probability(-5);
        assert_eq!(p.pulses_probability(), 0);
    }

    #[test]
    fn prescaler_snaps_down_to_allowed_factor() {
        let mut p = RhythmParameters::default();
        p.set_prescaler(7);
        assert_eq!(p.prescaler(), 4);
        p.set_prescaler(100);
        assert_eq!(p.prescaler(), 16);
        p.set_prescaler(0);
        assert_eq!(p.prescaler(), 1);
        p.set_prescaler_index(4);
        assert_eq!(p.prescaler(), 8);
        assert_eq!(p.prescaler_index(), 4);
    }

    #[test]
    fn gate_length_rounds_and_clamps() {
        let mut p = RhythmParameters::default();
        p.set_gate_length_ms(124);
        assert_eq!(p.gate_length_ms(), 120);
        p.set_gate_length_ms(1);
        assert_eq!(p.gate_length_ms(), GATE_LENGTH_MIN_MS);
        p.set_gate_length_ms(1000);
        assert_eq!(p.gate_length_ms(), GATE_LENGTH_MAX_MS);
    }

    #[test]
    fn setters_report_changes() {
        let mut p = RhythmParameters::default();
        assert!(p.set_beats(12));
        assert!(!p.set_beats(12));
        assert!(!p.set_randomize_gate_length(false));
    }

    #[test]
    fn randomized_gate_stays_in_half_to_full_window() {
        let mut rand = Wyrand::seed(7);
        let mut p = RhythmParameters::default();
        p.set_gate_length_ms(100);
        for _ in 0..500 {
            p.refresh_randomized_gate_length(&mut rand);
            let v = p.randomized_gate_length_ms();
            assert!((50..=100).contains(&v), "randomized gate {} out of window", v);
        }
    }

    #[test]
    fn randomized_gate_never_below_one() {
        let mut rand = Wyrand::seed(3);
        let mut p = RhythmParameters::default();
        p.set_gate_length_ms(GATE_LENGTH_MIN_MS as i32);
        for _ in 0..100 {
            p.refresh_randomized_gate_length(&mut rand);
            assert!(p.randomized_gate_length_ms() >= 1);
        }
    }

    #[test]
    fn effective_gate_follows_randomize_flag() {
        let mut rand = Wyrand::seed(11);
        let mut p = RhythmParameters::default();
        p.set_gate_length_ms(200);
        p.refresh_randomized_gate_length(&mut rand);
        assert_eq!(p.effective_gate_length_ms(), 200);
        p.set_randomize_gate_length(true);
        assert_eq!(p.effective_gate_length_ms(), p.randomized_gate_length_ms());
    }

    #[test]
    fn assign_revalidates_against_new_beats() {
        let source = RhythmParameters::new(5, 5, 4);
        let mut target = RhythmParameters::new(32, 20, 30);
        target.assign(&source);
        assert_eq!(target.beats(), 5);
        assert_eq!(target.pulses(), 5);
        assert_eq!(target.offset(), 4);
    }
}
