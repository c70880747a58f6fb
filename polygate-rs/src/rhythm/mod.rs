//! Euclidean rhythm generation for a single gate channel.
//!
//! A channel is described by its [`RhythmParameters`] (the part that is
//! saved in presets) and driven by a [`RhythmEngine`], which adds the
//! generated [`Pattern`] and the runtime step position.
//!
//! ```text
//! beats = 8, pulses = 3          offset = 2 (applied at read time)
//! pattern  x . . x . . x .       step 0 reads pattern[6]
//! ```
//!
//! Patterns are stored as a bitmask (`beats <= 32`), so reading a step and
//! advancing the clock are a handful of integer operations and can run
//! inside an interrupt handler.

mod engine;
mod params;
mod pattern;

pub use engine::RhythmEngine;
pub use params::{
    RhythmParameters, GATE_LENGTH_MAX_MS, GATE_LENGTH_MIN_MS, GATE_LENGTH_STEP_MS, MAX_BEATS,
    PRESCALERS, PRESCALER_LABELS, PROBABILITY_STEP,
};
pub use pattern::Pattern;
