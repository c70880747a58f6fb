//! Core logic for a four-channel euclidean gate generator.
//!
//! The crate is split into three parts that mirror the three sources of
//! change on the module:
//!
//! - [`rhythm`]: per-channel euclidean pattern generation and stepping.
//! - [`gesture`]: decoding of the twelve capacitive ring sensors into
//!   angles and increment/decrement motions.
//! - [`config`]: the UI state machine that owns the four channels, the
//!   presets, the CV mapping and the menu, and that publishes the
//!   redisplay/persist flags read by the display and storage consumers.
//!
//! Nothing here allocates, blocks or talks to hardware. The async tasks
//! that feed events in and drain snapshots out live in `polygate-io`.
//!
//! # Crate Features
//!
//! - **`defmt`**: `defmt::Format` on the public types, plus logging of
//!   ignored events, calibration and document loads.

#![no_std]

pub mod config;
pub mod gesture;
pub mod rhythm;

pub use config::{
    ConfigError, ConfigStateMachine, DisplaySnapshot, Event, LoadReport, PersistedDocument,
    UiState,
};
pub use gesture::{Gesture, GestureDecoder, Motion, Ring};
pub use rhythm::{Pattern, RhythmEngine, RhythmParameters};
