//! The UI and configuration state machine.
//!
//! [`ConfigStateMachine`] owns the four [`RhythmEngine`](crate::RhythmEngine)s
//! and everything the user can configure around them: two presets, the CV
//! input mapping, the touch-ring behaviour and the clock. Discrete input
//! events go through [`ConfigStateMachine::on_event`]; analog CV goes
//! through [`ConfigStateMachine::apply_cv`]; the clock through
//! [`ConfigStateMachine::clock_tick`].
//!
//! Consumers poll two dirty flags:
//!
//! - `needs_redisplay` → build a [`DisplaySnapshot`] and redraw.
//! - `needs_persist` → build a [`PersistedDocument`] and store it.
//!
//! # States
//!
//! ```text
//!   Init ──init──▶ Live ◀──────────────┐
//!                  │  │                 │ menu (empty path) / tap
//!           switch │  └──menu──▶ Parameters
//!                  ▼
//!   RhythmParamBeatsPulses ──same switch──▶ RhythmParamOffsetProbability
//!            ▲                                     │ same switch: persist
//!            └──────── other switch ───────────────┤
//!                                                  ▼
//!                                                 Live
//! ```

/// Declares a small user-selectable enum together with its menu labels.
///
/// Generates `ALL`, `LABELS`, `index()`, a clamping `from_index()` and
/// `label()`. Variant order is the menu order and the stored encoding.
macro_rules! indexed_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
            pub const LABELS: &'static [&'static str] = &[$($label),+];

            pub fn index(self) -> u8 {
                self as u8
            }

            /// Variant at `index`, clamped to the valid range.
            pub fn from_index(index: i32) -> Self {
                let last = Self::ALL.len() as i32 - 1;
                Self::ALL[index.clamp(0, last) as usize]
            }

            pub fn label(self) -> &'static str {
                Self::LABELS[self as usize]
            }
        }
    };
}

mod binding;
mod clock;
mod cv;
mod document;
mod error;
mod event;
mod interface;
mod machine;
mod menu;
mod preset;
mod snapshot;

pub use clock::{
    ClockSettings, ClockSource, TapTempo, CLOCK_PERIOD_MAX_MS, CLOCK_PERIOD_MIN_MS,
    CLOCK_PERIOD_STEP_MS, TAP_TIMEOUT_MS,
};
pub use cv::{CvAction, CvChannelConfig, VoltageRange, EDGE_HIGH_PERCENT, EDGE_LOW_PERCENT};
pub use document::{PersistedDocument, StoredClock, StoredCv, StoredInterface, StoredRhythm};
pub use error::{ConfigError, LoadReport};
pub use event::Event;
pub use interface::{ChannelSelector, InterfaceSettings, LiveAction, LongPressAction, Sensitivity};
pub use machine::{ConfigStateMachine, UiState};
pub use menu::{Attr, MenuNode, NodeKind, Target, MENU, MENU_DEPTH};
pub use preset::Preset;
pub use snapshot::{ChannelView, DisplaySnapshot, MenuValue, MenuView};

/// Number of gate channels.
pub const CHANNEL_COUNT: usize = 4;

/// Number of preset slots.
pub const PRESET_COUNT: usize = 2;

/// Number of analog CV inputs.
pub const CV_CHANNEL_COUNT: usize = 4;
