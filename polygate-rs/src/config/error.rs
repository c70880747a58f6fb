/// Errors returned by index-addressed [`ConfigStateMachine`] methods.
///
/// Parameter values never produce errors; they are clamped instead.
///
/// [`ConfigStateMachine`]: super::ConfigStateMachine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Channel index is out of bounds (must be < `CHANNEL_COUNT`).
    InvalidChannel,
    /// Preset index is out of bounds (must be < `PRESET_COUNT`).
    InvalidPreset,
    /// CV input index is out of bounds (must be < `CV_CHANNEL_COUNT`).
    InvalidCvChannel,
}

/// Outcome of restoring a [`PersistedDocument`](super::PersistedDocument).
///
/// A partial load is not an error: every missing field keeps its default,
/// and the caller should write a complete document back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoadReport {
    /// Fields or records absent from the document.
    pub missing: u16,
}

impl LoadReport {
    pub fn is_partial(&self) -> bool {
        self.missing > 0
    }

    pub(crate) fn note<T>(&mut self, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.missing += 1;
        }
        value
    }
}
