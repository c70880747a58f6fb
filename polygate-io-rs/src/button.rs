//! Front-panel buttons: short/long press classification and debouncing.

use polygate::Event;

/// Hold time at which a press becomes a long press.
pub const LONG_PRESS_MS: u64 = 500;

/// Settling time after an edge before the level is trusted.
pub const DEBOUNCE_MS: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Press {
    Short,
    Long,
}

/// What a physical button means to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonRole {
    Menu,
    Tap,
    /// Channel switch `0..CHANNEL_COUNT`.
    Switch(u8),
}

impl ButtonRole {
    /// `now_ms` is the press time; only the tap button uses it.
    pub fn event(self, press: Press, now_ms: u64) -> Event {
        match (self, press) {
            (ButtonRole::Menu, Press::Short) => Event::MenuShort,
            (ButtonRole::Menu, Press::Long) => Event::MenuLong,
            (ButtonRole::Tap, Press::Short) => Event::TapShort { at_ms: now_ms },
            (ButtonRole::Tap, Press::Long) => Event::TapLong,
            (ButtonRole::Switch(n), Press::Short) => Event::SwitchShort(n),
            (ButtonRole::Switch(n), Press::Long) => Event::SwitchLong(n),
        }
    }
}

/// Turns debounced press/release times into [`Press`] results.
///
/// A long press is reported once, as soon as the hold reaches
/// [`LONG_PRESS_MS`]; the release that follows reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PressTracker {
    pressed_at: Option<u64>,
    long_sent: bool,
}

impl PressTracker {
    pub fn press(&mut self, now_ms: u64) {
        self.pressed_at = Some(now_ms);
        self.long_sent = false;
    }

    /// When [`poll`](Self::poll) should next be called, if held.
    pub fn long_deadline(&self) -> Option<u64> {
        match self.pressed_at {
            Some(at) if !self.long_sent => Some(at + LONG_PRESS_MS),
            _ => None,
        }
    }

    /// Report a long press if the button has been held long enough.
    pub fn poll(&mut self, now_ms: u64) -> Option<Press> {
        let deadline = self.long_deadline()?;
        if now_ms >= deadline {
            self.long_sent = true;
            Some(Press::Long)
        } else {
            None
        }
    }

    pub fn release(&mut self, now_ms: u64) -> Option<Press> {
        let at = self.pressed_at.take()?;
        if self.long_sent {
            None
        } else if now_ms.saturating_sub(at) >= LONG_PRESS_MS {
            Some(Press::Long)
        } else {
            Some(Press::Short)
        }
    }

    /// Time of the press in progress.
    pub fn pressed_at(&self) -> Option<u64> {
        self.pressed_at
    }
}

#[cfg(feature = "task")]
pub use debounce::Debounce;

#[cfg(feature = "task")]
mod debounce {
    use embassy_time::{Duration, Timer};
    use embedded_hal::digital::InputPin;
    use embedded_hal_async::digital::Wait;

    use super::DEBOUNCE_MS;

    /// Active-low input that only reports levels stable for
    /// [`DEBOUNCE_MS`].
    pub struct Debounce<P> {
        pin: P,
        timeout: Duration,
    }

    impl<P: Wait + InputPin> Debounce<P> {
        pub fn new(pin: P) -> Self {
            Self {
                pin,
                timeout: Duration::from_millis(DEBOUNCE_MS),
            }
        }

        /// Wait until the button is held down.
        pub async fn wait_for_press(&mut self) -> Result<(), P::Error> {
            self.wait_for_level(false).await
        }

        pub async fn wait_for_release(&mut self) -> Result<(), P::Error> {
            self.wait_for_level(true).await
        }

        async fn wait_for_level(&mut self, high: bool) -> Result<(), P::Error> {
            loop {
                if self.pin.is_high()? != high {
                    self.pin.wait_for_any_edge().await?;
                }
                Timer::after(self.timeout).await;
                if self.pin.is_high()? == high {
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_release_is_short() {
        let mut t = PressTracker::default();
        t.press(1000);
        assert_eq!(t.poll(1100), None);
        assert_eq!(t.release(1200), Some(Press::Short));
        assert_eq!(t.pressed_at(), None);
    }

    #[test]
    fn hold_reports_long_once() {
        let mut t = PressTracker::default();
        t.press(0);
        assert_eq!(t.long_deadline(), Some(LONG_PRESS_MS));
        assert_eq!(t.poll(LONG_PRESS_MS), Some(Press::Long));
        assert_eq!(t.poll(LONG_PRESS_MS + 100), None);
        assert_eq!(t.long_deadline(), None);
        assert_eq!(t.release(2000), None);
    }

    #[test]
    fn late_release_without_poll_is_long() {
        let mut t = PressTracker::default();
        t.press(10);
        assert_eq!(t.release(10 + LONG_PRESS_MS), Some(Press::Long));
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut t = PressTracker::default();
        assert_eq!(t.release(50), None);
        assert_eq!(t.poll(5000), None);
    }

    #[test]
    fn roles_map_to_events() {
        assert_eq!(ButtonRole::Menu.event(Press::Short, 0), Event::MenuShort);
        assert_eq!(ButtonRole::Menu.event(Press::Long, 0), Event::MenuLong);
        assert_eq!(ButtonRole::Tap.event(Press::Short, 1234), Event::TapShort { at_ms: 1234 });
        assert_eq!(ButtonRole::Tap.event(Press::Long, 0), Event::TapLong);
        assert_eq!(ButtonRole::Switch(2).event(Press::Short, 0), Event::SwitchShort(2));
        assert_eq!(ButtonRole::Switch(3).event(Press::Long, 0), Event::SwitchLong(3));
    }
}
