//! Gate-off deadlines for the four outputs.

use polygate::config::CHANNEL_COUNT;

/// Tracks when each raised gate has to drop.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateScheduler {
    deadlines: [Option<u64>; CHANNEL_COUNT],
}

impl GateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise `channel` for `length_ms`. Refiring an open gate extends it.
    pub fn fire(&mut self, channel: usize, now_ms: u64, length_ms: u16) {
        if let Some(slot) = self.deadlines.get_mut(channel) {
            *slot = Some(now_ms + u64::from(length_ms));
        }
    }

    pub fn is_open(&self, channel: usize) -> bool {
        matches!(self.deadlines.get(channel), Some(Some(_)))
    }

    /// Earliest pending gate-off.
    pub fn next_deadline(&self) -> Option<u64> {
        self.deadlines.iter().flatten().copied().min()
    }

    /// Close every gate due at `now_ms`; returns the channels to lower.
    pub fn expire(&mut self, now_ms: u64) -> [bool; CHANNEL_COUNT] {
        core::array::from_fn(|i| match self.deadlines[i] {
            Some(at) if at <= now_ms => {
                self.deadlines[i] = None;
                true
            }
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gates_close_at_their_deadline() {
        let mut g = GateScheduler::new();
        g.fire(0, 100, 50);
        g.fire(2, 100, 20);
        assert_eq!(g.next_deadline(), Some(120));
        assert_eq!(g.expire(119), [false; 4]);
        assert_eq!(g.expire(120), [false, false, true, false]);
        assert_eq!(g.next_deadline(), Some(150));
        assert_eq!(g.expire(200), [true, false, false, false]);
        assert_eq!(g.next_deadline(), None);
    }

    #[test]
    fn refire_extends_the_gate() {
        let mut g = GateScheduler::new();
        g.fire(1, 0, 100);
        g.fire(1, 80, 100);
        assert_eq!(g.expire(100), [false; 4]);
        assert!(g.is_open(1));
        assert_eq!(g.expire(180), [false, true, false, false]);
        assert!(!g.is_open(1));
    }

    #[test]
    fn unknown_channels_are_ignored() {
        let mut g = GateScheduler::new();
        g.fire(CHANNEL_COUNT, 0, 10);
        assert_eq!(g.next_deadline(), None);
        assert!(!g.is_open(CHANNEL_COUNT));
    }
}
