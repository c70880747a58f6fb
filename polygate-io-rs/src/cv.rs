//! CV input conditioning between the ADC and
//! [`ConfigStateMachine::apply_cv`](polygate::ConfigStateMachine::apply_cv).

use polygate::config::{EDGE_HIGH_PERCENT, EDGE_LOW_PERCENT};

/// Rising-edge detector with hysteresis.
///
/// An edge fires when the level crosses above [`EDGE_HIGH_PERCENT`]
/// after having been below [`EDGE_LOW_PERCENT`]. A level that starts high
/// produces no edge until it has dropped low once.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeDetector {
    armed: bool,
}

impl EdgeDetector {
    pub fn update(&mut self, percent: u8) -> bool {
        if percent < EDGE_LOW_PERCENT {
            self.armed = true;
            false
        } else if percent > EDGE_HIGH_PERCENT && self.armed {
            self.armed = false;
            true
        } else {
            false
        }
    }
}

/// Per-input state kept by the CV task.
#[derive(Debug, Clone, Copy, Default)]
pub struct CvInput {
    edge: EdgeDetector,
    last_percent: Option<u8>,
}

impl CvInput {
    /// Feed one normalised reading.
    ///
    /// Returns `(percent, rising_edge)` when the level moved or an edge
    /// fired, `None` when there is nothing to apply.
    pub fn update(&mut self, percent: u8) -> Option<(u8, bool)> {
        let edge = self.edge.update(percent);
        let moved = self.last_percent != Some(percent);
        self.last_percent = Some(percent);
        (moved || edge).then_some((percent, edge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_needs_low_then_high() {
        let mut d = EdgeDetector::default();
        assert!(!d.update(80));
        assert!(!d.update(10));
        assert!(!d.update(50));
        assert!(d.update(61));
        assert!(!d.update(90));
    }

    #[test]
    fn hysteresis_band_does_not_rearm() {
        let mut d = EdgeDetector::default();
        d.update(0);
        assert!(d.update(100));
        assert!(!d.update(45));
        assert!(!d.update(100));
        assert!(!d.update(39));
        assert!(d.update(100));
    }

    #[test]
    fn thresholds_are_exclusive() {
        let mut d = EdgeDetector::default();
        assert!(!d.update(EDGE_LOW_PERCENT));
        assert!(!d.update(100));
        d.update(EDGE_LOW_PERCENT - 1);
        assert!(!d.update(EDGE_HIGH_PERCENT));
        assert!(d.update(EDGE_HIGH_PERCENT + 1));
    }

    #[test]
    fn steady_level_is_reported_once() {
        let mut input = CvInput::default();
        assert_eq!(input.update(20), Some((20, false)));
        assert_eq!(input.update(20), None);
        assert_eq!(input.update(70), Some((70, true)));
        assert_eq!(input.update(70), None);
        assert_eq!(input.update(71), Some((71, false)));
    }
}
