use super::{Gesture, Motion, RawSample, Ring, RING_SIZE, SECTOR_DEGREES, SENSOR_COUNT};

/// A reading this far below its baseline counts as a touch.
pub const TOUCH_THRESHOLD: u16 = 10;

/// Samples closer together than this belong to the same continuous touch.
pub const CONTINUOUS_TOUCH_MS: u64 = 1000;

/// Deltas larger than this are taken the short way round the circle.
pub const WRAP_LIMIT_DEGREES: f32 = 340.0;

/// Degrees of travel per increment, indexed by sensitivity (low, mid, high).
pub const SENSITIVITY_DEGREES: [f32; 3] = [25.0, 10.0, 5.0];

/// Logical ring position of each electrode, indexed by wiring order.
///
/// The board routes the two rings interleaved, outer electrodes first.
pub const DEFAULT_SENSOR_MAP: [u8; SENSOR_COUNT] = [6, 0, 7, 1, 8, 2, 9, 3, 10, 4, 11, 5];

/// Interpolation span of the normalized reading difference.
const PAIR_SPAN: f32 = 180.0;

#[derive(Debug, Clone, Copy, Default)]
struct RingTrack {
    angle: f32,
    at_ms: Option<u64>,
}

/// One electrode that crossed the touch threshold.
#[derive(Debug, Clone, Copy)]
struct Contact {
    position: u8,
    reading: u16,
    depth: u16,
}

/// Converts raw electrode samples into [`Gesture`]s.
///
/// Holds the per-electrode baseline captured at boot and the last angle
/// and timestamp seen on each ring.
#[derive(Debug, Clone)]
pub struct GestureDecoder {
    calibration: RawSample,
    sensor_map: [u8; SENSOR_COUNT],
    sensitivity: u8,
    tracks: [RingTrack; 2],
}

impl GestureDecoder {
    pub fn new(calibration: RawSample) -> Self {
        Self::with_sensor_map(calibration, DEFAULT_SENSOR_MAP)
    }

    /// Use a custom wiring table. Entries must be a permutation of `0..12`.
    pub fn with_sensor_map(calibration: RawSample, sensor_map: [u8; SENSOR_COUNT]) -> Self {
        Self {
            calibration,
            sensor_map,
            sensitivity: 1,
            tracks: [RingTrack::default(); 2],
        }
    }

    pub fn calibration(&self) -> &RawSample {
        &self.calibration
    }

    pub fn sensitivity(&self) -> u8 {
        self.sensitivity
    }

    /// Select the increment threshold; values above 2 clamp to 2.
    pub fn set_sensitivity(&mut self, sensitivity: u8) {
        self.sensitivity = sensitivity.min(SENSITIVITY_DEGREES.len() as u8 - 1);
    }

    pub fn threshold_degrees(&self) -> f32 {
        SENSITIVITY_DEGREES[self.sensitivity as usize]
    }

    /// Decode one sample taken at `now_ms`.
    ///
    /// Returns `None` when nothing is touched, when the contact pattern is
    /// noise (more than three electrodes, or two non-adjacent ones), and
    /// leaves ring history untouched in that case.
    pub fn update(&mut self, raw: &RawSample, now_ms: u64) -> Option<Gesture> {
        let (ring, angle) = self.locate(raw)?;
        let motion = self.track(ring, angle, now_ms);
        Some(Gesture {
            ring,
            angle,
            motion,
        })
    }

    // ── Contact classification ───────────────────────────────────────

    fn locate(&self, raw: &RawSample) -> Option<(Ring, f32)> {
        let mut contacts = [None::<Contact>; 3];
        let mut count = 0usize;
        for (index, &reading) in raw.iter().enumerate() {
            let baseline = self.calibration[index];
            if reading >= baseline.saturating_sub(TOUCH_THRESHOLD) {
                continue;
            }
            if count == contacts.len() {
                return None;
            }
            contacts[count] = Some(Contact {
                position: self.sensor_map[index],
                reading,
                depth: baseline - reading,
            });
            count += 1;
        }
        if count == 0 {
            return None;
        }

        let inner = contacts
            .iter()
            .flatten()
            .filter(|c| Ring::of_position(c.position) == Ring::Inner)
            .count();
        let ring = if inner > count - inner {
            Ring::Inner
        } else {
            Ring::Outer
        };

        // Keep the majority ring, deepest first.
        let mut kept = [None::<Contact>; 3];
        let mut n = 0usize;
        for contact in contacts.iter().flatten() {
            if Ring::of_position(contact.position) == ring {
                kept[n] = Some(*contact);
                n += 1;
            }
        }
        kept[..n].sort_unstable_by(|a, b| {
            let depth = |c: &Option<Contact>| c.map_or(0, |c| c.depth);
            depth(b).cmp(&depth(a))
        });

        match (kept[0], kept[1]) {
            (Some(only), None) => Some((ring, ring_position(only.position) as f32 * SECTOR_DEGREES)),
            (Some(a), Some(b)) => Some((ring, pair_angle(a, b)?)),
            _ => None,
        }
    }

    // ── Motion tracking ──────────────────────────────────────────────

    fn track(&mut self, ring: Ring, angle: f32, now_ms: u64) -> Option<Motion> {
        let threshold = self.threshold_degrees();
        let track = &mut self.tracks[ring.index()];

        let continuous = track
            .at_ms
            .is_some_and(|at| now_ms.saturating_sub(at) < CONTINUOUS_TOUCH_MS);

        // `track.angle` is the anchor travel is measured from. It only moves
        // when a step fires or the ring went idle, so slow turns add up.
        let motion = if continuous {
            let mut delta = angle - track.angle;
            if delta > WRAP_LIMIT_DEGREES {
                delta -= 360.0;
            } else if delta < -WRAP_LIMIT_DEGREES {
                delta += 360.0;
            }
            let motion = if delta > threshold {
                Some(Motion::Increment)
            } else if delta < -threshold {
                Some(Motion::Decrement)
            } else {
                None
            };
            if motion.is_some() {
                track.angle = angle;
            }
            motion
        } else {
            #[cfg(feature = "defmt")]
            defmt::debug!("ring {} rebased at {}", ring, angle);
            track.angle = angle;
            None
        };

        track.at_ms = Some(now_ms);
        motion
    }
}

fn ring_position(position: u8) -> u8 {
    position % RING_SIZE as u8
}

/// Interpolated angle for two contacts on the same ring, or `None` when
/// they are not neighbours.
fn pair_angle(a: Contact, b: Contact) -> Option<f32> {
    let (low, high) = if ring_position(a.position) < ring_position(b.position) {
        (a, b)
    } else {
        (b, a)
    };
    let (lower, first, second) = match ring_position(high.position) - ring_position(low.position) {
        1 => (ring_position(low.position), low.reading, high.reading),
        // Seam pair: interpolate from the last sector towards 0°.
        d if d as usize == RING_SIZE - 1 => (ring_position(high.position), high.reading, low.reading),
        _ => return None,
    };

    let factor = ((first as f32 - second as f32 + PAIR_SPAN / 2.0) / PAIR_SPAN).clamp(0.0, 1.0);
    let angle = lower as f32 * SECTOR_DEGREES + factor * SECTOR_DEGREES;
    Some(if angle >= 360.0 { angle - 360.0 } else { angle })
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: [u8; SENSOR_COUNT] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];
    const BASELINE: u16 = 500;

    fn decoder() -> GestureDecoder {
        GestureDecoder::with_sensor_map([BASELINE; SENSOR_COUNT], IDENTITY)
    }

    /// Sample with the given logical positions pressed to the given readings.
    fn sample(touches: &[(usize, u16)]) -> RawSample {
        let mut raw = [BASELINE; SENSOR_COUNT];
        for &(position, reading) in touches {
            raw[position] = reading;
        }
        raw
    }

    fn angle(g: Option<Gesture>) -> f32 {
        g.map(|g| g.angle).unwrap_or(f32::NAN)
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 0.01,
            "expected {} got {}",
            expected,
            actual
        );
    }

    // ── Classification ───────────────────────────────────────────────

    #[test]
    fn idle_sample_yields_nothing() {
        let mut d = decoder();
        assert_eq!(d.update(&sample(&[]), 0), None);
    }

    #[test]
    fn shallow_dip_is_not_a_touch() {
        let mut d = decoder();
        assert_eq!(d.update(&sample(&[(2, BASELINE - TOUCH_THRESHOLD)]), 0), None);
    }

    #[test]
    fn single_inner_sensor_gives_sector_angle() {
        let mut d = decoder();
        let g = d.update(&sample(&[(2, 400)]), 0);
        assert_eq!(g.map(|g| g.ring), Some(Ring::Inner));
        assert_close(angle(g), 120.0);
    }

    #[test]
    fn single_outer_sensor_is_ring_relative() {
        let mut d = decoder();
        let g = d.update(&sample(&[(9, 400)]), 0);
        assert_eq!(g.map(|g| g.ring), Some(Ring::Outer));
        assert_close(angle(g), 180.0);
    }

    #[test]
    fn equal_pair_gives_midpoint() {
        let mut d = decoder();
        assert_close(angle(d.update(&sample(&[(1, 400), (2, 400)]), 0)), 90.0);
    }

    #[test]
    fn pair_leans_towards_deeper_touch() {
        let mut d = decoder();
        // Position 1 pressed harder: angle moves towards 60°.
        let a = angle(d.update(&sample(&[(1, 360), (2, 420)]), 0));
        assert!(a > 60.0 && a < 90.0, "angle {}", a);
        assert_close(a, 60.0 + (-60.0 + 90.0) / 180.0 * 60.0);
    }

    #[test]
    fn seam_pair_interpolates_across_zero() {
        let mut d = decoder();
        assert_close(angle(d.update(&sample(&[(0, 400), (5, 400)]), 0)), 330.0);
        // Deeper at position 0 pulls the angle towards 360° (wraps to 0°).
        let a = angle(d.update(&sample(&[(0, 300), (5, 480)]), 5000));
        assert_close(a, 0.0);
    }

    #[test]
    fn outer_seam_pair() {
        let mut d = decoder();
        assert_close(angle(d.update(&sample(&[(6, 400), (11, 400)]), 0)), 330.0);
    }

    #[test]
    fn non_adjacent_pair_is_noise() {
        let mut d = decoder();
        assert_eq!(d.update(&sample(&[(1, 400), (3, 400)]), 0), None);
    }

    #[test]
    fn four_contacts_are_noise() {
        let mut d = decoder();
        let raw = sample(&[(0, 400), (1, 400), (2, 400), (3, 400)]);
        assert_eq!(d.update(&raw, 0), None);
    }

    #[test]
    fn majority_ring_wins() {
        let mut d = decoder();
        let g = d.update(&sample(&[(1, 400), (2, 400), (8, 300)]), 0);
        assert_eq!(g.map(|g| g.ring), Some(Ring::Inner));
        assert_close(angle(g), 90.0);
    }

    #[test]
    fn tie_goes_to_outer_ring() {
        let mut d = decoder();
        let g = d.update(&sample(&[(1, 400), (8, 400)]), 0);
        assert_eq!(g.map(|g| g.ring), Some(Ring::Outer));
        assert_close(angle(g), 120.0);
    }

    #[test]
    fn three_on_one_ring_keeps_two_deepest() {
        let mut d = decoder();
        let g = d.update(&sample(&[(1, 400), (2, 400), (3, 480)]), 0);
        assert_close(angle(g), 90.0);
    }

    #[test]
    fn sensor_map_reorders_inputs() {
        let mut d = GestureDecoder::new([BASELINE; SENSOR_COUNT]);
        // Wiring index 5 is logical inner position 2.
        let mut raw = [BASELINE; SENSOR_COUNT];
        raw[5] = 400;
        let g = d.update(&raw, 0);
        assert_eq!(g.map(|g| g.ring), Some(Ring::Inner));
        assert_close(angle(g), 120.0);
    }

    // ── Motion ───────────────────────────────────────────────────────

    #[test]
    fn first_contact_has_no_motion() {
        let mut d = decoder();
        let g = d.update(&sample(&[(1, 400)]), 100);
        assert_eq!(g.and_then(|g| g.motion), None);
    }

    #[test]
    fn clockwise_motion_increments() {
        let mut d = decoder();
        d.update(&sample(&[(1, 400)]), 0);
        let g = d.update(&sample(&[(1, 400), (2, 400)]), 50);
        assert_eq!(g.and_then(|g| g.motion), Some(Motion::Increment));
        let g = d.update(&sample(&[(1, 400)]), 100);
        assert_eq!(g.and_then(|g| g.motion), Some(Motion::Decrement));
    }

    #[test]
    fn small_motion_below_threshold_is_touch_only() {
        let mut d = decoder();
        d.set_sensitivity(0);
        d.update(&sample(&[(1, 400), (2, 400)]), 0);
        // 90° -> 100°: below the 25° low-sensitivity threshold.
        let g = d.update(&sample(&[(1, 400), (2, 370)]), 20);
        assert_close(angle(g), 100.0);
        assert_eq!(g.and_then(|g| g.motion), None);
    }

    #[test]
    fn motion_across_seam_is_wrap_corrected() {
        let mut d = decoder();
        d.update(&sample(&[(0, 400), (5, 445)]), 0); // 345°
        let g = d.update(&sample(&[(0, 400)]), 20); // 0°
        assert_eq!(g.and_then(|g| g.motion), Some(Motion::Increment));
        let g = d.update(&sample(&[(0, 400), (5, 445)]), 40);
        assert_eq!(g.and_then(|g| g.motion), Some(Motion::Decrement));
    }

    /// Inner pair 1/2 leaning to `60 + 3 * k` degrees, for `k` in `0..=20`.
    fn sweep_sample(k: u16) -> RawSample {
        sample(&[(1, 350 + 5 * k), (2, 440 - 4 * k)])
    }

    #[test]
    fn slow_sweep_accumulates_travel() {
        let mut d = decoder();
        assert_eq!(d.threshold_degrees(), 10.0);
        let mut increments = 0;
        for k in 0..=20 {
            let g = d.update(&sweep_sample(k), u64::from(k) * 10);
            match g.and_then(|g| g.motion) {
                Some(Motion::Increment) => increments += 1,
                Some(Motion::Decrement) => panic!("reverse step at {}", k),
                None => {}
            }
        }
        // 60 degrees of travel, one step each time more than 10 has built up.
        assert_eq!(increments, 5);
    }

    #[test]
    fn jitter_inside_threshold_never_steps() {
        let mut d = decoder();
        for i in 0..50u64 {
            let k = if i % 2 == 0 { 0 } else { 3 };
            let g = d.update(&sweep_sample(k), i * 10);
            assert_eq!(g.and_then(|g| g.motion), None);
        }
    }

    #[test]
    fn steady_contact_keeps_the_touch_continuous() {
        let mut d = decoder();
        // Held still for well over the idle window, sampled every 10 ms.
        for i in 0..150u64 {
            d.update(&sweep_sample(0), i * 10);
        }
        let g = d.update(&sweep_sample(4), 1500);
        assert_eq!(g.and_then(|g| g.motion), Some(Motion::Increment));
    }

    #[test]
    fn idle_gap_rebases_without_motion() {
        let mut d = decoder();
        d.update(&sample(&[(0, 400)]), 0);
        let g = d.update(&sample(&[(3, 400)]), CONTINUOUS_TOUCH_MS);
        assert_eq!(g.and_then(|g| g.motion), None);
        // Tracking resumes from the rebased angle.
        let g = d.update(&sample(&[(4, 400)]), CONTINUOUS_TOUCH_MS + 20);
        assert_eq!(g.and_then(|g| g.motion), Some(Motion::Increment));
    }

    #[test]
    fn rings_track_independently() {
        let mut d = decoder();
        d.update(&sample(&[(1, 400)]), 0);
        d.update(&sample(&[(9, 400)]), 10);
        let g = d.update(&sample(&[(2, 400)]), 20);
        assert_eq!(g.map(|g| g.ring), Some(Ring::Inner));
        assert_eq!(g.and_then(|g| g.motion), Some(Motion::Increment));
    }

    #[test]
    fn noise_does_not_disturb_history() {
        let mut d = decoder();
        d.update(&sample(&[(1, 400)]), 0);
        assert_eq!(d.update(&sample(&[(1, 400), (4, 400)]), 10), None);
        let g = d.update(&sample(&[(2, 400)]), 20);
        assert_eq!(g.and_then(|g| g.motion), Some(Motion::Increment));
    }

    #[test]
    fn sensitivity_is_clamped() {
        let mut d = decoder();
        d.set_sensitivity(9);
        assert_eq!(d.sensitivity(), 2);
        assert_eq!(d.threshold_degrees(), 5.0);
    }
}
