use super::params::MAX_BEATS;

/// A generated onset pattern of up to [`MAX_BEATS`] steps.
///
/// Bit `i` of `bits` is set when step `i` is an onset. Offset is not baked
/// in; the engine applies it when reading a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pattern {
    bits: u32,
    len: u8,
}

impl Default for Pattern {
    fn default() -> Self {
        Self::euclidean(16, 4)
    }
}

impl Pattern {
    /// Distribute `pulses` onsets as evenly as possible over `beats` steps.
    ///
    /// Uses Bjorklund's algorithm, then rotates the result onto an onset so
    /// that onset `i` sits on the step nearest to `i * beats / pulses`
    /// (halves round up). E(8, 3) therefore reads `x..x.x..`, intervals
    /// 3-2-3. Out-of-range arguments are clamped.
    pub fn euclidean(beats: u8, pulses: u8) -> Self {
        let beats = beats.clamp(1, MAX_BEATS);
        let pulses = pulses.min(beats);
        if pulses == 0 {
            return Self { bits: 0, len: beats };
        }

        let mut builder = Bjorklund::new(beats, pulses);
        let top = builder.divide();
        builder.build(top);
        debug_assert_eq!(builder.len, beats);

        Self {
            bits: align_to_nearest(builder.bits, beats, pulses),
            len: beats,
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn len(&self) -> u8 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Whether `step` is an onset. Steps at or past `len` are never onsets.
    pub fn is_onset(&self, step: u8) -> bool {
        step < self.len && self.bits & (1 << step) != 0
    }

    pub fn onset_count(&self) -> u8 {
        self.bits.count_ones() as u8
    }

    /// Iterate over onset positions in ascending order.
    pub fn onsets(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.len).filter(move |&step| self.is_onset(step))
    }
}

/// Rotate the low `len` bits of `bits` so bit `by` becomes bit 0.
fn rotate_down(bits: u32, by: u32, len: u8) -> u32 {
    let len = len as u32;
    let by = by % len;
    let mask = (1u64 << len) - 1;
    let wide = bits as u64;
    (((wide >> by) | (wide << (len - by))) & mask) as u32
}

/// Onsets at the nearest step to `i * beats / pulses`, halves rounding up.
fn nearest_steps(beats: u8, pulses: u8) -> u32 {
    let (beats, pulses) = (u32::from(beats), u32::from(pulses));
    (0..pulses).fold(0, |bits, i| bits | 1 << ((2 * i * beats + pulses) / (2 * pulses)))
}

/// Pick the rotation of a Bjorklund pattern that starts on an onset and
/// matches [`nearest_steps`]. Both are maximally even, so one always does;
/// the first onset is the fallback.
fn align_to_nearest(bits: u32, beats: u8, pulses: u8) -> u32 {
    let target = nearest_steps(beats, pulses);
    (0..u32::from(beats))
        .filter(|&step| bits & (1 << step) != 0)
        .map(|step| rotate_down(bits, step, beats))
        .find(|&rotated| rotated == target)
        .unwrap_or_else(|| rotate_down(bits, bits.trailing_zeros(), beats))
}

// Index slack for the division cascade: one extra level for the final count
// and one more for the remainder written alongside it.
const LEVELS: usize = MAX_BEATS as usize + 2;

struct Bjorklund {
    counts: [u8; LEVELS],
    remainders: [u8; LEVELS + 1],
    beats: u8,
    pulses: u8,
    bits: u32,
    len: u8,
}

impl Bjorklund {
    fn new(beats: u8, pulses: u8) -> Self {
        Self {
            counts: [0; LEVELS],
            remainders: [0; LEVELS + 1],
            beats,
            pulses,
            bits: 0,
            len: 0,
        }
    }

    /// Run the Euclid-style division cascade and return the top level.
    fn divide(&mut self) -> i32 {
        let mut divisor = self.beats - self.pulses;
        self.remainders[0] = self.pulses;
        let mut level = 0usize;
        loop {
            self.counts[level] = divisor / self.remainders[level];
            self.remainders[level + 1] = divisor % self.remainders[level];
            divisor = self.remainders[level];
            level += 1;
            if self.remainders[level] <= 1 {
                break;
            }
        }
        self.counts[level] = divisor;
        level as i32
    }

    fn build(&mut self, level: i32) {
        match level {
            -1 => self.push(false),
            -2 => self.push(true),
            _ => {
                let index = level as usize;
                for _ in 0..self.counts[index] {
                    self.build(level - 1);
                }
                if self.remainders[index] != 0 {
                    self.build(level - 2);
                }
            }
        }
    }

    fn push(&mut self, onset: bool) {
        if onset {
            self.bits |= 1 << self.len;
        }
        self.len += 1;
    }
}
