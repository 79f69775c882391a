//! Rising-temperature detector: a small ring buffer of recent samples
//! judged against a threshold, the judgement being a single delta rather
//! than an interpolated curve.

/// Default ring length. The `+2` index offset below is tied to this
/// length and to `RISE_THRESHOLD_C`; do not "correct" it if `history_len`
/// changes without re-deriving the offset.
pub const DEFAULT_HISTORY_LEN: usize = 5;

/// Offset (in ring slots) behind the just-written sample that the delta is
/// computed against. Preserved verbatim from the original firmware rather
/// than recomputed as `history_len - 1`.
const DELTA_OFFSET: usize = 2;

pub struct RisingDetector {
    buf: Vec<f32>,
    cnt: usize,
    threshold: f32,
}

impl RisingDetector {
    /// `history_len` must be at least `DELTA_OFFSET + 1` for the index
    /// arithmetic below to stay in bounds; the default is 5.
    pub fn new(history_len: usize, threshold: f32) -> Self {
        assert!(
            history_len > DELTA_OFFSET,
            "history_len must be greater than {}",
            DELTA_OFFSET
        );
        RisingDetector {
            buf: vec![0.0; history_len],
            cnt: 0,
            threshold,
        }
    }

    /// Feed one new sample in and report whether the temperature is rising.
    ///
    /// Advances the write cursor, overwrites it with the new sample, then
    /// compares against the sample that sits `DELTA_OFFSET` slots behind
    /// it in the ring.
    pub fn sample(&mut self, value: f32) -> bool {
        let len = self.buf.len();
        self.cnt = (self.cnt + 1) % len;
        self.buf[self.cnt] = value;
        let delta_index = (self.cnt + DELTA_OFFSET) % len;
        let delta = self.buf[self.cnt] - self.buf[delta_index];
        delta >= self.threshold
    }

    /// Seed every slot with the same starting value so there is never an
    /// "uninitialised" buffer state.
    pub fn seed(&mut self, value: f32) {
        self.buf.fill(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Recorded sample sequence: five flat samples, then a climb, should
    /// flip to "rising" once the delta against the sample from 2 slots
    /// behind (not 4) clears 0.12.
    #[test]
    fn exact_index_arithmetic_matches_recorded_sequence() {
        let mut d = RisingDetector::new(5, 0.12);
        d.seed(20.0);

        // buf = [20,20,20,20,20], cnt starts at 0.
        // Walk through a sequence and check against hand-computed deltas.
        let samples = [20.0, 20.0, 20.05, 20.20, 20.30, 20.05];
        let expected = [false, false, false, true, true, false];

        for (value, expect) in samples.iter().zip(expected.iter()) {
            assert_eq!(d.sample(*value), *expect, "sample {}", value);
        }
    }

    #[test]
    fn flat_signal_never_rises() {
        let mut d = RisingDetector::new(5, 0.12);
        d.seed(20.0);
        for _ in 0..20 {
            assert!(!d.sample(20.0));
        }
    }

    #[test]
    fn steady_climb_eventually_rises() {
        let mut d = RisingDetector::new(5, 0.12);
        d.seed(20.0);
        let mut rose = false;
        let mut temp = 20.0;
        for _ in 0..10 {
            temp += 0.05;
            rose |= d.sample(temp);
        }
        assert!(rose, "a steady 0.05C/sample climb should trigger rising");
    }

    #[test]
    #[should_panic]
    fn history_len_too_short_panics() {
        RisingDetector::new(2, 0.12);
    }
}
