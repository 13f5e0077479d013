//! Adaptive Probability Map: a second-stage refinement that re-maps the
//! mixer's output through a learned, per-context curve (§4.17). Grounded on
//! `APM_t` in `Moruga.cpp`.
//!
//! Each context owns 24 interpolation buckets spanning the stretched
//! probability range. A bucket packs a 10-bit hit count and a 22-bit
//! probability into one `u32` so the learning rate can anneal
//! (`scale / (count + 4)`) without a second array.

use crate::logistic::{squash, Stretch};

const BUCKETS: usize = 24;
const DECAY_LEN: usize = 1024;

fn build_decay(scale: i32) -> Vec<i32> {
    (0..DECAY_LEN).map(|i| scale / (i as i32 + 4)).collect()
}

pub struct Apm {
    table: Vec<u32>,
    decay: Vec<i32>,
    cx: usize,
    weight: i32,
}

const PR_BITS: u32 = 22;
const COUNT_BITS: u32 = 10;
const COUNT_MASK: u32 = (1 << COUNT_BITS) - 1;

impl Apm {
    /// `start == 8` selects the reference's alternate seeding mode, used
    /// where the caller wants the curve to start centered on a specific
    /// bucket (e.g. an SSE stage chained after another APM) rather than
    /// spanning the full stretch range from a cold identity curve.
    pub fn new(n_contexts: usize, start: i32) -> Apm {
        let mut table = vec![0u32; n_contexts * (BUCKETS + 1)];
        for cx in 0..n_contexts {
            for b in 0..=BUCKETS {
                let d = (b as i32 - BUCKETS as i32 / 2) * (4096 / BUCKETS as i32);
                let pr = if start == 8 {
                    squash(d / 2) * 16
                } else {
                    squash(d) * 16
                };
                table[cx * (BUCKETS + 1) + b] = (pr as u32) << COUNT_BITS;
            }
        }
        Apm {
            table,
            decay: build_decay(1 << 16),
            cx: 0,
            weight: 0,
        }
    }

    /// Refines `pr` (a 12-bit probability) for context `cx`, interpolating
    /// between the two buckets bracketing `pr`'s stretched value.
    pub fn predict(&mut self, pr: i32, cx: usize, stretch: &Stretch) -> i32 {
        let d = stretch.stretch(pr.clamp(0, 4095)).clamp(-2047, 2047) + 2048;
        let step = 4096 / BUCKETS as i32;
        let bucket = (d / step).clamp(0, BUCKETS as i32 - 1) as usize;
        self.weight = d % step;
        self.cx = cx * (BUCKETS + 1) + bucket;

        let lo = self.table[self.cx] >> COUNT_BITS;
        let hi = self.table[self.cx + 1] >> COUNT_BITS;
        let interpolated = (lo as i64 * (step - self.weight) as i64 + hi as i64 * self.weight as i64) / step as i64;
        ((interpolated >> (PR_BITS - 12)) as i32).clamp(0, 4095)
    }

    /// Trains the two buckets used by the most recent `predict` toward
    /// observed bit `y`, with a rate that anneals as each bucket's count
    /// saturates toward `DECAY_LEN`.
    pub fn update(&mut self, y: i32) {
        let target: u32 = if y != 0 { (1 << PR_BITS) - 1 } else { 0 };
        for idx in [self.cx, self.cx + 1] {
            let slot = self.table[idx];
            let count = (slot & COUNT_MASK).min(DECAY_LEN as u32 - 1);
            let pr = slot >> COUNT_BITS;
            let rate = self.decay[count as usize];
            let delta = ((target as i64 - pr as i64) * i64::from(rate)) >> 16;
            let new_pr = (pr as i64 + delta).clamp(0, (1 << PR_BITS) - 1) as u32;
            let new_count = (count + 1).min(COUNT_MASK);
            self.table[idx] = (new_pr << COUNT_BITS) | new_count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_stays_within_probability_range() {
        let stretch = Stretch::new();
        let mut apm = Apm::new(4, 0);
        for cx in 0..4 {
            for pr in [0, 1, 2048, 4094, 4095] {
                let out = apm.predict(pr, cx, &stretch);
                assert!((0..=4095).contains(&out));
                apm.update(1);
            }
        }
    }

    #[test]
    fn converges_toward_observed_bit_over_many_updates() {
        let stretch = Stretch::new();
        let mut apm = Apm::new(1, 0);
        for _ in 0..2000 {
            apm.predict(2048, 0, &stretch);
            apm.update(1);
        }
        let out = apm.predict(2048, 0, &stretch);
        assert!(out > 2048);
    }

    #[test]
    fn start_eight_mode_differs_from_default() {
        let a = Apm::new(1, 0);
        let b = Apm::new(1, 8);
        assert_ne!(a.table, b.table);
    }
}
