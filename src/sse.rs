//! Secondary Symbol Estimation: a simpler final refinement stage keeping
//! raw hit/miss counts per context bucket instead of APM's learned curve
//! (§4.18). Grounded on `SSE_t` in `Moruga.cpp`.

const BUCKETS: usize = 4096;
const OVERFLOW_BITS: u32 = 21;
const OVERFLOW_LIMIT: u32 = 1 << OVERFLOW_BITS;

pub struct Sse {
    n0: Vec<u32>,
    n1: Vec<u32>,
    cx: usize,
}

impl Sse {
    pub fn new(n_contexts: usize) -> Sse {
        Sse {
            n0: vec![1; n_contexts * BUCKETS],
            n1: vec![1; n_contexts * BUCKETS],
            cx: 0,
        }
    }

    /// Refines 12-bit probability `pr` for context `cx`, bucketed directly
    /// (no interpolation): returns a 16-bit probability for the final
    /// arithmetic coder stage.
    pub fn predict(&mut self, pr: i32, cx: usize) -> i32 {
        let bucket = pr.clamp(0, BUCKETS as i32 - 1) as usize;
        self.cx = cx * BUCKETS + bucket;
        let n0 = self.n0[self.cx] as i64;
        let n1 = self.n1[self.cx] as i64;
        (((n1 << 16) / (n0 + n1)) as i32).clamp(1, 0xFFFF)
    }

    /// Trains the bucket used by the most recent `predict`, halving both
    /// counters when either would overflow `OVERFLOW_BITS` so the ratio is
    /// preserved but old evidence gradually fades.
    pub fn update(&mut self, y: i32) {
        if y != 0 {
            self.n1[self.cx] += 1;
        } else {
            self.n0[self.cx] += 1;
        }
        if self.n0[self.cx] >= OVERFLOW_LIMIT || self.n1[self.cx] >= OVERFLOW_LIMIT {
            self.n0[self.cx] = (self.n0[self.cx] >> 1).max(1);
            self.n1[self.cx] = (self.n1[self.cx] >> 1).max(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_counters_near_overflow() {
        let mut sse = Sse::new(1);
        sse.n0[0] = OVERFLOW_LIMIT - 1;
        sse.n1[0] = 5;
        sse.cx = 0;
        sse.update(0);
        assert!(sse.n0[0] < OVERFLOW_LIMIT);
    }

    #[test]
    fn converges_toward_observed_ratio() {
        let mut sse = Sse::new(1);
        for _ in 0..500 {
            sse.predict(2048, 0);
            sse.update(1);
        }
        let p = sse.predict(2048, 0);
        assert!(p > 0x8000, "expected strong positive probability, got {p:#x}");
    }
}
