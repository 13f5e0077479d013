//! SparseMatchModel: a smaller match predictor over non-contiguous
//! ("sparse") byte contexts (§4.15). Grounded on `SparseMatchModel_t` in
//! `Moruga.cpp` — same match-continuation idea as `MatchModel`, but with a
//! shorter minimum length and a plainer 2-ContextMap/2-StateMap side model,
//! feeding the top mixer's slot 8 rather than slot 0.

use crate::blend::Blend;
use crate::context_map::{ContextMap, Regime};
use crate::logistic::Stretch;
use crate::statemap::StateMap;

const MINLEN: usize = 2;
const MAXLEN: usize = 65;
const NBITS: u32 = 15;

pub struct SparseMatchModel {
    table: Vec<u32>,
    match_ptr: usize,
    match_len: usize,
    expected_bit: u8,

    sm_a: StateMap,
    sm_b: StateMap,
    cm_a: ContextMap,
    cm_b: ContextMap,
    blend: Blend<5>,
}

impl SparseMatchModel {
    pub fn new() -> SparseMatchModel {
        SparseMatchModel {
            table: vec![0; 1 << NBITS],
            match_ptr: 0,
            match_len: 0,
            expected_bit: 0,
            sm_a: StateMap::new(256, 7),
            sm_b: StateMap::new(256, 7),
            cm_a: ContextMap::new(1 << 16, &[7, 7], &[Regime(0), Regime(1)]),
            cm_b: ContextMap::new(1 << 16, &[7, 7], &[Regime(0), Regime(1)]),
            blend: Blend::new(MAXLEN.min(64) + 1, 0),
        }
    }

    /// Call once per finished byte. `sparse_cx` should already combine the
    /// non-contiguous byte positions the caller wants this model to key on
    /// (e.g. every other byte).
    pub fn new_byte(&mut self, history: &[u8], sparse_cx: u64) {
        let pos = history.len();
        if self.match_len > 0 && self.match_ptr + 1 < pos && history[self.match_ptr] == history[pos - 1] {
            self.match_ptr += 1;
            self.match_len = (self.match_len + 1).min(MAXLEN);
        } else {
            self.match_len = 0;
        }

        if self.match_len == 0 && pos > 0 {
            let h = (crate::hash::hash(sparse_cx) as usize) & (self.table.len() - 1);
            let candidate = self.table[h] as usize;
            if candidate > 0 && candidate < pos {
                self.match_ptr = candidate;
                self.match_len = MINLEN;
            }
            self.table[h] = pos as u32;
        }

        self.expected_bit = if self.match_len > 0 && self.match_ptr < pos {
            (history[self.match_ptr] >> 7) & 1
        } else {
            0
        };

        self.cm_a.set_context(sparse_cx);
        self.cm_b.set_context(sparse_cx.rotate_left(17));
    }

    pub fn predict(&mut self, c0: u32, state: u8, stretch: &Stretch) -> i32 {
        let match_stretch = if self.match_len == 0 {
            0
        } else if self.expected_bit == 1 {
            256
        } else {
            -256
        };

        self.blend.set_context(self.match_len.min(MAXLEN));
        self.blend.set_input(0, match_stretch);
        self.blend.set_input(1, self.sm_a.predict(state as usize, stretch));
        self.blend.set_input(2, self.cm_a.predict(0, c0, stretch));
        self.blend.set_input(3, self.cm_b.predict(0, c0, stretch));
        self.blend.set_input(4, self.sm_b.predict(state as usize, stretch));
        self.blend.predict(stretch)
    }

    pub fn learn(&mut self, y: i32, bpos: u32) {
        self.cm_a.update(bpos, y as u8);
        self.cm_b.update(bpos, y as u8);
        self.sm_a.update(y);
        self.sm_b.update(y);
        self.blend.update(y);
    }
}

impl Default for SparseMatchModel {
    fn default() -> SparseMatchModel {
        SparseMatchModel::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicts_without_panicking_over_many_bytes() {
        let stretch = Stretch::new();
        let mut sm = SparseMatchModel::new();
        let mut history = Vec::new();
        for i in 0..500u32 {
            let b = (i % 17) as u8;
            history.push(b);
            sm.new_byte(&history, i as u64);
            for bpos in 0..8 {
                let _ = sm.predict(1, 0, &stretch);
                sm.learn((i % 2) as i32, bpos);
            }
        }
    }
}
