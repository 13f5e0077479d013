//! LempelZivPredict: predicts the next bit by finding the longest recent
//! repeat of the current context and forecasting that the repeat
//! continues (§4.14). Grounded on `LempelZivPredict_t` in `Moruga.cpp`.

use crate::blend::Blend;
use crate::logistic::Stretch;
use crate::run_context_map::RunContextMap;

const MINLEN: usize = 7;
const MAXLEN: usize = MINLEN + 63;

/// Packs a mixer-context hint per match length (capped to 64 buckets) into
/// one 64-bit constant, 4 bits per bucket, the way the reference encodes
/// "how much should the top mixer trust a match this long" without a
/// runtime table. Exposed so `predict` can look a length up without a
/// branch ladder.
const LEN_HINT: u64 = 0x9999_9888_8877_6654;

fn length_hint(len: usize) -> u32 {
    let bucket = (len.min(15)) as u32;
    ((LEN_HINT >> (bucket * 4)) & 0xF) as u32
}

pub struct MatchModel {
    table: Vec<u32>,
    hash_bits: u32,
    match_ptr: usize,
    match_len: usize,
    /// The whole byte the match predicts comes next, so mid-byte bit
    /// positions can each be checked against their own expected bit
    /// instead of only the byte's top bit.
    expected_byte: u8,

    rcm_w5: RunContextMap,
    rcm_x5: RunContextMap,
    rcm_tt: RunContextMap,
    rcm_word: RunContextMap,
    blend: Blend<8>,
}

impl MatchModel {
    pub fn new(hash_bits: u32) -> MatchModel {
        MatchModel {
            table: vec![0; 1 << hash_bits],
            hash_bits,
            match_ptr: 0,
            match_len: 0,
            expected_byte: 0,
            rcm_w5: RunContextMap::new(16),
            rcm_x5: RunContextMap::new(16),
            rcm_tt: RunContextMap::new(16),
            rcm_word: RunContextMap::new(16),
            blend: Blend::new(64, 0),
        }
    }

    /// Call once per finished byte, after the byte has been appended to
    /// `history`. Extends the current match if the prediction held,
    /// otherwise looks a new one up from the hash of the last 8 bytes.
    pub fn new_byte(&mut self, history: &[u8], cx: u64, w5: u64, x5: u64, tt: u64, word: u64) {
        let pos = history.len();
        if self.match_len > 0 && self.match_ptr + 1 < pos && history[self.match_ptr] == history[pos - 1] {
            self.match_ptr += 1;
            self.match_len = (self.match_len + 1).min(MAXLEN);
        } else {
            self.match_len = 0;
        }

        if self.match_len == 0 && pos >= 8 {
            let h = (crate::hash::hash(cx) as usize) & (self.table.len() - 1);
            let candidate = self.table[h] as usize;
            if candidate > 0 && candidate < pos {
                self.match_ptr = candidate;
                self.match_len = MINLEN;
            }
            self.table[h] = pos as u32;
        }

        self.expected_byte = if self.match_len > 0 && self.match_ptr < pos {
            history[self.match_ptr]
        } else {
            0
        };

        self.rcm_w5.set_context(w5);
        self.rcm_x5.set_context(x5);
        self.rcm_tt.set_context(tt);
        self.rcm_word.set_context(word);
    }

    pub fn update_byte(&mut self, byte: u8) {
        self.rcm_w5.update_byte(byte);
        self.rcm_x5.update_byte(byte);
        self.rcm_tt.update_byte(byte);
        self.rcm_word.update_byte(byte);
    }

    /// Combines the match-continuation forecast with the four run-context
    /// side predictions through this model's own `Blend`; the caller wires
    /// the result into mixer input slot 0.
    pub fn predict(&mut self, bpos: u32, partial: u32, stretch: &Stretch) -> i32 {
        let match_stretch = if self.match_len == 0 {
            0
        } else if partial_matches_expected(partial, bpos, self.expected_byte) {
            let expected_bit = (self.expected_byte >> (7 - bpos)) & 1;
            let confidence = (length_hint(self.match_len) as i32 + 1) * 128;
            if expected_bit == 1 {
                confidence
            } else {
                -confidence
            }
        } else {
            // The live partial byte has already diverged from the matched
            // continuation mid-byte; no opinion until the next byte boundary
            // re-evaluates the match.
            0
        };

        self.blend.set_context(self.match_len.min(63));
        self.blend.set_input(0, match_stretch);
        self.blend.set_input(1, self.rcm_w5.predict(bpos, stretch));
        self.blend.set_input(2, self.rcm_x5.predict(bpos, stretch));
        self.blend.set_input(3, self.rcm_tt.predict(bpos, stretch));
        self.blend.set_input(4, self.rcm_word.predict(bpos, stretch));
        self.blend.set_input(5, 0);
        self.blend.set_input(6, 0);
        self.blend.set_input(7, 0);
        self.blend.predict(stretch)
    }

    pub fn learn(&mut self, y: i32) {
        self.blend.update(y);
    }

    pub fn match_length(&self) -> usize {
        self.match_len
    }
}

/// True while the partial byte seen so far (`partial`, `c0`'s bit-shifted
/// leading-1 format, with `bpos` bits already consumed) agrees with the
/// corresponding prefix of `expected_byte`, the byte the match predicts
/// comes next (§4.9: "the expected byte's bits through `bcount` agree with
/// `c0`").
fn partial_matches_expected(partial: u32, bpos: u32, expected_byte: u8) -> bool {
    if bpos == 0 {
        return true;
    }
    let mask = (1u32 << bpos) - 1;
    let consumed = partial & mask;
    let expected_prefix = (u32::from(expected_byte) >> (8 - bpos)) & mask;
    consumed == expected_prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_matches_expected_checks_consumed_prefix() {
        // Matched byte 0b1010_0000; after 3 consumed bits of a prefix that
        // should read 101, a partial of 0b1_101 (leading marker + 101) agrees.
        assert!(partial_matches_expected(0b1_101, 3, 0b1010_0000));
        // But a partial that diverged (0b1_100) does not.
        assert!(!partial_matches_expected(0b1_100, 3, 0b1010_0000));
        // With no bits consumed yet, any partial trivially agrees.
        assert!(partial_matches_expected(1, 0, 0b1010_0000));
    }

    #[test]
    fn length_hint_is_monotonic_nondecreasing() {
        let mut prev = 0;
        for len in 0..16 {
            let h = length_hint(len);
            assert!(h >= prev);
            prev = h;
        }
    }

    #[test]
    fn repeated_pattern_eventually_finds_a_match() {
        let stretch = Stretch::new();
        let mut mm = MatchModel::new(8);
        let mut history = Vec::new();
        let pattern = b"abcdefgh";
        for rep in 0..4 {
            for &b in pattern {
                history.push(b);
                mm.new_byte(&history, rep as u64, 0, 0, 0, 0);
                mm.update_byte(b);
                let _ = mm.predict(0, 0, &stretch);
                mm.learn(1);
            }
        }
        assert!(mm.match_length() > 0);
    }
}
