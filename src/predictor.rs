//! Top-level orchestration: wires every context model into the mixer and
//! the two refinement stages that follow it (§4.3, §4.20). Grounded on
//! `Predict_t::Predict` in `Moruga.cpp`.
//!
//! Mixer input slots follow the reference's layout: slot 0 carries the
//! match model's blended prediction, slot 8 the sparse match model's, and
//! slots 1-7 the direct order-1..order-5 context maps plus the dynamic
//! Markov model and the text forecaster.

use crate::apm::Apm;
use crate::blend::Blend;
use crate::context_map::{ContextMap, Regime};
use crate::dmc::DynamicMarkovModel;
use crate::hash;
use crate::logistic::Stretch;
use crate::match_model::MatchModel;
use crate::mixer::Mixer;
use crate::sparse_match::SparseMatchModel;
use crate::sse::Sse;
use crate::state::PredictorState;
use crate::txt_model::TxtModel;

const ORDERS: [u32; 5] = [1, 2, 3, 4, 5];

pub struct Predictor {
    state: PredictorState,
    stretch: Stretch,
    history: Vec<u8>,

    orders: Vec<ContextMap>,
    dmc: DynamicMarkovModel,
    match_model: MatchModel,
    sparse_match: SparseMatchModel,
    txt: TxtModel,

    mixer: Mixer,
    /// §4.3's six-APM chain: `a1` refines the mixer output on an 8-bit
    /// context and feeds `a2`/`a3` (also on the mixer output) and, through
    /// `Balance`, `a4`; `a4` in turn feeds `a6` alongside the fail-bucketed
    /// `a2`-context cousin, while `a3`/`a5` round out the four probabilities
    /// that reach the top-level `Blend`. Grounded on `Predict_t`'s
    /// `_a1.._a6` (the `_ax1`/`_ax2` pair is out of scope: they key off the
    /// binary-file detector, which this crate doesn't implement).
    apm1: Apm,
    apm2: Apm,
    apm3: Apm,
    apm4: Apm,
    apm5: Apm,
    apm6: Apm,
    /// Top-level 4-input blend over `a3`/`a4`/`a5`/`a6`'s stretched outputs,
    /// keyed on `(w5 << 1) | (fails != 0)`. Grounded on `Predict_t::_blend`.
    top_blend: Blend<4>,
    sse: Sse,

    apm2_size: usize,
    apm3_size: usize,
    apm4_size: usize,
    apm5_size: usize,
    apm6_size: usize,

    pr: i32,
    /// The 16-bit probability `predict` last returned, kept so `update` can
    /// age `fails`/`failz` against the bit that actually arrived (§4.3
    /// step 1). Starts at "no information" (half of 0xFFFF).
    pr16: u32,
}

/// `Balance(weight, px, py)`: blends `px` towards `py` by `weight/16`.
/// Grounded on the `Balance<T>` template in `Moruga.cpp`.
fn balance(weight: i32, px: i32, py: i32) -> i32 {
    ((16 * px - (16 - weight) * (px - py)) + 8) / 16
}

/// Buckets the `fails` shift-register history into 1..=9, blended with
/// `failcount` into the context `a6` keys on. Transcribed from the
/// reference's packed-nibble constants (`0x3340`/`0xC660`/`0xFC60`), its
/// "simplest of three equivalent forms".
fn calc_cz(fails: u32, failcount: u32) -> u32 {
    let mut cz = if fails & 1 != 0 { 9 } else { 1 };
    cz += (0x3340u32 >> (4 * (3 & (fails >> 5)))) & 0xF;
    cz += (0xC660u32 >> (4 * (3 & (fails >> 3)))) & 0xF;
    cz += (0xFC60u32 >> (4 * (3 & (fails >> 1)))) & 0xF;
    ((failcount + cz) / 2).min(9)
}

impl Predictor {
    pub fn new(mem_bits: u32) -> Predictor {
        let orders = ORDERS
            .iter()
            .map(|_| ContextMap::new(1 << mem_bits, &[7, 7], &[Regime(0), Regime(1)]))
            .collect();

        // MEM(offset) in the reference is `1 << (offset + level)`, and this
        // crate's `mem_bits == level + 10`, so MEM(9)/MEM(12)/MEM(14) become
        // `mem_bits - 1`/`mem_bits + 2`/`mem_bits + 4` bits respectively.
        let a2_bits = mem_bits.saturating_sub(1).max(4);
        let a3_bits = mem_bits + 2;
        let a4_bits = mem_bits + 4;
        let a5_bits = mem_bits + 2;
        let a6_bits = mem_bits.saturating_sub(1).max(4);

        Predictor {
            state: PredictorState::new(),
            stretch: Stretch::new(),
            history: Vec::new(),
            orders,
            dmc: DynamicMarkovModel::new(1 << (mem_bits + 2)),
            match_model: MatchModel::new(mem_bits),
            sparse_match: SparseMatchModel::new(),
            txt: TxtModel::new(),
            mixer: Mixer::new(),
            apm1: Apm::new(256, 0),
            apm2: Apm::new(1 << a2_bits, 0),
            apm3: Apm::new(1 << a3_bits, 0),
            apm4: Apm::new(1 << a4_bits, 0),
            apm5: Apm::new(1 << a5_bits, 0),
            apm6: Apm::new(1 << a6_bits, 0),
            top_blend: Blend::new(1 << 19, 4096),
            sse: Sse::new(256),
            apm2_size: 1 << a2_bits,
            apm3_size: 1 << a3_bits,
            apm4_size: 1 << a4_bits,
            apm5_size: 1 << a5_bits,
            apm6_size: 1 << a6_bits,
            pr: 2048,
            pr16: 0x7FFF,
        }
    }

    /// Sizes the dictionary-index extension masks the text forecaster's
    /// pattern detector uses (`Txt_t::SetDicWords`). A no-op default (every
    /// extension mask zero) until called.
    pub fn set_number_of_words(&mut self, number_of_words: u32) {
        self.txt.set_number_of_words(number_of_words);
    }

    /// Call once per finished byte, before predicting its first bit.
    fn on_new_byte(&mut self) {
        let cx = self.state.cx;
        for (cm, &order) in self.orders.iter_mut().zip(ORDERS.iter()) {
            let mask = (1u64 << (8 * order)) - 1;
            cm.set_context(hash::hash(cx & mask));
        }
        self.dmc.new_byte(self.state.c1 as u8);
        self.match_model.new_byte(
            &self.history,
            cx,
            u64::from(self.state.w5),
            u64::from(self.state.x5),
            u64::from(self.state.tt),
            self.state.word,
        );
        self.sparse_match.new_byte(&self.history, cx ^ self.state.word);
    }

    /// Produces the 16-bit probability that the next bit is 1.
    pub fn predict(&mut self) -> u32 {
        if self.state.bcount == 7 {
            self.on_new_byte();
        }

        let bpos = 7 - self.state.bcount;
        let c0 = self.state.c0;

        self.txt.observe(c0, self.state.cx, self.state.bcount);

        self.mixer.reset_inputs();
        self.mixer.add(self.match_model.predict(bpos, c0, &self.stretch));
        self.mixer.add(self.dmc.predict(c0, self.state.tt, self.state.word, self.state.x5, &self.stretch));
        self.mixer.add(self.txt.predict(&self.stretch));
        for cm in self.orders.iter_mut() {
            self.mixer.add(cm.predict(0, c0, &self.stretch));
        }
        self.mixer.add(self.sparse_match.predict(c0, 0, &self.stretch));

        self.mixer.set_context(self.state.c1 as usize);
        self.mixer.set_dp_shift(self.state.dp_shift);
        let p0 = self.mixer.predict(&self.stretch);

        // `Apm::predict` stretches its probability argument internally, so
        // wherever the reference passes an already-stretched value (e.g.
        // `Stretch(p1)`) as an APM's "prediction", passing the pre-stretch
        // probability (`p1`) here is equivalent.
        let a1_out = self.apm1.predict(p0, (self.state.c1 as usize) & 0xFF, &self.stretch);
        let p1 = balance(7, a1_out, p0).clamp(0, 4095); // weight of 7 per the reference, tuned on enwik9

        let cz = calc_cz(self.state.fails, self.state.failcount);
        let x5 = self.state.x5 as u64;
        let w5 = self.state.w5 as u64;
        let c0_64 = u64::from(c0);
        let c1_64 = u64::from(self.state.c1);

        let a2_ctx = hash::hash2(8 * c0_64, 0x7FF & u64::from(self.state.failz)) as usize & (self.apm2_size - 1);
        let p2 = self.apm2.predict(p0, a2_ctx, &self.stretch);

        let a3_ctx = hash::hash2(32 * c0_64, 0x80_FFFF & x5) as usize & (self.apm3_size - 1);
        let p3 = self.apm3.predict(p0, a3_ctx, &self.stretch);

        let a4_ctx = (hash::hash3(c1_64, 0xFF & (x5 >> 8), 0x80FF & (x5 >> 16)) as usize ^ (2 * c0 as usize))
            & (self.apm4_size - 1);
        let p4 = self.apm4.predict(p1, a4_ctx, &self.stretch);

        let a5_ctx = hash::hash2(c0_64, w5) as usize & (self.apm5_size - 1);
        let p5 = self.apm5.predict(p2, a5_ctx, &self.stretch);

        let a6_ctx = (hash::hash2(u64::from(cz), 0x0080_FF & x5) as usize ^ (4 * c0 as usize)) & (self.apm6_size - 1);
        let p6 = self.apm6.predict(p4, a6_ctx, &self.stretch);

        // A certain text-forecast overrides the four inputs the top blend
        // sees (§4.11): the blend/SSE chain still runs and trains, but the
        // asserted bit is what actually reaches the coder.
        let txt_certain = self.txt.certain();
        let (in0, in1, in2, in3) = match txt_certain {
            Some(bit) => {
                let v = if bit { 2047 } else { -2047 };
                (v, v, v, v)
            }
            None => (
                self.stretch.stretch(p3.clamp(0, 4095)),
                self.stretch.stretch(p4.clamp(0, 4095)),
                self.stretch.stretch(p5.clamp(0, 4095)),
                self.stretch.stretch(p6.clamp(0, 4095)),
            ),
        };

        let blend_ctx = ((self.state.w5 as usize) << 1) | usize::from(self.state.fails & 0xFF != 0);
        self.top_blend.set_context(blend_ctx);
        self.top_blend.set_input(0, in0);
        self.top_blend.set_input(1, in1);
        self.top_blend.set_input(2, in2);
        self.top_blend.set_input(3, in3);
        let pr12 = self.top_blend.predict(&self.stretch);

        let final_pr = self.sse.predict(pr12, (self.state.c1 as usize) & 0xFF);

        let pr16 = match txt_certain {
            Some(bit) => {
                if bit {
                    0xFFFF
                } else {
                    0x0000
                }
            }
            None => {
                self.pr = final_pr.clamp(1, 4095);
                ((self.pr as u32) << 4).clamp(1, 0xFFFF)
            }
        };
        self.pr16 = pr16;
        pr16
    }

    /// Trains every model and advances shared state for observed bit `y`.
    pub fn update(&mut self, y: u8) {
        // §4.3 step 1: age the `fails`/`failz` history against the bit that
        // just arrived, gated at 375/32 and 975/32 of full 16-bit scale.
        if self.state.fails & 0x80 != 0 {
            self.state.failcount = self.state.failcount.saturating_sub(1);
        }
        self.state.fails = self.state.fails.wrapping_shl(1);
        self.state.failz = self.state.failz.wrapping_shl(1);
        let pr16_for_bit = if y != 0 { self.pr16 ^ 0xFFFF } else { self.pr16 };
        if pr16_for_bit >= 375 * 32 {
            self.state.failz = self.state.failz.wrapping_add(1);
            if pr16_for_bit >= 975 * 32 {
                self.state.fails = self.state.fails.wrapping_add(1);
                self.state.failcount = (self.state.failcount + 1).min(8);
            }
        }

        for cm in self.orders.iter_mut() {
            cm.update(7 - self.state.bcount, y);
            cm.learn(0, i32::from(y));
            cm.learn(1, i32::from(y));
        }
        self.dmc.update(y);
        self.match_model.learn(i32::from(y));
        self.sparse_match.learn(i32::from(y), 7 - self.state.bcount);
        self.txt.consume(y);

        self.mixer.update(i32::from(y));
        self.apm1.update(i32::from(y));
        self.apm2.update(i32::from(y));
        self.apm3.update(i32::from(y));
        self.apm4.update(i32::from(y));
        self.apm5.update(i32::from(y));
        self.apm6.update(i32::from(y));
        self.top_blend.update(i32::from(y));
        self.sse.update(i32::from(y));

        let byte_done = self.state.shift_bit(u32::from(y));
        if byte_done {
            let finished_byte = (self.state.c0 & 0xFF) as u8;
            self.state.finish_byte();
            self.history.push(finished_byte);
            self.match_model.update_byte(finished_byte);

            if self.state.bytes_processed == PredictorState::SCALE_UP_MILESTONE_1
                || self.state.bytes_processed == PredictorState::SCALE_UP_MILESTONE_2
            {
                self.mixer.scale_up();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicts_and_updates_over_a_short_stream() {
        let mut p = Predictor::new(10);
        let data = b"the quick brown fox jumps over the lazy dog";
        for &byte in data {
            for bpos in 0..8 {
                let pr16 = p.predict();
                assert!((1..=0xFFFF).contains(&pr16));
                let bit = (byte >> (7 - bpos)) & 1;
                p.update(bit);
            }
        }
        assert_eq!(p.history.len(), data.len());
    }
}
