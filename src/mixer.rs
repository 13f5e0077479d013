//! Top-level logistic Mixer: combines every model's stretched prediction
//! into one probability, weighted per context (§4.12). Grounded on
//! `Mixer_t` in `Moruga.cpp`.
//!
//! Weight storage is `N_CONTEXTS * N_INPUTS` entries. `spec.md`'s "11,520
//! context rows" is read here as the *total weight count* (1280 context
//! rows times 9 inputs), matching `Mixer_t`'s `wx_` array size in the
//! reference — see `DESIGN.md`.

use log::trace;

use crate::logistic::{squash, Stretch};

pub const N_INPUTS: usize = 9;
pub const N_CONTEXTS: usize = 1280;

pub struct Mixer {
    weights: Vec<i32>,
    inputs: [i32; N_INPUTS],
    n_inputs: usize,
    cx: usize,
    pr: i32,
    dp_shift: i32,
}

impl Mixer {
    /// Reference's `wx_.fill(0xA00)` — weights start at 2560, not 0, so the
    /// mixer has a sane prior before any training happens.
    const INITIAL_WEIGHT: i32 = 0x0A00;

    pub fn new() -> Mixer {
        Mixer {
            weights: vec![Self::INITIAL_WEIGHT; N_CONTEXTS * N_INPUTS],
            inputs: [0; N_INPUTS],
            n_inputs: 0,
            cx: 0,
            pr: 2048,
            dp_shift: 14,
        }
    }

    pub fn set_dp_shift(&mut self, shift: i32) {
        self.dp_shift = shift;
    }

    /// Resets the input slots for a new bit.
    pub fn reset_inputs(&mut self) {
        self.n_inputs = 0;
        self.inputs = [0; N_INPUTS];
    }

    /// Adds one model's stretched prediction to the next slot.
    pub fn add(&mut self, stretched: i32) {
        debug_assert!(self.n_inputs < N_INPUTS);
        self.inputs[self.n_inputs] = stretched;
        self.n_inputs += 1;
    }

    pub fn set_context(&mut self, cx: usize) {
        self.cx = cx % N_CONTEXTS;
    }

    pub fn predict(&mut self, _stretch: &Stretch) -> i32 {
        let row = self.cx * N_INPUTS;
        let mut dot: i64 = 0;
        for i in 0..N_INPUTS {
            dot += i64::from(self.weights[row + i]) * i64::from(self.inputs[i]);
        }
        let d = (dot >> self.dp_shift) as i32;
        self.pr = squash(d.clamp(-2047, 2047));
        self.pr
    }

    /// Trains the row used by the most recent `predict` against observed
    /// bit `y`. Reference's `train`: `w += (((t * err) >> 13) + 1) >> 1`,
    /// a fixed learning-rate shift independent of `dp_shift` (which only
    /// scales `predict`'s output, not the update step).
    pub fn update(&mut self, y: i32) {
        let row = self.cx * N_INPUTS;
        let err = (y << 12) - self.pr;
        for i in 0..N_INPUTS {
            let delta = (((self.inputs[i] * err) >> 13) + 1) >> 1;
            self.weights[row + i] += delta;
        }
    }

    /// Doubles every weight (saturating) and bumps `dp_shift`, matching the
    /// reference's `ScaleUp`: called at fixed byte-count milestones so the
    /// mixer's effective learning rate slows as more context accumulates.
    pub fn scale_up(&mut self) {
        trace!("mixer ScaleUp: dp_shift {} -> {}", self.dp_shift, self.dp_shift + 1);
        for w in self.weights.iter_mut() {
            *w = w.saturating_mul(2);
        }
        self.dp_shift += 1;
    }
}

impl Default for Mixer {
    fn default() -> Mixer {
        Mixer::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_up_doubles_weights_and_grows_shift() {
        let mut m = Mixer::new();
        m.weights[0] = 100;
        let shift_before = m.dp_shift;
        m.scale_up();
        assert_eq!(m.weights[0], 200);
        assert_eq!(m.dp_shift, shift_before + 1);
    }

    #[test]
    fn predict_is_bounded_probability() {
        let stretch = Stretch::new();
        let mut m = Mixer::new();
        m.reset_inputs();
        for _ in 0..N_INPUTS {
            m.add(2047);
        }
        let p = m.predict(&stretch);
        assert!((0..=4095).contains(&p));
    }
}
