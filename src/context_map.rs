//! ContextMap: per-context bit-history state array feeding 2-3 StateMaps
//! (§4.8). Grounded on `ContextMap_t` in `Moruga.cpp`.
//!
//! Each context owns one 256-entry row per tier (one slot per possible
//! `c0` partial-byte value). `update` advances the slot for the partial
//! byte just completed through a bit-history table; `predict` reads that
//! same slot through the tier's StateMap.

use crate::logistic::Stretch;
use crate::statemap::StateMap;
use crate::tables::{STATE_TABLE_Y0, STATE_TABLE_Y1};

/// Which of the six bit-history regimes (`Moruga.cpp`'s six parallel state
/// tables) a given StateMap tier advances through.
#[derive(Clone, Copy)]
pub struct Regime(pub usize);

pub struct ContextMap {
    size: usize,
    /// One flat array per tier, each `size * 256` bytes.
    states: Vec<Vec<u8>>,
    state_maps: Vec<StateMap>,
    regimes: Vec<Regime>,
    row: usize,
}

impl ContextMap {
    /// `size` rows of 256 state bytes each per tier; one StateMap (and
    /// advancing regime) per entry in `rates`/`regimes`.
    pub fn new(size: usize, rates: &[u32], regimes: &[Regime]) -> ContextMap {
        assert_eq!(rates.len(), regimes.len());
        assert!((2..=3).contains(&rates.len()), "ContextMap supports 2 or 3 tiers");
        ContextMap {
            size,
            states: rates.iter().map(|_| vec![0u8; size * 256]).collect(),
            state_maps: rates.iter().map(|&r| StateMap::new(size * 256, r)).collect(),
            regimes: regimes.to_vec(),
            row: 0,
        }
    }

    /// Selects the row for a newly-hashed context, truncating `h` to the
    /// table's address space.
    pub fn set_context(&mut self, h: u64) {
        self.row = (h as usize % self.size) * 256;
    }

    /// Advances every tier's state byte for partial-byte value `c0` in the
    /// row selected by `set_context`, given the bit `y` just observed at
    /// that partial-byte value. Call once per bit, before `predict`.
    pub fn update(&mut self, c0: u32, y: u8) {
        let slot = self.row + c0 as usize;
        let table = if y == 0 { &STATE_TABLE_Y0 } else { &STATE_TABLE_Y1 };
        for (tier, regime) in self.regimes.iter().enumerate() {
            self.states[tier][slot] = table[regime.0][self.states[tier][slot] as usize];
        }
    }

    /// Reads the current partial-byte slot for tier `i` through its
    /// StateMap, returning a stretched 12-bit prediction.
    pub fn predict(&mut self, i: usize, c0: u32, stretch: &Stretch) -> i32 {
        let cx = self.row + c0 as usize;
        self.state_maps[i].predict(cx, stretch)
    }

    /// Trains tier `i`'s StateMap toward the observed bit.
    pub fn learn(&mut self, i: usize, y: i32) {
        self.state_maps[i].update(y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_context_wraps_into_table_bounds() {
        let mut cm = ContextMap::new(4, &[7, 7], &[Regime(0), Regime(1)]);
        cm.set_context(0xFFFF_FFFF);
        assert!(cm.row < 4 * 256);
    }

    #[test]
    fn update_and_predict_share_the_same_slot() {
        let stretch = Stretch::new();
        let mut cm = ContextMap::new(4, &[7, 7], &[Regime(0), Regime(1)]);
        cm.set_context(3);
        cm.update(5, 1);
        let before = cm.states[0][cm.row + 5];
        assert_ne!(before, 0);
        let _ = cm.predict(0, 5, &stretch);
    }
}
