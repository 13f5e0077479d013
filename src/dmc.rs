//! Dynamic Markov Model: a self-growing bit-level Markov chain used as one
//! of the two long-range predictors feeding the top mixer (§4.13). Grounded
//! on `DynamicMarkovModel_t` in `Moruga.cpp`.
//!
//! The chain lives in a flat arena so nodes can be addressed by a 28-bit
//! index instead of a pointer. Walking an edge increments its count; once
//! an edge has been walked `THRESHOLD` times and its target is itself well
//! visited, the target is cloned so the two incoming paths diverge into
//! separate statistics (the state-cloning step that lets DMC grow new
//! states on demand instead of fixing its model order up front).

use log::trace;

use crate::blend::Blend;
use crate::context_map::ContextMap;
use crate::logistic::Stretch;
use crate::statemap::StateMap;

const THRESHOLD: u32 = 1576;
const THRESHOLD_SPEED: u32 = 11;
const INIT_COUNT: u16 = 486;

/// Number of root trees (one per starting byte value) and nodes per tree in
/// the forest used to reseed the arena whenever it fills up.
const FOREST_TREES: usize = 256;
const FOREST_NODES_PER_TREE: usize = 255;

#[derive(Clone, Copy)]
struct Node {
    nx0: u32,
    nx1: u32,
    state: u8,
    count0: u16,
    count1: u16,
}

impl Node {
    const EMPTY: Node = Node {
        nx0: 0,
        nx1: 0,
        state: 0,
        count0: 0,
        count1: 0,
    };
}

pub struct DynamicMarkovModel {
    arena: Vec<Node>,
    capacity: usize,
    cur: usize,
    root_of: [usize; 256],
    /// Clone-trigger threshold; creeps up after every successful clone
    /// (via `threshold_fine`) up to a hard cap of `10 * THRESHOLD`, so the
    /// graph doesn't over-fragment on long inputs (§4.8).
    threshold: u32,
    threshold_fine: u32,

    aux_state: StateMap,
    aux_tt: StateMap,
    aux_word: StateMap,
    aux_x5: StateMap,
    cm: ContextMap,
    blend: Blend<8>,
}

impl DynamicMarkovModel {
    pub fn new(capacity: usize) -> DynamicMarkovModel {
        let mut dmc = DynamicMarkovModel {
            arena: Vec::with_capacity(capacity),
            capacity,
            cur: 0,
            root_of: [0; 256],
            threshold: THRESHOLD,
            threshold_fine: THRESHOLD << THRESHOLD_SPEED,
            aux_state: StateMap::new(256, 7),
            aux_tt: StateMap::new(1 << 16, 7),
            aux_word: StateMap::new(1 << 16, 7),
            aux_x5: StateMap::new(1 << 16, 7),
            cm: ContextMap::new(
                1 << 18,
                &[7, 7, 7],
                &[crate::context_map::Regime(0), crate::context_map::Regime(1), crate::context_map::Regime(2)],
            ),
            blend: Blend::new(1, 0),
        };
        dmc.seed_forest();
        dmc
    }

    /// Rebuilds the arena as `FOREST_TREES` independent 8-level binary
    /// trees (one per starting byte, 255 internal nodes each — enough to
    /// discriminate every bit of the following byte), discarding whatever
    /// state had accumulated. Runs at construction and whenever the arena
    /// fills.
    fn seed_forest(&mut self) {
        trace!("DMC arena reset: reseeding {FOREST_TREES} trees of {FOREST_NODES_PER_TREE} nodes");
        self.threshold = THRESHOLD;
        self.threshold_fine = THRESHOLD << THRESHOLD_SPEED;
        self.arena.clear();
        for tree in 0..FOREST_TREES {
            let base = self.arena.len();
            self.root_of[tree] = base;
            for _ in 0..FOREST_NODES_PER_TREE {
                self.arena.push(Node::EMPTY);
            }
            for i in 0..FOREST_NODES_PER_TREE {
                let idx = base + i;
                let c0 = 2 * (i + 1);
                let c1 = 2 * (i + 1) + 1;
                self.arena[idx].nx0 = if c0 < FOREST_NODES_PER_TREE { (base + c0) as u32 } else { self.root_of[0] as u32 };
                self.arena[idx].nx1 = if c1 < FOREST_NODES_PER_TREE { (base + c1) as u32 } else { self.root_of[0] as u32 };
                self.arena[idx].count0 = INIT_COUNT;
                self.arena[idx].count1 = INIT_COUNT;
            }
        }
        self.cur = self.root_of[0];
    }

    /// Call once per finished byte: re-enters the forest at the tree rooted
    /// on the byte just completed.
    pub fn new_byte(&mut self, c1: u8) {
        self.cur = self.root_of[c1 as usize];
    }

    fn edge_counts(&self) -> (u32, u32) {
        let n = &self.arena[self.cur];
        (u32::from(n.count0), u32::from(n.count1))
    }

    /// Primary DMC log-odds prediction for the next bit, from the current
    /// node's observed edge frequencies.
    fn primary_stretch(&self, stretch: &Stretch) -> i32 {
        let (c0, c1) = self.edge_counts();
        let total = (c0 + c1).max(1);
        let p = ((c1 * 4095) / total) as i32;
        stretch.stretch(p.clamp(0, 4095))
    }

    /// Combines the primary prediction with the auxiliary StateMaps and
    /// ContextMap tiers through this model's own `Blend`, keyed on
    /// `state`/`tt`/`word`/`x5` the way the reference folds in side
    /// context before handing one value to the top mixer.
    pub fn predict(
        &mut self,
        c0: u32,
        tt: u32,
        word: u64,
        x5: u32,
        stretch: &Stretch,
    ) -> i32 {
        let state = self.arena[self.cur].state;
        self.blend.set_context(0);
        self.blend.set_input(0, self.primary_stretch(stretch));
        self.blend.set_input(1, self.aux_state.predict(state as usize, stretch));
        self.blend.set_input(2, self.aux_tt.predict((tt as usize) & 0xFFFF, stretch));
        self.blend.set_input(3, self.aux_word.predict((word as usize) & 0xFFFF, stretch));
        self.blend.set_input(4, self.aux_x5.predict((x5 as usize) & 0xFFFF, stretch));
        self.cm.set_context(tt as u64 ^ word);
        for i in 0..3 {
            self.blend.set_input(5 + i, self.cm.predict(i, c0, stretch));
        }
        self.blend.predict(stretch)
    }

    /// Trains every component against the observed bit, walks the edge
    /// taken, and clones the destination node if it has become hot enough
    /// to warrant splitting off a private copy (the step that lets DMC
    /// refine its state graph beyond the seeded forest).
    pub fn update(&mut self, y: u8) {
        self.aux_state.update(i32::from(y));
        self.aux_tt.update(i32::from(y));
        self.aux_word.update(i32::from(y));
        self.aux_x5.update(i32::from(y));
        for i in 0..3 {
            self.cm.learn(i, i32::from(y));
        }
        self.cm.update(0, y);
        self.blend.update(i32::from(y));

        let cur = self.cur;
        let (next, edge_count) = if y == 0 {
            self.arena[cur].count0 = self.arena[cur].count0.saturating_add(1);
            (self.arena[cur].nx0 as usize, u32::from(self.arena[cur].count0))
        } else {
            self.arena[cur].count1 = self.arena[cur].count1.saturating_add(1);
            (self.arena[cur].nx1 as usize, u32::from(self.arena[cur].count1))
        };

        let next_total = u32::from(self.arena[next].count0) + u32::from(self.arena[next].count1);

        if edge_count > self.threshold && next_total > edge_count + self.threshold {
            if self.arena.len() + 1 >= self.capacity {
                self.seed_forest();
                return;
            }
            let cloned_index = self.arena.len() as u32;
            let mut clone = self.arena[next];
            let scale = |count: u16| -> u16 {
                ((u32::from(count) * edge_count) / next_total.max(1)).min(u32::from(u16::MAX)) as u16
            };
            clone.count0 = scale(clone.count0);
            clone.count1 = scale(clone.count1);
            self.arena.push(clone);

            if y == 0 {
                self.arena[cur].nx0 = cloned_index;
            } else {
                self.arena[cur].nx1 = cloned_index;
            }
            self.cur = cloned_index as usize;

            if self.threshold < 10 * THRESHOLD {
                self.threshold_fine += 1;
                self.threshold = self.threshold_fine >> THRESHOLD_SPEED;
            }
        } else {
            self.cur = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_and_update_cycle_without_panicking() {
        let stretch = Stretch::new();
        let mut dmc = DynamicMarkovModel::new(4096);
        for i in 0..2000u32 {
            let bit = (i % 3 == 0) as u8;
            let _ = dmc.predict(1, 0, 0, 0, &stretch);
            dmc.update(bit);
            if i % 8 == 7 {
                dmc.new_byte((i & 0xFF) as u8);
            }
        }
    }

    #[test]
    fn reseeding_on_overflow_keeps_arena_within_capacity() {
        let stretch = Stretch::new();
        let mut dmc = DynamicMarkovModel::new(FOREST_TREES * FOREST_NODES_PER_TREE + 4);
        for i in 0..5000u32 {
            let _ = dmc.predict(1, 0, 0, 0, &stretch);
            dmc.update((i % 2) as u8);
        }
        assert!(dmc.arena.len() <= dmc.capacity);
    }
}
