//! Checksum-tagged hash table family backing the context models (§4.7).
//! Grounded on `HashTable_t` in `Moruga.cpp`: slots are found by a hash of
//! the context, tagged with an 8-bit checksum of the same hash to detect
//! collisions, and evicted by lowest first-state-byte ("count") when full.

/// One slot: a 1-byte checksum plus a fixed-size state vector.
#[derive(Clone, Copy)]
struct Slot<const W: usize> {
    checksum: u8,
    states: [u8; W],
}

impl<const W: usize> Slot<W> {
    const EMPTY: Slot<W> = Slot {
        checksum: 0,
        states: [0; W],
    };
}

/// A checksum-tagged hash table with `WAYS`-way associativity and `W`-byte
/// state vectors per slot. `get1x`/`get3a`/`get3b` in the original are the
/// `WAYS=1`/`W=3` and `WAYS=4`/`W=3` instantiations of this single design.
pub struct HashTable<const WAYS: usize, const W: usize> {
    slots: Vec<Slot<W>>,
    mask: usize,
}

impl<const WAYS: usize, const W: usize> HashTable<WAYS, W> {
    /// `bits` is the log2 of the number of `WAYS`-way buckets.
    pub fn new(bits: u32) -> HashTable<WAYS, W> {
        let buckets = 1usize << bits;
        HashTable {
            slots: vec![Slot::EMPTY; buckets * WAYS],
            mask: buckets - 1,
        }
    }

    /// Finds (or evicts into) the slot for hashed context `h`, returning a
    /// mutable view of its state vector. `h` must already include the
    /// checksum bits in its low byte the way `Hash`/`Finalise64` produce.
    pub fn find(&mut self, h: u64) -> &mut [u8; W] {
        let checksum = (h & 0xFF) as u8;
        let bucket = ((h >> 8) as usize) & self.mask;
        let base = bucket * WAYS;

        if let Some(i) = (0..WAYS).find(|&i| self.slots[base + i].checksum == checksum) {
            return &mut self.slots[base + i].states;
        }

        // Evict the way whose first state byte (bit-history "count" proxy)
        // is lowest; ties keep the lowest index.
        let victim = (0..WAYS)
            .min_by_key(|&i| self.slots[base + i].states[0])
            .unwrap_or(0);
        self.slots[base + victim] = Slot {
            checksum,
            states: [0; W],
        };
        &mut self.slots[base + victim].states
    }
}

/// 1-way associative, 3-byte state vector.
pub type HashTable1x = HashTable<1, 3>;
/// 4-way associative, 3-byte state vector, smaller effective checksum load.
pub type HashTable3a = HashTable<4, 3>;
/// 4-way associative, 3-byte state vector, used by the second context-map
/// tier (kept distinct from `HashTable3a` so callers can size them apart).
pub type HashTable3b = HashTable<4, 3>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_hash_returns_same_slot() {
        let mut t: HashTable1x = HashTable::new(4);
        t.find(0x1234)[0] = 7;
        assert_eq!(t.find(0x1234)[0], 7);
    }

    #[test]
    fn distinct_checksums_in_same_bucket_evict_lowest_count() {
        let mut t: HashTable3a = HashTable::new(2);
        let bucket = 0u64;
        t.find(bucket | 0x01)[0] = 5;
        t.find(bucket | 0x02)[0] = 1;
        t.find(bucket | 0x03)[0] = 9;
        t.find(bucket | 0x04)[0] = 3;
        // All four ways now occupied; a fifth distinct checksum must evict
        // the way holding count 1 (checksum 0x02).
        t.find(bucket | 0x05)[0] = 2;
        assert_eq!(t.find(bucket | 0x01)[0], 5);
        assert_eq!(t.find(bucket | 0x03)[0], 9);
        assert_eq!(t.find(bucket | 0x04)[0], 3);
        assert_eq!(t.find(bucket | 0x05)[0], 2);
    }
}
