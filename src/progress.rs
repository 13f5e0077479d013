//! Progress counters: bytes consumed from the plaintext side and bytes
//! emitted to the compressed side, readable from another thread while the
//! encode/decode loop runs (§5: "An external progress thread may read
//! monitoring counters... but must not touch model state"). Grounded on
//! the teacher's `progress.rs` (`Progress::new`/`update` shape), adapted
//! from its single-threaded, file-polling counters to `AtomicU64` fields
//! since this crate's progress reader is explicitly a second thread rather
//! than the same loop that owns the counts.

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared, lock-free byte counters for one encode or decode run.
#[derive(Default)]
pub struct Progress {
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
}

impl Progress {
    pub fn new() -> Progress {
        Progress {
            bytes_in: AtomicU64::new(0),
            bytes_out: AtomicU64::new(0),
        }
    }

    /// Bytes read from the plaintext side so far.
    pub fn bytes_in(&self) -> u64 {
        self.bytes_in.load(Ordering::Relaxed)
    }

    /// Bytes written to the compressed side so far.
    pub fn bytes_out(&self) -> u64 {
        self.bytes_out.load(Ordering::Relaxed)
    }

    pub(crate) fn add_in(&self, n: u64) {
        self.bytes_in.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_out(&self, n: u64) {
        self.bytes_out.fetch_add(n, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_accumulate() {
        let p = Progress::new();
        assert_eq!(p.bytes_in(), 0);
        assert_eq!(p.bytes_out(), 0);
        p.add_in(10);
        p.add_out(3);
        p.add_in(5);
        assert_eq!(p.bytes_in(), 15);
        assert_eq!(p.bytes_out(), 3);
    }
}
