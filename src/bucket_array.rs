//! BucketArray: the fixed table of collision chains.
//!
//! Each bucket is either unpopulated (`None`) or a chain of slot keys
//! pointing into the map's entry storage. Chains are materialized on the
//! first insert that lands in them and are only dropped by `clear`; an
//! empty chain and an unpopulated bucket are observably the same.

use slotmap::DefaultKey;
use std::collections::VecDeque;

/// Number of buckets in every map. Prime, to spread integer-derived hash
/// codes; never changes for the lifetime of a map.
pub const BUCKET_COUNT: usize = 107;

pub(crate) type Chain = VecDeque<DefaultKey>;

#[derive(Debug)]
pub(crate) struct BucketArray {
    buckets: Box<[Option<Chain>]>,
}

impl BucketArray {
    pub fn new() -> Self {
        Self {
            buckets: (0..BUCKET_COUNT).map(|_| None).collect(),
        }
    }

    /// Slot rule: `hash mod BUCKET_COUNT`. `u64` hashes are never negative.
    #[inline]
    pub fn slot_for(hash: u64) -> usize {
        (hash % BUCKET_COUNT as u64) as usize
    }

    /// The chain at `index`, or `None` when it was never materialized or
    /// `index` is out of range.
    pub fn chain(&self, index: usize) -> Option<&Chain> {
        self.buckets.get(index)?.as_ref()
    }

    pub fn chain_len(&self, index: usize) -> usize {
        self.chain(index).map_or(0, VecDeque::len)
    }

    /// Position of the first slot in the chain at `index` satisfying `pred`.
    pub fn position<F>(&self, index: usize, mut pred: F) -> Option<usize>
    where
        F: FnMut(DefaultKey) -> bool,
    {
        self.chain(index)?.iter().position(|&k| pred(k))
    }

    /// Link `slot` at the front of the chain at `index`, materializing it.
    pub fn push_front(&mut self, index: usize, slot: DefaultKey) {
        self.buckets[index]
            .get_or_insert_with(VecDeque::new)
            .push_front(slot);
    }

    /// Unlink the slot at `pos`; the relative order of the rest is kept.
    pub fn remove_at(&mut self, index: usize, pos: usize) -> Option<DefaultKey> {
        self.buckets.get_mut(index)?.as_mut()?.remove(pos)
    }

    pub fn populated(&self) -> usize {
        self.buckets.iter().filter(|b| b.is_some()).count()
    }

    /// Reset every bucket to unpopulated.
    pub fn clear(&mut self) {
        for bucket in self.buckets.iter_mut() {
            *bucket = None;
        }
    }
}
