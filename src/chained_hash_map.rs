//! ChainedHashMap: fixed bucket array, chained collisions, and a reserved
//! slot for the absent (`None`) key.

use crate::bucket_array::{BucketArray, BUCKET_COUNT};
use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;
use hashbrown::HashSet;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

/// Stable reference to an ordinary-key entry. Generational: a handle to a
/// removed entry never resolves, even if its storage slot is reused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    pub fn key<'a, K, V, S>(&self, map: &'a ChainedHashMap<K, V, S>) -> Option<&'a K> {
        map.slots.get(self.0).map(|e| &e.key)
    }

    pub fn value<'a, K, V, S>(&self, map: &'a ChainedHashMap<K, V, S>) -> Option<&'a V> {
        map.slots.get(self.0).map(|e| &e.value)
    }

    /// Replace the entry's value, returning the previous one. `None` when
    /// the handle is stale; `value` is dropped in that case.
    pub fn set_value<K, V, S>(&self, map: &mut ChainedHashMap<K, V, S>, value: V) -> Option<V> {
        map.set_value(*self, value)
    }
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    DuplicateKey,
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertError::DuplicateKey => f.write_str("key already present in map"),
        }
    }
}

impl std::error::Error for InsertError {}

/// Map from `Option<K>` to `V` over [`BUCKET_COUNT`] chained buckets.
///
/// Ordinary keys (`Some(k)`) live in the bucket chosen by
/// `hash(k) mod BUCKET_COUNT` and are found by a linear equality scan of
/// that bucket's chain. The absent key (`None`) never touches the hash
/// path: its value sits in a dedicated slot outside the bucket array.
pub struct ChainedHashMap<K, V, S = RandomState> {
    hasher: S,
    buckets: BucketArray,
    slots: SlotMap<DefaultKey, Entry<K, V>>, // bucketed entries; len() is the size counter
    absent: Option<V>,
    reentrancy: DebugReentrancy,
}

impl<K, V> ChainedHashMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<K, V, S> Default for ChainedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

/// Iterator over every entry, the absent-key entry first when present.
pub struct Iter<'a, K, V> {
    absent: Option<&'a V>,
    it: slotmap::basic::Iter<'a, DefaultKey, Entry<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Option<&'a K>, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if let Some(v) = self.absent.take() {
            return Some((None, v));
        }
        self.it.next().map(|(_, e)| (Some(&e.key), &e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let extra = usize::from(self.absent.is_some());
        let (lo, hi) = self.it.size_hint();
        (lo + extra, hi.map(|h| h + extra))
    }
}

impl<K, V, S> ChainedHashMap<K, V, S> {
    /// Total entries: bucketed ones plus one if the absent key is set.
    pub fn len(&self) -> usize {
        self.slots.len() + usize::from(self.absent.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Drop every entry and unpopulate every bucket. Outstanding handles
    /// become stale.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.absent = None;
        self.slots.clear();
    }

    /// Order is unspecified.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            absent: self.absent.as_ref(),
            it: self.slots.iter(),
        }
    }

    /// Remove the entry behind `handle`, returning its key and value. Uses
    /// the stored hash, so no user code runs.
    pub fn remove_handle(&mut self, handle: Handle) -> Option<(K, V)> {
        let index = BucketArray::slot_for(self.slots.get(handle.0)?.hash);
        let pos = self.buckets.position(index, |k| k == handle.0)?;
        self.buckets.remove_at(index, pos);
        let entry = self.slots.remove(handle.0)?;
        Some((entry.key, entry.value))
    }

    pub fn set_value(&mut self, handle: Handle, value: V) -> Option<V> {
        self.slots
            .get_mut(handle.0)
            .map(|e| mem::replace(&mut e.value, value))
    }

    /// Linear scan over the absent slot and every bucketed entry.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.absent.as_ref() == Some(value) || self.slots.values().any(|e| e.value == *value)
    }

    /// Snapshot of all values. Later mutation of the map does not affect it.
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.iter().map(|(_, v)| v.clone()).collect()
    }

    /// Snapshot of all `(key, value)` pairs; keys are unique, so the result
    /// has set semantics.
    pub fn entry_set(&self) -> Vec<(Option<K>, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.iter().map(|(k, v)| (k.cloned(), v.clone())).collect()
    }

    /// Entries of bucket `index`, front (most recently inserted) first.
    /// Empty for unpopulated buckets and for `index >= BUCKET_COUNT`.
    pub fn chain(&self, index: usize) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.buckets
            .chain(index)
            .into_iter()
            .flatten()
            .filter_map(move |&k| self.slots.get(k).map(|e| (&e.key, &e.value)))
    }

    pub fn chain_len(&self, index: usize) -> usize {
        self.buckets.chain_len(index)
    }

    /// Number of buckets whose chain has been materialized.
    pub fn populated_buckets(&self) -> usize {
        self.buckets.populated()
    }

    /// Bucketed entries per bucket. Not managed: the bucket count is fixed.
    pub fn load_factor(&self) -> f64 {
        self.slots.len() as f64 / BUCKET_COUNT as f64
    }
}

impl<K, V, S> ChainedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            buckets: BucketArray::new(),
            slots: SlotMap::with_key(),
            absent: None,
            reentrancy: DebugReentrancy::new(),
        }
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Bucket an ordinary key is routed to.
    pub fn slot_index<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
    {
        let _g = self.reentrancy.enter("slot_index");
        BucketArray::slot_for(self.make_hash(q))
    }

    // Callers hold the reentrancy guard: runs `K: Eq`.
    fn scan<Q>(&self, index: usize, q: &Q) -> Option<(usize, DefaultKey)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let slots = &self.slots;
        let pos = self.buckets.position(index, |k| {
            slots.get(k).is_some_and(|e| e.key.borrow() == q)
        })?;
        let slot = self.buckets.chain(index)?[pos];
        Some((pos, slot))
    }

    // Callers hold the reentrancy guard: runs `K: Hash` and `K: Eq`.
    fn locate<Q>(&self, q: &Q) -> Option<(usize, usize, DefaultKey)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let index = BucketArray::slot_for(self.make_hash(q));
        let (pos, slot) = self.scan(index, q)?;
        Some((index, pos, slot))
    }

    /// Handle to the entry for an ordinary key.
    pub fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("find");
        self.locate(q).map(|(_, _, slot)| Handle(slot))
    }

    pub fn get(&self, key: Option<&K>) -> Option<&V> {
        let Some(key) = key else {
            return self.absent.as_ref();
        };
        let _g = self.reentrancy.enter("get");
        let (_, _, slot) = self.locate(key)?;
        self.slots.get(slot).map(|e| &e.value)
    }

    /// Never materializes a chain.
    pub fn contains_key(&self, key: Option<&K>) -> bool {
        let Some(key) = key else {
            return self.absent.is_some();
        };
        let _g = self.reentrancy.enter("contains_key");
        self.locate(key).is_some()
    }

    /// Insert or replace. Returns the previous value for `key`, if any. A
    /// new ordinary key is linked at the front of its bucket's chain.
    pub fn insert(&mut self, key: Option<K>, value: V) -> Option<V> {
        let Some(key) = key else {
            return self.absent.replace(value);
        };
        let _g = self.reentrancy.enter("insert");
        let hash = self.make_hash(&key);
        let index = BucketArray::slot_for(hash);
        match self.scan(index, &key) {
            Some((_, slot)) => self
                .slots
                .get_mut(slot)
                .map(|e| mem::replace(&mut e.value, value)),
            None => {
                let slot = self.slots.insert(Entry { key, value, hash });
                self.buckets.push_front(index, slot);
                None
            }
        }
    }

    /// Insert an ordinary key only if it is not already present.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Handle, InsertError> {
        let _g = self.reentrancy.enter("try_insert");
        let hash = self.make_hash(&key);
        let index = BucketArray::slot_for(hash);
        if self.scan(index, &key).is_some() {
            return Err(InsertError::DuplicateKey);
        }
        let slot = self.slots.insert(Entry { key, value, hash });
        self.buckets.push_front(index, slot);
        Ok(Handle(slot))
    }

    /// Remove `key`, returning its value. The rest of the chain keeps its
    /// order.
    pub fn remove(&mut self, key: Option<&K>) -> Option<V> {
        let Some(key) = key else {
            return self.absent.take();
        };
        let (index, pos, slot) = {
            let _g = self.reentrancy.enter("remove");
            self.locate(key)?
        };
        let unlinked = self.buckets.remove_at(index, pos);
        debug_assert_eq!(unlinked, Some(slot));
        // The removed key drops here, outside the guarded section.
        let entry = self.slots.remove(slot)?;
        debug_assert_eq!(BucketArray::slot_for(entry.hash), index);
        Some(entry.value)
    }

    /// Snapshot of all keys, `None` included when the absent key is set.
    pub fn key_set(&self) -> HashSet<Option<K>>
    where
        K: Clone,
    {
        self.iter().map(|(k, _)| k.cloned()).collect()
    }

    /// `insert` every entry of `other`, the absent key included.
    pub fn insert_all<S2>(&mut self, other: &ChainedHashMap<K, V, S2>)
    where
        K: Clone,
        V: Clone,
    {
        for (k, v) in other {
            self.insert(k.cloned(), v.clone());
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a ChainedHashMap<K, V, S> {
    type Item = (Option<&'a K>, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> Extend<(Option<K>, V)> for ChainedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (Option<K>, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(Option<K>, V)> for ChainedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (Option<K>, V)>>(iter: I) -> Self {
        let mut m = Self::with_hasher(S::default());
        m.extend(iter);
        m
    }
}

impl<K, V, S> fmt::Debug for ChainedHashMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
