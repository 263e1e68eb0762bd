#![cfg(test)]

// Property tests for ChainedHashMap kept inside the crate so they can
// inspect bucket placement through crate-private types.

use crate::bucket_array::BucketArray;
use crate::chained_hash_map::{ChainedHashMap, Handle, InsertError};
use crate::BUCKET_COUNT;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::hash::{BuildHasher, Hasher};

// Keys hash to themselves, so a small pool spread over a few multiples of
// BUCKET_COUNT collides heavily.
#[derive(Clone, Default)]
struct IdentityBuildHasher;
struct IdentityHasher(u64);
impl BuildHasher for IdentityBuildHasher {
    type Hasher = IdentityHasher;
    fn build_hasher(&self) -> Self::Hasher {
        IdentityHasher(0)
    }
}
impl Hasher for IdentityHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 << 8) | u64::from(b);
        }
    }
    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }
    fn finish(&self) -> u64 {
        self.0
    }
}

type Sut = ChainedHashMap<u64, i32, IdentityBuildHasher>;

#[derive(Clone, Debug)]
enum Op {
    Insert(Option<u64>, i32),
    TryInsert(u64, i32),
    Remove(Option<u64>),
    Get(Option<u64>),
    ContainsValue(i32),
    SetValue(u64, i32),
    Clear,
    Snapshot,
}

fn arb_key() -> impl Strategy<Value = u64> {
    // Four residues, each with a few colliding keys.
    (0u64..4, 0u64..5).prop_map(|(r, m)| r + m * BUCKET_COUNT as u64)
}

fn arb_op() -> impl Strategy<Value = Op> {
    let opt_key = || proptest::option::weighted(0.85, arb_key());
    let value = -20i32..20;
    prop_oneof![
        6 => (opt_key(), value.clone()).prop_map(|(k, v)| Op::Insert(k, v)),
        2 => (arb_key(), value.clone()).prop_map(|(k, v)| Op::TryInsert(k, v)),
        4 => opt_key().prop_map(Op::Remove),
        3 => opt_key().prop_map(Op::Get),
        2 => value.clone().prop_map(Op::ContainsValue),
        2 => (arb_key(), value).prop_map(|(k, v)| Op::SetValue(k, v)),
        1 => Just(Op::Clear),
        1 => Just(Op::Snapshot),
    ]
}

fn check_structure(sut: &Sut, model: &HashMap<Option<u64>, i32>) -> Result<(), TestCaseError> {
    prop_assert_eq!(sut.len(), model.len());
    prop_assert_eq!(sut.is_empty(), model.is_empty());
    let mut bucketed = 0;
    for index in 0..BUCKET_COUNT {
        let mut seen = BTreeSet::new();
        for (k, v) in sut.chain(index) {
            // Every entry sits in the bucket its hash routes to, once.
            prop_assert_eq!(BucketArray::slot_for(*k), index);
            prop_assert!(seen.insert(*k), "duplicate key {} in chain {}", k, index);
            prop_assert_eq!(model.get(&Some(*k)), Some(v));
            bucketed += 1;
        }
        prop_assert_eq!(sut.chain_len(index), seen.len());
    }
    let absent = usize::from(model.contains_key(&None));
    prop_assert_eq!(bucketed + absent, model.len());
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap
// keyed by Option<u64>.
// Invariants exercised across random operation sequences:
// - insert/remove/get return what the model returns, absent key included.
// - try_insert rejects exactly the keys already present.
// - Handle::set_value replaces the value found through find.
// - len == bucketed entries + absent slot; keys unique across chains.
// - Snapshots equal the model's contents.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(ops in proptest::collection::vec(arb_op(), 1..80)) {
        let mut sut: Sut = ChainedHashMap::with_hasher(IdentityBuildHasher);
        let mut model: HashMap<Option<u64>, i32> = HashMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    prop_assert_eq!(sut.insert(k, v), model.insert(k, v));
                }
                Op::TryInsert(k, v) => {
                    let already = model.contains_key(&Some(k));
                    match sut.try_insert(k, v) {
                        Ok(h) => {
                            prop_assert!(!already, "try_insert must fail on duplicate");
                            prop_assert_eq!(h.value(&sut), Some(&v));
                            model.insert(Some(k), v);
                        }
                        Err(InsertError::DuplicateKey) => {
                            prop_assert!(already, "duplicate error only when key exists");
                        }
                    }
                }
                Op::Remove(k) => {
                    prop_assert_eq!(sut.remove(k.as_ref()), model.remove(&k));
                    prop_assert!(!sut.contains_key(k.as_ref()));
                }
                Op::Get(k) => {
                    prop_assert_eq!(sut.get(k.as_ref()), model.get(&k));
                    prop_assert_eq!(sut.contains_key(k.as_ref()), model.contains_key(&k));
                }
                Op::ContainsValue(v) => {
                    prop_assert_eq!(sut.contains_value(&v), model.values().any(|x| *x == v));
                }
                Op::SetValue(k, v) => {
                    let found: Option<Handle> = sut.find(&k);
                    prop_assert_eq!(found.is_some(), model.contains_key(&Some(k)));
                    if let Some(h) = found {
                        let old = h.set_value(&mut sut, v);
                        prop_assert_eq!(old, model.insert(Some(k), v));
                    }
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                    prop_assert_eq!(sut.populated_buckets(), 0);
                }
                Op::Snapshot => {
                    let keys: BTreeSet<Option<u64>> = sut.key_set().into_iter().collect();
                    let model_keys: BTreeSet<Option<u64>> = model.keys().copied().collect();
                    prop_assert_eq!(keys, model_keys);

                    let mut values = sut.values();
                    let mut model_values: Vec<i32> = model.values().copied().collect();
                    values.sort_unstable();
                    model_values.sort_unstable();
                    prop_assert_eq!(values, model_values);

                    let entries: BTreeSet<(Option<u64>, i32)> =
                        sut.entry_set().into_iter().collect();
                    let model_entries: BTreeSet<(Option<u64>, i32)> =
                        model.iter().map(|(k, v)| (*k, *v)).collect();
                    prop_assert_eq!(entries, model_entries);
                }
            }
            check_structure(&sut, &model)?;
        }
    }
}

// Property: the absent key and ordinary keys never disturb each other.
proptest! {
    #[test]
    fn prop_absent_key_isolation(keys in proptest::collection::vec(arb_key(), 0..40), v in any::<i32>()) {
        let mut sut: Sut = ChainedHashMap::with_hasher(IdentityBuildHasher);
        for (i, k) in keys.iter().enumerate() {
            sut.insert(Some(*k), i as i32);
        }
        let before: BTreeSet<(Option<u64>, i32)> = sut.entry_set().into_iter().collect();
        let populated = sut.populated_buckets();

        sut.insert(None, v);
        prop_assert_eq!(sut.populated_buckets(), populated);
        prop_assert_eq!(sut.remove(None), Some(v));
        let after: BTreeSet<(Option<u64>, i32)> = sut.entry_set().into_iter().collect();
        prop_assert_eq!(&before, &after);

        sut.insert(None, v);
        for k in &keys {
            sut.remove(Some(k));
        }
        prop_assert_eq!(sut.get(None), Some(&v));
        prop_assert_eq!(sut.len(), 1);
    }
}
