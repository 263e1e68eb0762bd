//! chained-hashmap: a single-threaded map built directly on a fixed array
//! of collision chains, with a reserved slot for the absent key.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a Map with inspectable bucket mechanics rather than a wrapper
//!   around `std::collections::HashMap`.
//! - Layers:
//!   - BucketArray: `BUCKET_COUNT` (107) lazily materialized chains of
//!     slot keys. Knows nothing about keys or values.
//!   - ChainedHashMap<K, V, S>: owns the entries in a generational
//!     `SlotMap`, routes ordinary keys through the bucket array and keeps
//!     the absent key (`None`) in a dedicated slot.
//!
//! Slot rule
//! - `slot_index(k) = hash(k) mod BUCKET_COUNT`, with `hash` from the
//!   map's `BuildHasher`. Equal keys must hash equal; a key type that
//!   breaks this gets silently wrong lookups, not an error.
//! - Within a bucket the chain is scanned linearly by `K: Eq`; hash
//!   collisions are resolved by equality alone.
//! - New keys are linked at the front of their chain. This ordering is an
//!   implementation detail, visible only through `chain`.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` through the reentrancy tracker.
//! - No resizing: the bucket count is fixed, so chain length grows with
//!   load. `load_factor` reports it; nothing acts on it.
//! - Each entry stores its `u64` hash; `K: Hash` runs once per keyed
//!   operation and never during scans or `clear`.
//! - Lookups never materialize a chain.
//!
//! Snapshots
//! - `key_set`, `values` and `entry_set` return owned copies. They are
//!   unaffected by later mutation of the map and vice versa. Iteration
//!   order is unspecified.
//!
//! Reentrancy policy
//! - Operations that call `K: Eq`/`K: Hash` run under a debug-only guard;
//!   re-entering the same map from inside those calls panics in debug
//!   builds. Values are never compared or dropped under the guard.

mod bucket_array;
mod chained_hash_map;
mod chained_hash_map_proptest;
pub mod reentrancy;

// Public surface
pub use bucket_array::BUCKET_COUNT;
pub use chained_hash_map::{ChainedHashMap, Handle, InsertError, Iter};
pub use reentrancy::DebugReentrancy;
