//! Memoization table for BDD operator results.
//!
//! Each binary and trinary operator keeps its own `OpCache`, so a repeated
//! application with the same operands is answered without recursing. The
//! table is backed by `hashbrown::HashMap` through the raw-entry API, with
//! hashes supplied by [`MyHash`] (pairing functions over the operand words)
//! rather than a byte-oriented hasher.
//!
//! The cache owns one reference on every operand and result it retains; the
//! manager flushes these references when the cache is cleared. This keeps a
//! cached result valid for the whole lifetime of the entry, at the cost of
//! pinning the memoized nodes in the arena.

use std::cell::Cell;
use std::hash::BuildHasherDefault;

use hashbrown::hash_map::RawEntryMut;
use hashbrown::HashMap;

use crate::utils::{HashableKey, MyHash, MyHasher};

pub struct OpCache<K, V> {
    map: HashMap<HashableKey<K>, V, BuildHasherDefault<MyHasher>>,
    hits: Cell<usize>,
    misses: Cell<usize>,
}

impl<K, V> Default for OpCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> OpCache<K, V> {
    pub fn new() -> Self {
        Self {
            map: HashMap::with_hasher(BuildHasherDefault::default()),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    /// Returns the number of retained results.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of lookups answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits.get()
    }

    /// Number of lookups that missed.
    pub fn misses(&self) -> usize {
        self.misses.get()
    }

    /// Removes and returns all entries. The caller releases the references
    /// held by each entry.
    pub fn drain(&mut self) -> impl Iterator<Item = (K, V)> + '_ {
        self.map.drain().map(|(k, v)| (k.0, v))
    }
}

impl<K, V> OpCache<K, V>
where
    K: MyHash + Eq,
{
    /// Looks up a key in the cache.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        let hash = key.hash();
        match self.map.raw_entry().from_hash(hash, |k| k.0 == *key).map(|(_, v)| v) {
            Some(v) => {
                self.hits.set(self.hits.get() + 1);
                Some(v)
            }
            None => {
                self.misses.set(self.misses.get() + 1);
                None
            }
        }
    }

    /// Inserts a key-value pair, returning the previous value for the key
    /// if there was one.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = key.hash();
        match self.map.raw_entry_mut().from_hash(hash, |k| k.0 == key) {
            RawEntryMut::Occupied(mut entry) => Some(std::mem::replace(entry.get_mut(), value)),
            RawEntryMut::Vacant(entry) => {
                entry.insert_hashed_nocheck(hash, HashableKey(key), value);
                None
            }
        }
    }
}
