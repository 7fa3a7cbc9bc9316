//! Concurrent conversion table and negative cache.
//!
//! Both structures are backed by [`DashMap`], so readers never contend on a
//! global lock and writers only lock one shard for the duration of an
//! insert. Neither type ever invokes a converter while holding a shard
//! guard.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use conduit_core::{ConverterRef, TypeDescriptor, TypeKey};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};

struct TableEntry {
    converter: ConverterRef,
    /// Registration sequence; keeps table scans deterministic.
    seq: u64,
}

/// Result of [`ConversionTable::put`].
pub enum PutOutcome {
    /// The key had no converter.
    Inserted,
    /// A different converter was replaced; the previous one is returned.
    Replaced(ConverterRef),
    /// The very same converter was already registered.
    Unchanged,
}

/// Mapping from [`TypeKey`] to conversion function.
pub struct ConversionTable {
    entries: DashMap<TypeKey, TableEntry>,
    next_seq: AtomicU64,
}

impl ConversionTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Inserts or replaces the converter for `key`.
    ///
    /// A replaced entry keeps its original registration position.
    pub fn put(&self, key: TypeKey, converter: ConverterRef) -> PutOutcome {
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if Arc::ptr_eq(&occupied.get().converter, &converter) {
                    PutOutcome::Unchanged
                } else {
                    let previous = std::mem::replace(&mut occupied.get_mut().converter, converter);
                    PutOutcome::Replaced(previous)
                }
            }
            Entry::Vacant(vacant) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                vacant.insert(TableEntry { converter, seq });
                PutOutcome::Inserted
            }
        }
    }

    /// Inserts only if `key` has no converter. Returns `true` if inserted.
    pub fn put_if_absent(&self, key: TypeKey, converter: ConverterRef) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                vacant.insert(TableEntry { converter, seq });
                true
            }
        }
    }

    /// Direct O(1) lookup.
    #[must_use]
    pub fn get(&self, target: &TypeDescriptor, source: &TypeDescriptor) -> Option<ConverterRef> {
        self.get_key(&TypeKey::new(target.clone(), source.clone()))
    }

    #[must_use]
    pub fn get_key(&self, key: &TypeKey) -> Option<ConverterRef> {
        self.entries.get(key).map(|entry| entry.converter.clone())
    }

    /// Removes the converter for `key`. Returns `true` if one existed.
    pub fn remove(&self, key: &TypeKey) -> bool {
        self.entries.remove(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes the entry for `key` only if it still holds `converter`.
    pub fn remove_if_same(&self, key: &TypeKey, converter: &ConverterRef) -> bool {
        self.entries
            .remove_if(key, |_, entry| Arc::ptr_eq(&entry.converter, converter))
            .is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// All distinct source types currently registered.
    #[must_use]
    pub fn snapshot_source_types(&self) -> HashSet<TypeDescriptor> {
        self.entries
            .iter()
            .filter_map(|entry| entry.key().source().cloned())
            .collect()
    }

    /// Registered keys and converters in registration order.
    #[must_use]
    pub fn entries(&self) -> Vec<(TypeKey, ConverterRef)> {
        let mut keyed: Vec<(u64, TypeKey, ConverterRef)> = self
            .entries
            .iter()
            .map(|entry| (entry.seq, entry.key().clone(), entry.converter.clone()))
            .collect();
        keyed.sort_by_key(|(seq, _, _)| *seq);
        keyed
            .into_iter()
            .map(|(_, key, converter)| (key, converter))
            .collect()
    }

    /// `(source, target)` pairs in registration order.
    #[must_use]
    pub fn mappings(&self) -> Vec<(Option<TypeDescriptor>, TypeDescriptor)> {
        self.entries()
            .into_iter()
            .map(|(key, _)| (key.source().cloned(), key.target().clone()))
            .collect()
    }

    /// Converter of the earliest-registered key matching `predicate`.
    ///
    /// Visits every shard; `predicate` runs under a shard read guard and
    /// must not touch the table.
    pub fn find_first(&self, predicate: impl Fn(&TypeKey) -> bool) -> Option<ConverterRef> {
        let mut best: Option<(u64, ConverterRef)> = None;
        for entry in &self.entries {
            if !predicate(entry.key()) {
                continue;
            }
            let earlier = best.as_ref().map_or(true, |(seq, _)| entry.seq < *seq);
            if earlier {
                best = Some((entry.seq, entry.converter.clone()));
            }
        }
        best.map(|(_, converter)| converter)
    }
}

impl Default for ConversionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Set of type pairs known to have no conversion.
///
/// Cleared only together with the table.
pub struct MissCache {
    misses: DashSet<TypeKey>,
}

impl MissCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            misses: DashSet::new(),
        }
    }

    /// Records a miss. Returns `true` if it was not already recorded.
    pub fn insert(&self, key: TypeKey) -> bool {
        self.misses.insert(key)
    }

    #[must_use]
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.misses.contains(key)
    }

    pub fn remove(&self, key: &TypeKey) -> bool {
        self.misses.remove(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.misses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.misses.is_empty()
    }

    pub fn clear(&self) {
        self.misses.clear();
    }
}

impl Default for MissCache {
    fn default() -> Self {
        Self::new()
    }
}
