//! NodeTable: structural layer. An append-only, index-stable arena that
//! deduplicates hashable values behind dense `u32` ids.
//!
//! Each occupied slot stores the value together with its precomputed `u64`
//! hash; every probe and every index rebuild uses the stored hash, so
//! `K: Hash` runs exactly once per value, at intern time. Compaction is
//! split into a pure planning step and an infallible apply step so callers
//! can validate the plan against dependent structures before committing.

use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::HashTable;
use std::collections::hash_map::RandomState;

/// Dense index of an interned value.
///
/// Ids are assigned in intern order and stay stable across `vacate`; only
/// `apply_compact` renumbers them, at which point every previously observed
/// id is invalid.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_index(i: usize) -> Self {
        NodeId(i as u32)
    }
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Debug for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Raw index form, used by the informal map repr.
        write!(f, "{}", self.0)
    }
}

/// Old-to-new id mapping produced by [`NodeTable::plan_compact`]. `None`
/// marks a slot dropped by the plan.
#[derive(Debug)]
pub(crate) struct Remap {
    forward: Vec<Option<u32>>,
    kept: usize,
}

impl Remap {
    pub(crate) fn get(&self, id: NodeId) -> Option<NodeId> {
        self.forward.get(id.index()).copied().flatten().map(NodeId)
    }
    /// Number of slots surviving the plan.
    pub(crate) fn kept(&self) -> usize {
        self.kept
    }
}

enum Slot<K> {
    Occupied { value: K, hash: u64 },
    Vacant,
}

impl<K> Slot<K> {
    fn value(&self) -> Option<&K> {
        match self {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Vacant => None,
        }
    }
}

pub(crate) struct NodeTable<K, S = RandomState> {
    hasher: S,
    slots: Vec<Slot<K>>,
    index: HashTable<u32>,
    occupied: usize,
}

impl<K, S> NodeTable<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub(crate) fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            slots: Vec::new(),
            index: HashTable::new(),
            occupied: 0,
        }
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.occupied
    }
    pub(crate) fn is_empty(&self) -> bool {
        self.occupied == 0
    }
    /// Total slot count, vacant tombstones included.
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Deduplicating insert-or-lookup. Returns the existing id when an
    /// equal value is already interned, else appends a fresh slot.
    pub(crate) fn intern(&mut self, value: K) -> NodeId {
        let hash = self.make_hash(&value);
        let slots = &self.slots;
        match self.index.entry(
            hash,
            |&i| slots[i as usize].value().map(|v| *v == value).unwrap_or(false),
            |&i| match &slots[i as usize] {
                Slot::Occupied { hash, .. } => *hash,
                Slot::Vacant => 0,
            },
        ) {
            hashbrown::hash_table::Entry::Occupied(e) => NodeId(*e.get()),
            hashbrown::hash_table::Entry::Vacant(e) => {
                let i = self.slots.len() as u32;
                let _ = e.insert(i);
                self.slots.push(Slot::Occupied { value, hash });
                self.occupied += 1;
                NodeId(i)
            }
        }
    }

    /// Borrowed-form probe; never interns.
    pub(crate) fn lookup<Q>(&self, q: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        self.index
            .find(hash, |&i| {
                self.slots[i as usize]
                    .value()
                    .map(|v| v.borrow() == q)
                    .unwrap_or(false)
            })
            .map(|&i| NodeId(i))
    }

    pub(crate) fn resolve(&self, id: NodeId) -> Option<&K> {
        self.slots.get(id.index()).and_then(Slot::value)
    }

    /// Tombstones a slot. O(1); no other id moves. The id is never reused
    /// for a different value until a compaction runs.
    pub(crate) fn vacate(&mut self, id: NodeId) -> Option<K> {
        let slot = self.slots.get_mut(id.index())?;
        let taken = core::mem::replace(slot, Slot::Vacant);
        match taken {
            Slot::Occupied { value, hash } => {
                if let Ok(entry) = self.index.find_entry(hash, |&i| i == id.0) {
                    entry.remove();
                }
                self.occupied -= 1;
                Some(value)
            }
            Slot::Vacant => None,
        }
    }

    /// Pure planning half of compaction: renumber, densely and in table
    /// order, every occupied slot the predicate keeps. Vacant slots are
    /// always dropped. Does not mutate the table.
    pub(crate) fn plan_compact<F>(&self, mut keep: F) -> Remap
    where
        F: FnMut(NodeId) -> bool,
    {
        let mut forward = Vec::with_capacity(self.slots.len());
        let mut next = 0u32;
        for (i, slot) in self.slots.iter().enumerate() {
            let kept = matches!(slot, Slot::Occupied { .. }) && keep(NodeId(i as u32));
            if kept {
                forward.push(Some(next));
                next += 1;
            } else {
                forward.push(None);
            }
        }
        Remap {
            forward,
            kept: next as usize,
        }
    }

    /// Commit half of compaction: drop every slot the plan rejected and
    /// rebuild the hash index from stored hashes. Runs no user code.
    pub(crate) fn apply_compact(&mut self, remap: &Remap) {
        let old = core::mem::take(&mut self.slots);
        let mut slots: Vec<Slot<K>> = Vec::with_capacity(remap.kept());
        let mut index = HashTable::with_capacity(remap.kept());
        for (i, slot) in old.into_iter().enumerate() {
            let Some(new_id) = remap.get(NodeId(i as u32)) else {
                continue;
            };
            // Plans only keep occupied slots.
            debug_assert!(matches!(slot, Slot::Occupied { .. }));
            debug_assert_eq!(new_id.index(), slots.len());
            let pos = slots.len() as u32;
            let hash = match &slot {
                Slot::Occupied { hash, .. } => *hash,
                Slot::Vacant => continue,
            };
            slots.push(slot);
            index.insert_unique(hash, pos, |&j| match &slots[j as usize] {
                Slot::Occupied { hash, .. } => *hash,
                Slot::Vacant => 0,
            });
        }
        self.occupied = slots.len();
        self.slots = slots;
        self.index = index;
    }

    pub(crate) fn iter(&self) -> Iter<'_, K> {
        Iter {
            it: self.slots.iter().enumerate(),
        }
    }
}

impl<K, S> NodeTable<K, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    pub(crate) fn new() -> Self {
        Self::with_hasher(S::default())
    }
}

/// Iterator over occupied slots in id order.
pub(crate) struct Iter<'a, K> {
    it: core::iter::Enumerate<core::slice::Iter<'a, Slot<K>>>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = (NodeId, &'a K);
    fn next(&mut self) -> Option<Self::Item> {
        for (i, slot) in self.it.by_ref() {
            if let Some(value) = slot.value() {
                return Some((NodeId::from_index(i), value));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Table = NodeTable<String>;

    /// Invariant: interning an equal value twice yields the same id and
    /// does not grow the table.
    #[test]
    fn intern_deduplicates() {
        let mut t = Table::new();
        let a = t.intern("a".to_string());
        let b = t.intern("b".to_string());
        let a2 = t.intern("a".to_string());
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(t.len(), 2);
    }

    /// Invariant: borrowed lookup works (store `String`, query `&str`).
    #[test]
    fn borrowed_lookup_with_str() {
        let mut t = Table::new();
        let a = t.intern("hello".to_string());
        assert_eq!(t.lookup("hello"), Some(a));
        assert_eq!(t.lookup("world"), None);
    }

    /// Invariant: vacating tombstones exactly one slot; ids of all other
    /// slots are untouched and resolvable.
    #[test]
    fn vacate_keeps_other_indices_stable() {
        let mut t = Table::new();
        let a = t.intern("a".to_string());
        let b = t.intern("b".to_string());
        let c = t.intern("c".to_string());
        assert_eq!(t.vacate(b).as_deref(), Some("b"));
        assert_eq!(t.lookup("b"), None);
        assert_eq!(t.resolve(b), None);
        assert_eq!(t.resolve(a).map(String::as_str), Some("a"));
        assert_eq!(t.resolve(c).map(String::as_str), Some("c"));
        assert_eq!(t.len(), 2);
        assert_eq!(t.slot_count(), 3);
        // Double-vacate is a no-op.
        assert_eq!(t.vacate(b), None);
        assert_eq!(t.len(), 2);
    }

    /// Invariant: re-interning a vacated value appends a fresh slot; the
    /// old id is not reused before compaction.
    #[test]
    fn reintern_after_vacate_appends() {
        let mut t = Table::new();
        let a = t.intern("a".to_string());
        t.vacate(a);
        let a2 = t.intern("a".to_string());
        assert_ne!(a, a2);
        assert_eq!(a2.index(), 1);
        assert_eq!(t.resolve(a), None);
        assert_eq!(t.resolve(a2).map(String::as_str), Some("a"));
    }

    /// Invariant: compaction drops vacant and rejected slots, renumbers the
    /// rest densely in table order, and lookups keep working afterwards.
    #[test]
    fn compact_renumbers_densely() {
        let mut t = Table::new();
        let a = t.intern("a".to_string());
        let b = t.intern("b".to_string());
        let c = t.intern("c".to_string());
        let d = t.intern("d".to_string());
        t.vacate(b);

        let remap = t.plan_compact(|id| id != d);
        assert_eq!(remap.kept(), 2);
        assert_eq!(remap.get(a), Some(NodeId::from_index(0)));
        assert_eq!(remap.get(b), None);
        assert_eq!(remap.get(c), Some(NodeId::from_index(1)));
        assert_eq!(remap.get(d), None);

        t.apply_compact(&remap);
        assert_eq!(t.len(), 2);
        assert_eq!(t.slot_count(), 2);
        assert_eq!(t.lookup("a"), Some(NodeId::from_index(0)));
        assert_eq!(t.lookup("c"), Some(NodeId::from_index(1)));
        assert_eq!(t.lookup("b"), None);
        assert_eq!(t.lookup("d"), None);
    }

    /// Invariant: `iter` yields occupied slots only, in id order.
    #[test]
    fn iter_skips_tombstones() {
        let mut t = Table::new();
        t.intern("a".to_string());
        let b = t.intern("b".to_string());
        t.intern("c".to_string());
        t.vacate(b);
        let seen: Vec<&str> = t.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(seen, ["a", "c"]);
    }
}
