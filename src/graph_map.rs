//! GraphMap: the public directed mapping composing the node table and the
//! adjacency store.
//!
//! Subscript semantics are redefined for a graph: "key" means a node with
//! at least one outgoing edge, "value" means one with at least one incoming
//! edge, and `insert` accumulates edges instead of replacing. Edge-level
//! removal (`delete`, `delete_link`, `disconnect`) is cheap and leaves the
//! node's slot in place; slot removal (`pop`, `popitem`) forces a full
//! reindex and is O(n).

use crate::adjacency::AdjStore;
use crate::node_table::{NodeId, NodeTable};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::{HashMap, HashSet};
use std::collections::hash_map::RandomState;

/// Errors raised by the graph mappings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// The queried node was never interned, or has no outgoing edge.
    KeyNotFound,
    /// The operation is deliberately refused on this variant; the message
    /// names the supported alternative.
    Unsupported(&'static str),
    /// Compaction found the node table and the edge store out of sync.
    /// Unrecoverable; indicates a bug in this crate, never caller misuse.
    /// The mapping is left on its pre-compaction indices, not half-remapped.
    InvariantViolation,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::KeyNotFound => f.write_str("key not found (no such node, or node has no outgoing edges)"),
            Error::Unsupported(msg) => write!(f, "unsupported operation: {msg}"),
            Error::InvariantViolation => f.write_str("internal invariant violation during compaction"),
        }
    }
}

impl std::error::Error for Error {}

/// Resolved successor set of a key: one target unwrapped, several as a set.
///
/// `Many` always holds at least two targets; a key with a single successor
/// yields `One` of the bare value.
#[derive(Clone, Debug)]
pub enum Fanout<T> {
    One(T),
    Many(HashSet<T>),
}

impl<T: Eq + Hash> Fanout<T> {
    /// Number of targets; never zero.
    pub fn len(&self) -> usize {
        match self {
            Fanout::One(_) => 1,
            Fanout::Many(set) => set.len(),
        }
    }

    pub fn contains(&self, target: &T) -> bool {
        match self {
            Fanout::One(v) => v == target,
            Fanout::Many(set) => set.contains(target),
        }
    }

    /// The bare target, if there is exactly one.
    pub fn as_one(&self) -> Option<&T> {
        match self {
            Fanout::One(v) => Some(v),
            Fanout::Many(_) => None,
        }
    }

    pub fn iter(&self) -> FanoutIter<'_, T> {
        match self {
            Fanout::One(v) => FanoutIter::One(Some(v)),
            Fanout::Many(set) => FanoutIter::Many(set.iter()),
        }
    }

    pub fn into_set(self) -> HashSet<T> {
        match self {
            Fanout::One(v) => core::iter::once(v).collect(),
            Fanout::Many(set) => set,
        }
    }
}

impl<'a, T: Eq + Hash + Clone> Fanout<&'a T> {
    /// Owned copy of a borrowed fanout.
    pub fn cloned(&self) -> Fanout<T> {
        match self {
            Fanout::One(v) => Fanout::One((*v).clone()),
            Fanout::Many(set) => Fanout::Many(set.iter().map(|v| (*v).clone()).collect()),
        }
    }
}

impl<T: Eq + Hash> PartialEq for Fanout<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Fanout::One(a), Fanout::One(b)) => a == b,
            (Fanout::Many(a), Fanout::Many(b)) => a == b,
            _ => false,
        }
    }
}

impl<T: Eq + Hash> Eq for Fanout<T> {}

/// Iterator over the targets of a [`Fanout`].
pub enum FanoutIter<'a, T> {
    One(Option<&'a T>),
    Many(hashbrown::hash_set::Iter<'a, T>),
}

impl<'a, T> Iterator for FanoutIter<'a, T> {
    type Item = &'a T;
    fn next(&mut self) -> Option<Self::Item> {
        match self {
            FanoutIter::One(v) => v.take(),
            FanoutIter::Many(it) => it.next(),
        }
    }
}

/// Directed multi-graph mapping over interned, deduplicated nodes.
///
/// Every distinct value occupies exactly one slot in a shared table, and
/// every connection is a pair of slot indices, so a large value that
/// participates in many relationships is stored once. Single-threaded;
/// views borrow `&self`, so the borrow checker rules out mutation during
/// iteration.
pub struct GraphMap<K, S = RandomState> {
    pub(crate) table: NodeTable<K, S>,
    pub(crate) adj: AdjStore,
}

impl<K> GraphMap<K>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl<K> Default for GraphMap<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> GraphMap<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            table: NodeTable::with_hasher(hasher),
            adj: AdjStore::new(),
        }
    }

    pub(crate) fn intern(&mut self, value: K) -> NodeId {
        let id = self.table.intern(value);
        self.adj.grow_to(self.table.slot_count());
        id
    }

    pub(crate) fn resolve(&self, id: NodeId) -> &K {
        self.table
            .resolve(id)
            .expect("edge endpoint must be an occupied slot")
    }

    fn fanout_of(&self, id: NodeId) -> Option<Fanout<&K>> {
        let out = self.adj.outgoing(id);
        match out.len() {
            0 => None,
            1 => {
                let &target = out.iter().next().expect("length checked");
                Some(Fanout::One(self.resolve(target)))
            }
            _ => Some(Fanout::Many(out.iter().map(|&t| self.resolve(t)).collect())),
        }
    }

    /// Number of interned nodes, connected or not.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.adj.edge_count()
    }

    /// Whether the value is interned at all, connected or not.
    pub fn contains<Q>(&self, node: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.lookup(node).is_some()
    }

    /// Resolved successors of `key`. Interns nothing. Fails with
    /// [`Error::KeyNotFound`] when the value was never interned or has no
    /// outgoing edges.
    pub fn get<Q>(&self, key: &Q) -> Result<Fanout<&K>, Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let id = self.table.lookup(key).ok_or(Error::KeyNotFound)?;
        self.fanout_of(id).ok_or(Error::KeyNotFound)
    }

    /// `get` with an explicit fallback; the supported replacement for
    /// `setdefault`.
    pub fn get_or<'a, Q>(&'a self, key: &Q, default: &'a K) -> Fanout<&'a K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(key).unwrap_or(Fanout::One(default))
    }

    /// Intern both endpoints and add the edge key→value. Accumulates:
    /// prior outgoing edges from `key` are kept, so repeated inserts under
    /// one key build a multi-valued fan-out rather than replacing.
    ///
    /// When both endpoints are new, the value is interned before the key;
    /// the raw-index repr depends on that order.
    pub fn insert(&mut self, key: K, value: K) {
        let v = self.intern(value);
        let k = self.intern(key);
        self.adj.add_edge(k, v);
    }

    /// Intern a lone node with no edges. It joins neither the key set nor
    /// the value set until an edge touches it.
    pub fn insert_node(&mut self, node: K) {
        let _ = self.intern(node);
    }

    /// Add an edge per pair, in argument order.
    pub fn update<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, K)>,
    {
        for (k, v) in pairs {
            self.insert(k, v);
        }
    }

    /// Like [`update`](Self::update), with an iterable of targets per key.
    pub fn update_grouped<I, T>(&mut self, pairs: I)
    where
        K: Clone,
        I: IntoIterator<Item = (K, T)>,
        T: IntoIterator<Item = K>,
    {
        for (k, targets) in pairs {
            for v in targets {
                self.insert(k.clone(), v);
            }
        }
    }

    /// Re-intern every node of `other` (merging equal values into the same
    /// slot) and replay every edge of `other` here. `other` is unmodified.
    pub fn merge<S2>(&mut self, other: &GraphMap<K, S2>)
    where
        K: Clone,
        S2: BuildHasher,
    {
        for (_, node) in other.table.iter() {
            let _ = self.intern(node.clone());
        }
        for (a, b) in other.adj.edges() {
            let ia = self.intern(other.resolve(a).clone());
            let ib = self.intern(other.resolve(b).clone());
            self.adj.add_edge(ia, ib);
        }
    }

    /// Remove every edge touching `key` in either direction. O(degree).
    /// The slot persists (and keeps its index) until a reindex; prefer this
    /// over [`pop`](Self::pop) when the value itself can stay interned.
    /// Returns whether the node was known.
    pub fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.table.lookup(key) {
            Some(id) => {
                self.adj.remove_all_edges_of(id);
                true
            }
            None => false,
        }
    }

    /// Resolve the current `get(key)` result, then drop the slot entirely
    /// and force a reindex. O(n): every surviving index is rewritten.
    /// Discouraged versus [`delete`](Self::delete).
    pub fn pop<Q>(&mut self, key: &Q) -> Result<Fanout<K>, Error>
    where
        K: Borrow<Q> + Clone,
        Q: ?Sized + Hash + Eq,
    {
        let id = self.table.lookup(key).ok_or(Error::KeyNotFound)?;
        let fan = self.fanout_of(id).ok_or(Error::KeyNotFound)?.cloned();
        self.adj.remove_all_edges_of(id);
        self.table.vacate(id);
        self.reindex()?;
        Ok(fan)
    }

    /// Remove and return the most recently interned node that still has
    /// outgoing edges, then force a reindex. "Last" is the highest current
    /// index with out-degree ≥ 1; value-only and disconnected trailing
    /// nodes are skipped. Same cost class as [`pop`](Self::pop), though the
    /// removed slot trends toward the end of the table so fewer surviving
    /// indices move in practice.
    pub fn popitem(&mut self) -> Result<(K, Fanout<K>), Error>
    where
        K: Clone,
    {
        let id = (0..self.table.slot_count())
            .rev()
            .map(NodeId::from_index)
            .find(|&id| self.table.resolve(id).is_some() && self.adj.out_degree(id) > 0)
            .ok_or(Error::KeyNotFound)?;
        let fan = self.fanout_of(id).expect("out-degree checked").cloned();
        self.adj.remove_all_edges_of(id);
        let key = self.table.vacate(id).expect("occupancy checked");
        self.reindex()?;
        Ok((key, fan))
    }

    /// Remove exactly the edge key→value if present; no-op otherwise.
    /// Never removes slots. Returns whether an edge was removed.
    pub fn delete_link<Q1, Q2>(&mut self, key: &Q1, value: &Q2) -> bool
    where
        K: Borrow<Q1> + Borrow<Q2>,
        Q1: ?Sized + Hash + Eq,
        Q2: ?Sized + Hash + Eq,
    {
        match (self.table.lookup(key), self.table.lookup(value)) {
            (Some(k), Some(v)) => self.adj.remove_edge(k, v),
            _ => false,
        }
    }

    /// Remove both a→b and b→a if present. Never removes slots.
    pub fn disconnect<Q1, Q2>(&mut self, a: &Q1, b: &Q2) -> bool
    where
        K: Borrow<Q1> + Borrow<Q2>,
        Q1: ?Sized + Hash + Eq,
        Q2: ?Sized + Hash + Eq,
    {
        let forward = self.delete_link(a, b);
        let backward = self.delete_link(b, a);
        forward || backward
    }

    /// Add a self-edge node→node for each given node, interning as needed.
    pub fn make_loops<I>(&mut self, nodes: I)
    where
        K: Clone,
        I: IntoIterator<Item = K>,
    {
        for node in nodes {
            self.insert(node.clone(), node);
        }
    }

    /// Add a self-edge for every current key (out-degree ≥ 1).
    pub fn make_all_loops(&mut self) {
        let keys: Vec<NodeId> = self
            .table
            .iter()
            .map(|(id, _)| id)
            .filter(|&id| self.adj.out_degree(id) > 0)
            .collect();
        for id in keys {
            self.adj.add_edge(id, id);
        }
    }

    /// Not supported on any variant: the accumulate-on-insert semantics
    /// make an insert-if-absent primitive ambiguous. Always fails with
    /// [`Error::Unsupported`]; use [`get_or`](Self::get_or) instead.
    pub fn setdefault(&mut self, _key: K, _default: K) -> Result<(), Error> {
        Err(Error::Unsupported(
            "setdefault is not supported; use get_or(key, default) instead",
        ))
    }

    /// Drop every fully disconnected, edge-less slot and renumber the rest
    /// densely, rewriting all stored edge indices. O(n + edges). All
    /// previously observed raw indices become invalid.
    ///
    /// Either fully rewrites all indices or, on an internal consistency
    /// violation, fails with [`Error::InvariantViolation`] leaving the old
    /// indices in place; mixed old/new state is impossible.
    pub fn reindex(&mut self) -> Result<(), Error> {
        let plan = self.table.plan_compact(|id| self.adj.degree(id) > 0);
        self.adj
            .remap(&plan)
            .map_err(|_| Error::InvariantViolation)?;
        self.table.apply_compact(&plan);
        Ok(())
    }

    /// Materialize a plain mapping of every key with ≥ 1 outgoing edge to
    /// its resolved fanout. Nodes without outgoing edges are omitted.
    pub fn get_dict(&self) -> HashMap<K, Fanout<K>>
    where
        K: Clone,
    {
        let mut out = HashMap::new();
        for (id, key) in self.table.iter() {
            if let Some(fan) = self.fanout_of(id) {
                out.insert(key.clone(), fan.cloned());
            }
        }
        out
    }

    /// Lazy view over the key set (nodes with ≥ 1 outgoing edge).
    pub fn keys(&self) -> Keys<'_, K> {
        Keys {
            it: self.table.iter(),
            adj: &self.adj,
        }
    }

    /// Lazy view over the value set (nodes with ≥ 1 incoming edge).
    pub fn values(&self) -> Values<'_, K> {
        Values {
            it: self.table.iter(),
            adj: &self.adj,
        }
    }

    /// Lazy view over connected nodes, each paired with its fanout, or
    /// `None` for value-only nodes.
    pub fn items(&self) -> Items<'_, K, S> {
        Items {
            graph: self,
            it: self.table.iter(),
        }
    }
}

impl<K, S> Extend<(K, K)> for GraphMap<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, K)>>(&mut self, pairs: I) {
        self.update(pairs);
    }
}

impl<K, S> FromIterator<(K, K)> for GraphMap<K, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, K)>>(pairs: I) -> Self {
        let mut graph = Self::with_hasher(S::default());
        graph.update(pairs);
        graph
    }
}

impl<K, const N: usize> From<[(K, K); N]> for GraphMap<K>
where
    K: Eq + Hash,
{
    fn from(pairs: [(K, K); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Informal debug repr: each connected node against its raw outgoing index
/// set. Raw indices are an implementation artifact; this form is not stable
/// across a `reindex`.
impl<K, S> fmt::Debug for GraphMap<K, S>
where
    K: Eq + Hash + fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (id, key) in self.table.iter() {
            if self.adj.degree(id) > 0 {
                map.entry(&key, self.adj.outgoing(id));
            }
        }
        map.finish()
    }
}

/// Lazy key-set view; see [`GraphMap::keys`].
pub struct Keys<'a, K> {
    it: crate::node_table::Iter<'a, K>,
    adj: &'a AdjStore,
}

impl<'a, K> Iterator for Keys<'a, K> {
    type Item = &'a K;
    fn next(&mut self) -> Option<Self::Item> {
        for (id, key) in self.it.by_ref() {
            if self.adj.out_degree(id) > 0 {
                return Some(key);
            }
        }
        None
    }
}

/// Lazy value-set view; see [`GraphMap::values`].
pub struct Values<'a, K> {
    it: crate::node_table::Iter<'a, K>,
    adj: &'a AdjStore,
}

impl<'a, K> Iterator for Values<'a, K> {
    type Item = &'a K;
    fn next(&mut self) -> Option<Self::Item> {
        for (id, key) in self.it.by_ref() {
            if self.adj.in_degree(id) > 0 {
                return Some(key);
            }
        }
        None
    }
}

/// Lazy item view; see [`GraphMap::items`].
pub struct Items<'a, K, S = RandomState> {
    graph: &'a GraphMap<K, S>,
    it: crate::node_table::Iter<'a, K>,
}

impl<'a, K, S> Iterator for Items<'a, K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = (&'a K, Option<Fanout<&'a K>>);
    fn next(&mut self) -> Option<Self::Item> {
        for (id, key) in self.it.by_ref() {
            if self.graph.adj.degree(id) > 0 {
                return Some((key, self.graph.fanout_of(id)));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: one edge yields the bare value; a second distinct target
    /// switches the result to a set holding both.
    #[test]
    fn one_target_bare_two_targets_set() {
        let mut g: GraphMap<&str> = GraphMap::new();
        g.insert("a", "b");
        assert_eq!(g.get("a").unwrap().cloned(), Fanout::One("b"));

        g.insert("a", "c");
        let fan = g.get("a").unwrap().cloned();
        assert_eq!(fan, Fanout::Many(["b", "c"].into_iter().collect()));
        assert_eq!(fan.len(), 2);
    }

    /// Invariant: inserting the same edge twice is a no-op, not a second
    /// fan-out entry.
    #[test]
    fn duplicate_edge_is_noop() {
        let mut g: GraphMap<&str> = GraphMap::new();
        g.insert("a", "b");
        g.insert("a", "b");
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.get("a").unwrap().cloned(), Fanout::One("b"));
    }

    /// Invariant: `get` interns nothing and fails both for unknown values
    /// and for interned nodes without outgoing edges.
    #[test]
    fn get_fails_for_unknown_and_value_only_nodes() {
        let mut g: GraphMap<&str> = GraphMap::new();
        g.insert("a", "b");
        assert_eq!(g.get("missing"), Err(Error::KeyNotFound));
        assert_eq!(g.len(), 2, "failed get must not intern");
        // "b" is interned but value-only.
        assert!(g.contains("b"));
        assert_eq!(g.get("b"), Err(Error::KeyNotFound));
    }

    /// Invariant: when both endpoints are new, the value takes the lower
    /// index; observable through the raw-index repr.
    #[test]
    fn value_interned_before_key() {
        let mut g: GraphMap<&str> = GraphMap::new();
        g.insert("a", "b");
        assert_eq!(format!("{g:?}"), r#"{"b": {}, "a": {0}}"#);
    }

    /// Invariant: `delete` severs all edges but keeps the slot interned;
    /// `get` then fails while `contains` still holds.
    #[test]
    fn delete_keeps_slot() {
        let mut g: GraphMap<&str> = GraphMap::new();
        g.insert("a", "b");
        g.insert("c", "b");
        assert!(g.delete("a"));
        assert!(!g.delete("zzz"));

        assert_eq!(g.get("a"), Err(Error::KeyNotFound));
        assert!(g.contains("a"), "slot persists until reindex");
        assert_eq!(g.len(), 3);
        assert_eq!(g.get("c").unwrap().cloned(), Fanout::One("b"));
    }

    /// Invariant: `reindex` drops disconnected slots only; the value-level
    /// edge set is untouched.
    #[test]
    fn reindex_drops_disconnected_slots() {
        let mut g: GraphMap<&str> = GraphMap::new();
        g.insert("a", "b");
        g.insert("c", "b");
        g.insert_node("lone");
        g.delete("a");

        g.reindex().unwrap();
        assert_eq!(g.len(), 2, "only c and b survive");
        assert!(!g.contains("a"));
        assert!(!g.contains("lone"));
        assert_eq!(g.get("c").unwrap().cloned(), Fanout::One("b"));
    }

    /// Invariant: `setdefault` is refused on every variant.
    #[test]
    fn setdefault_unsupported() {
        let mut g: GraphMap<&str> = GraphMap::new();
        assert!(matches!(
            g.setdefault("a", "b"),
            Err(Error::Unsupported(_))
        ));
        assert!(g.is_empty(), "refused setdefault must not intern");
    }

    /// Invariant: `get_or` falls back without interning.
    #[test]
    fn get_or_falls_back() {
        let mut g: GraphMap<String> = GraphMap::new();
        g.insert("a".into(), "b".into());
        let default = "dflt".to_string();
        assert_eq!(
            g.get_or("a", &default).cloned(),
            Fanout::One("b".to_string())
        );
        assert_eq!(
            g.get_or("missing", &default).cloned(),
            Fanout::One("dflt".to_string())
        );
        assert_eq!(g.len(), 2);
    }

    /// Invariant: `make_all_loops` touches current keys only, not
    /// value-only nodes.
    #[test]
    fn make_all_loops_targets_keys_only() {
        let mut g: GraphMap<&str> = GraphMap::new();
        g.insert("a", "b");
        g.make_all_loops();
        assert!(g.get("a").unwrap().contains(&&"a"));
        assert_eq!(g.get("b"), Err(Error::KeyNotFound), "b gained no loop");
    }

    /// Invariant: views cover exactly the key set, value set, and their
    /// union.
    #[test]
    fn view_membership() {
        let mut g: GraphMap<&str> = GraphMap::new();
        g.insert("a", "b");
        g.insert("b", "c");
        g.insert_node("lone");

        // Table order: "b" was interned first (value before key).
        let keys: Vec<&&str> = g.keys().collect();
        assert_eq!(keys, [&"b", &"a"]);

        let values: Vec<&&str> = g.values().collect();
        assert_eq!(values, [&"b", &"c"]);

        let items: Vec<(&&str, bool)> = g
            .items()
            .map(|(k, fan)| (k, fan.is_some()))
            .collect();
        assert_eq!(items, [(&"b", true), (&"a", true), (&"c", false)]);
    }

    /// Invariant: `popitem` takes the highest-index node that still has
    /// outgoing edges, skipping value-only trailing nodes.
    #[test]
    fn popitem_takes_highest_connected_key() {
        let mut g: GraphMap<&str> = GraphMap::new();
        g.insert("a", "b");
        g.insert("c", "d"); // "d" has the highest index but no outgoing edge
        let (key, fan) = g.popitem().unwrap();
        assert_eq!(key, "c");
        assert_eq!(fan, Fanout::One("d"));
        // "d" became disconnected and was dropped by the forced reindex.
        assert!(!g.contains("d"));
        assert_eq!(g.get("a").unwrap().cloned(), Fanout::One("b"));

        let (key, _) = g.popitem().unwrap();
        assert_eq!(key, "a");
        assert_eq!(g.popitem(), Err(Error::KeyNotFound));
    }
}
