//! TwoWayMap: the exclusive bijection specialization of [`GraphMap`].
//!
//! Every connected node has at most one outgoing and one incoming edge, and
//! every connection is stored symmetrically (key→value and value→key), so a
//! lookup on either side of an established pair returns the single partner.
//! Establishing a connection first severs any prior partnership of either
//! endpoint; superseded partners keep their slots, edge-less, until a
//! reindex.

use crate::graph_map::{Error, GraphMap};
use crate::node_table::NodeId;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::HashMap;
use std::collections::hash_map::RandomState;

pub struct TwoWayMap<K, S = RandomState> {
    graph: GraphMap<K, S>,
}

impl<K> TwoWayMap<K>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            graph: GraphMap::new(),
        }
    }
}

impl<K> Default for TwoWayMap<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> TwoWayMap<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            graph: GraphMap::with_hasher(hasher),
        }
    }

    fn partner_id(&self, id: NodeId) -> Option<NodeId> {
        self.graph.adj.outgoing(id).iter().next().copied()
    }

    /// Remove the node's partnership, both directions.
    fn sever(&mut self, id: NodeId) {
        self.graph.adj.remove_all_edges_of(id);
    }

    /// Number of interned nodes, paired or not.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Number of established pairs (a self-pair counts once).
    pub fn pair_count(&self) -> usize {
        self.pairs().count()
    }

    /// Whether the value is interned at all, paired or not.
    pub fn contains<Q>(&self, node: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.graph.contains(node)
    }

    /// The single partner of `node`. Fails with [`Error::KeyNotFound`] for
    /// unknown or unpaired (orphaned) nodes; never returns a set, by the
    /// cardinality invariant.
    pub fn get<Q>(&self, node: &Q) -> Result<&K, Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let id = self.graph.table.lookup(node).ok_or(Error::KeyNotFound)?;
        let partner = self.partner_id(id).ok_or(Error::KeyNotFound)?;
        Ok(self.graph.resolve(partner))
    }

    /// Pair `key` with `value`. Any prior partnership of either endpoint is
    /// severed first ("remarriage" supersedes "marriage"); the superseded
    /// partner keeps its slot but loses its edges. The connection is stored
    /// in both directions.
    pub fn insert(&mut self, key: K, value: K) {
        let v = self.graph.intern(value);
        let k = self.graph.intern(key);
        self.sever(k);
        self.sever(v);
        self.graph.adj.add_edge(k, v);
        self.graph.adj.add_edge(v, k);
    }

    /// Pair each `(key, value)` in argument order; later pairs supersede
    /// earlier partnerships as in [`insert`](Self::insert).
    pub fn update<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, K)>,
    {
        for (k, v) in pairs {
            self.insert(k, v);
        }
    }

    /// Sever the node's partnership. Both slots persist, edge-less, until a
    /// reindex. Returns whether the node was known.
    pub fn delete<Q>(&mut self, node: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.graph.table.lookup(node) {
            Some(id) => {
                self.sever(id);
                true
            }
            None => false,
        }
    }

    /// Resolve the node's partner, then drop the node's slot entirely and
    /// force a reindex (which also drops the now-orphaned partner). O(n);
    /// prefer [`delete`](Self::delete).
    pub fn pop<Q>(&mut self, node: &Q) -> Result<K, Error>
    where
        K: Borrow<Q> + Clone,
        Q: ?Sized + Hash + Eq,
    {
        let id = self.graph.table.lookup(node).ok_or(Error::KeyNotFound)?;
        let partner = self.partner_id(id).ok_or(Error::KeyNotFound)?;
        let value = self.graph.resolve(partner).clone();
        self.sever(id);
        self.graph.table.vacate(id);
        self.reindex()?;
        Ok(value)
    }

    /// A bijection cannot meaningfully absorb an arbitrary multi-edge
    /// graph; always fails with [`Error::Unsupported`].
    pub fn merge<S2>(&mut self, _other: &GraphMap<K, S2>) -> Result<(), Error>
    where
        S2: BuildHasher,
    {
        Err(Error::Unsupported(
            "merge would absorb a multi-edge graph into a bijection; use update with explicit pairs",
        ))
    }

    /// Self-pairs would destroy the exclusive structure wholesale; always
    /// fails with [`Error::Unsupported`].
    pub fn make_loops<I>(&mut self, _nodes: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = K>,
    {
        Err(Error::Unsupported(
            "make_loops would pair every key with itself; bijections do not support it",
        ))
    }

    /// Not supported on any variant; see [`GraphMap::setdefault`].
    pub fn setdefault(&mut self, _key: K, _default: K) -> Result<(), Error> {
        Err(Error::Unsupported(
            "setdefault is not supported; use get(key).ok() with a fallback instead",
        ))
    }

    /// Drop every orphaned, edge-less slot and renumber the rest densely.
    /// All previously observed raw indices become invalid.
    pub fn reindex(&mut self) -> Result<(), Error> {
        self.graph.reindex()
    }

    /// Materialize a plain mapping holding every pairing in both
    /// directions (each pair contributes `k → v` and `v → k`).
    pub fn get_dict(&self) -> HashMap<K, K>
    where
        K: Clone,
    {
        let mut out = HashMap::new();
        for (id, node) in self.graph.table.iter() {
            if let Some(partner) = self.partner_id(id) {
                out.insert(node.clone(), self.graph.resolve(partner).clone());
            }
        }
        out
    }

    /// Lazy view over established pairs, each yielded once, ordered by the
    /// lower endpoint's index.
    pub fn pairs(&self) -> Pairs<'_, K, S> {
        Pairs {
            map: self,
            it: self.graph.table.iter(),
        }
    }
}

impl<K, S> Extend<(K, K)> for TwoWayMap<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, K)>>(&mut self, pairs: I) {
        self.update(pairs);
    }
}

impl<K, S> FromIterator<(K, K)> for TwoWayMap<K, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, K)>>(pairs: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.update(pairs);
        map
    }
}

impl<K, const N: usize> From<[(K, K); N]> for TwoWayMap<K>
where
    K: Eq + Hash,
{
    fn from(pairs: [(K, K); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Same informal raw-index repr as [`GraphMap`].
impl<K, S> fmt::Debug for TwoWayMap<K, S>
where
    K: Eq + Hash + fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.graph, f)
    }
}

/// Lazy pair view; see [`TwoWayMap::pairs`].
pub struct Pairs<'a, K, S = RandomState> {
    map: &'a TwoWayMap<K, S>,
    it: crate::node_table::Iter<'a, K>,
}

impl<'a, K, S> Iterator for Pairs<'a, K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = (&'a K, &'a K);
    fn next(&mut self) -> Option<Self::Item> {
        for (id, node) in self.it.by_ref() {
            if let Some(partner) = self.map.partner_id(id) {
                // Yield each pair from its lower endpoint only; a
                // self-pair has both endpoints equal and passes once.
                if id <= partner {
                    return Some((node, self.map.graph.resolve(partner)));
                }
            }
        }
        None
    }
}
