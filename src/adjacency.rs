//! AdjStore: the dual forward/backward edge relation layered on the node
//! table's dense ids.
//!
//! Invariant: `b ∈ out[a]` iff `a ∈ inc[b]`. Every mutation adjusts both
//! sides; the incoming mirror is what keeps `remove_all_edges_of` at
//! O(degree) instead of a full scan. Self-loops are permitted.

use crate::node_table::{NodeId, Remap};
use hashbrown::HashSet;

/// Signals an edge whose endpoint has no mapping in a compaction plan.
/// Reaching this means the table/store cross-invariants were broken.
#[derive(Debug)]
pub(crate) struct UnmappedId;

#[derive(Default)]
pub(crate) struct AdjStore {
    out: Vec<HashSet<NodeId>>,
    inc: Vec<HashSet<NodeId>>,
}

impl AdjStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Grow both sides so every id below `slot_count` has a set.
    pub(crate) fn grow_to(&mut self, slot_count: usize) {
        if self.out.len() < slot_count {
            self.out.resize_with(slot_count, HashSet::new);
            self.inc.resize_with(slot_count, HashSet::new);
        }
    }

    /// Add a→b on both sides. Returns false if the edge already existed.
    pub(crate) fn add_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        let fresh = self.out[a.index()].insert(b);
        if fresh {
            self.inc[b.index()].insert(a);
        }
        fresh
    }

    /// Remove a→b from both sides. Returns false if the edge was absent.
    pub(crate) fn remove_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        let existed = self.out[a.index()].remove(&b);
        if existed {
            self.inc[b.index()].remove(&a);
        }
        existed
    }

    /// Drop every edge touching `id` in either direction. O(degree); the
    /// slot itself is untouched.
    pub(crate) fn remove_all_edges_of(&mut self, id: NodeId) {
        let targets = core::mem::take(&mut self.out[id.index()]);
        for b in targets {
            self.inc[b.index()].remove(&id);
        }
        let sources = core::mem::take(&mut self.inc[id.index()]);
        for a in sources {
            self.out[a.index()].remove(&id);
        }
    }

    pub(crate) fn outgoing(&self, id: NodeId) -> &HashSet<NodeId> {
        &self.out[id.index()]
    }

    pub(crate) fn incoming(&self, id: NodeId) -> &HashSet<NodeId> {
        &self.inc[id.index()]
    }

    pub(crate) fn out_degree(&self, id: NodeId) -> usize {
        self.out.get(id.index()).map(HashSet::len).unwrap_or(0)
    }

    pub(crate) fn in_degree(&self, id: NodeId) -> usize {
        self.inc.get(id.index()).map(HashSet::len).unwrap_or(0)
    }

    /// Degree across both directions; a self-loop counts once each way.
    pub(crate) fn degree(&self, id: NodeId) -> usize {
        self.out_degree(id) + self.in_degree(id)
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.out.iter().map(HashSet::len).sum()
    }

    /// All edges as (source, target), in source-id order.
    pub(crate) fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.out.iter().enumerate().flat_map(|(i, set)| {
            set.iter().map(move |&b| (NodeId::from_index(i), b))
        })
    }

    /// Rewrite every stored id per a compaction plan, whole or not at all.
    /// The rebuilt relation is staged and swapped in only once every edge
    /// endpoint has mapped; a dropped id with edges still attached is an
    /// invariant breach and leaves the store untouched.
    pub(crate) fn remap(&mut self, remap: &Remap) -> Result<(), UnmappedId> {
        let mut out: Vec<HashSet<NodeId>> = vec![HashSet::new(); remap.kept()];
        let mut inc: Vec<HashSet<NodeId>> = vec![HashSet::new(); remap.kept()];
        for (i, set) in self.out.iter().enumerate() {
            let old = NodeId::from_index(i);
            match remap.get(old) {
                Some(new_a) => {
                    for &b in set {
                        let new_b = remap.get(b).ok_or(UnmappedId)?;
                        out[new_a.index()].insert(new_b);
                        inc[new_b.index()].insert(new_a);
                    }
                }
                None if set.is_empty() => {}
                None => return Err(UnmappedId),
            }
        }
        // Dropped ids must not appear on the incoming side either.
        for (i, set) in self.inc.iter().enumerate() {
            if remap.get(NodeId::from_index(i)).is_none() && !set.is_empty() {
                return Err(UnmappedId);
            }
        }
        self.out = out;
        self.inc = inc;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_table::NodeTable;

    fn ids(n: usize) -> Vec<NodeId> {
        (0..n).map(NodeId::from_index).collect()
    }

    fn store(n: usize) -> AdjStore {
        let mut s = AdjStore::new();
        s.grow_to(n);
        s
    }

    /// Invariant: add/remove keep the forward and backward sides mirrored.
    #[test]
    fn forward_backward_mirror() {
        let v = ids(3);
        let mut s = store(3);
        assert!(s.add_edge(v[0], v[1]));
        assert!(!s.add_edge(v[0], v[1]), "duplicate edge is a no-op");
        assert!(s.add_edge(v[2], v[1]));

        assert!(s.outgoing(v[0]).contains(&v[1]));
        assert!(s.incoming(v[1]).contains(&v[0]));
        assert!(s.incoming(v[1]).contains(&v[2]));
        assert_eq!(s.edge_count(), 2);

        assert!(s.remove_edge(v[0], v[1]));
        assert!(!s.remove_edge(v[0], v[1]), "absent edge is a no-op");
        assert!(!s.incoming(v[1]).contains(&v[0]));
        assert_eq!(s.edge_count(), 1);
    }

    /// Invariant: `remove_all_edges_of` clears both directions and leaves
    /// unrelated edges alone.
    #[test]
    fn remove_all_edges_touching_a_node() {
        let v = ids(4);
        let mut s = store(4);
        s.add_edge(v[0], v[1]);
        s.add_edge(v[1], v[2]);
        s.add_edge(v[2], v[3]);

        s.remove_all_edges_of(v[1]);
        assert_eq!(s.degree(v[1]), 0);
        assert_eq!(s.out_degree(v[0]), 0, "v0 -> v1 gone");
        assert_eq!(s.in_degree(v[2]), 0, "v1 -> v2 gone");
        assert!(s.outgoing(v[2]).contains(&v[3]), "unrelated edge survives");
    }

    /// Invariant: self-loops are permitted and count on both sides.
    #[test]
    fn self_loop() {
        let v = ids(1);
        let mut s = store(1);
        assert!(s.add_edge(v[0], v[0]));
        assert!(s.outgoing(v[0]).contains(&v[0]));
        assert!(s.incoming(v[0]).contains(&v[0]));
        assert_eq!(s.degree(v[0]), 2);
        s.remove_all_edges_of(v[0]);
        assert_eq!(s.degree(v[0]), 0);
    }

    /// Invariant: remapping rewrites every stored id and preserves the
    /// mirror; edge-less dropped ids are fine.
    #[test]
    fn remap_rewrites_all_ids() {
        // Build a remap through a real table so the plan shape matches.
        let mut t: NodeTable<u32> = NodeTable::new();
        let a = t.intern(10);
        let b = t.intern(20);
        let c = t.intern(30);

        let mut s = store(3);
        s.add_edge(a, c);
        s.add_edge(c, c);

        // b is edge-less and dropped by the plan.
        let remap = t.plan_compact(|id| id != b);
        s.remap(&remap).expect("all endpoints kept");

        let a2 = remap.get(a).unwrap();
        let c2 = remap.get(c).unwrap();
        assert!(s.outgoing(a2).contains(&c2));
        assert!(s.incoming(c2).contains(&a2));
        assert!(s.outgoing(c2).contains(&c2), "loop survives remap");
        assert_eq!(s.edge_count(), 2);
    }

    /// Invariant: a plan that drops a still-connected id is rejected and
    /// the store is left untouched.
    #[test]
    fn remap_rejects_dropped_connected_id() {
        let mut t: NodeTable<u32> = NodeTable::new();
        let a = t.intern(10);
        let b = t.intern(20);

        let mut s = store(2);
        s.add_edge(a, b);

        let bad = t.plan_compact(|id| id != b);
        assert!(s.remap(&bad).is_err());
        assert!(s.outgoing(a).contains(&b), "store unchanged on failure");
    }
}
