//! graph-hashmap: single-threaded hash maps that store directed links
//! between interned, deduplicated entries.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: amortize storage when the same large hashable value takes part
//!   in many relationships. Each distinct value occupies exactly one slot
//!   in a shared table; every connection is a pair of slot indices.
//! - Layers:
//!   - NodeTable<K, S>: append-only, index-stable arena deduplicating
//!     values behind dense `u32` ids, with tombstoning (`vacate`) and a
//!     two-phase compaction that returns an old→new remap.
//!   - AdjStore: forward/backward index-set relation over those ids; every
//!     edge mutation adjusts both sides.
//!   - GraphMap<K, S>: public directed multi-graph mapping composing the
//!     two, with mapping-like surface (get/insert/update/views) where
//!     "key" means has-outgoing-edge and insert accumulates edges.
//!   - TwoWayMap<K, S>: exclusive ≤1-to-≤1 symmetric specialization with
//!     divorce/remarriage rebinding.
//!   - BatchedMap<K, V>: sibling aggregator folding repeated inserts under
//!     one key into a `Vec`; shares the accumulation surface, not the
//!     edge mechanism.
//!
//! Constraints
//! - Single-threaded, synchronous: every operation runs to completion, no
//!   internal synchronization. Views borrow `&self`, so the borrow checker
//!   rules out mutation during iteration statically.
//! - Indices are an implementation artifact: stable across edge-level
//!   mutation, invalidated by `reindex`/`pop`/`popitem`, never a public
//!   identifier. The debug repr leaks raw indices for inspection only.
//! - Cheap vs. expensive is explicit: `delete`/`delete_link`/`disconnect`
//!   are degree-bounded and keep slots; `pop`/`popitem`/`reindex` compact
//!   the table and rewrite every stored index, O(n).
//!
//! Hasher and rehashing invariants
//! - Each occupied slot stores its precomputed `u64` hash and every index
//!   rebuild uses the stored hash; `K: Hash` runs once per value, at
//!   intern time, and compaction never re-enters user code.
//!
//! Compaction atomicity
//! - Compaction plans against the table, stages the rewritten edge
//!   relation, and only then commits both; a cross-invariant breach
//!   surfaces as `Error::InvariantViolation` with the old indices intact,
//!   never as a half-remapped mapping.
//!
//! Notes and non-goals
//! - No concurrent or multi-writer access; callers needing it must wrap
//!   the map in their own exclusion.
//! - No persistence format for the graph; the raw-index repr is not a
//!   serialization contract.
//! - No query surface beyond direct and one-hop traversal.
//! - A capacity-bounded store spilling entries to secondary storage is a
//!   sibling abstraction sharing only the mapping-like call surface; the
//!   graph mappings never delegate to one.

mod adjacency;
mod batched_map;
mod graph_map;
mod node_table;
mod two_way_map;

// Public surface
pub use batched_map::BatchedMap;
pub use graph_map::{Error, Fanout, FanoutIter, GraphMap, Items, Keys, Values};
pub use two_way_map::{Pairs, TwoWayMap};
