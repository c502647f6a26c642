//! BatchedMap: a sibling aggregator that folds repeated insertions under
//! one key into an accumulating sequence.
//!
//! This shares the multi-valued-accumulation surface with [`GraphMap`] but
//! not the mechanism: here values pile up in a per-key `Vec`, while the
//! graph mapping accumulates via repeated edges between interned nodes.
//! The two must not be confused.
//!
//! [`GraphMap`]: crate::GraphMap

use crate::graph_map::Error;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::HashMap;
use std::collections::hash_map::RandomState;

#[derive(Clone, Debug)]
pub struct BatchedMap<K, V, S = RandomState> {
    inner: HashMap<K, Vec<V>, S>,
}

impl<K, V> BatchedMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            inner: HashMap::with_hasher(RandomState::new()),
        }
    }
}

impl<K, V> Default for BatchedMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> BatchedMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            inner: HashMap::with_hasher(hasher),
        }
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.contains_key(key)
    }

    /// Append `value` to the sequence accumulated under `key`, starting a
    /// fresh single-element sequence for a new key.
    pub fn append(&mut self, key: K, value: V) {
        self.inner.entry(key).or_default().push(value);
    }

    /// The accumulated sequence for `key`, in append order.
    pub fn get<Q>(&self, key: &Q) -> Option<&[V]>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.get(key).map(Vec::as_slice)
    }

    /// Append each pair, in argument order.
    pub fn update<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in pairs {
            self.append(k, v);
        }
    }

    /// The full accumulated state, keyed by field name.
    pub fn snapshot(&self) -> &HashMap<K, Vec<V>, S> {
        &self.inner
    }

    /// Not supported, matching the graph mappings: accumulation makes an
    /// insert-if-absent primitive ambiguous. Use
    /// [`get`](Self::get)`.unwrap_or(..)` instead.
    pub fn setdefault(&mut self, _key: K, _default: V) -> Result<(), Error> {
        Err(Error::Unsupported(
            "setdefault is not supported; use get(key) with a fallback instead",
        ))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &[V])> {
        self.inner.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

impl<K, V, S> Extend<(K, V)> for BatchedMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, pairs: I) {
        self.update(pairs);
    }
}

impl<K, V, S> FromIterator<(K, V)> for BatchedMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(pairs: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.update(pairs);
        map
    }
}
