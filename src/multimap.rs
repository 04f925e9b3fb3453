//! Filepath: src/multimap.rs
//!
//! `BMultiMap` - a sorted map allowing several values per key.
//!
//! Entries are ordered by key, then by value. Passing a value comparer that
//! always returns `Equal` makes values under one key keep insertion order;
//! [`remove`](BMultiMap::remove) then removes the first value under the key
//! regardless of the value passed.

use std::cmp::Ordering;
use std::fmt as StdFmt;
use std::sync::Arc;

use crate::config::TreeConfig;
use crate::list::{AList, Iter};
use crate::observer::ObserverHandle;
use crate::sorted::{Comparer, Mode, check_sorted};
use crate::tree::{ATree, TreeError};

/// Sorted multimap from `K` to `V`.
pub struct BMultiMap<K: Clone, V: Clone> {
    tree: AList<(K, V)>,
    key_cmp: Comparer<K>,
    value_cmp: Comparer<V>,
}

impl<K: Clone, V: Clone> Clone for BMultiMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
            key_cmp: Arc::clone(&self.key_cmp),
            value_cmp: Arc::clone(&self.value_cmp),
        }
    }
}

impl<K: Clone + StdFmt::Debug, V: Clone + StdFmt::Debug> StdFmt::Debug for BMultiMap<K, V> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_list().entries(self.tree.iter()).finish()
    }
}

impl<K: Clone + Ord + 'static, V: Clone + Ord + 'static> Default for BMultiMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Ord + 'static, V: Clone + Ord + 'static> BMultiMap<K, V> {
    /// Empty multimap ordered by `Ord` on keys, then values.
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparers(K::cmp, V::cmp)
    }
}

impl<K: Clone, V: Clone> BMultiMap<K, V> {
    /// Empty multimap with explicit key and value orders.
    #[must_use]
    pub fn with_comparers(
        key_cmp: impl Fn(&K, &K) -> Ordering + Send + Sync + 'static,
        value_cmp: impl Fn(&V, &V) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        Self {
            tree: ATree::build(TreeConfig::default(), true),
            key_cmp: Arc::new(key_cmp),
            value_cmp: Arc::new(value_cmp),
        }
    }

    /// Empty multimap with custom node limits.
    ///
    /// # Errors
    /// [`TreeError::InvalidConfig`].
    pub fn with_config(
        config: TreeConfig,
        key_cmp: impl Fn(&K, &K) -> Ordering + Send + Sync + 'static,
        value_cmp: impl Fn(&V, &V) -> Ordering + Send + Sync + 'static,
    ) -> Result<Self, TreeError> {
        Ok(Self {
            tree: ATree::new_keyed(config)?,
            key_cmp: Arc::new(key_cmp),
            value_cmp: Arc::new(value_cmp),
        })
    }

    fn entry_cmp(&self) -> impl Fn(&(K, V), &(K, V)) -> Ordering + use<K, V> {
        let key_cmp = Arc::clone(&self.key_cmp);
        let value_cmp = Arc::clone(&self.value_cmp);
        move |a, b| key_cmp(&a.0, &b.0).then_with(|| value_cmp(&a.1, &b.1))
    }

    /// Positions `lower..upper` holding entries under `key`.
    fn key_range(&self, key: &K) -> (usize, usize) {
        let lower = self
            .tree
            .partition_point(|(k, _)| (self.key_cmp)(k, key) == Ordering::Less);
        let upper = self
            .tree
            .partition_point(|(k, _)| (self.key_cmp)(k, key) != Ordering::Greater);
        (lower, upper)
    }

    fn seek_entry(&self, key: &K, value: &V) -> (usize, bool) {
        self.tree.seek_key(|(k, v)| {
            (self.key_cmp)(k, key).then_with(|| (self.value_cmp)(v, value))
        })
    }

    // ========================================================================
    //  Queries
    // ========================================================================

    /// Number of entries (not keys).
    #[must_use]
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Whether the multimap is empty.
    #[must_use]
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Whether the pair `(key, value)` is present.
    #[must_use]
    pub fn contains(&self, key: &K, value: &V) -> bool {
        self.seek_entry(key, value).1
    }

    /// Whether any value is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.count_of(key) > 0
    }

    /// Number of values under `key`.
    #[must_use]
    pub fn count_of(&self, key: &K) -> usize {
        let (lower, upper) = self.key_range(key);
        upper - lower
    }

    /// Values under `key`, in value order.
    pub fn values_of(&self, key: &K) -> impl Iterator<Item = &V> {
        let (lower, upper) = self.key_range(key);
        self.tree.iter_from(lower).take(upper - lower).map(|(_, v)| v)
    }

    /// Entry at `index` in order.
    #[must_use]
    pub fn get_at(&self, index: usize) -> Option<(&K, &V)> {
        self.tree.get(index).map(|(k, v)| (k, v))
    }

    /// Entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries().map(|(k, v)| (k, v))
    }

    fn entries(&self) -> Iter<'_, (K, V)> {
        self.tree.iter()
    }

    // ========================================================================
    //  Mutation
    // ========================================================================

    /// Add `(key, value)` after any equal entries; returns its position.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`] or a veto.
    pub fn insert(&mut self, key: K, value: V) -> Result<usize, TreeError> {
        let cmp = self.entry_cmp();
        self.tree
            .keyed_operation(Mode::Add, (key, value), cmp)
            .map(|r| r.index)
    }

    /// Remove the first entry equal to `(key, value)`; returns whether one
    /// was found.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`] or a veto.
    pub fn remove(&mut self, key: &K, value: &V) -> Result<bool, TreeError> {
        self.tree.ensure_writable()?;
        match self.seek_entry(key, value) {
            (at, true) => self.tree.remove_at(at).map(|_| true),
            _ => Ok(false),
        }
    }

    /// Remove every value under `key`; returns how many were removed.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`] or a veto.
    pub fn remove_all(&mut self, key: &K) -> Result<usize, TreeError> {
        self.tree.ensure_writable()?;
        let (lower, upper) = self.key_range(key);
        self.tree.remove_range(lower, upper - lower)?;
        Ok(upper - lower)
    }

    /// Remove every entry.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`] or a veto.
    pub fn clear(&mut self) -> Result<(), TreeError> {
        self.tree.clear()
    }

    // ========================================================================
    //  Tree capabilities
    // ========================================================================

    /// Make the multimap permanently read-only.
    pub fn freeze(&mut self) {
        self.tree.freeze();
    }

    /// Whether [`freeze`](Self::freeze) has been called.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.tree.is_frozen()
    }

    /// See [`ATree::attach_observer`].
    ///
    /// # Errors
    /// [`TreeError::ObserverAttached`].
    pub fn attach_observer(&mut self, handle: ObserverHandle<(K, V)>) -> Result<(), TreeError> {
        self.tree.attach_observer(handle)
    }

    /// See [`ATree::detach_observer`].
    pub fn detach_observer(&mut self) -> Option<ObserverHandle<(K, V)>> {
        self.tree.detach_observer()
    }

    /// Structural check plus key-then-value order, including the routing
    /// keys cached in inner nodes.
    ///
    /// # Errors
    /// [`TreeError::Inconsistent`].
    pub fn check_invariants(&self) -> Result<(), TreeError> {
        self.tree.check_invariants()?;
        self.tree.check_high_keys(self.entry_cmp())?;
        check_sorted(self.entries(), self.entry_cmp())
    }
}
