//! Filepath: src/dictionary.rs
//!
//! `BDictionary` - a sorted map with unique keys.
//!
//! Entries are `(K, V)` pairs in a keyed [`ATree`], ordered by key. Besides
//! key lookup, entries can be addressed by their rank in key order.

use std::cmp::Ordering;
use std::fmt as StdFmt;
use std::sync::Arc;

use crate::config::TreeConfig;
use crate::list::{AList, Iter};
use crate::observer::ObserverHandle;
use crate::sorted::{Mode, SingleOpResult, check_sorted};
use crate::tree::{ATree, TreeError};

/// Shared total order over keys.
pub type KeyComparer<K> = Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>;

/// Sorted map from `K` to `V`.
pub struct BDictionary<K: Clone, V: Clone> {
    tree: AList<(K, V)>,
    compare: KeyComparer<K>,
}

impl<K: Clone, V: Clone> Clone for BDictionary<K, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
            compare: Arc::clone(&self.compare),
        }
    }
}

impl<K: Clone + StdFmt::Debug, V: Clone + StdFmt::Debug> StdFmt::Debug for BDictionary<K, V> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Clone + Ord + 'static, V: Clone> Default for BDictionary<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Ord + 'static, V: Clone> BDictionary<K, V> {
    /// Empty map ordered by `K: Ord`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparer(K::cmp)
    }
}

impl<K: Clone, V: Clone> BDictionary<K, V> {
    /// Empty map ordered by `compare`.
    #[must_use]
    pub fn with_comparer(compare: impl Fn(&K, &K) -> Ordering + Send + Sync + 'static) -> Self {
        Self {
            tree: ATree::build(TreeConfig::default(), true),
            compare: Arc::new(compare),
        }
    }

    /// Empty map with custom node limits.
    ///
    /// # Errors
    /// [`TreeError::InvalidConfig`].
    pub fn with_config(
        config: TreeConfig,
        compare: impl Fn(&K, &K) -> Ordering + Send + Sync + 'static,
    ) -> Result<Self, TreeError> {
        Ok(Self {
            tree: ATree::new_keyed(config)?,
            compare: Arc::new(compare),
        })
    }

    // ========================================================================
    //  Queries
    // ========================================================================

    /// Number of entries.
    #[must_use]
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Whether the map is empty.
    #[must_use]
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    fn seek(&self, key: &K) -> (usize, bool) {
        self.tree.seek_key(|(k, _)| (self.compare)(k, key))
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        match self.seek(key) {
            (at, true) => self.tree.get(at).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.seek(key).1
    }

    /// Rank of the first key not less than `key`.
    #[must_use]
    pub fn lower_bound(&self, key: &K) -> usize {
        self.seek(key).0
    }

    /// Entry with rank `index` in key order.
    #[must_use]
    pub fn get_at(&self, index: usize) -> Option<(&K, &V)> {
        self.tree.get(index).map(|(k, v)| (k, v))
    }

    /// Entry with the smallest key.
    #[must_use]
    pub fn first(&self) -> Option<(&K, &V)> {
        self.get_at(0)
    }

    /// Entry with the largest key.
    #[must_use]
    pub fn last(&self) -> Option<(&K, &V)> {
        self.tree.last().map(|(k, v)| (k, v))
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries().map(|(k, v)| (k, v))
    }

    /// Keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries().map(|(k, _)| k)
    }

    /// Values in key order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries().map(|(_, v)| v)
    }

    fn entries(&self) -> Iter<'_, (K, V)> {
        self.tree.iter()
    }

    // ========================================================================
    //  Mutation
    // ========================================================================

    fn apply(&mut self, mode: Mode, key: K, value: V) -> Result<SingleOpResult<(K, V)>, TreeError> {
        let compare = Arc::clone(&self.compare);
        self.tree
            .keyed_operation(mode, (key, value), |a, b| compare(&a.0, &b.0))
    }

    /// Insert or replace; returns the previous value.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`] or a veto.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, TreeError> {
        self.apply(Mode::AddOrReplace, key, value)
            .map(|r| r.previous.map(|(_, v)| v))
    }

    /// Insert a new key.
    ///
    /// # Errors
    /// [`TreeError::KeyAlreadyExists`] if `key` is present, otherwise as
    /// [`insert`](Self::insert).
    pub fn try_insert(&mut self, key: K, value: V) -> Result<(), TreeError> {
        self.apply(Mode::AddOrThrow, key, value).map(|_| ())
    }

    /// Insert unless `key` is present; returns whether it was inserted.
    ///
    /// # Errors
    /// As [`insert`](Self::insert).
    pub fn insert_if_absent(&mut self, key: K, value: V) -> Result<bool, TreeError> {
        self.apply(Mode::AddIfNotPresent, key, value)
            .map(|r| r.size_change == 1)
    }

    /// Replace the value under an existing key; returns the previous value,
    /// or `None` (and no change) if `key` is absent.
    ///
    /// # Errors
    /// As [`insert`](Self::insert).
    pub fn replace_if_present(&mut self, key: K, value: V) -> Result<Option<V>, TreeError> {
        self.apply(Mode::ReplaceIfPresent, key, value)
            .map(|r| r.previous.map(|(_, v)| v))
    }

    /// Remove `key`; returns its value.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`] or a veto.
    pub fn remove(&mut self, key: &K) -> Result<Option<V>, TreeError> {
        self.tree.ensure_writable()?;
        match self.seek(key) {
            (at, true) => Ok(self.tree.remove_at(at)?.map(|(_, v)| v)),
            _ => Ok(None),
        }
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

    /// Make the map permanently read-only.
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

    /// Structural check plus strictly ascending keys.
    ///
    /// # Errors
    /// [`TreeError::Inconsistent`].
    pub fn check_invariants(&self) -> Result<(), TreeError> {
        self.tree.check_invariants()?;
        self.tree.check_high_keys(|a, b| (self.compare)(&a.0, &b.0))?;
        check_sorted(self.entries(), |a, b| match (self.compare)(&a.0, &b.0) {
            Ordering::Equal => Ordering::Greater,
            other => other,
        })
    }
}

impl<K: Clone + Ord + 'static, V: Clone> FromIterator<(K, V)> for BDictionary<K, V> {
    /// Later duplicates of a key replace earlier ones.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            if let Err(err) = map.insert(k, v) {
                unreachable!("fresh dictionary rejected an insert: {err}");
            }
        }
        map
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "fail fast in tests")]
mod tests {
    use super::*;

    fn small() -> BDictionary<u32, String> {
        let config = TreeConfig::default().with_max_leaf_size(4).with_max_inner_size(4);
        BDictionary::with_config(config, u32::cmp).unwrap()
    }

    #[test]
    fn test_insert_replaces() {
        let mut map = small();
        assert_eq!(map.insert(1, "a".into()).unwrap(), None);
        assert_eq!(map.insert(1, "b".into()).unwrap(), Some("a".into()));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1).map(String::as_str), Some("b"));
    }

    #[test]
    fn test_try_insert_and_if_absent() {
        let mut map = small();
        map.try_insert(5, "x".into()).unwrap();
        assert_eq!(map.try_insert(5, "y".into()), Err(TreeError::KeyAlreadyExists));
        assert!(!map.insert_if_absent(5, "y".into()).unwrap());
        assert!(map.insert_if_absent(6, "y".into()).unwrap());
        assert_eq!(map.get(&5).map(String::as_str), Some("x"));
    }

    #[test]
    fn test_replace_if_present_never_inserts() {
        let mut map = small();
        assert_eq!(map.replace_if_present(1, "a".into()).unwrap(), None);
        assert!(map.is_empty());
        map.insert(1, "a".into()).unwrap();
        assert_eq!(map.replace_if_present(1, "b".into()).unwrap(), Some("a".into()));
    }

    #[test]
    fn test_ordered_views_and_rank() {
        let mut map = small();
        for k in [40, 10, 30, 20, 50, 0] {
            map.insert(k, k.to_string()).unwrap();
        }
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![0, 10, 20, 30, 40, 50]);
        assert_eq!(map.values().next().map(String::as_str), Some("0"));
        assert_eq!(map.get_at(2).map(|(k, _)| *k), Some(20));
        assert_eq!(map.lower_bound(&25), 3);
        assert_eq!(map.first().map(|(k, _)| *k), Some(0));
        assert_eq!(map.last().map(|(k, _)| *k), Some(50));
        map.check_invariants().unwrap();
    }

    #[test]
    fn test_remove_many() {
        let mut map = small();
        for k in 0..300 {
            map.insert(k, String::new()).unwrap();
        }
        for k in (0..300).filter(|k| k % 3 != 0) {
            assert!(map.remove(&k).unwrap().is_some());
        }
        assert_eq!(map.remove(&1).unwrap(), None);
        assert_eq!(map.len(), 100);
        assert!(map.keys().all(|k| k % 3 == 0));
        map.check_invariants().unwrap();
    }

    #[test]
    fn test_clone_snapshot_is_independent() {
        let mut map = small();
        for k in 0..50 {
            map.insert(k, "old".into()).unwrap();
        }
        let snapshot = map.clone();
        map.insert(7, "new".into()).unwrap();
        map.remove(&8).unwrap();

        assert_eq!(snapshot.get(&7).map(String::as_str), Some("old"));
        assert!(snapshot.contains_key(&8));
        assert!(!map.contains_key(&8));
    }

    #[test]
    fn test_debug_and_collect() {
        let map: BDictionary<u8, char> = [(2, 'b'), (1, 'a'), (2, 'c')].into_iter().collect();
        assert_eq!(format!("{map:?}"), "{1: 'a', 2: 'c'}");
    }
}
