//! Filepath: src/sorted.rs
//!
//! Key-ordered single operations and `BList`, a sorted list.
//!
//! Ordered collections store their items in a keyed [`ATree`]: every inner
//! node caches the last item of each child, so a key search routes through
//! those cached "high" keys instead of positions. A single keyed operation
//! first searches (without mutating), then applies at most one positional
//! insert, replace or remove; errors are therefore raised before any effect.

use std::cmp::Ordering;
use std::fmt as StdFmt;
use std::sync::Arc;

use crate::config::TreeConfig;
use crate::leaf::DenseLeaf;
use crate::list::{AList, Iter};
use crate::observer::ObserverHandle;
use crate::tree::{ATree, TreeError};

// ============================================================================
//  Single operation
// ============================================================================

/// What a keyed single operation does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Look up only.
    Retrieve,
    /// Insert, after any equal items.
    Add,
    /// Replace the first equal item, or insert.
    AddOrReplace,
    /// Insert only if no equal item exists.
    AddIfNotPresent,
    /// Insert, failing with [`TreeError::KeyAlreadyExists`] if an equal item exists.
    AddOrThrow,
    /// Replace the first equal item; never inserts.
    ReplaceIfPresent,
    /// Remove the first equal item.
    Remove,
}

/// Outcome of a keyed single operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SingleOpResult<T> {
    /// An equal item existed before the operation.
    pub found: bool,

    /// Position of the equal item, or where the item was (or would be)
    /// inserted.
    pub index: usize,

    /// Net change in length: `1`, `0` or `-1`.
    pub size_change: isize,

    /// The item replaced or removed; for [`Mode::Retrieve`], the item found.
    pub previous: Option<T>,
}

impl<T> SingleOpResult<T> {
    const fn new(found: bool, index: usize, size_change: isize, previous: Option<T>) -> Self {
        Self {
            found,
            index,
            size_change,
            previous,
        }
    }
}

impl<T: Clone> ATree<DenseLeaf<T>> {
    /// Lower bound of the items matching `probe`, and whether an item
    /// matches there. `probe(x)` orders `x` relative to the key sought.
    pub(crate) fn seek_key(&self, probe: impl Fn(&T) -> Ordering) -> (usize, bool) {
        let at = self.partition_point(|x| probe(x) == Ordering::Less);
        let found = self.get(at).is_some_and(|x| probe(x) == Ordering::Equal);
        (at, found)
    }

    /// Apply one keyed operation for `item` under the total order `cmp`.
    pub(crate) fn keyed_operation(
        &mut self,
        mode: Mode,
        item: T,
        cmp: impl Fn(&T, &T) -> Ordering,
    ) -> Result<SingleOpResult<T>, TreeError> {
        if mode != Mode::Retrieve {
            self.ensure_writable()?;
        }
        let (at, found) = self.seek_key(|x| cmp(x, &item));
        match (mode, found) {
            (Mode::Retrieve, _) => {
                let hit = found.then(|| self.get(at).cloned()).flatten();
                Ok(SingleOpResult::new(found, at, 0, hit))
            }

            (Mode::Add, _) => {
                let upper = self.partition_point(|x| cmp(x, &item) != Ordering::Greater);
                self.insert(upper, item)?;
                Ok(SingleOpResult::new(found, upper, 1, None))
            }

            (Mode::AddOrReplace | Mode::ReplaceIfPresent, true) => {
                let previous = self.set(at, item)?;
                Ok(SingleOpResult::new(true, at, 0, previous))
            }

            (Mode::ReplaceIfPresent | Mode::Remove, false) | (Mode::AddIfNotPresent, true) => {
                Ok(SingleOpResult::new(found, at, 0, None))
            }

            (Mode::AddOrThrow, true) => Err(TreeError::KeyAlreadyExists),

            (Mode::Remove, true) => {
                let previous = self.remove_at(at)?;
                Ok(SingleOpResult::new(true, at, -1, previous))
            }

            (Mode::AddOrReplace | Mode::AddIfNotPresent | Mode::AddOrThrow, false) => {
                self.insert(at, item)?;
                Ok(SingleOpResult::new(false, at, 1, None))
            }
        }
    }
}

// ============================================================================
//  BList
// ============================================================================

/// Shared total order over items.
pub type Comparer<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// A sorted list allowing duplicates.
///
/// Equal items keep insertion order: [`insert`](Self::insert) places a new
/// item after every item equal to it.
pub struct BList<T: Clone> {
    tree: AList<T>,
    compare: Comparer<T>,
}

impl<T: Clone> Clone for BList<T> {
    /// O(1) snapshot; see [`ATree`]'s `Clone`.
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
            compare: Arc::clone(&self.compare),
        }
    }
}

impl<T: Clone + StdFmt::Debug> StdFmt::Debug for BList<T> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Clone + Ord + 'static> Default for BList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Ord + 'static> BList<T> {
    /// Empty list ordered by `Ord`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparer(T::cmp)
    }
}

impl<T: Clone> BList<T> {
    /// Empty list ordered by `compare`.
    #[must_use]
    pub fn with_comparer(compare: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static) -> Self {
        Self {
            tree: ATree::build(TreeConfig::default(), true),
            compare: Arc::new(compare),
        }
    }

    /// Empty list with custom node limits.
    ///
    /// # Errors
    /// [`TreeError::InvalidConfig`].
    pub fn with_config(
        config: TreeConfig,
        compare: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    ) -> Result<Self, TreeError> {
        Ok(Self {
            tree: ATree::new_keyed(config)?,
            compare: Arc::new(compare),
        })
    }

    // ========================================================================
    //  Queries
    // ========================================================================

    /// Number of items.
    #[must_use]
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Whether the list is empty.
    #[must_use]
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Item at `index` in sorted order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.tree.get(index)
    }

    /// Smallest item.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.tree.first()
    }

    /// Largest item.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.tree.last()
    }

    /// Items in sorted order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        self.tree.iter()
    }

    /// First position whose item is not less than `item`.
    #[must_use]
    pub fn lower_bound(&self, item: &T) -> usize {
        self.tree.partition_point(|x| (self.compare)(x, item) == Ordering::Less)
    }

    /// First position whose item is greater than `item`.
    #[must_use]
    pub fn upper_bound(&self, item: &T) -> usize {
        self.tree.partition_point(|x| (self.compare)(x, item) != Ordering::Greater)
    }

    /// Position of the first item equal to `item`.
    #[must_use]
    pub fn index_of(&self, item: &T) -> Option<usize> {
        let (at, found) = self.tree.seek_key(|x| (self.compare)(x, item));
        found.then_some(at)
    }

    /// Whether an item equal to `item` is present.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.index_of(item).is_some()
    }

    /// The underlying tree (read-only).
    #[must_use]
    pub const fn as_list(&self) -> &AList<T> {
        &self.tree
    }

    // ========================================================================
    //  Mutation
    // ========================================================================

    /// Run one keyed operation.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`] for any mutating mode on a frozen list,
    /// [`TreeError::KeyAlreadyExists`] for [`Mode::AddOrThrow`], or a veto.
    pub fn do_single_operation(&mut self, mode: Mode, item: T) -> Result<SingleOpResult<T>, TreeError> {
        let compare = Arc::clone(&self.compare);
        self.tree.keyed_operation(mode, item, |a, b| compare(a, b))
    }

    /// Insert `item` after any equal items; returns its position.
    ///
    /// # Errors
    /// As [`do_single_operation`](Self::do_single_operation).
    pub fn insert(&mut self, item: T) -> Result<usize, TreeError> {
        self.do_single_operation(Mode::Add, item).map(|r| r.index)
    }

    /// Insert `item` unless an equal item exists; returns whether it was
    /// inserted.
    ///
    /// # Errors
    /// As [`do_single_operation`](Self::do_single_operation).
    pub fn insert_unique(&mut self, item: T) -> Result<bool, TreeError> {
        self.do_single_operation(Mode::AddIfNotPresent, item)
            .map(|r| r.size_change == 1)
    }

    /// Remove the first item equal to `item`; returns whether one was found.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`] or a veto.
    pub fn remove(&mut self, item: &T) -> Result<bool, TreeError> {
        self.tree.ensure_writable()?;
        match self.index_of(item) {
            Some(at) => self.tree.remove_at(at).map(|_| true),
            None => Ok(false),
        }
    }

    /// Remove every item equal to `item`; returns how many were removed.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`] or a veto.
    pub fn remove_all(&mut self, item: &T) -> Result<usize, TreeError> {
        self.tree.ensure_writable()?;
        let lower = self.lower_bound(item);
        let count = self.upper_bound(item) - lower;
        self.tree.remove_range(lower, count)?;
        Ok(count)
    }

    /// Remove the item at `index`.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`], [`TreeError::IndexOutOfRange`] or a veto.
    pub fn remove_at(&mut self, index: usize) -> Result<Option<T>, TreeError> {
        self.tree.remove_at(index)
    }

    /// Remove every item.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`] or a veto.
    pub fn clear(&mut self) -> Result<(), TreeError> {
        self.tree.clear()
    }

    // ========================================================================
    //  Tree capabilities
    // ========================================================================

    /// Make the list permanently read-only.
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
    pub fn attach_observer(&mut self, handle: ObserverHandle<T>) -> Result<(), TreeError> {
        self.tree.attach_observer(handle)
    }

    /// See [`ATree::detach_observer`].
    pub fn detach_observer(&mut self) -> Option<ObserverHandle<T>> {
        self.tree.detach_observer()
    }

    /// See [`ATree::check_invariants`]; additionally checks sort order and
    /// the routing keys cached in inner nodes.
    ///
    /// # Errors
    /// [`TreeError::Inconsistent`].
    pub fn check_invariants(&self) -> Result<(), TreeError> {
        self.tree.check_invariants()?;
        self.tree.check_high_keys(|a, b| (self.compare)(a, b))?;
        check_sorted(self.iter(), |a, b| (self.compare)(a, b))
    }
}

impl<'a, T: Clone> IntoIterator for &'a BList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<T: Clone + Ord + 'static> FromIterator<T> for BList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut items: Vec<T> = iter.into_iter().collect();
        items.sort();
        Self {
            tree: ATree::from_items(TreeConfig::default(), true, items),
            compare: Arc::new(T::cmp),
        }
    }
}

/// Fail if consecutive items are out of order.
pub(crate) fn check_sorted<'a, T: 'a>(
    items: impl Iterator<Item = &'a T>,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Result<(), TreeError> {
    let mut prev: Option<&T> = None;
    for (i, item) in items.enumerate() {
        if let Some(p) = prev
            && cmp(p, item) == Ordering::Greater
        {
            return Err(TreeError::Inconsistent(format!("items out of order at {i}")));
        }
        prev = Some(item);
    }
    Ok(())
}
