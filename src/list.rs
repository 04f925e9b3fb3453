//! Filepath: src/list.rs
//!
//! `AList` - an indexable list with O(log n) insert and remove anywhere.
//!
//! ```
//! use atree::AList;
//!
//! let mut list: AList<u32> = (0..10).collect();
//! list.insert(5, 100)?;
//! assert_eq!(list[5], 100);
//! assert_eq!(list.len(), 11);
//!
//! // O(1) snapshot; the original is untouched by later writes.
//! let snapshot = list.clone();
//! list.remove_range(0, 5)?;
//! assert_eq!(snapshot.len(), 11);
//! # Ok::<(), atree::TreeError>(())
//! ```

use std::iter::FusedIterator;
use std::ops::Index;

use crate::leaf::DenseLeaf;
use crate::tree::{ATree, LeafIter, TreeError};

/// Dense list backed by an [`ATree`].
pub type AList<T> = ATree<DenseLeaf<T>>;

// ============================================================================
//  Iter
// ============================================================================

/// Iterator over the items of a dense tree, in order.
pub struct Iter<'a, T: Clone> {
    leaves: LeafIter<'a, DenseLeaf<T>>,
    current: std::slice::Iter<'a, T>,
    remaining: usize,
}

impl<'a, T: Clone> Iter<'a, T> {
    pub(crate) fn starting_at(tree: &'a ATree<DenseLeaf<T>>, index: usize) -> Self {
        let index = index.min(tree.len());
        let (mut leaves, offset) = LeafIter::seek(tree.root(), index);
        let current = match leaves.next() {
            Some((_, leaf)) => {
                let items = leaf.as_slice();
                items[offset.min(items.len())..].iter()
            }
            None => <&[T]>::default().iter(),
        };
        Self {
            leaves,
            current,
            remaining: tree.len() - index,
        }
    }
}

impl<'a, T: Clone> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        loop {
            if let Some(item) = self.current.next() {
                self.remaining -= 1;
                return Some(item);
            }
            let (_, leaf) = self.leaves.next()?;
            self.current = leaf.as_slice().iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Clone> ExactSizeIterator for Iter<'_, T> {}

impl<T: Clone> FusedIterator for Iter<'_, T> {}

// ============================================================================
//  List operations
// ============================================================================

impl<T: Clone> ATree<DenseLeaf<T>> {
    /// Items in order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::starting_at(self, 0)
    }

    /// Items from position `index` onwards.
    #[must_use]
    pub fn iter_from(&self, index: usize) -> Iter<'_, T> {
        Iter::starting_at(self, index)
    }

    /// Copy the items into a `Vec`.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        for (_, leaf) in self.leaves() {
            out.extend_from_slice(leaf.as_slice());
        }
        out
    }

    /// Insert `item` at the front.
    ///
    /// # Errors
    /// As [`ATree::insert`].
    pub fn push_front(&mut self, item: T) -> Result<(), TreeError> {
        self.insert(0, item)
    }

    /// Remove and return the last item (`None` when empty).
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`] or a veto.
    pub fn pop(&mut self) -> Result<Option<T>, TreeError> {
        match self.len().checked_sub(1) {
            Some(last) => self.remove_at(last),
            None => self.ensure_writable().map(|()| None),
        }
    }

    /// Remove and return the first item (`None` when empty).
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`] or a veto.
    pub fn pop_front(&mut self) -> Result<Option<T>, TreeError> {
        if self.is_empty() {
            return self.ensure_writable().map(|()| None);
        }
        self.remove_at(0)
    }
}

impl<T: Clone + PartialEq> ATree<DenseLeaf<T>> {
    /// Position of the first item equal to `item` (linear scan).
    #[must_use]
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.iter().position(|x| x == item)
    }

    /// Whether any item equals `item` (linear scan).
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.index_of(item).is_some()
    }
}

// ============================================================================
//  Std traits
// ============================================================================

impl<T: Clone> FromIterator<T> for ATree<DenseLeaf<T>> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_items(crate::config::TreeConfig::default(), false, iter.into_iter().collect())
    }
}

impl<T: Clone> Extend<T> for ATree<DenseLeaf<T>> {
    /// # Panics
    /// If the list is frozen or a list-changing hook vetoes the insertion;
    /// use [`ATree::insert_range`] to handle those as errors.
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        if let Err(err) = self.insert_range(self.len(), iter) {
            panic!("cannot extend list: {err}");
        }
    }
}

impl<T: Clone> Index<usize> for ATree<DenseLeaf<T>> {
    type Output = T;

    /// # Panics
    /// If `index >= len`, like slice indexing.
    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(item) => item,
            None => panic!("index {index} out of range for length {}", self.len()),
        }
    }
}

impl<'a, T: Clone> IntoIterator for &'a ATree<DenseLeaf<T>> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<T: Clone + PartialEq> PartialEq for ATree<DenseLeaf<T>> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Clone + Eq> Eq for ATree<DenseLeaf<T>> {}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "fail fast in tests")]
mod tests {
    use super::*;
    use crate::config::TreeConfig;

    fn small(n: u32) -> AList<u32> {
        let config = TreeConfig::default().with_max_leaf_size(4).with_max_inner_size(4);
        let mut list = AList::with_config(config).unwrap();
        list.insert_range(0, 0..n).unwrap();
        list
    }

    #[test]
    fn test_iter_matches_to_vec() {
        let list = small(77);
        let via_iter: Vec<u32> = list.iter().copied().collect();
        assert_eq!(via_iter, list.to_vec());
        assert_eq!(via_iter, (0..77).collect::<Vec<_>>());
        assert_eq!(list.iter().len(), 77);
    }

    #[test]
    fn test_iter_from_each_position() {
        let list = small(30);
        for start in 0..=31 {
            let tail: Vec<u32> = list.iter_from(start).copied().collect();
            let expect: Vec<u32> = (start.min(30) as u32..30).collect();
            assert_eq!(tail, expect, "start {start}");
        }
    }

    #[test]
    fn test_pop_both_ends() {
        let mut list = small(3);
        assert_eq!(list.pop().unwrap(), Some(2));
        assert_eq!(list.pop_front().unwrap(), Some(0));
        assert_eq!(list.pop().unwrap(), Some(1));
        assert_eq!(list.pop().unwrap(), None);
        assert_eq!(list.pop_front().unwrap(), None);

        list.freeze();
        assert_eq!(list.pop(), Err(TreeError::ReadOnly));
    }

    #[test]
    fn test_index_and_search() {
        let mut list = small(10);
        list.push_front(42).unwrap();
        assert_eq!(list[0], 42);
        assert_eq!(list[10], 9);
        assert_eq!(list.index_of(&5), Some(6));
        assert!(list.contains(&42));
        assert!(!list.contains(&100));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_index_past_end_panics() {
        let list = small(2);
        let _ = list[2];
    }

    #[test]
    fn test_collect_extend_and_eq() {
        let mut a: AList<u32> = (0..100).collect();
        a.extend(100..150);
        let b: AList<u32> = (0..150).collect();
        assert_eq!(a, b);
        assert_eq!((&a).into_iter().count(), 150);

        a.set(0, 7).unwrap();
        assert_ne!(a, b);
    }
}
