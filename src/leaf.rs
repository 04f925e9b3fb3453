//! Filepath: src/leaf.rs
//!
//! Dense leaf: every logical position holds exactly one item.

use std::fmt as StdFmt;

use crate::leaf_trait::LeafStore;

/// A leaf that stores its items contiguously in a `Vec`.
///
/// Backs [`AList`](crate::list::AList) and the key-ordered variants.
#[derive(Clone, PartialEq, Eq)]
pub struct DenseLeaf<T> {
    items: Vec<T>,
}

impl<T> Default for DenseLeaf<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: StdFmt::Debug> StdFmt::Debug for DenseLeaf<T> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}

impl<T> DenseLeaf<T> {
    /// Items as a slice.
    #[must_use]
    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Build a leaf from a vector of items.
    #[must_use]
    pub(crate) const fn from_vec(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T: Clone> LeafStore for DenseLeaf<T> {
    type Item = T;

    #[inline(always)]
    fn span(&self) -> usize {
        self.items.len()
    }

    #[inline(always)]
    fn local_count(&self) -> usize {
        self.items.len()
    }

    #[inline(always)]
    fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    #[inline(always)]
    fn is_set(&self, index: usize) -> bool {
        index < self.items.len()
    }

    fn insert(&mut self, index: usize, item: T) {
        self.items.insert(index, item);
    }

    fn fill(&mut self, index: usize, item: T) -> Option<T> {
        self.items
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, item))
    }

    fn remove(&mut self, index: usize) -> Option<T> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    fn remove_range<F>(&mut self, start: usize, end: usize, mut on_removed: F)
    where
        F: FnMut(&T),
    {
        let end = end.min(self.items.len());
        if start >= end {
            return;
        }
        for item in self.items.drain(start..end) {
            on_removed(&item);
        }
    }

    fn split_local(&mut self, keep: usize) -> Self {
        let keep = keep.min(self.items.len());
        Self {
            items: self.items.split_off(keep),
        }
    }

    fn append(&mut self, mut other: Self) {
        self.items.append(&mut other.items);
    }

    #[inline(always)]
    fn last(&self) -> Option<&T> {
        self.items.last()
    }

    fn entries(&self) -> impl Iterator<Item = (usize, &T)> {
        self.items.iter().enumerate()
    }

    fn items(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}
