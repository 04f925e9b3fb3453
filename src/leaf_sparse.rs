//! Filepath: src/leaf_sparse.rs
//!
//! Sparse leaf: a run-length style leaf whose logical span may exceed the
//! number of items it stores.
//!
//! Items are kept as `(offset, item)` pairs sorted by offset. Every position
//! in `0..span` without a pair is *space* (unset). Inserting or removing
//! space only shifts offsets, so a leaf can describe millions of unset
//! positions with no storage for them.

use std::fmt as StdFmt;

use crate::leaf_trait::{LeafStore, SpaceLeaf};

/// A leaf of [`SparseAList`](crate::sparse::SparseAList).
///
/// # Invariants
/// - offsets are strictly increasing
/// - every offset is `< span`
#[derive(Clone, PartialEq, Eq)]
pub struct SparseLeaf<T> {
    entries: Vec<(usize, T)>,
    span: usize,
}

impl<T> Default for SparseLeaf<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            span: 0,
        }
    }
}

impl<T: StdFmt::Debug> StdFmt::Debug for SparseLeaf<T> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("SparseLeaf")
            .field("span", &self.span)
            .field("entries", &self.entries)
            .finish()
    }
}

impl<T> SparseLeaf<T> {
    /// Physical slot of the first entry at or after logical `index`.
    #[inline]
    fn slot_from(&self, index: usize) -> usize {
        self.entries.partition_point(|(offset, _)| *offset < index)
    }

    fn shift_from(&mut self, slot: usize, up: bool, by: usize) {
        for (offset, _) in &mut self.entries[slot..] {
            if up {
                *offset += by;
            } else {
                *offset -= by;
            }
        }
    }
}

impl<T: Clone> LeafStore for SparseLeaf<T> {
    type Item = T;

    #[inline(always)]
    fn span(&self) -> usize {
        self.span
    }

    #[inline(always)]
    fn local_count(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, index: usize) -> Option<&T> {
        let slot = self.slot_from(index);
        match self.entries.get(slot) {
            Some((offset, item)) if *offset == index => Some(item),
            _ => None,
        }
    }

    fn insert(&mut self, index: usize, item: T) {
        let slot = self.slot_from(index);
        self.shift_from(slot, true, 1);
        self.entries.insert(slot, (index, item));
        self.span += 1;
    }

    fn fill(&mut self, index: usize, item: T) -> Option<T> {
        let slot = self.slot_from(index);
        if let Some((offset, existing)) = self.entries.get_mut(slot)
            && *offset == index
        {
            return Some(std::mem::replace(existing, item));
        }
        self.entries.insert(slot, (index, item));
        None
    }

    fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.span {
            return None;
        }
        let slot = self.slot_from(index);
        let removed = match self.entries.get(slot) {
            Some((offset, _)) if *offset == index => Some(self.entries.remove(slot).1),
            _ => None,
        };
        self.shift_from(slot, false, 1);
        self.span -= 1;
        removed
    }

    fn remove_range<F>(&mut self, start: usize, end: usize, mut on_removed: F)
    where
        F: FnMut(&T),
    {
        let end = end.min(self.span);
        if start >= end {
            return;
        }
        let first = self.slot_from(start);
        let last = self.slot_from(end);
        for (_, item) in self.entries.drain(first..last) {
            on_removed(&item);
        }
        self.shift_from(first, false, end - start);
        self.span -= end - start;
    }

    fn split_local(&mut self, keep: usize) -> Self {
        if keep >= self.entries.len() {
            return Self::default();
        }
        let cut = self.entries[keep].0;
        let mut moved = self.entries.split_off(keep);
        for (offset, _) in &mut moved {
            *offset -= cut;
        }
        let right = Self {
            entries: moved,
            span: self.span - cut,
        };
        self.span = cut;
        right
    }

    fn append(&mut self, other: Self) {
        let base = self.span;
        self.entries.extend(
            other
                .entries
                .into_iter()
                .map(|(offset, item)| (offset + base, item)),
        );
        self.span += other.span;
    }

    #[inline(always)]
    fn last(&self) -> Option<&T> {
        self.entries.last().map(|(_, item)| item)
    }

    fn entries(&self) -> impl Iterator<Item = (usize, &T)> {
        self.entries.iter().map(|(offset, item)| (*offset, item))
    }
}

impl<T: Clone> SpaceLeaf for SparseLeaf<T> {
    fn insert_space(&mut self, index: usize, count: usize) {
        let slot = self.slot_from(index);
        self.shift_from(slot, true, count);
        self.span += count;
    }

    fn first_set_from(&self, from: usize) -> Option<(usize, &T)> {
        self.entries
            .get(self.slot_from(from))
            .map(|(offset, item)| (*offset, item))
    }

    fn last_set_before(&self, before: usize) -> Option<(usize, &T)> {
        let slot = self.slot_from(before);
        slot.checked_sub(1)
            .and_then(|s| self.entries.get(s))
            .map(|(offset, item)| (*offset, item))
    }
}
