//! Filepath: src/leaf_trait.rs
//!
//! Capability traits for leaf contents.
//!
//! The tree engine in [`crate::tree`] is generic over the leaf kind. A leaf
//! covers a contiguous *logical* index range of [`span()`](LeafStore::span)
//! positions and physically stores [`local_count()`](LeafStore::local_count)
//! items. For a dense leaf the two are equal; a sparse leaf may cover far
//! more positions than it stores.
//!
//! Capacity limits and split points are expressed in *physical* items, while
//! every index argument is a *logical* position within the leaf.

/// Leaf contents the tree engine can store, split and merge.
pub trait LeafStore: Clone + Default {
    /// Item type held by the leaf.
    type Item: Clone;

    /// Number of logical index positions covered by this leaf.
    fn span(&self) -> usize;

    /// Number of physical items stored.
    fn local_count(&self) -> usize;

    /// Item at logical `index`, or `None` if the position holds no item.
    fn get(&self, index: usize) -> Option<&Self::Item>;

    /// Whether a physical item is stored at logical `index`.
    fn is_set(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Insert `item` at `index`, shifting later positions up by one.
    ///
    /// `index` may equal [`span()`](LeafStore::span).
    fn insert(&mut self, index: usize, item: Self::Item);

    /// Store `item` at `index` without changing the span.
    ///
    /// Returns the item previously stored there.
    fn fill(&mut self, index: usize, item: Self::Item) -> Option<Self::Item>;

    /// Remove position `index`, shifting later positions down by one.
    ///
    /// Returns the item that occupied the position, if any.
    fn remove(&mut self, index: usize) -> Option<Self::Item>;

    /// Remove positions `start..end`, passing each removed item to `on_removed`.
    fn remove_range<F>(&mut self, start: usize, end: usize, on_removed: F)
    where
        F: FnMut(&Self::Item);

    /// Split off everything from physical item `keep` onwards.
    ///
    /// `self` keeps the first `keep` items and the returned leaf holds the
    /// rest. The logical span is divided at the first moved item.
    #[must_use]
    fn split_local(&mut self, keep: usize) -> Self;

    /// Append `other`'s positions after this leaf's last position.
    fn append(&mut self, other: Self);

    /// Last physical item, used as the routing key of keyed trees.
    fn last(&self) -> Option<&Self::Item>;

    /// Physical items with their logical positions, in order.
    fn entries(&self) -> impl Iterator<Item = (usize, &Self::Item)>;

    /// Physical items, in order.
    fn items(&self) -> impl Iterator<Item = &Self::Item> {
        self.entries().map(|(_, item)| item)
    }
}

/// Leaves that can hold unset positions ("space").
pub trait SpaceLeaf: LeafStore {
    /// Insert `count` unset positions before `index`.
    fn insert_space(&mut self, index: usize, count: usize);

    /// First stored item at a position `>= from`.
    fn first_set_from(&self, from: usize) -> Option<(usize, &Self::Item)>;

    /// Last stored item at a position `< before`.
    fn last_set_before(&self, before: usize) -> Option<(usize, &Self::Item)>;
}
