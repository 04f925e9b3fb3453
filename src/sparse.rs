//! Filepath: src/sparse.rs
//!
//! `SparseAList` - a list whose positions may be unset ("space").
//!
//! Runs of unset positions cost no storage: a leaf records only its set
//! items and its logical span. A list of a billion unset positions is a
//! single empty leaf.
//!
//! ```
//! use atree::SparseAList;
//!
//! let mut list: SparseAList<u32> = SparseAList::new();
//! list.insert_space(0, 100)?;
//! list.set(99, 777)?;
//!
//! let mut at = Some(usize::MAX);
//! assert_eq!(list.next_lower_item(&mut at), Some(&777));
//! assert_eq!(at, Some(99));
//! assert_eq!(list.next_lower_item(&mut at), None);
//! assert_eq!(at, None);
//! # Ok::<(), atree::TreeError>(())
//! ```

use crate::change::{ChangeAction, delta};
use crate::leaf_sparse::SparseLeaf;
use crate::leaf_trait::{LeafStore, SpaceLeaf};
use crate::node::Node;
use crate::tree::{ATree, TreeError, ops};

/// Sparse list backed by an [`ATree`].
pub type SparseAList<T> = ATree<SparseLeaf<T>>;

impl<T: Clone> ATree<SparseLeaf<T>> {
    /// Whether position `index` holds an item.
    #[must_use]
    pub fn is_set(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Insert `count` unset positions before `index`.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`], a veto, or [`TreeError::IndexOutOfRange`]
    /// when `index > len` or the new length would exceed `usize::MAX`.
    pub fn insert_space(&mut self, index: usize, count: usize) -> Result<(), TreeError> {
        self.ensure_writable()?;
        let len = self.len();
        if index > len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        self.grown_len(count)?;
        if count == 0 {
            return Ok(());
        }
        self.hooks_mut()
            .before(ChangeAction::Add, index, delta(count), &[])?;
        self.with_ctx(|tree, ctx| ops::insert_space(tree.root_slot(), None, index, count, ctx));
        self.hooks_mut().after(delta(count));
        Ok(())
    }

    /// Append `count` unset positions.
    ///
    /// # Errors
    /// As [`insert_space`](Self::insert_space).
    pub fn push_space(&mut self, count: usize) -> Result<(), TreeError> {
        self.insert_space(self.len(), count)
    }

    /// Unset positions `index..index + count`, discarding their items.
    ///
    /// A range running past the end grows the list to `index + count`.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`], a veto, or [`TreeError::IndexOutOfRange`]
    /// when `index > len` or `index + count` exceeds `usize::MAX`.
    pub fn clear_space(&mut self, index: usize, count: usize) -> Result<(), TreeError> {
        self.ensure_writable()?;
        let len = self.len();
        if index > len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        let Some(end) = index.checked_add(count) else {
            return Err(TreeError::IndexOutOfRange { index: usize::MAX, len });
        };
        let growth = delta(end.saturating_sub(len));
        self.hooks_mut()
            .before(ChangeAction::Replace, index, growth, &[])?;
        self.with_ctx(|tree, ctx| {
            tree.cut(index, end.min(len), ctx);
            if count > 0 {
                ops::insert_space(tree.root_slot(), None, index, count, ctx);
            }
        });
        self.hooks_mut().after(growth);
        Ok(())
    }

    /// Nearest set item strictly after `*index` (from the start when
    /// `None`).
    ///
    /// On success `*index` becomes the item's position; otherwise `None`.
    pub fn next_higher_item(&self, index: &mut Option<usize>) -> Option<&T> {
        let from = match *index {
            None => Some(0),
            Some(i) => i.checked_add(1),
        };
        let found = from.and_then(|from| first_set_from(self.root(), from));
        *index = found.map(|(at, _)| at);
        found.map(|(_, item)| item)
    }

    /// Nearest set item strictly before `*index` (from the end when
    /// `None`).
    ///
    /// On success `*index` becomes the item's position; otherwise `None`.
    pub fn next_lower_item(&self, index: &mut Option<usize>) -> Option<&T> {
        let before = index.unwrap_or(usize::MAX).min(self.len());
        let found = last_set_before(self.root(), before);
        *index = found.map(|(at, _)| at);
        found.map(|(_, item)| item)
    }

    /// Number of set positions.
    #[must_use]
    pub fn real_item_count(&self) -> usize {
        self.leaves().map(|(_, leaf)| leaf.local_count()).sum()
    }

    /// Set positions with their items, in order.
    pub fn iter_set(&self) -> impl Iterator<Item = (usize, &T)> {
        self.leaves()
            .flat_map(|(base, leaf)| leaf.entries().map(move |(offset, item)| (base + offset, item)))
    }
}

fn first_set_from<L: SpaceLeaf>(node: &Node<L>, from: usize) -> Option<(usize, &L::Item)> {
    match node {
        Node::Leaf(leaf) => leaf.first_set_from(from),
        Node::Inner(inner) => {
            let mut base = 0;
            for child in &inner.children {
                let end = base + child.count;
                if from < end
                    && let Some((at, item)) = first_set_from(&child.node, from.saturating_sub(base))
                {
                    return Some((base + at, item));
                }
                base = end;
            }
            None
        }
    }
}

fn last_set_before<L: SpaceLeaf>(node: &Node<L>, before: usize) -> Option<(usize, &L::Item)> {
    match node {
        Node::Leaf(leaf) => leaf.last_set_before(before),
        Node::Inner(inner) => {
            let mut base = inner.total;
            for child in inner.children.iter().rev() {
                base -= child.count;
                if base < before
                    && let Some((at, item)) = last_set_before(&child.node, before - base)
                {
                    return Some((base + at, item));
                }
            }
            None
        }
    }
}
