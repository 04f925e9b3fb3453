//! Filepath: src/tree/leaf_iterator.rs
//!
//! In-order leaf traversal.
//!
//! [`LeafIter`] walks the leaves of a tree left to right with an explicit
//! stack of `(inner node, next child)` frames, yielding each leaf together
//! with the logical index of its first position. Item iterators of the
//! collection types are built on top of it.

use smallvec::SmallVec;

use crate::leaf_trait::LeafStore;
use crate::node::{Inner, Node};

/// Iterator over the leaves of a tree, in order.
pub struct LeafIter<'a, L: LeafStore> {
    /// Ancestors of the current leaf, each with the next child to visit.
    stack: SmallVec<[(&'a Inner<L>, usize); 8]>,

    /// Subtree to descend into on the next call.
    pending: Option<&'a Node<L>>,

    /// Logical index of the next leaf's first position.
    base: usize,
}

impl<'a, L: LeafStore> LeafIter<'a, L> {
    pub(crate) fn new(root: &'a Node<L>) -> Self {
        Self {
            stack: SmallVec::new(),
            pending: Some(root),
            base: 0,
        }
    }

    /// Iterator whose first leaf contains position `index`, plus `index`'s
    /// offset within that leaf.
    pub(crate) fn seek(root: &'a Node<L>, index: usize) -> (Self, usize) {
        let mut stack = SmallVec::new();
        let mut node = root;
        let mut offset = index;
        let mut base = 0;
        while let Node::Inner(inner) = node {
            if inner.children.is_empty() {
                break;
            }
            let (ci, within, before) = inner.locate(offset);
            stack.push((inner, ci + 1));
            base += before;
            offset = within;
            node = inner.children[ci].node.as_ref();
        }
        let iter = Self {
            stack,
            pending: Some(node),
            base,
        };
        (iter, offset)
    }

    /// Leftmost leaf under `node`, pushing the frames passed on the way.
    fn descend(&mut self, mut node: &'a Node<L>) -> Option<&'a L> {
        loop {
            match node {
                Node::Leaf(leaf) => return Some(leaf),
                Node::Inner(inner) => {
                    let first = inner.children.first()?;
                    self.stack.push((inner, 1));
                    node = first.node.as_ref();
                }
            }
        }
    }
}

impl<'a, L: LeafStore> Iterator for LeafIter<'a, L> {
    type Item = (usize, &'a L);

    fn next(&mut self) -> Option<Self::Item> {
        let leaf = match self.pending.take() {
            Some(node) => self.descend(node),
            None => loop {
                let frame = self.stack.last_mut()?;
                let inner: &'a Inner<L> = frame.0;
                if let Some(child) = inner.children.get(frame.1) {
                    frame.1 += 1;
                    break self.descend(child.node.as_ref());
                }
                self.stack.pop();
            },
        }?;
        let base = self.base;
        self.base += leaf.span();
        Some((base, leaf))
    }
}

impl<L: LeafStore> std::iter::FusedIterator for LeafIter<'_, L> {}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "fail fast in tests")]
mod tests {
    use crate::config::TreeConfig;
    use crate::leaf::DenseLeaf;
    use crate::leaf_trait::LeafStore;
    use crate::tree::ATree;

    fn tree(n: u32) -> ATree<DenseLeaf<u32>> {
        let config = TreeConfig::default().with_max_leaf_size(3).with_max_inner_size(3);
        let mut tree = ATree::with_config(config).unwrap();
        for i in 0..n {
            tree.push(i).unwrap();
        }
        tree
    }

    #[test]
    fn test_leaves_cover_all_items_in_order() {
        let tree = tree(100);
        let mut expect = 0;
        for (base, leaf) in tree.leaves() {
            assert_eq!(base, expect as usize);
            for &item in leaf.as_slice() {
                assert_eq!(item, expect);
                expect += 1;
            }
        }
        assert_eq!(expect, 100);
    }

    #[test]
    fn test_seek_starts_at_containing_leaf() {
        let tree = tree(100);
        for target in [0, 1, 37, 99] {
            let (mut leaves, offset) = super::LeafIter::seek(tree.root(), target);
            let (base, leaf) = leaves.next().unwrap();
            assert_eq!(base + offset, target);
            assert_eq!(leaf.get(offset), Some(&(target as u32)));
        }
    }

    #[test]
    fn test_empty_tree_has_one_empty_leaf() {
        let tree = tree(0);
        let leaves: Vec<_> = tree.leaves().collect();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].1.span(), 0);
    }
}
