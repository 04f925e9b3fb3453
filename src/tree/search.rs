//! Filepath: src/tree/search.rs
//!
//! Key routing for ordered trees.

use super::ATree;
use crate::leaf::DenseLeaf;
use crate::node::Node;

impl<T: Clone> ATree<DenseLeaf<T>> {
    /// Index of the first item for which `pred` is false.
    ///
    /// Items must be partitioned by `pred` (all `true` before all `false`).
    /// Inner nodes are routed through their children's cached last items,
    /// so this needs a keyed tree.
    pub(crate) fn partition_point(&self, mut pred: impl FnMut(&T) -> bool) -> usize {
        debug_assert!(self.is_keyed() || self.height == 0);
        let mut node: &Node<DenseLeaf<T>> = &self.root;
        let mut base = 0;
        loop {
            match node {
                Node::Leaf(leaf) => {
                    return base + leaf.as_slice().partition_point(|item| pred(item));
                }
                Node::Inner(inner) => {
                    let i = inner
                        .children
                        .partition_point(|c| c.high.as_ref().is_some_and(|high| pred(high)));
                    base += inner.children[..i].iter().map(|c| c.count).sum::<usize>();
                    match inner.children.get(i) {
                        Some(child) => node = child.node.as_ref(),
                        None => return base,
                    }
                }
            }
        }
    }
}
