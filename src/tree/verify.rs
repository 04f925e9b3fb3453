//! Filepath: src/tree/verify.rs
//!
//! Structural validation and shape statistics, for tests and debugging.

use std::cmp::Ordering;

use super::{ATree, TreeError};
use crate::leaf_trait::LeafStore;
use crate::node::{Node, NodeId};

/// Shape summary of a tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Inner levels above the leaves.
    pub height: usize,
    /// Leaf count.
    pub leaves: usize,
    /// Inner node count.
    pub inner_nodes: usize,
    /// Physical items stored.
    pub items: usize,
    /// Largest leaf, in items.
    pub max_leaf_items: usize,
    /// Largest inner node, in children.
    pub max_inner_children: usize,
}

impl<L: LeafStore> ATree<L> {
    /// Walk the whole tree and check its structural invariants.
    ///
    /// # Errors
    /// [`TreeError::Inconsistent`] describing the first violation found.
    pub fn check_invariants(&self) -> Result<(), TreeError> {
        self.check_node(&self.root, 0).map(|_| ())
    }

    /// Check that every cached high key of a keyed tree equals the last
    /// item of its subtree under `cmp`.
    ///
    /// # Errors
    /// [`TreeError::Inconsistent`] naming the first stale key.
    pub(crate) fn check_high_keys(&self, cmp: impl Fn(&L::Item, &L::Item) -> Ordering) -> Result<(), TreeError> {
        if !self.keyed {
            return Ok(());
        }
        check_high_keys(&self.root, &cmp)
    }

    /// Count nodes and items.
    #[must_use]
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            height: self.height,
            ..TreeStats::default()
        };
        collect(&self.root, &mut stats);
        stats
    }

    fn check_node(&self, node: &Node<L>, depth: usize) -> Result<usize, TreeError> {
        let fail = |what: String| Err(TreeError::Inconsistent(what));
        match node {
            Node::Leaf(leaf) => {
                if depth != self.height {
                    return fail(format!("leaf at depth {depth}, height {}", self.height));
                }
                if leaf.local_count() > self.config.max_leaf_size {
                    return fail(format!("leaf holds {} items", leaf.local_count()));
                }
                let mut prev = None;
                for (offset, _) in leaf.entries() {
                    if offset >= leaf.span() || prev.is_some_and(|p| p >= offset) {
                        return fail(format!("leaf entry offset {offset} out of order"));
                    }
                    prev = Some(offset);
                }
                Ok(leaf.span())
            }
            Node::Inner(inner) => {
                if inner.children.is_empty() {
                    return fail("inner node without children".into());
                }
                if inner.children.len() > self.config.max_inner_size {
                    return fail(format!("inner node holds {} children", inner.children.len()));
                }
                let mut sum = 0;
                for child in &inner.children {
                    let span = self.check_node(&child.node, depth + 1)?;
                    if span != child.count {
                        return fail(format!("cached count {} but subtree spans {span}", child.count));
                    }
                    if self.keyed && child.high.is_none() != child.node.last_item().is_none() {
                        return fail("stale high key".into());
                    }
                    sum += span;
                }
                if sum != inner.total {
                    return fail(format!("inner total {} but children sum {sum}", inner.total));
                }
                Ok(sum)
            }
        }
    }
}

fn check_high_keys<L: LeafStore>(
    node: &Node<L>,
    cmp: &impl Fn(&L::Item, &L::Item) -> Ordering,
) -> Result<(), TreeError> {
    let Node::Inner(inner) = node else {
        return Ok(());
    };
    for (i, child) in inner.children.iter().enumerate() {
        let fresh = match (&child.high, child.node.last_item()) {
            (None, None) => true,
            (Some(high), Some(last)) => cmp(high, last) == Ordering::Equal,
            _ => false,
        };
        if !fresh {
            return Err(TreeError::Inconsistent(format!(
                "stale high key at child {i} of {}",
                NodeId::of(node)
            )));
        }
        check_high_keys(&child.node, cmp)?;
    }
    Ok(())
}

fn collect<L: LeafStore>(node: &Node<L>, stats: &mut TreeStats) {
    match node {
        Node::Leaf(leaf) => {
            stats.leaves += 1;
            stats.items += leaf.local_count();
            stats.max_leaf_items = stats.max_leaf_items.max(leaf.local_count());
        }
        Node::Inner(inner) => {
            stats.inner_nodes += 1;
            stats.max_inner_children = stats.max_inner_children.max(inner.children.len());
            for child in &inner.children {
                collect(&child.node, stats);
            }
        }
    }
}
