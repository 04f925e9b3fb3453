//! Filepath: src/node.rs
//!
//! Tree nodes.
//!
//! A node is either a leaf (holds items directly) or an inner node (holds
//! child references plus each child's subtree count). All leaves sit at the
//! same depth.
//!
//! # Sharing
//!
//! Every node lives behind an [`Arc`]. A node whose `Arc` is referenced by
//! more than one parent or tree is *frozen*: it is never mutated in place.
//! Mutation goes through the engine's make-unique step, which replaces a
//! shared `Arc` with a private copy before touching it. A uniquely owned
//! node is mutated in place and keeps its address, which doubles as its
//! [`NodeId`].
//!
//! ```text
//!              Inner [ (c0, 48) (c1, 40) (c2, 17) ]     total = 105
//!               /            |           \
//!        Leaf(48 items)  Leaf(40)     Leaf(17)
//! ```

use std::fmt as StdFmt;
use std::sync::Arc;

use crate::config::TreeConfig;
use crate::leaf_trait::LeafStore;

/// Shared reference to a node.
pub type NodeRef<L> = Arc<Node<L>>;

// ============================================================================
//  NodeId
// ============================================================================

/// Identity of a node for observers.
///
/// Derived from the node's heap address. Stable while the node is uniquely
/// owned; a copy-on-write copy gets a new id, and observers are told about
/// the replacement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Id of the node behind `node`.
    #[must_use]
    #[inline(always)]
    pub fn of<L: LeafStore>(node: &Node<L>) -> Self {
        Self(std::ptr::from_ref(node).cast::<()>() as usize)
    }

    /// Id of the node an `Arc` points at.
    #[must_use]
    #[inline(always)]
    pub fn of_ref<L: LeafStore>(node: &NodeRef<L>) -> Self {
        Self::of(node.as_ref())
    }
}

impl StdFmt::Display for NodeId {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        write!(f, "node@{:#x}", self.0)
    }
}

// ============================================================================
//  Child
// ============================================================================

/// One slot of an inner node.
pub struct Child<L: LeafStore> {
    /// The child subtree.
    pub(crate) node: NodeRef<L>,

    /// Logical positions in the child's subtree.
    pub(crate) count: usize,

    /// Last item of the child's subtree. Maintained only in keyed trees,
    /// where it routes key searches.
    pub(crate) high: Option<L::Item>,
}

impl<L: LeafStore> Clone for Child<L> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
            count: self.count,
            high: self.high.clone(),
        }
    }
}

impl<L: LeafStore> Child<L> {
    /// Wrap a node, computing its count and (when `keyed`) its high key.
    #[must_use]
    pub(crate) fn new(node: NodeRef<L>, keyed: bool) -> Self {
        let count = node.span();
        let high = if keyed { node.last_item().cloned() } else { None };
        Self { node, count, high }
    }

    /// Child subtree.
    #[must_use]
    #[inline(always)]
    pub fn node(&self) -> &Node<L> {
        &self.node
    }

    /// Logical positions in the child subtree.
    #[must_use]
    #[inline(always)]
    pub const fn count(&self) -> usize {
        self.count
    }
}

// ============================================================================
//  Inner
// ============================================================================

/// An inner node: an ordered list of children with their subtree counts.
///
/// # Invariants
/// - `total == children.iter().map(|c| c.count).sum()`
/// - every `count` equals the child's actual span
pub struct Inner<L: LeafStore> {
    pub(crate) children: Vec<Child<L>>,
    pub(crate) total: usize,
}

impl<L: LeafStore> Default for Inner<L> {
    fn default() -> Self {
        Self {
            children: Vec::new(),
            total: 0,
        }
    }
}

impl<L: LeafStore> Clone for Inner<L> {
    fn clone(&self) -> Self {
        Self {
            children: self.children.clone(),
            total: self.total,
        }
    }
}

impl<L: LeafStore> Inner<L> {
    /// Build an inner node over `children`.
    #[must_use]
    pub(crate) fn from_children(children: Vec<Child<L>>) -> Self {
        let total = children.iter().map(|c| c.count).sum();
        Self { children, total }
    }

    /// Children in order.
    #[must_use]
    #[inline(always)]
    pub fn children(&self) -> &[Child<L>] {
        &self.children
    }

    /// Logical positions in this subtree.
    #[must_use]
    #[inline(always)]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Find the child containing logical `index`.
    ///
    /// Returns `(child_index, offset_in_child, positions_before_child)`.
    /// An index at or past the end resolves to the last child.
    #[must_use]
    pub(crate) fn locate(&self, index: usize) -> (usize, usize, usize) {
        let mut before = 0;
        for (i, child) in self.children.iter().enumerate() {
            if index < before + child.count {
                return (i, index - before, before);
            }
            before += child.count;
        }
        let last = self.children.len().saturating_sub(1);
        let last_count = self.children.get(last).map_or(0, |c| c.count);
        let base = before - last_count;
        (last, index - base, base)
    }

    /// Re-read child `i`'s count (and high key when `keyed`) from the node.
    pub(crate) fn refresh_child(&mut self, i: usize, keyed: bool) {
        let child = &mut self.children[i];
        let count = child.node.span();
        self.total = self.total - child.count + count;
        child.count = count;
        if keyed {
            child.high = child.node.last_item().cloned();
        }
    }

    pub(crate) fn insert_child(&mut self, at: usize, child: Child<L>) {
        self.total += child.count;
        self.children.insert(at, child);
    }

    pub(crate) fn remove_child(&mut self, at: usize) -> Child<L> {
        let child = self.children.remove(at);
        self.total -= child.count;
        child
    }

    /// Split off children from `keep` onwards into a new inner node.
    #[must_use]
    pub(crate) fn split_local(&mut self, keep: usize) -> Self {
        let moved = self.children.split_off(keep.min(self.children.len()));
        let right = Self::from_children(moved);
        self.total -= right.total;
        right
    }

    pub(crate) fn append(&mut self, other: Self) {
        self.total += other.total;
        self.children.extend(other.children);
    }
}

// ============================================================================
//  Node
// ============================================================================

/// A tree node.
pub enum Node<L: LeafStore> {
    /// Items stored directly.
    Leaf(L),

    /// Children plus per-child subtree counts.
    Inner(Inner<L>),
}

impl<L: LeafStore> Clone for Node<L> {
    fn clone(&self) -> Self {
        match self {
            Self::Leaf(leaf) => Self::Leaf(leaf.clone()),
            Self::Inner(inner) => Self::Inner(inner.clone()),
        }
    }
}

impl<L: LeafStore> StdFmt::Debug for Node<L> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::Leaf(leaf) => f
                .debug_struct("Leaf")
                .field("id", &NodeId::of(self))
                .field("span", &leaf.span())
                .field("items", &leaf.local_count())
                .finish(),
            Self::Inner(inner) => f
                .debug_struct("Inner")
                .field("id", &NodeId::of(self))
                .field("total", &inner.total)
                .field("children", &inner.children.len())
                .finish_non_exhaustive(),
        }
    }
}

impl<L: LeafStore> Node<L> {
    /// Logical positions in this subtree (`totalCount`).
    #[must_use]
    #[inline(always)]
    pub fn span(&self) -> usize {
        match self {
            Self::Leaf(leaf) => leaf.span(),
            Self::Inner(inner) => inner.total,
        }
    }

    /// Items (leaf) or children (inner) stored directly (`localCount`).
    #[must_use]
    #[inline(always)]
    pub fn local_count(&self) -> usize {
        match self {
            Self::Leaf(leaf) => leaf.local_count(),
            Self::Inner(inner) => inner.children.len(),
        }
    }

    /// Whether this is a leaf.
    #[must_use]
    #[inline(always)]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Capacity limit for this node's kind.
    #[must_use]
    #[inline(always)]
    pub(crate) const fn capacity(&self, config: &TreeConfig) -> usize {
        match self {
            Self::Leaf(_) => config.max_leaf_size,
            Self::Inner(_) => config.max_inner_size,
        }
    }

    /// Whether this node should be merged with or refilled from a sibling.
    #[must_use]
    pub(crate) fn is_undersized(&self, config: &TreeConfig) -> bool {
        match self {
            Self::Leaf(leaf) => config.leaf_undersized(leaf.local_count()),
            Self::Inner(inner) => config.inner_undersized(inner.children.len()),
        }
    }

    /// Last item of the subtree, read from the cached high keys of inner
    /// nodes. Only meaningful in keyed trees.
    #[must_use]
    pub(crate) fn last_item(&self) -> Option<&L::Item> {
        match self {
            Self::Leaf(leaf) => leaf.last(),
            Self::Inner(inner) => inner.children.last().and_then(|c| c.high.as_ref()),
        }
    }

    /// Empty node of the same kind.
    #[must_use]
    pub(crate) fn empty_like(&self) -> Self {
        match self {
            Self::Leaf(_) => Self::Leaf(L::default()),
            Self::Inner(_) => Self::Inner(Inner::default()),
        }
    }

    /// Split off local entries from `keep` onwards into a node of the same kind.
    #[must_use]
    pub(crate) fn split_local(&mut self, keep: usize) -> Self {
        match self {
            Self::Leaf(leaf) => Self::Leaf(leaf.split_local(keep)),
            Self::Inner(inner) => Self::Inner(inner.split_local(keep)),
        }
    }

    /// Append a sibling of the same kind. Returns the sibling back if the
    /// kinds differ.
    pub(crate) fn append(&mut self, other: Self) -> Result<(), Self> {
        match (self, other) {
            (Self::Leaf(a), Self::Leaf(b)) => {
                a.append(b);
                Ok(())
            }
            (Self::Inner(a), Self::Inner(b)) => {
                a.append(b);
                Ok(())
            }
            (_, other) => Err(other),
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "fail fast in tests")]
mod tests {
    use super::*;
    use crate::leaf::DenseLeaf;

    type L = DenseLeaf<u32>;

    fn leaf_node(items: &[u32]) -> NodeRef<L> {
        Arc::new(Node::Leaf(DenseLeaf::from_vec(items.to_vec())))
    }

    fn inner_of(leaves: &[&[u32]]) -> Inner<L> {
        Inner::from_children(
            leaves
                .iter()
                .map(|items| Child::new(leaf_node(items), true))
                .collect(),
        )
    }

    #[test]
    fn test_locate_by_prefix_sum() {
        let inner = inner_of(&[&[1, 2, 3], &[4, 5], &[6]]);
        assert_eq!(inner.total(), 6);

        assert_eq!(inner.locate(0), (0, 0, 0));
        assert_eq!(inner.locate(2), (0, 2, 0));
        assert_eq!(inner.locate(3), (1, 0, 3));
        assert_eq!(inner.locate(5), (2, 0, 5));
        // end position resolves into the last child
        assert_eq!(inner.locate(6), (2, 1, 5));
    }

    #[test]
    fn test_high_keys_follow_last_items() {
        let inner = inner_of(&[&[1, 2], &[7, 9]]);
        let highs: Vec<_> = inner.children().iter().map(|c| c.high).collect();
        assert_eq!(highs, vec![Some(2), Some(9)]);

        let node: Node<L> = Node::Inner(inner);
        assert_eq!(node.last_item(), Some(&9));
    }

    #[test]
    fn test_inner_split_and_append_keep_totals() {
        let mut inner = inner_of(&[&[1], &[2, 3], &[4, 5, 6]]);
        let right = inner.split_local(1);
        assert_eq!(inner.total(), 1);
        assert_eq!(right.total(), 5);

        inner.append(right);
        assert_eq!(inner.total(), 6);
        assert_eq!(inner.children().len(), 3);
    }

    #[test]
    fn test_append_rejects_mismatched_kinds() {
        let mut leaf: Node<L> = Node::Leaf(DenseLeaf::from_vec(vec![1]));
        let inner: Node<L> = Node::Inner(inner_of(&[&[2]]));
        assert!(leaf.append(inner).is_err());
    }

    #[test]
    fn test_ids_are_stable_for_unique_nodes() {
        let mut node = leaf_node(&[1, 2]);
        let before = NodeId::of_ref(&node);
        if let Node::Leaf(leaf) = Arc::get_mut(&mut node).unwrap() {
            leaf.insert(0, 0);
        }
        assert_eq!(NodeId::of_ref(&node), before);
    }
}
