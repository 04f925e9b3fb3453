//! Filepath: src/tree/bulk.rs
//!
//! Bulk structural operations: append, prepend, section copy and removal.
//!
//! Append and prepend *graft* the other tree's root into the receiver's
//! spine at the level where heights match, so their cost follows the height
//! difference rather than the number of items moved:
//!
//! ```text
//!   host (height 2)             guest (height 1)
//!        R                           G
//!      /   \                       /   \
//!     A     B      append  ==>   g0     g1
//!
//!        R
//!      /   \
//!     A     B + G        (G linked as B's last child; B splits if full)
//! ```
//!
//! Only the pair of nodes meeting at the seam is rebalanced. Undersized
//! nodes deeper along the seam are left for later passes.
//!
//! With an observer attached, a graft is reported as a rebuild: the
//! observer is reset and the whole tree re-announced.
//!
//! Grafting a snapshot of a tree into itself links the same node at two
//! positions. Observers identify nodes by address, so before announcing,
//! [`unshare_repeats`](ATree::unshare_repeats) gives every position after a
//! node's first its own copy.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::ops::{self, Side, rebalance_pair, seam_undersized};
use super::{ATree, Ctx, TreeError};
use crate::change::{ChangeAction, delta};
use crate::config::TreeConfig;
use crate::leaf_trait::LeafStore;
use crate::node::{Child, Inner, Node, NodeId, NodeRef};
use crate::tracing_helpers::debug_log;

impl<L: LeafStore> ATree<L> {
    /// Move every position of `other` after this tree's last position.
    ///
    /// `other` is consumed; its nodes are linked in, not copied. Nodes it
    /// shares with other trees stay shared and are copied on first write.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`] or a veto; [`TreeError::Inconsistent`] only
    /// for a corrupted tree.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(len = self.len(), other = other.len()))
    )]
    pub fn append(&mut self, other: Self) -> Result<(), TreeError> {
        self.join(other, Side::Right)
    }

    /// Append a snapshot of `other`, leaving it unchanged.
    ///
    /// # Errors
    /// As [`append`](Self::append).
    pub fn append_copy(&mut self, other: &Self) -> Result<(), TreeError> {
        self.join(other.clone(), Side::Right)
    }

    /// Move every position of `other` before this tree's first position.
    ///
    /// # Errors
    /// As [`append`](Self::append).
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(len = self.len(), other = other.len()))
    )]
    pub fn prepend(&mut self, other: Self) -> Result<(), TreeError> {
        self.join(other, Side::Left)
    }

    /// Prepend a snapshot of `other`, leaving it unchanged.
    ///
    /// # Errors
    /// As [`append`](Self::append).
    pub fn prepend_copy(&mut self, other: &Self) -> Result<(), TreeError> {
        self.join(other.clone(), Side::Left)
    }

    /// New tree holding positions `start..start + count`.
    ///
    /// The section shares every node that lies wholly inside the range.
    ///
    /// # Errors
    /// [`TreeError::IndexOutOfRange`] if the range leaves `0..=len`.
    pub fn copy_section(&self, start: usize, count: usize) -> Result<Self, TreeError> {
        let len = self.len();
        let end = section_end(start, count, len)?;
        let mut section = self.clone();
        section.with_ctx(|tree, ctx| {
            tree.cut(end, len, ctx);
            tree.cut(0, start, ctx);
        });
        Ok(section)
    }

    /// Remove positions `start..start + count`.
    ///
    /// Children wholly inside the range are unlinked without visiting their
    /// items (unless an observer needs to hear about them).
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`], [`TreeError::IndexOutOfRange`] or a veto.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self), fields(len = self.len()))
    )]
    pub fn remove_range(&mut self, start: usize, count: usize) -> Result<(), TreeError> {
        self.ensure_writable()?;
        let end = section_end(start, count, self.len())?;
        if count == 0 {
            return Ok(());
        }
        self.hooks.before(ChangeAction::Remove, start, -delta(count), &[])?;
        self.with_ctx(|tree, ctx| tree.cut(start, end, ctx));
        self.hooks.after(-delta(count));
        Ok(())
    }

    /// Remove positions `start..start + count` and return them as a tree.
    ///
    /// # Errors
    /// As [`remove_range`](Self::remove_range).
    pub fn remove_section(&mut self, start: usize, count: usize) -> Result<Self, TreeError> {
        self.ensure_writable()?;
        let removed = self.copy_section(start, count)?;
        self.remove_range(start, count)?;
        Ok(removed)
    }

    /// Insert `items` before position `index`.
    ///
    /// The items are built into a balanced subtree which is then grafted in,
    /// splitting this tree at `index` when inserting in the middle.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`], [`TreeError::IndexOutOfRange`] or a veto.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, items), fields(len = self.len()))
    )]
    pub fn insert_range<I>(&mut self, index: usize, items: I) -> Result<(), TreeError>
    where
        I: IntoIterator<Item = L::Item>,
    {
        self.ensure_writable()?;
        let len = self.len();
        if index > len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        let items: Vec<L::Item> = items.into_iter().collect();
        if items.is_empty() {
            return Ok(());
        }
        self.grown_len(items.len())?;
        let added = delta(items.len());
        self.hooks.before(ChangeAction::Add, index, added, &items)?;
        self.with_rebuild(|tree, ctx| {
            let Some((guest, height)) = build_subtree(items, tree.config, tree.keyed) else {
                return Ok(());
            };
            if index == len {
                return tree.graft_subtree(guest, height, Side::Right, ctx);
            }
            if index == 0 {
                return tree.graft_subtree(guest, height, Side::Left, ctx);
            }
            let mut tail = tree.clone();
            tail.cut(0, index, ctx);
            tree.cut(index, len, ctx);
            tree.graft_subtree(guest, height, Side::Right, ctx)?;
            tree.graft_subtree(tail.root, tail.height, Side::Right, ctx)
        })?;
        self.hooks.after(added);
        Ok(())
    }

    /// Tree holding `items`, built bottom-up with evenly filled nodes.
    pub(crate) fn from_items(config: TreeConfig, keyed: bool, items: Vec<L::Item>) -> Self {
        let mut tree = Self::build(config, keyed);
        if let Some((root, height)) = build_subtree(items, config, keyed) {
            tree.root = root;
            tree.height = height;
        }
        tree
    }

    // ========================================================================
    //  Internals
    // ========================================================================

    fn join(&mut self, mut other: Self, side: Side) -> Result<(), TreeError> {
        self.ensure_writable()?;
        let added = other.len();
        if added == 0 {
            return Ok(());
        }
        self.grown_len(added)?;
        let at = match side {
            Side::Left => 0,
            Side::Right => self.len(),
        };
        self.hooks.before(ChangeAction::Add, at, delta(added), &[])?;
        other.detach_observer();
        self.with_rebuild(|tree, ctx| tree.graft_tree(other, side, ctx))?;
        self.hooks.after(delta(added));
        debug_log!(len = self.len(), height = self.height, "graft complete");
        Ok(())
    }

    fn graft_tree(&mut self, other: Self, side: Side, ctx: &mut Ctx<'_, L::Item>) -> Result<(), TreeError> {
        if other.config == self.config && other.keyed == self.keyed {
            return self.graft_subtree(other.root, other.height, side, ctx);
        }
        // Node sizes differ: graft leaf by leaf, re-chunked to our limits.
        let mut pieces = other.rechunk(self.config.max_leaf_size);
        if side == Side::Left {
            pieces.reverse();
        }
        for piece in pieces {
            self.graft_subtree(Arc::new(Node::Leaf(piece)), 0, side, ctx)?;
        }
        Ok(())
    }

    fn graft_subtree(
        &mut self,
        guest: NodeRef<L>,
        guest_height: usize,
        side: Side,
        ctx: &mut Ctx<'_, L::Item>,
    ) -> Result<(), TreeError> {
        if guest.span() == 0 {
            return Ok(());
        }
        if self.is_empty() {
            self.root = guest;
            self.height = guest_height;
            return Ok(());
        }

        let keyed = self.keyed;
        if guest_height == self.height {
            let outer = match side {
                Side::Right => guest,
                Side::Left => std::mem::replace(&mut self.root, guest),
            };
            self.grow_root(Child::new(outer, keyed), ctx);
            let root = super::context::make_unique(&mut self.root, None, ctx);
            let id = NodeId::of(root);
            if let Node::Inner(inner) = root
                && seam_undersized(inner, 0, ctx)
            {
                rebalance_pair(inner, id, 0, ctx);
            }
        } else {
            let (levels, child, side) = if guest_height < self.height {
                (self.height - guest_height - 1, Child::new(guest, keyed), side)
            } else {
                // Guest is taller: it becomes the host.
                let host = std::mem::replace(&mut self.root, guest);
                let host_height = std::mem::replace(&mut self.height, guest_height);
                (guest_height - host_height - 1, Child::new(host, keyed), side.opposite())
            };
            if let Some(right) = ops::graft_spine(&mut self.root, None, levels, child, side, ctx)? {
                self.grow_root(right, ctx);
            }
        }
        self.collapse_root(ctx);
        Ok(())
    }

    /// Give every node linked at more than one position a private deep
    /// copy at each position after its first (in depth-first order).
    ///
    /// Subtrees holding no repeated node are left shared.
    pub(crate) fn unshare_repeats(&mut self) {
        let mut seen = FxHashSet::default();
        let mut repeats = FxHashSet::default();
        find_repeats(&self.root, &mut seen, &mut repeats);
        if repeats.is_empty() {
            return;
        }
        debug_log!(repeats = repeats.len(), "unsharing repeated nodes");
        let mut pass = Unshare {
            repeats,
            holds: FxHashMap::default(),
            kept: FxHashSet::default(),
            retired: Vec::new(),
        };
        pass.visit(&mut self.root);
    }

    /// Leaves cloned and split so none exceeds `max` items.
    fn rechunk(&self, max: usize) -> Vec<L> {
        let half = (max / 2).max(1);
        let mut pieces = Vec::new();
        for (_, leaf) in self.leaves() {
            let mut leaf = leaf.clone();
            while leaf.local_count() > max {
                let rest = leaf.split_local(half);
                pieces.push(std::mem::replace(&mut leaf, rest));
            }
            pieces.push(leaf);
        }
        pieces
    }

    /// Remove `start..end` without hooks or bounds checks.
    pub(crate) fn cut(&mut self, start: usize, end: usize, ctx: &mut Ctx<'_, L::Item>) {
        if start >= end {
            return;
        }
        ops::remove_range(&mut self.root, None, start, end, ctx);
        self.collapse_root(ctx);
    }
}

// ============================================================================
//  Unsharing repeated nodes
// ============================================================================

/// Record in `repeats` every node reached at more than one position.
fn find_repeats<L: LeafStore>(
    node: &NodeRef<L>,
    seen: &mut FxHashSet<NodeId>,
    repeats: &mut FxHashSet<NodeId>,
) {
    let id = NodeId::of_ref(node);
    if !seen.insert(id) {
        repeats.insert(id);
        return;
    }
    if let Node::Inner(inner) = node.as_ref() {
        for child in &inner.children {
            find_repeats(&child.node, seen, repeats);
        }
    }
}

struct Unshare<L: LeafStore> {
    repeats: FxHashSet<NodeId>,

    /// Whether a repeated node lies below a node, by node.
    holds: FxHashMap<NodeId, bool>,

    /// Repeated nodes already kept at their first position.
    kept: FxHashSet<NodeId>,

    /// Replaced nodes, kept alive until the pass ends so no address is
    /// reused while ids are compared.
    retired: Vec<NodeRef<L>>,
}

impl<L: LeafStore> Unshare<L> {
    fn visit(&mut self, slot: &mut NodeRef<L>) {
        let id = NodeId::of_ref(slot);
        if self.repeats.contains(&id) && !self.kept.insert(id) {
            let copy = deep_copy(slot);
            self.retired.push(std::mem::replace(slot, copy));
            return;
        }
        if !self.holds_repeat(slot.as_ref()) {
            return;
        }
        if let Node::Inner(inner) = Arc::make_mut(slot) {
            for child in &mut inner.children {
                self.visit(&mut child.node);
            }
        }
    }

    fn holds_repeat(&mut self, node: &Node<L>) -> bool {
        let Node::Inner(inner) = node else {
            return false;
        };
        let id = NodeId::of(node);
        if let Some(&known) = self.holds.get(&id) {
            return known;
        }
        let holds = inner
            .children
            .iter()
            .any(|c| self.repeats.contains(&NodeId::of_ref(&c.node)) || self.holds_repeat(&c.node));
        self.holds.insert(id, holds);
        holds
    }
}

fn deep_copy<L: LeafStore>(node: &Node<L>) -> NodeRef<L> {
    let mut copy = node.clone();
    if let Node::Inner(inner) = &mut copy {
        for child in &mut inner.children {
            child.node = deep_copy(&child.node);
        }
    }
    Arc::new(copy)
}

/// Balanced subtree over `items` and its height; `None` when empty.
fn build_subtree<L: LeafStore>(
    items: Vec<L::Item>,
    config: TreeConfig,
    keyed: bool,
) -> Option<(NodeRef<L>, usize)> {
    let mut items = items.into_iter();
    let mut level: Vec<NodeRef<L>> = group_sizes(items.len(), config.max_leaf_size)
        .into_iter()
        .map(|size| {
            let mut leaf = L::default();
            for item in items.by_ref().take(size) {
                leaf.insert(leaf.span(), item);
            }
            Arc::new(Node::Leaf(leaf))
        })
        .collect();

    let mut height = 0;
    while level.len() > 1 {
        let mut nodes = level.into_iter();
        level = group_sizes(nodes.len(), config.max_inner_size)
            .into_iter()
            .map(|size| {
                let children = nodes.by_ref().take(size).map(|n| Child::new(n, keyed)).collect();
                Arc::new(Node::Inner(Inner::from_children(children)))
            })
            .collect();
        height += 1;
    }
    level.pop().map(|root| (root, height))
}

/// Split `n` into the fewest groups of at most `max`, sized as evenly as
/// possible.
fn group_sizes(n: usize, max: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let groups = n.div_ceil(max);
    let (base, extra) = (n / groups, n % groups);
    (0..groups).map(|g| base + usize::from(g < extra)).collect()
}

fn section_end(start: usize, count: usize, len: usize) -> Result<usize, TreeError> {
    start
        .checked_add(count)
        .filter(|&end| end <= len)
        .ok_or(TreeError::IndexOutOfRange {
            index: start.saturating_add(count),
            len,
        })
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "fail fast in tests")]
mod tests {
    use rustc_hash::FxHashSet;

    use crate::config::TreeConfig;
    use crate::leaf::DenseLeaf;
    use crate::node::{Node, NodeId};
    use crate::tree::{ATree, TreeError};

    type Tree = ATree<DenseLeaf<usize>>;

    fn range(config: TreeConfig, r: std::ops::Range<usize>) -> Tree {
        let mut tree = Tree::with_config(config).unwrap();
        for i in r {
            tree.push(i).unwrap();
        }
        tree
    }

    fn contents(tree: &Tree) -> Vec<usize> {
        (0..tree.len()).map(|i| *tree.get(i).unwrap()).collect()
    }

    fn small() -> TreeConfig {
        TreeConfig::default().with_max_leaf_size(5).with_max_inner_size(4)
    }

    #[test]
    fn test_append_small_to_large() {
        let mut a = range(small(), 0..80);
        let b = range(small(), 80..960);
        a.append(b).unwrap();

        assert_eq!(a.len(), 960);
        assert_eq!(contents(&a), (0..960).collect::<Vec<_>>());
        a.check_invariants().unwrap();
    }

    #[test]
    fn test_prepend_taller_tree() {
        let mut a = range(small(), 500..503);
        let b = range(small(), 0..500);
        a.prepend(b).unwrap();

        assert_eq!(contents(&a), (0..503).collect::<Vec<_>>());
        a.check_invariants().unwrap();
    }

    #[test]
    fn test_append_copy_leaves_source_intact() {
        let mut a = range(small(), 0..30);
        let b = range(small(), 30..60);
        a.append_copy(&b).unwrap();
        a.push(60).unwrap();

        assert_eq!(contents(&b), (30..60).collect::<Vec<_>>());
        assert_eq!(contents(&a), (0..61).collect::<Vec<_>>());
        a.check_invariants().unwrap();
        b.check_invariants().unwrap();
    }

    #[test]
    fn test_append_with_different_limits() {
        let mut a = range(small(), 0..40);
        let b = range(TreeConfig::default(), 40..200);
        a.append(b).unwrap();

        assert_eq!(contents(&a), (0..200).collect::<Vec<_>>());
        a.check_invariants().unwrap();
    }

    #[test]
    fn test_copy_section_shares_and_isolates() {
        let tree = range(small(), 0..300);
        let mut section = tree.copy_section(100, 50).unwrap();

        assert_eq!(contents(&section), (100..150).collect::<Vec<_>>());
        section.set(0, 0).unwrap();
        assert_eq!(tree.get(100), Some(&100));
        section.check_invariants().unwrap();
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_remove_section_returns_removed() {
        let mut tree = range(small(), 0..300);
        let removed = tree.remove_section(10, 250).unwrap();

        assert_eq!(contents(&removed), (10..260).collect::<Vec<_>>());
        let mut expect: Vec<usize> = (0..10).collect();
        expect.extend(260..300);
        assert_eq!(contents(&tree), expect);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_insert_range_in_middle() {
        let mut tree = range(small(), 0..50);
        tree.insert_range(20, 1000..1100).unwrap();

        let mut expect: Vec<usize> = (0..20).collect();
        expect.extend(1000..1100);
        expect.extend(20..50);
        assert_eq!(contents(&tree), expect);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_from_items_is_balanced() {
        let tree = Tree::from_items(small(), false, (0..333).collect());
        assert_eq!(contents(&tree), (0..333).collect::<Vec<_>>());
        tree.check_invariants().unwrap();
        let stats = tree.stats();
        assert!(stats.leaves >= 333 / 5);
    }

    #[test]
    fn test_group_sizes_are_even() {
        assert_eq!(super::group_sizes(0, 4), Vec::<usize>::new());
        assert_eq!(super::group_sizes(9, 4), vec![3, 3, 3]);
        assert_eq!(super::group_sizes(10, 4), vec![4, 3, 3]);
    }

    fn distinct_nodes(tree: &Tree) -> bool {
        fn walk(node: &Node<DenseLeaf<usize>>, seen: &mut FxHashSet<NodeId>) -> bool {
            seen.insert(NodeId::of(node))
                && match node {
                    Node::Leaf(_) => true,
                    Node::Inner(inner) => inner.children.iter().all(|c| walk(c.node(), seen)),
                }
        }
        walk(tree.root(), &mut FxHashSet::default())
    }

    #[test]
    fn test_unshare_repeats_after_self_graft() {
        let mut tree = range(small(), 0..40);
        let snapshot = tree.clone();
        tree.append_copy(&snapshot).unwrap();
        tree.prepend_copy(&snapshot).unwrap();
        assert!(!distinct_nodes(&tree));

        tree.unshare_repeats();
        assert!(distinct_nodes(&tree));
        let mut expect: Vec<usize> = (0..40).collect();
        expect.extend(0..40);
        expect.extend(0..40);
        assert_eq!(contents(&tree), expect);
        assert_eq!(contents(&snapshot), (0..40).collect::<Vec<_>>());
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_unshare_repeats_keeps_sharing_without_repeats() {
        let mut tree = range(small(), 0..100);
        let snapshot = tree.clone();
        tree.unshare_repeats();
        assert!(std::ptr::eq(tree.root(), snapshot.root()));
    }

    #[test]
    fn test_section_bounds() {
        let mut tree = range(small(), 0..10);
        assert_eq!(
            tree.copy_section(8, 3).err(),
            Some(TreeError::IndexOutOfRange { index: 11, len: 10 })
        );
        assert!(tree.remove_section(11, 0).is_err());
        assert!(tree.remove_section(10, 0).unwrap().is_empty());
        assert_eq!(tree.len(), 10);
    }
}
