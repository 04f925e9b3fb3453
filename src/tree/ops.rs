//! Filepath: src/tree/ops.rs
//!
//! Recursive positional mutation.
//!
//! Every function here takes the slot holding a subtree, makes the node in
//! it unique, applies the change to the child covering the target index and
//! then repairs the parent:
//!
//! - a full leaf is split at its midpoint *before* an item is added, and the
//!   new right sibling is returned to the parent
//! - an inner node that ends up with more than `max_inner_size` children is
//!   split after the child's sibling is linked
//! - after removal a child that became empty is unlinked, and an undersized
//!   child is merged with or refilled from an adjacent sibling
//!
//! Structural changes are reported to the observer through [`Ctx`] as they
//! happen.

use std::sync::Arc;

use smallvec::SmallVec;

use super::context::{Ctx, make_unique};
use super::TreeError;
use crate::leaf_trait::{LeafStore, SpaceLeaf};
use crate::node::{Child, Inner, Node, NodeId, NodeRef};
use crate::tracing_helpers::{error_log, trace_log};

/// How an item is stored at a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Placement {
    /// New position before `index`.
    Insert,
    /// Existing position `index` is overwritten (or set, if unset).
    Fill,
}

/// Which edge of a tree a graft attaches to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    #[must_use]
    pub(crate) const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Outcome of [`place`].
pub(crate) struct Placed<L: LeafStore> {
    /// Item overwritten by a fill.
    pub(crate) previous: Option<L::Item>,
    /// New right sibling of the subtree, to be linked by the parent.
    pub(crate) split: Option<Child<L>>,
}

// ============================================================================
//  Insert / fill
// ============================================================================

pub(crate) fn place<L: LeafStore>(
    slot: &mut NodeRef<L>,
    parent: Option<NodeId>,
    index: usize,
    item: L::Item,
    how: Placement,
    ctx: &mut Ctx<'_, L::Item>,
) -> Placed<L> {
    let node = make_unique(slot, parent, ctx);
    let id = NodeId::of(node);
    match node {
        Node::Leaf(leaf) => place_in_leaf(leaf, id, index, item, how, ctx),

        Node::Inner(inner) => {
            let (ci, offset, _) = inner.locate(index);
            let placed = place(&mut inner.children[ci].node, Some(id), offset, item, how, ctx);
            inner.refresh_child(ci, ctx.keyed);
            let split = match placed.split {
                Some(right) => {
                    link_sibling(inner, id, ci, right, ctx);
                    split_if_full(inner, id, ctx)
                }
                None => None,
            };
            Placed {
                previous: placed.previous,
                split,
            }
        }
    }
}

fn place_in_leaf<L: LeafStore>(
    leaf: &mut L,
    id: NodeId,
    index: usize,
    item: L::Item,
    how: Placement,
    ctx: &mut Ctx<'_, L::Item>,
) -> Placed<L> {
    let grows = match how {
        Placement::Insert => true,
        Placement::Fill => !leaf.is_set(index),
    };
    if !grows || leaf.local_count() < ctx.config.max_leaf_size {
        let previous = store(leaf, id, index, item, how, ctx);
        return Placed {
            previous,
            split: None,
        };
    }

    // Full: split first so the item lands in a half with room.
    let keep = leaf.local_count() / 2;
    let mut right = leaf.split_local(keep);
    for moved in right.items() {
        ctx.item_removed(moved, id);
    }
    let left_span = leaf.span();
    let goes_left = match how {
        Placement::Insert => index <= left_span,
        Placement::Fill => index < left_span,
    };

    let previous = if goes_left {
        store(leaf, id, index, item, how, ctx)
    } else {
        match how {
            Placement::Insert => {
                right.insert(index - left_span, item);
                None
            }
            Placement::Fill => right.fill(index - left_span, item),
        }
    };

    let right = Arc::new(Node::Leaf(right));
    let right_id = NodeId::of_ref(&right);
    if let Node::Leaf(r) = right.as_ref() {
        for moved in r.items() {
            ctx.item_added(moved, right_id);
        }
    }
    trace_log!(leaf = %id, sibling = %right_id, keep, "leaf split");

    Placed {
        previous,
        split: Some(Child::new(right, ctx.keyed)),
    }
}

/// Store into a leaf with room, reporting the change.
fn store<L: LeafStore>(
    leaf: &mut L,
    id: NodeId,
    index: usize,
    item: L::Item,
    how: Placement,
    ctx: &mut Ctx<'_, L::Item>,
) -> Option<L::Item> {
    match how {
        Placement::Insert => {
            ctx.item_added(&item, id);
            leaf.insert(index, item);
            None
        }
        Placement::Fill => {
            if let Some(old) = leaf.get(index) {
                ctx.item_removed(old, id);
            }
            ctx.item_added(&item, id);
            leaf.fill(index, item)
        }
    }
}

/// Link `right` as the sibling after child `ci`.
pub(crate) fn link_sibling<L: LeafStore>(
    inner: &mut Inner<L>,
    id: NodeId,
    ci: usize,
    right: Child<L>,
    ctx: &mut Ctx<'_, L::Item>,
) {
    ctx.node_added(NodeId::of_ref(&right.node), id);
    inner.insert_child(ci + 1, right);
}

/// Split an inner node holding more than `max_inner_size` children.
pub(crate) fn split_if_full<L: LeafStore>(
    inner: &mut Inner<L>,
    id: NodeId,
    ctx: &mut Ctx<'_, L::Item>,
) -> Option<Child<L>> {
    let len = inner.children.len();
    if len <= ctx.config.max_inner_size {
        return None;
    }
    let right = Arc::new(Node::Inner(inner.split_local(len / 2)));
    let right_id = NodeId::of_ref(&right);
    ctx.contents_moved(&right, id, right_id);
    trace_log!(inner = %id, sibling = %right_id, "inner split");
    Some(Child::new(right, ctx.keyed))
}

// ============================================================================
//  Space
// ============================================================================

/// Insert `count` unset positions before `index`. Never splits: no items
/// are added.
pub(crate) fn insert_space<L: SpaceLeaf>(
    slot: &mut NodeRef<L>,
    parent: Option<NodeId>,
    index: usize,
    count: usize,
    ctx: &mut Ctx<'_, L::Item>,
) {
    let node = make_unique(slot, parent, ctx);
    let id = NodeId::of(node);
    match node {
        Node::Leaf(leaf) => leaf.insert_space(index, count),
        Node::Inner(inner) => {
            let (ci, offset, _) = inner.locate(index);
            insert_space(&mut inner.children[ci].node, Some(id), offset, count, ctx);
            inner.refresh_child(ci, ctx.keyed);
        }
    }
}

// ============================================================================
//  Removal
// ============================================================================

pub(crate) fn remove_at<L: LeafStore>(
    slot: &mut NodeRef<L>,
    parent: Option<NodeId>,
    index: usize,
    ctx: &mut Ctx<'_, L::Item>,
) -> Option<L::Item> {
    let node = make_unique(slot, parent, ctx);
    let id = NodeId::of(node);
    match node {
        Node::Leaf(leaf) => {
            let removed = leaf.remove(index);
            if let Some(item) = &removed {
                ctx.item_removed(item, id);
            }
            removed
        }
        Node::Inner(inner) => {
            let (ci, offset, _) = inner.locate(index);
            let removed = remove_at(&mut inner.children[ci].node, Some(id), offset, ctx);
            inner.refresh_child(ci, ctx.keyed);
            fix_child(inner, id, ci, ctx);
            removed
        }
    }
}

/// Remove positions `start..end` of the subtree in `slot`.
///
/// Children entirely inside the range are unlinked whole; at most two
/// children (the boundary ones) are descended into.
pub(crate) fn remove_range<L: LeafStore>(
    slot: &mut NodeRef<L>,
    parent: Option<NodeId>,
    start: usize,
    end: usize,
    ctx: &mut Ctx<'_, L::Item>,
) {
    let node = make_unique(slot, parent, ctx);
    let id = NodeId::of(node);
    match node {
        Node::Leaf(leaf) => leaf.remove_range(start, end, |item| ctx.item_removed(item, id)),

        Node::Inner(inner) => {
            let mut touched: SmallVec<[usize; 2]> = SmallVec::new();
            let mut i = 0;
            let mut base = 0;
            while i < inner.children.len() && base < end {
                let lo = base;
                let hi = lo + inner.children[i].count;
                base = hi;
                if hi <= start {
                    i += 1;
                    continue;
                }
                if start <= lo && hi <= end {
                    let gone = inner.remove_child(i);
                    ctx.retract(&gone.node);
                    ctx.node_removed(NodeId::of_ref(&gone.node), id);
                    continue;
                }
                let from = start.max(lo) - lo;
                let to = end.min(hi) - lo;
                remove_range(&mut inner.children[i].node, Some(id), from, to, ctx);
                inner.refresh_child(i, ctx.keyed);
                touched.push(i);
                i += 1;
            }
            for &ci in touched.iter().rev() {
                fix_child(inner, id, ci, ctx);
            }
        }
    }
}

/// Repair child `ci` after it shrank: unlink it if empty, otherwise merge
/// or redistribute with a neighbour if it is undersized.
pub(crate) fn fix_child<L: LeafStore>(
    inner: &mut Inner<L>,
    id: NodeId,
    ci: usize,
    ctx: &mut Ctx<'_, L::Item>,
) {
    let Some(child) = inner.children.get(ci) else {
        return;
    };
    if child.node.span() == 0 {
        let gone = inner.remove_child(ci);
        ctx.retract(&gone.node);
        ctx.node_removed(NodeId::of_ref(&gone.node), id);
        return;
    }
    if inner.children.len() < 2 || !child.node.is_undersized(&ctx.config) {
        return;
    }
    rebalance_pair(inner, id, ci.saturating_sub(1), ctx);
}

/// Merge children `left` and `left + 1`, splitting the result back in half
/// if it exceeds capacity.
pub(crate) fn rebalance_pair<L: LeafStore>(
    inner: &mut Inner<L>,
    id: NodeId,
    left: usize,
    ctx: &mut Ctx<'_, L::Item>,
) {
    let right = left + 1;
    if right >= inner.children.len() {
        return;
    }
    let config = ctx.config;
    let merged = {
        let (head, tail) = inner.children.split_at_mut(right);
        let left_node = make_unique(&mut head[left].node, Some(id), ctx);
        let right_node = make_unique(&mut tail[0].node, Some(id), ctx);
        let (left_id, right_id) = (NodeId::of(left_node), NodeId::of(right_node));

        let empty = right_node.empty_like();
        let moved = std::mem::replace(right_node, empty);
        ctx.contents_moved(&moved, right_id, left_id);
        if let Err(moved) = left_node.append(moved) {
            error_log!(left = %left_id, right = %right_id, "sibling kinds differ; not merging");
            ctx.contents_moved(&moved, left_id, right_id);
            *right_node = moved;
            return;
        }

        let len = left_node.local_count();
        if len > left_node.capacity(&config) {
            let back = left_node.split_local(len / 2);
            ctx.contents_moved(&back, left_id, right_id);
            *right_node = back;
            trace_log!(left = %left_id, right = %right_id, "siblings redistributed");
            false
        } else {
            trace_log!(into = %left_id, from = %right_id, "siblings merged");
            true
        }
    };
    inner.refresh_child(left, ctx.keyed);
    inner.refresh_child(right, ctx.keyed);
    if merged {
        let gone = inner.remove_child(right);
        ctx.node_removed(NodeId::of_ref(&gone.node), id);
    }
}

// ============================================================================
//  Graft
// ============================================================================

/// Attach `guest` as the outermost child of the node `levels` below `slot`
/// on `side`. Returns a new right sibling of `slot`'s node if it split.
///
/// `guest` must be exactly one level shorter than the node it is linked
/// into.
pub(crate) fn graft_spine<L: LeafStore>(
    slot: &mut NodeRef<L>,
    parent: Option<NodeId>,
    levels: usize,
    guest: Child<L>,
    side: Side,
    ctx: &mut Ctx<'_, L::Item>,
) -> Result<Option<Child<L>>, TreeError> {
    let node = make_unique(slot, parent, ctx);
    let id = NodeId::of(node);
    let Node::Inner(inner) = node else {
        return Err(TreeError::Inconsistent("graft spine ended at a leaf".into()));
    };
    let edge = match side {
        Side::Left => 0,
        Side::Right => inner.children.len().saturating_sub(1),
    };

    if levels == 0 {
        let guest_id = NodeId::of_ref(&guest.node);
        let at = match side {
            Side::Left => 0,
            Side::Right => inner.children.len(),
        };
        inner.insert_child(at, guest);
        ctx.node_added(guest_id, id);
        // The seam pair is (edge, edge + 1) on either side.
        let seam = match side {
            Side::Left => 0,
            Side::Right => inner.children.len().saturating_sub(2),
        };
        if seam_undersized(inner, seam, ctx) {
            rebalance_pair(inner, id, seam, ctx);
        }
    } else {
        let split = graft_spine(&mut inner.children[edge].node, Some(id), levels - 1, guest, side, ctx)?;
        inner.refresh_child(edge, ctx.keyed);
        if let Some(right) = split {
            link_sibling(inner, id, edge, right, ctx);
        }
    }
    Ok(split_if_full(inner, id, ctx))
}

/// Whether either child of the pair at `left` is undersized.
pub(crate) fn seam_undersized<L: LeafStore>(inner: &Inner<L>, left: usize, ctx: &Ctx<'_, L::Item>) -> bool {
    inner.children[left..]
        .iter()
        .take(2)
        .any(|c| c.node.is_undersized(&ctx.config))
}
