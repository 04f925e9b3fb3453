//! Filepath: src/tree/context.rs
//!
//! Per-operation context: limits, routing mode and the observer sink, plus
//! the make-unique (copy-on-write) step every mutating descent goes through.

use std::sync::Arc;

use crate::config::TreeConfig;
use crate::leaf_trait::LeafStore;
use crate::node::{Node, NodeId, NodeRef};
use crate::observer::{DynObserver, retract_subtree};
use crate::tracing_helpers::trace_log;

/// Carried through one mutating operation.
pub(crate) struct Ctx<'o, T> {
    pub(crate) config: TreeConfig,
    pub(crate) keyed: bool,
    observer: Option<&'o mut DynObserver<T>>,
}

impl<'o, T> Ctx<'o, T> {
    pub(crate) fn new(config: TreeConfig, keyed: bool, observer: Option<&'o mut DynObserver<T>>) -> Self {
        Self {
            config,
            keyed,
            observer,
        }
    }

    #[inline(always)]
    pub(crate) const fn observing(&self) -> bool {
        self.observer.is_some()
    }

    // ========================================================================
    //  Notifications
    // ========================================================================

    #[inline]
    pub(crate) fn item_added(&mut self, item: &T, leaf: NodeId) {
        if let Some(o) = &mut self.observer {
            o.item_added(item, leaf);
        }
    }

    #[inline]
    pub(crate) fn item_removed(&mut self, item: &T, leaf: NodeId) {
        if let Some(o) = &mut self.observer {
            o.item_removed(item, leaf);
        }
    }

    #[inline]
    pub(crate) fn node_added(&mut self, child: NodeId, parent: NodeId) {
        if let Some(o) = &mut self.observer {
            o.node_added(child, parent);
        }
    }

    #[inline]
    pub(crate) fn node_removed(&mut self, child: NodeId, parent: NodeId) {
        if let Some(o) = &mut self.observer {
            o.node_removed(child, parent);
        }
    }

    /// Root replaced without discarding observer state.
    #[inline]
    pub(crate) fn root_changed(&mut self, root: Option<NodeId>) {
        if let Some(o) = &mut self.observer {
            o.root_changed(root, false);
        }
    }

    /// Retract a subtree's contents (not its link to a parent).
    pub(crate) fn retract<L: LeafStore<Item = T>>(&mut self, node: &Node<L>) {
        if let Some(o) = &mut self.observer {
            retract_subtree(&mut **o, node);
        }
    }

    /// Report `node`'s direct contents as leaving `from` and arriving at `to`.
    pub(crate) fn contents_moved<L: LeafStore<Item = T>>(&mut self, node: &Node<L>, from: NodeId, to: NodeId) {
        let Some(o) = &mut self.observer else {
            return;
        };
        match node {
            Node::Leaf(leaf) => {
                for item in leaf.items() {
                    o.item_removed(item, from);
                    o.item_added(item, to);
                }
            }
            Node::Inner(inner) => {
                for child in &inner.children {
                    let id = NodeId::of_ref(&child.node);
                    o.node_removed(id, from);
                    o.node_added(id, to);
                }
            }
        }
    }

    /// Report a copy-on-write replacement of `old` by `new` under `parent`
    /// (`None` for the root).
    fn replaced<L: LeafStore<Item = T>>(&mut self, old: &Node<L>, new: &Node<L>, parent: Option<NodeId>) {
        if !self.observing() {
            return;
        }
        let (old_id, new_id) = (NodeId::of(old), NodeId::of(new));
        if let Some(p) = parent {
            self.node_removed(old_id, p);
        }
        self.contents_moved(new, old_id, new_id);
        match parent {
            Some(p) => self.node_added(new_id, p),
            None => self.root_changed(Some(new_id)),
        }
    }
}

/// Make the node in `slot` uniquely owned and return it for mutation.
///
/// A shared node is replaced by a private shallow copy: the copy's children
/// stay shared with the original.
pub(crate) fn make_unique<'n, L: LeafStore>(
    slot: &'n mut NodeRef<L>,
    parent: Option<NodeId>,
    ctx: &mut Ctx<'_, L::Item>,
) -> &'n mut Node<L> {
    if Arc::get_mut(slot).is_none() {
        let copy = Arc::new(Node::clone(slot));
        let old = std::mem::replace(slot, copy);
        trace_log!(from = %NodeId::of_ref(&old), to = %NodeId::of_ref(slot), "copy-on-write");
        ctx.replaced(&old, slot.as_ref(), parent);
    }
    Arc::make_mut(slot)
}
