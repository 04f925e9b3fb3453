//! Filepath: src/observer.rs
//!
//! Tree observer protocol.
//!
//! An observer is told about every structural change of the tree it is
//! attached to: items entering or leaving a leaf, children entering or
//! leaving an inner node, and root replacement. Callbacks arrive in the
//! order the engine performs them, so a subscriber can mirror the tree's
//! shape at every point between public operations.
//!
//! Splits and merges are reported as moves: each moved item is removed from
//! its old leaf and added to its new one; each moved child is removed from
//! its old parent and added to its new one. A copy-on-write copy of a shared
//! node is reported as the old node leaving its parent (with its contents)
//! and the copy arriving (with the same contents).
//!
//! The tree does not own the observer's state. It holds an
//! [`ObserverHandle`], a shared handle also kept by whoever attached it,
//! and the observer holds no reference back to the tree. Attachment is
//! bracketed by [`TreeObserver::attaching`] and [`TreeObserver::detached`];
//! the latter also runs when the tree is dropped with the observer attached.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::leaf_trait::LeafStore;
use crate::node::{Node, NodeId};
use crate::tree::TreeError;

/// Receives structural change notifications from one tree.
pub trait TreeObserver<T> {
    /// `item` was stored in `leaf`.
    fn item_added(&mut self, item: &T, leaf: NodeId);

    /// `item` was removed from `leaf`.
    fn item_removed(&mut self, item: &T, leaf: NodeId);

    /// `child` was linked under `parent`.
    fn node_added(&mut self, child: NodeId, parent: NodeId);

    /// `child` was unlinked from `parent`.
    fn node_removed(&mut self, child: NodeId, parent: NodeId);

    /// The root became `root`.
    ///
    /// With `clearing` set, the subscriber must discard all state first;
    /// the tree follows up by re-announcing every node and item under the
    /// new root (or nothing, when `root` is `None` on detach).
    fn root_changed(&mut self, root: Option<NodeId>, clearing: bool);

    /// A tree is about to attach this observer.
    ///
    /// Runs before any other callback. The default accepts every tree.
    ///
    /// # Errors
    /// An observer that follows one tree at a time returns
    /// [`TreeError::ObserverAttached`] while it is attached elsewhere.
    fn attaching(&mut self) -> Result<(), TreeError> {
        Ok(())
    }

    /// The tree this observer was attached to detached it or was dropped.
    fn detached(&mut self) {}
}

/// Observer trait object as held by a tree.
pub type DynObserver<T> = dyn TreeObserver<T> + Send;

/// Shared handle through which a tree notifies its observer.
pub type ObserverHandle<T> = Arc<Mutex<DynObserver<T>>>;

/// Announce every node and item of the subtree under `node`.
///
/// Children are linked before their own contents are announced.
pub(crate) fn announce_subtree<L, O>(observer: &mut O, node: &Node<L>)
where
    L: LeafStore,
    O: TreeObserver<L::Item> + ?Sized,
{
    let id = NodeId::of(node);
    match node {
        Node::Leaf(leaf) => {
            for item in leaf.items() {
                observer.item_added(item, id);
            }
        }
        Node::Inner(inner) => {
            for child in &inner.children {
                observer.node_added(NodeId::of_ref(&child.node), id);
                announce_subtree(observer, &child.node);
            }
        }
    }
}

/// Retract every node and item of the subtree under `node`.
pub(crate) fn retract_subtree<L, O>(observer: &mut O, node: &Node<L>)
where
    L: LeafStore,
    O: TreeObserver<L::Item> + ?Sized,
{
    let id = NodeId::of(node);
    match node {
        Node::Leaf(leaf) => {
            for item in leaf.items() {
                observer.item_removed(item, id);
            }
        }
        Node::Inner(inner) => {
            for child in &inner.children {
                retract_subtree(observer, &child.node);
                observer.node_removed(NodeId::of_ref(&child.node), id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf::DenseLeaf;
    use crate::node::{Child, Inner};

    /// Records every callback as a string.
    #[derive(Default)]
    struct Log(Vec<String>);

    impl TreeObserver<u32> for Log {
        fn item_added(&mut self, item: &u32, _leaf: NodeId) {
            self.0.push(format!("+{item}"));
        }
        fn item_removed(&mut self, item: &u32, _leaf: NodeId) {
            self.0.push(format!("-{item}"));
        }
        fn node_added(&mut self, _child: NodeId, _parent: NodeId) {
            self.0.push("+node".to_string());
        }
        fn node_removed(&mut self, _child: NodeId, _parent: NodeId) {
            self.0.push("-node".to_string());
        }
        fn root_changed(&mut self, _root: Option<NodeId>, clearing: bool) {
            self.0.push(format!("root clearing={clearing}"));
        }
    }

    fn two_leaves() -> Node<DenseLeaf<u32>> {
        let a = Arc::new(Node::Leaf(DenseLeaf::from_vec(vec![1, 2])));
        let b = Arc::new(Node::Leaf(DenseLeaf::from_vec(vec![3])));
        Node::Inner(Inner::from_children(vec![
            Child::new(a, false),
            Child::new(b, false),
        ]))
    }

    #[test]
    fn test_announce_links_child_before_contents() {
        let mut log = Log::default();
        announce_subtree(&mut log, &two_leaves());
        assert_eq!(log.0, vec!["+node", "+1", "+2", "+node", "+3"]);
    }

    #[test]
    fn test_retract_unlinks_child_after_contents() {
        let mut log = Log::default();
        retract_subtree(&mut log, &two_leaves());
        assert_eq!(log.0, vec!["-1", "-2", "-node", "-3", "-node"]);
    }

    #[test]
    fn test_handle_coerces_from_concrete_observer() {
        let concrete = Arc::new(Mutex::new(Log::default()));
        let handle: ObserverHandle<u32> = concrete.clone();
        handle.lock().root_changed(None, true);
        assert_eq!(concrete.lock().0, vec!["root clearing=true"]);
    }
}
