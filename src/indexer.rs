//! Filepath: src/indexer.rs
//!
//! `AListIndexer` - reverse lookup from item to position for large lists.
//!
//! The indexer is a [`TreeObserver`]: once attached to an [`AList`], it
//! mirrors which leaf holds each item and which inner node holds each child.
//! [`index_of`](AListIndexer::index_of) then finds an item's leaf, walks the
//! recorded parents up to the root, and descends that path summing the counts
//! of preceding siblings. That costs O(fanout * height) per candidate leaf
//! instead of a linear scan.
//!
//! Items are grouped by their hash (`FxHasher`), and every hash hit is
//! confirmed with `==`. The hash is only a grouping key, not an order.
//!
//! # Precondition
//!
//! An item's `Hash` must not change while it is indexed. Items are cloned
//! into the index when they enter a leaf; mutating the tree's copy through
//! interior mutability desynchronizes the index.
//!
//! ```
//! use atree::{AList, AListIndexer};
//!
//! let mut list: AList<&str> = ["a", "b", "c"].into_iter().collect();
//! let indexer = AListIndexer::new();
//! list.attach_observer(indexer.handle())?;
//!
//! list.insert(0, "z")?;
//! assert_eq!(indexer.index_of(&list, &"c")?, Some(3));
//! indexer.verify_correctness(&list)?;
//! # Ok::<(), atree::TreeError>(())
//! ```

use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxBuildHasher, FxHashMap};
use smallvec::SmallVec;

use crate::leaf::DenseLeaf;
use crate::list::AList;
use crate::node::{Node, NodeId};
use crate::observer::{ObserverHandle, TreeObserver, announce_subtree};
use crate::tracing_helpers::{trace_log, warn_log};
use crate::tree::TreeError;

/// Items sharing one hash, with the leaf holding each.
type Bucket<T> = SmallVec<[(T, NodeId); 2]>;

// ============================================================================
//  IndexState
// ============================================================================

/// The mirrored tree shape.
struct IndexState<T> {
    items: FxHashMap<u64, Bucket<T>>,
    parents: FxHashMap<NodeId, NodeId>,
    root: Option<NodeId>,
    item_count: usize,

    /// First callback that contradicted the recorded shape.
    broken: Option<String>,

    /// Whether a tree holds this state's handle.
    attached: bool,
}

impl<T> Default for IndexState<T> {
    fn default() -> Self {
        Self {
            items: FxHashMap::default(),
            parents: FxHashMap::default(),
            root: None,
            item_count: 0,
            broken: None,
            attached: false,
        }
    }
}

impl<T: Hash + Eq> IndexState<T> {
    fn fail(&mut self, reason: impl FnOnce() -> String) {
        if self.broken.is_none() {
            let reason = reason();
            warn_log!(%reason, "indexer out of sync");
            self.broken = Some(reason);
        }
    }

    fn clear(&mut self) {
        self.items.clear();
        self.parents.clear();
        self.root = None;
        self.item_count = 0;
        self.broken = None;
    }

    /// Leaves recorded for items equal to `item`, deduplicated.
    fn leaves_of(&self, item: &T) -> SmallVec<[NodeId; 2]> {
        let mut leaves = SmallVec::new();
        if let Some(bucket) = self.items.get(&FxBuildHasher.hash_one(item)) {
            for (x, leaf) in bucket {
                if x == item && !leaves.contains(leaf) {
                    leaves.push(*leaf);
                }
            }
        }
        leaves
    }

    /// Ids from the root down to `leaf`, following recorded parents.
    fn path_to(&self, leaf: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut path = vec![leaf];
        let mut at = leaf;
        while Some(at) != self.root {
            let Some(&parent) = self.parents.get(&at) else {
                return Err(TreeError::Inconsistent(format!("{at} has no recorded parent")));
            };
            if path.len() > self.parents.len() {
                return Err(TreeError::Inconsistent(format!("parent cycle through {at}")));
            }
            path.push(parent);
            at = parent;
        }
        path.reverse();
        Ok(path)
    }
}

impl<T: Clone + Hash + Eq> TreeObserver<T> for IndexState<T> {
    fn item_added(&mut self, item: &T, leaf: NodeId) {
        self.items
            .entry(FxBuildHasher.hash_one(item))
            .or_default()
            .push((item.clone(), leaf));
        self.item_count += 1;
    }

    fn item_removed(&mut self, item: &T, leaf: NodeId) {
        let hash = FxBuildHasher.hash_one(item);
        let removed = self.items.get_mut(&hash).is_some_and(|bucket| {
            match bucket.iter().position(|(x, l)| *l == leaf && x == item) {
                Some(at) => {
                    bucket.swap_remove(at);
                    true
                }
                None => false,
            }
        });
        if !removed {
            self.fail(|| format!("removed item was not recorded in {leaf}"));
            return;
        }
        if self.items.get(&hash).is_some_and(SmallVec::is_empty) {
            self.items.remove(&hash);
        }
        self.item_count -= 1;
    }

    fn node_added(&mut self, child: NodeId, parent: NodeId) {
        if let Some(old) = self.parents.insert(child, parent) {
            self.fail(|| format!("{child} added under {parent} while still under {old}"));
        }
    }

    fn node_removed(&mut self, child: NodeId, parent: NodeId) {
        match self.parents.remove(&child) {
            Some(p) if p == parent => {}
            other => self.fail(|| format!("{child} removed from {parent}, recorded under {other:?}")),
        }
    }

    fn root_changed(&mut self, root: Option<NodeId>, clearing: bool) {
        if clearing {
            self.clear();
        }
        trace_log!(?root, clearing, "indexer root changed");
        self.root = root;
    }

    fn attaching(&mut self) -> Result<(), TreeError> {
        if self.attached {
            return Err(TreeError::ObserverAttached);
        }
        self.attached = true;
        Ok(())
    }

    fn detached(&mut self) {
        self.attached = false;
    }
}

// ============================================================================
//  AListIndexer
// ============================================================================

/// Reverse index over one [`AList`].
///
/// Clones share the same state.
#[derive(Clone)]
pub struct AListIndexer<T> {
    state: Arc<Mutex<IndexState<T>>>,
}

impl<T: Clone + Hash + Eq + Send + 'static> Default for AListIndexer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Hash + Eq + Send + 'static> AListIndexer<T> {
    /// Detached, empty indexer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(IndexState::default())),
        }
    }

    /// Handle to pass to [`ATree::attach_observer`](crate::ATree::attach_observer).
    ///
    /// The indexer follows one tree at a time: attaching a second handle
    /// while the first tree still holds one fails with
    /// [`TreeError::ObserverAttached`].
    #[must_use]
    pub fn handle(&self) -> ObserverHandle<T> {
        self.state.clone()
    }

    /// Number of items recorded.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.state.lock().item_count
    }

    /// Position of the first item equal to `item` in `tree`.
    ///
    /// # Errors
    /// [`TreeError::Inconsistent`] if the index does not describe `tree`.
    pub fn index_of(&self, tree: &AList<T>, item: &T) -> Result<Option<usize>, TreeError> {
        Ok(self.indexes_of(tree, item)?.first().copied())
    }

    /// Positions of every item equal to `item`, ascending.
    ///
    /// # Errors
    /// As [`index_of`](Self::index_of).
    pub fn indexes_of(&self, tree: &AList<T>, item: &T) -> Result<Vec<usize>, TreeError> {
        let state = self.state.lock();
        if let Some(reason) = &state.broken {
            return Err(TreeError::Inconsistent(reason.clone()));
        }
        if state.root != Some(NodeId::of(tree.root())) {
            return Err(TreeError::Inconsistent("indexer is not attached to this tree".to_string()));
        }
        let mut found = Vec::new();
        for leaf in state.leaves_of(item) {
            let path = state.path_to(leaf)?;
            let (base, items) = locate_leaf(tree.root(), &path)?;
            found.extend(
                items
                    .as_slice()
                    .iter()
                    .enumerate()
                    .filter(|(_, x)| *x == item)
                    .map(|(i, _)| base + i),
            );
        }
        found.sort_unstable();
        Ok(found)
    }

    /// Whether an item equal to `item` is in `tree`.
    ///
    /// # Errors
    /// As [`index_of`](Self::index_of).
    pub fn contains(&self, tree: &AList<T>, item: &T) -> Result<bool, TreeError> {
        self.index_of(tree, item).map(|at| at.is_some())
    }

    /// Rebuild the index of `tree` from scratch and compare it with the
    /// incrementally maintained one.
    ///
    /// # Errors
    /// [`TreeError::Inconsistent`] describing the first difference.
    pub fn verify_correctness(&self, tree: &AList<T>) -> Result<(), TreeError> {
        let state = self.state.lock();
        if let Some(reason) = &state.broken {
            return Err(TreeError::Inconsistent(reason.clone()));
        }

        let mut fresh: IndexState<T> = IndexState::default();
        fresh.root_changed(Some(NodeId::of(tree.root())), true);
        announce_subtree(&mut fresh, tree.root());

        if state.root != fresh.root {
            return Err(TreeError::Inconsistent("recorded root differs".to_string()));
        }
        if state.item_count != tree.len() {
            return Err(TreeError::Inconsistent(format!(
                "recorded {} items, tree holds {}",
                state.item_count,
                tree.len()
            )));
        }
        if state.parents != fresh.parents {
            return Err(TreeError::Inconsistent("recorded node parents differ".to_string()));
        }
        if state.items.len() != fresh.items.len() {
            return Err(TreeError::Inconsistent("recorded item groups differ".to_string()));
        }
        for (hash, expected) in &fresh.items {
            let same = state
                .items
                .get(hash)
                .is_some_and(|recorded| same_entries(recorded, expected));
            if !same {
                return Err(TreeError::Inconsistent(format!("item group {hash:#x} differs")));
            }
        }
        Ok(())
    }
}

/// Descend `path` from `root`; returns the leaf's first position and the leaf.
fn locate_leaf<'a, T: Clone>(
    root: &'a Node<DenseLeaf<T>>,
    path: &[NodeId],
) -> Result<(usize, &'a DenseLeaf<T>), TreeError> {
    let mut node = root;
    let mut base = 0;
    for &next in &path[1..] {
        let Node::Inner(inner) = node else {
            return Err(TreeError::Inconsistent(format!("{} is not an inner node", NodeId::of(node))));
        };
        let mut hit = None;
        for child in &inner.children {
            if NodeId::of_ref(&child.node) == next {
                hit = Some(&child.node);
                break;
            }
            base += child.count;
        }
        let Some(child) = hit else {
            return Err(TreeError::Inconsistent(format!("{next} is not a child of {}", NodeId::of(node))));
        };
        node = child;
    }
    match node {
        Node::Leaf(leaf) => Ok((base, leaf)),
        Node::Inner(_) => Err(TreeError::Inconsistent(format!("{} is not a leaf", NodeId::of(node)))),
    }
}

/// Whether two buckets hold the same `(item, leaf)` multiset.
fn same_entries<T: Eq>(a: &Bucket<T>, b: &Bucket<T>) -> bool {
    let count = |bucket: &Bucket<T>, entry: &(T, NodeId)| bucket.iter().filter(|e| *e == entry).count();
    a.len() == b.len() && a.iter().all(|e| count(a, e) == count(b, e))
}
