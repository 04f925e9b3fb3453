//! Filepath: src/tree.rs
//! `ATree` - a persistent wide-fanout list tree.
//!
//! This module provides [`ATree<L>`], the engine behind every collection in
//! the crate, and [`TreeError`]. The tree is generic over the leaf kind
//! (see [`crate::leaf_trait`]):
//!
//! - [`AList<T>`](crate::list::AList) = `ATree<DenseLeaf<T>>`
//! - [`SparseAList<T>`](crate::sparse::SparseAList) = `ATree<SparseLeaf<T>>`
//!
//! Key-ordered collections wrap an `ATree<DenseLeaf<T>>` whose inner nodes
//! cache each child's last item for routing.
//!
//! # Snapshots
//!
//! [`Clone`] is O(1): the clone shares the root. Shared nodes are frozen and
//! get copied on the first write through them, along with every ancestor on
//! the path from the root. Nodes off the mutated path stay shared.
//! [`ATree::freeze`] is different: it makes the tree permanently read-only.

use std::fmt as StdFmt;
use std::sync::Arc;

use crate::change::{ChangeAction, ChangeHooks, ListChangingFn, SizeChangedFn, delta};
use crate::config::TreeConfig;
use crate::leaf_trait::LeafStore;
use crate::node::{Child, Inner, Node, NodeId, NodeRef};
use crate::observer::{ObserverHandle, announce_subtree};
use crate::tracing_helpers::debug_log;

mod bulk;
mod context;
mod leaf_iterator;
pub(crate) mod ops;
mod search;
mod verify;

pub use leaf_iterator::LeafIter;
pub use verify::TreeStats;

pub(crate) use context::Ctx;

// ============================================================================
//  TreeError
// ============================================================================

/// Errors reported by tree operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Mutation attempted on a frozen tree.
    ReadOnly,

    /// `AddOrThrow` found the key already present.
    KeyAlreadyExists,

    /// Index or section outside `0..=len`.
    IndexOutOfRange {
        /// Offending index (end of section for section operations).
        index: usize,
        /// Length of the tree at the time.
        len: usize,
    },

    /// Auxiliary state disagrees with the real tree shape.
    ///
    /// Always a contract violation; never retried.
    Inconsistent(String),

    /// The tree already has an observer.
    ObserverAttached,

    /// A list-changing hook rejected the change.
    Vetoed(String),

    /// Node-size limits below the supported minimum.
    InvalidConfig(&'static str),
}

impl StdFmt::Display for TreeError {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::ReadOnly => write!(f, "tree is frozen (read-only)"),

            Self::KeyAlreadyExists => write!(f, "key already exists"),

            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }

            Self::Inconsistent(what) => write!(f, "inconsistent tree structure: {what}"),

            Self::ObserverAttached => write!(f, "an observer is already attached"),

            Self::Vetoed(why) => write!(f, "change vetoed: {why}"),

            Self::InvalidConfig(why) => write!(f, "invalid tree configuration: {why}"),
        }
    }
}

impl std::error::Error for TreeError {}

// ============================================================================
//  ATree
// ============================================================================

/// A height-balanced tree of bounded-size nodes addressed by position.
///
/// # Type Parameters
/// * `L` - leaf kind ([`DenseLeaf`](crate::leaf::DenseLeaf) or
///   [`SparseLeaf`](crate::leaf_sparse::SparseLeaf))
///
/// # Invariants
/// - all leaves are at depth `height`
/// - every inner node's cached child counts match the children's spans
/// - no leaf holds more than `config.max_leaf_size` items and no inner node
///   more than `config.max_inner_size` children
pub struct ATree<L: LeafStore> {
    root: NodeRef<L>,

    /// Number of inner levels; 0 when the root is a leaf.
    height: usize,

    config: TreeConfig,

    /// Inner nodes cache each child's last item (key-ordered trees).
    keyed: bool,

    /// Permanently read-only.
    frozen: bool,

    observer: Option<Attachment<L::Item>>,

    hooks: ChangeHooks<L::Item>,
}

impl<L: LeafStore + StdFmt::Debug> StdFmt::Debug for ATree<L> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("ATree")
            .field("len", &self.len())
            .field("height", &self.height)
            .field("frozen", &self.frozen)
            .field("leaves", &DebugLeaves(self))
            .finish_non_exhaustive()
    }
}

struct DebugLeaves<'a, L: LeafStore>(&'a ATree<L>);

impl<L: LeafStore + StdFmt::Debug> StdFmt::Debug for DebugLeaves<'_, L> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_list().entries(self.0.leaves().map(|(_, leaf)| leaf)).finish()
    }
}

impl<L: LeafStore> Default for ATree<L> {
    fn default() -> Self {
        Self::new()
    }
}

/// An attached observer. Dropping it resets the observer and releases it.
struct Attachment<T> {
    handle: ObserverHandle<T>,
}

impl<T> Drop for Attachment<T> {
    fn drop(&mut self) {
        let mut observer = self.handle.lock();
        observer.root_changed(None, true);
        observer.detached();
    }
}

impl<L: LeafStore> Clone for ATree<L> {
    /// O(1) snapshot sharing every node with `self`.
    ///
    /// The clone is writable even if `self` is frozen, and starts without an
    /// observer or change hooks.
    fn clone(&self) -> Self {
        Self {
            root: Arc::clone(&self.root),
            height: self.height,
            config: self.config,
            keyed: self.keyed,
            frozen: false,
            observer: None,
            hooks: ChangeHooks::default(),
        }
    }
}

impl<L: LeafStore> ATree<L> {
    /// Create an empty tree with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::build(TreeConfig::default(), false)
    }

    /// Create an empty tree with custom limits.
    ///
    /// # Errors
    /// [`TreeError::InvalidConfig`] if a limit is below the minimum.
    pub fn with_config(config: TreeConfig) -> Result<Self, TreeError> {
        config.validate()?;
        Ok(Self::build(config, false))
    }

    /// Create an empty tree whose inner nodes cache routing keys.
    pub(crate) fn new_keyed(config: TreeConfig) -> Result<Self, TreeError> {
        config.validate()?;
        Ok(Self::build(config, true))
    }

    pub(crate) fn build(config: TreeConfig, keyed: bool) -> Self {
        Self {
            root: Arc::new(Node::Leaf(L::default())),
            height: 0,
            config,
            keyed,
            frozen: false,
            observer: None,
            hooks: ChangeHooks::default(),
        }
    }

    // ========================================================================
    //  Accessors
    // ========================================================================

    /// Number of positions (for sparse trees, including unset ones).
    #[must_use]
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.root.span()
    }

    /// Whether the tree has no positions.
    #[must_use]
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of inner levels above the leaves.
    #[must_use]
    #[inline(always)]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Node-size limits.
    #[must_use]
    #[inline(always)]
    pub const fn config(&self) -> TreeConfig {
        self.config
    }

    /// Whether [`freeze`](Self::freeze) has been called.
    #[must_use]
    #[inline(always)]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Root node, for read-only traversal.
    #[must_use]
    #[inline(always)]
    pub fn root(&self) -> &Node<L> {
        &self.root
    }

    /// Leaves in order, each with the index of its first position.
    #[must_use]
    pub fn leaves(&self) -> LeafIter<'_, L> {
        LeafIter::new(&self.root)
    }

    /// Item at `index`, or `None` if out of range or unset.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&L::Item> {
        if index >= self.len() {
            return None;
        }
        let mut node: &Node<L> = &self.root;
        let mut offset = index;
        loop {
            match node {
                Node::Leaf(leaf) => return leaf.get(offset),
                Node::Inner(inner) => {
                    let (ci, within, _) = inner.locate(offset);
                    node = inner.children.get(ci)?.node.as_ref();
                    offset = within;
                }
            }
        }
    }

    /// Item at position 0.
    #[must_use]
    pub fn first(&self) -> Option<&L::Item> {
        self.get(0)
    }

    /// Item at the last position.
    #[must_use]
    pub fn last(&self) -> Option<&L::Item> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    // ========================================================================
    //  Single-item mutation
    // ========================================================================

    /// Insert `item` before position `index` (`index == len` appends).
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`], [`TreeError::IndexOutOfRange`], or a veto
    /// from the list-changing hook.
    pub fn insert(&mut self, index: usize, item: L::Item) -> Result<(), TreeError> {
        self.ensure_writable()?;
        let len = self.len();
        if index > len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        self.grown_len(1)?;
        self.hooks
            .before(ChangeAction::Add, index, 1, std::slice::from_ref(&item))?;
        self.with_ctx(|tree, ctx| {
            let placed = ops::place(&mut tree.root, None, index, item, ops::Placement::Insert, ctx);
            if let Some(right) = placed.split {
                tree.grow_root(right, ctx);
            }
        });
        self.hooks.after(1);
        Ok(())
    }

    /// Append `item` at the end.
    ///
    /// # Errors
    /// As [`insert`](Self::insert).
    pub fn push(&mut self, item: L::Item) -> Result<(), TreeError> {
        self.insert(self.len(), item)
    }

    /// Store `item` at `index`, returning what was there.
    ///
    /// For sparse trees an unset position becomes set; the length never changes.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`], [`TreeError::IndexOutOfRange`] (`index >= len`),
    /// or a veto.
    pub fn set(&mut self, index: usize, item: L::Item) -> Result<Option<L::Item>, TreeError> {
        self.ensure_writable()?;
        let len = self.len();
        if index >= len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        self.hooks
            .before(ChangeAction::Replace, index, 0, std::slice::from_ref(&item))?;
        Ok(self.with_ctx(|tree, ctx| {
            let placed = ops::place(&mut tree.root, None, index, item, ops::Placement::Fill, ctx);
            if let Some(right) = placed.split {
                tree.grow_root(right, ctx);
            }
            placed.previous
        }))
    }

    /// Remove position `index`, returning its item (`None` for unset
    /// positions of a sparse tree).
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`], [`TreeError::IndexOutOfRange`], or a veto.
    pub fn remove_at(&mut self, index: usize) -> Result<Option<L::Item>, TreeError> {
        self.ensure_writable()?;
        let len = self.len();
        if index >= len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        self.hooks.before(ChangeAction::Remove, index, -1, &[])?;
        let removed = self.with_ctx(|tree, ctx| {
            let removed = ops::remove_at(&mut tree.root, None, index, ctx);
            tree.collapse_root(ctx);
            removed
        });
        self.hooks.after(-1);
        Ok(removed)
    }

    /// Remove every position.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`] or a veto.
    pub fn clear(&mut self) -> Result<(), TreeError> {
        self.ensure_writable()?;
        let len = self.len();
        self.hooks.before(ChangeAction::Clear, 0, -delta(len), &[])?;
        self.root = Arc::new(Node::Leaf(L::default()));
        self.height = 0;
        if let Some(attachment) = &self.observer {
            attachment.handle.lock().root_changed(Some(NodeId::of_ref(&self.root)), true);
        }
        self.hooks.after(-delta(len));
        Ok(())
    }

    // ========================================================================
    //  Freezing and ownership
    // ========================================================================

    /// Make the tree permanently read-only.
    pub fn freeze(&mut self) {
        debug_log!(len = self.len(), "tree frozen");
        self.frozen = true;
    }

    /// Exchange contents (root, height, limits and observer) with `other`.
    ///
    /// # Errors
    /// [`TreeError::ReadOnly`] if either tree is frozen.
    pub fn swap(&mut self, other: &mut Self) -> Result<(), TreeError> {
        if self.frozen || other.frozen {
            return Err(TreeError::ReadOnly);
        }
        std::mem::swap(&mut self.root, &mut other.root);
        std::mem::swap(&mut self.height, &mut other.height);
        std::mem::swap(&mut self.config, &mut other.config);
        std::mem::swap(&mut self.keyed, &mut other.keyed);
        std::mem::swap(&mut self.observer, &mut other.observer);
        Ok(())
    }

    // ========================================================================
    //  Observer and hooks
    // ========================================================================

    /// Attach an observer and announce the current contents to it.
    ///
    /// # Errors
    /// [`TreeError::ObserverAttached`] if this tree already has one, or the
    /// observer refuses in [`TreeObserver::attaching`](crate::TreeObserver::attaching).
    pub fn attach_observer(&mut self, handle: ObserverHandle<L::Item>) -> Result<(), TreeError> {
        if self.observer.is_some() {
            return Err(TreeError::ObserverAttached);
        }
        handle.lock().attaching()?;
        self.unshare_repeats();
        {
            let mut observer = handle.lock();
            observer.root_changed(Some(NodeId::of_ref(&self.root)), true);
            announce_subtree(&mut *observer, &self.root);
        }
        self.observer = Some(Attachment { handle });
        Ok(())
    }

    /// Detach the observer, telling it to reset, and return its handle.
    pub fn detach_observer(&mut self) -> Option<ObserverHandle<L::Item>> {
        let attachment = self.observer.take()?;
        Some(Arc::clone(&attachment.handle))
    }

    /// Whether an observer is attached.
    #[must_use]
    #[inline(always)]
    pub const fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    /// Install (or with `None`, remove) the hook run before each change.
    pub fn set_list_changing(&mut self, hook: Option<ListChangingFn<L::Item>>) {
        self.hooks.set_changing(hook);
    }

    /// Install (or with `None`, remove) the hook run after each size change.
    pub fn set_size_changed(&mut self, hook: Option<SizeChangedFn>) {
        self.hooks.set_size_changed(hook);
    }

    // ========================================================================
    //  Internals
    // ========================================================================

    #[inline]
    pub(crate) const fn ensure_writable(&self) -> Result<(), TreeError> {
        if self.frozen {
            return Err(TreeError::ReadOnly);
        }
        Ok(())
    }

    /// Length after adding `count` positions; sparse trees can reach
    /// `usize::MAX`.
    #[inline]
    pub(crate) fn grown_len(&self, count: usize) -> Result<usize, TreeError> {
        let len = self.len();
        len.checked_add(count)
            .ok_or(TreeError::IndexOutOfRange { index: usize::MAX, len })
    }

    /// Run `f` with a notification context bound to the attached observer.
    pub(crate) fn with_ctx<R>(&mut self, f: impl FnOnce(&mut Self, &mut Ctx<'_, L::Item>) -> R) -> R {
        let handle = self.observer.as_ref().map(|a| Arc::clone(&a.handle));
        let mut guard = handle.as_ref().map(|h| h.lock());
        let mut ctx = Ctx::new(self.config, self.keyed, guard.as_deref_mut());
        f(self, &mut ctx)
    }

    /// Run `f` with observer notifications suppressed, then announce the
    /// whole tree to the observer as a rebuild.
    pub(crate) fn with_rebuild<R>(&mut self, f: impl FnOnce(&mut Self, &mut Ctx<'_, L::Item>) -> R) -> R {
        let mut ctx = Ctx::new(self.config, self.keyed, None);
        let out = f(self, &mut ctx);
        if self.observer.is_none() {
            return out;
        }
        self.unshare_repeats();
        if let Some(attachment) = &self.observer {
            let mut observer = attachment.handle.lock();
            observer.root_changed(Some(NodeId::of_ref(&self.root)), true);
            announce_subtree(&mut *observer, &self.root);
        }
        out
    }

    /// Put `right` next to the current root under a new root.
    pub(crate) fn grow_root(&mut self, right: Child<L>, ctx: &mut Ctx<'_, L::Item>) {
        let left = Child::new(Arc::clone(&self.root), self.keyed);
        let (left_id, right_id) = (NodeId::of_ref(&left.node), NodeId::of_ref(&right.node));
        let root = Arc::new(Node::Inner(Inner::from_children(vec![left, right])));
        let root_id = NodeId::of_ref(&root);
        self.root = root;
        self.height += 1;
        ctx.node_added(left_id, root_id);
        ctx.node_added(right_id, root_id);
        ctx.root_changed(Some(root_id));
        debug_log!(height = self.height, len = self.len(), "root split; tree grew");
    }

    /// Replace single-child (or childless) inner roots until the root is a
    /// leaf or has at least two children.
    pub(crate) fn collapse_root(&mut self, ctx: &mut Ctx<'_, L::Item>) {
        loop {
            let next = match &*self.root {
                Node::Inner(inner) if inner.children.is_empty() => None,
                Node::Inner(inner) if inner.children.len() == 1 => {
                    Some(Arc::clone(&inner.children[0].node))
                }
                _ => break,
            };
            let old_id = NodeId::of_ref(&self.root);
            match next {
                Some(child) => {
                    let child_id = NodeId::of_ref(&child);
                    ctx.node_removed(child_id, old_id);
                    self.root = child;
                    self.height = self.height.saturating_sub(1);
                    ctx.root_changed(Some(child_id));
                }
                None => {
                    self.root = Arc::new(Node::Leaf(L::default()));
                    self.height = 0;
                    ctx.root_changed(Some(NodeId::of_ref(&self.root)));
                }
            }
            debug_log!(height = self.height, "root collapsed");
        }
    }

    pub(crate) const fn is_keyed(&self) -> bool {
        self.keyed
    }

    pub(crate) fn root_slot(&mut self) -> &mut NodeRef<L> {
        &mut self.root
    }

    pub(crate) fn hooks_mut(&mut self) -> &mut ChangeHooks<L::Item> {
        &mut self.hooks
    }
}
