//! # `ATree`
//!
//! Persistent wide-fanout trees for lists and ordered maps.
//!
//! Every collection in this crate is an [`ATree`]: a B+tree-like structure
//! whose inner nodes cache the item count of each child, so positions are
//! found by prefix sums in O(log n). Nodes are shared behind `Arc`s, making
//! `clone` an O(1) snapshot; the first write to a shared node copies it.
//!
//! | Collection | Storage | Ordered by |
//! |------------|---------|------------|
//! | [`AList`] | dense leaves | position |
//! | [`SparseAList`] | set items plus unset "space" | position |
//! | [`BList`] | dense, keyed | comparer, duplicates allowed |
//! | [`BDictionary`] | dense, keyed | key, unique |
//! | [`BMultiMap`] | dense, keyed | key, then value |
//!
//! ```rust
//! use atree::{AList, BDictionary};
//!
//! let mut list: AList<u32> = (0..1000).collect();
//! list.insert(500, 42)?;
//! list.remove_range(0, 100)?;
//! assert_eq!(list[400], 42);
//!
//! let mut map = BDictionary::new();
//! map.insert("b", 2)?;
//! map.insert("a", 1)?;
//! assert_eq!(map.get_at(0), Some((&"a", &1)));
//! # Ok::<(), atree::TreeError>(())
//! ```
//!
//! ## Bulk operations
//!
//! [`ATree::append`], [`ATree::prepend`], [`ATree::insert_range`] and
//! [`ATree::remove_section`] work on whole subtrees: appending a tree grafts
//! its root at the matching level instead of inserting item by item.
//!
//! ## Observers
//!
//! A [`TreeObserver`] receives every structural change. [`AListIndexer`] is
//! the bundled observer; it answers "where is this item?" without a scan.
//!
//! ## Thread Safety
//!
//! Trees are `Send + Sync` when their items are. Mutation takes `&mut self`;
//! share snapshots across threads by cloning.

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Hot accessors are marked #[inline(always)] and checked with the benches.
#![allow(clippy::inline_always)]

pub mod change;
pub mod config;
pub mod dictionary;
pub mod indexer;
pub mod leaf;
pub mod leaf_sparse;
pub mod leaf_trait;
pub mod list;
pub mod multimap;
pub mod node;
pub mod observer;
pub mod sorted;
pub mod sparse;
pub mod tree;

mod tracing_helpers;

// Re-export main types for convenience
pub use change::{ChangeAction, ListChange, ListChangingFn, SizeChangedFn};
pub use config::TreeConfig;
pub use dictionary::BDictionary;
pub use indexer::AListIndexer;
pub use list::AList;
pub use multimap::BMultiMap;
pub use node::NodeId;
pub use observer::{ObserverHandle, TreeObserver};
pub use sorted::{BList, Mode, SingleOpResult};
pub use sparse::SparseAList;
pub use tree::{ATree, TreeError, TreeStats};
