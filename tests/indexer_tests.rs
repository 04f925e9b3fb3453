//! Observer and indexer tests.
//!
//! Random edit sequences run against an indexed list; after each sequence
//! the indexer's incremental state must equal a from-scratch rebuild, and
//! every lookup must agree with a linear scan.

#![expect(clippy::unwrap_used, reason = "fail fast in tests")]

mod common;

use std::sync::Arc;

use atree::{AList, AListIndexer, NodeId, TreeObserver};
use parking_lot::Mutex;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Edit {
    Insert(usize),
    Remove(usize),
    Set(usize),
    RemoveRange(usize, usize),
    InsertRange(usize, usize),
    Append(usize),
    AppendSelf,
    Snapshot,
}

fn edits(max: usize) -> impl Strategy<Value = Vec<Edit>> {
    prop::collection::vec(
        prop_oneof![
            5 => any::<usize>().prop_map(Edit::Insert),
            3 => any::<usize>().prop_map(Edit::Remove),
            2 => any::<usize>().prop_map(Edit::Set),
            1 => (any::<usize>(), 0..30usize).prop_map(|(i, n)| Edit::RemoveRange(i, n)),
            1 => (any::<usize>(), 0..30usize).prop_map(|(i, n)| Edit::InsertRange(i, n)),
            1 => (0..50usize).prop_map(Edit::Append),
            1 => Just(Edit::AppendSelf),
            1 => Just(Edit::Snapshot),
        ],
        0..=max,
    )
}

/// Applies edits with fresh, never repeated items.
struct Driver {
    list: AList<u64>,
    next: u64,
    snapshots: Vec<AList<u64>>,
}

impl Driver {
    fn fresh(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    fn apply(&mut self, edit: &Edit) {
        let len = self.list.len();
        match *edit {
            Edit::Insert(i) => {
                let item = self.fresh();
                self.list.insert(i % (len + 1), item).unwrap();
            }
            Edit::Remove(i) if len > 0 => {
                self.list.remove_at(i % len).unwrap();
            }
            Edit::Set(i) if len > 0 => {
                let item = self.fresh();
                self.list.set(i % len, item).unwrap();
            }
            Edit::RemoveRange(i, n) => {
                let start = i % (len + 1);
                self.list.remove_range(start, n.min(len - start)).unwrap();
            }
            Edit::InsertRange(i, n) => {
                let items: Vec<u64> = (0..n).map(|_| self.fresh()).collect();
                self.list.insert_range(i % (len + 1), items).unwrap();
            }
            Edit::Append(n) => {
                let other: AList<u64> = (0..n).map(|_| self.fresh()).collect();
                self.list.append(other).unwrap();
            }
            Edit::AppendSelf if len < 400 => {
                let snapshot = self.list.clone();
                self.list.append_copy(&snapshot).unwrap();
            }
            Edit::Snapshot => self.snapshots.push(self.list.clone()),
            Edit::Remove(_) | Edit::Set(_) | Edit::AppendSelf => {}
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The indexer stays in sync through splits, merges, copy-on-write and
    /// bulk rebuilds, including appending the list to itself.
    #[test]
    fn indexer_tracks_every_edit(initial in 0..200usize, edits in edits(80)) {
        common::init_tracing();
        let mut list = AList::with_config(common::small_config()).unwrap();
        list.insert_range(0, 0..initial as u64).unwrap();
        let indexer = AListIndexer::new();
        list.attach_observer(indexer.handle()).unwrap();

        let mut driver = Driver { list, next: 1_000_000, snapshots: Vec::new() };
        for edit in &edits {
            driver.apply(edit);
        }
        let list = &driver.list;

        indexer.verify_correctness(list).unwrap();
        prop_assert_eq!(indexer.item_count(), list.len());
        for (pos, item) in list.iter().enumerate() {
            let positions = indexer.indexes_of(list, item).unwrap();
            prop_assert!(positions.contains(&pos));
            if pos % 8 == 0 {
                prop_assert_eq!(positions.first().copied(), list.index_of(item));
            }
        }
        prop_assert_eq!(indexer.index_of(list, &u64::MAX).unwrap(), None);
    }
}

#[test]
fn grafting_a_snapshot_of_itself() {
    let mut list: AList<u64> = AList::with_config(common::small_config()).unwrap();
    list.insert_range(0, 0..40).unwrap();
    let indexer = AListIndexer::new();
    list.attach_observer(indexer.handle()).unwrap();

    list.append_copy(&list.clone()).unwrap();
    list.check_invariants().unwrap();
    indexer.verify_correctness(&list).unwrap();
    assert_eq!(indexer.indexes_of(&list, &5).unwrap(), vec![5, 45]);

    let snapshot = list.clone();
    list.prepend_copy(&snapshot).unwrap();
    list.insert_range(80, snapshot.iter().copied()).unwrap();
    indexer.verify_correctness(&list).unwrap();
    assert_eq!(indexer.item_count(), 240);
    assert_eq!(indexer.indexes_of(&list, &39).unwrap(), vec![39, 79, 119, 159, 199, 239]);
}

#[test]
fn attaching_after_a_self_graft() {
    let mut list: AList<u64> = AList::with_config(common::small_config()).unwrap();
    list.insert_range(0, 0..30).unwrap();
    let snapshot = list.clone();
    list.append_copy(&snapshot).unwrap();
    list.prepend(snapshot).unwrap();

    let indexer = AListIndexer::new();
    list.attach_observer(indexer.handle()).unwrap();
    indexer.verify_correctness(&list).unwrap();
    assert_eq!(indexer.indexes_of(&list, &0).unwrap(), vec![0, 30, 60]);
}

#[test]
fn one_indexer_follows_one_list() {
    let mut first: AList<u64> = (0..20).collect();
    let mut second: AList<u64> = (100..120).collect();
    let indexer = AListIndexer::new();
    first.attach_observer(indexer.handle()).unwrap();
    assert_eq!(
        second.attach_observer(indexer.handle()),
        Err(atree::TreeError::ObserverAttached)
    );

    first.detach_observer().unwrap();
    second.attach_observer(indexer.handle()).unwrap();
    assert_eq!(indexer.index_of(&second, &105).unwrap(), Some(5));
    indexer.verify_correctness(&second).unwrap();
}

#[test]
fn attaching_twice_is_rejected() {
    let mut list: AList<u64> = (0..10).collect();
    let indexer = AListIndexer::new();
    list.attach_observer(indexer.handle()).unwrap();
    assert!(list.attach_observer(AListIndexer::new().handle()).is_err());
    assert!(list.has_observer());
}

#[test]
fn clone_does_not_carry_the_observer() {
    let mut list: AList<u64> = (0..100).collect();
    let indexer = AListIndexer::new();
    list.attach_observer(indexer.handle()).unwrap();

    let mut copy = list.clone();
    assert!(!copy.has_observer());
    copy.push(1000).unwrap();
    assert_eq!(indexer.item_count(), 100);
    indexer.verify_correctness(&list).unwrap();
}

#[test]
fn reattach_after_detach_reindexes() {
    let mut list: AList<u64> = (0..300).collect();
    let indexer = AListIndexer::new();
    list.attach_observer(indexer.handle()).unwrap();
    let handle = list.detach_observer().unwrap();
    list.remove_range(0, 100).unwrap();

    list.attach_observer(handle).unwrap();
    indexer.verify_correctness(&list).unwrap();
    assert_eq!(indexer.index_of(&list, &100).unwrap(), Some(0));
}

/// Counts callbacks by kind.
#[derive(Default)]
struct Tally {
    items_added: usize,
    items_removed: usize,
    nodes_added: usize,
    nodes_removed: usize,
    clears: usize,
}

impl TreeObserver<u32> for Tally {
    fn item_added(&mut self, _item: &u32, _leaf: NodeId) {
        self.items_added += 1;
    }
    fn item_removed(&mut self, _item: &u32, _leaf: NodeId) {
        self.items_removed += 1;
    }
    fn node_added(&mut self, _child: NodeId, _parent: NodeId) {
        self.nodes_added += 1;
    }
    fn node_removed(&mut self, _child: NodeId, _parent: NodeId) {
        self.nodes_removed += 1;
    }
    fn root_changed(&mut self, _root: Option<NodeId>, clearing: bool) {
        if clearing {
            self.clears += 1;
        }
    }
}

#[test]
fn custom_observer_sees_net_item_changes() {
    let tally = Arc::new(Mutex::new(Tally::default()));
    let mut list = AList::with_config(common::small_config()).unwrap();
    list.attach_observer(tally.clone()).unwrap();
    assert_eq!(tally.lock().clears, 1);

    for i in 0..50u32 {
        list.push(i).unwrap();
    }
    for _ in 0..20 {
        list.remove_at(0).unwrap();
    }

    let t = tally.lock();
    // Moves during splits and merges count on both sides.
    assert_eq!(t.items_added - t.items_removed, 30);
    assert!(t.nodes_added > t.nodes_removed);
}
