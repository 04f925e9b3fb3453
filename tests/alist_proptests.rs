//! Property-based tests for `AList` and the bulk operations.
//!
//! Differential testing against `Vec` as an oracle: every operation is
//! applied to both, and contents must match afterwards.

#![expect(clippy::unwrap_used, reason = "fail fast in tests")]

mod common;

use atree::{AList, TreeConfig, TreeError};
use proptest::prelude::*;

// ============================================================================
//  Strategies
// ============================================================================

/// Operations for random testing. Positions are reduced modulo the current
/// length when applied.
#[derive(Debug, Clone)]
enum Op {
    Insert(usize, u32),
    Push(u32),
    Set(usize, u32),
    RemoveAt(usize),
    RemoveRange(usize, usize),
    InsertRange(usize, Vec<u32>),
    Append(Vec<u32>),
    Prepend(Vec<u32>),
}

fn operations(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            4 => (any::<usize>(), any::<u32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            3 => any::<u32>().prop_map(Op::Push),
            2 => (any::<usize>(), any::<u32>()).prop_map(|(i, v)| Op::Set(i, v)),
            3 => any::<usize>().prop_map(Op::RemoveAt),
            1 => (any::<usize>(), 0..40usize).prop_map(|(i, n)| Op::RemoveRange(i, n)),
            1 => (any::<usize>(), prop::collection::vec(any::<u32>(), 0..60))
                .prop_map(|(i, v)| Op::InsertRange(i, v)),
            1 => prop::collection::vec(any::<u32>(), 0..80).prop_map(Op::Append),
            1 => prop::collection::vec(any::<u32>(), 0..80).prop_map(Op::Prepend),
        ],
        0..=max_ops,
    )
}

/// Leaf and inner limits from the smallest allowed upwards.
fn config() -> impl Strategy<Value = TreeConfig> {
    (3..12usize, 3..12usize).prop_map(|(leaf, inner)| {
        TreeConfig::default()
            .with_max_leaf_size(leaf)
            .with_max_inner_size(inner)
    })
}

fn apply(list: &mut AList<u32>, oracle: &mut Vec<u32>, op: &Op) {
    let len = oracle.len();
    match op {
        Op::Insert(i, v) => {
            let at = i % (len + 1);
            list.insert(at, *v).unwrap();
            oracle.insert(at, *v);
        }
        Op::Push(v) => {
            list.push(*v).unwrap();
            oracle.push(*v);
        }
        Op::Set(i, v) if len > 0 => {
            let at = i % len;
            assert_eq!(list.set(at, *v).unwrap(), Some(oracle[at]));
            oracle[at] = *v;
        }
        Op::RemoveAt(i) if len > 0 => {
            let at = i % len;
            assert_eq!(list.remove_at(at).unwrap(), Some(oracle.remove(at)));
        }
        Op::RemoveRange(i, n) => {
            let start = i % (len + 1);
            let count = (*n).min(len - start);
            list.remove_range(start, count).unwrap();
            oracle.drain(start..start + count);
        }
        Op::InsertRange(i, items) => {
            let at = i % (len + 1);
            list.insert_range(at, items.iter().copied()).unwrap();
            oracle.splice(at..at, items.iter().copied());
        }
        Op::Append(items) => {
            let other: AList<u32> = items.iter().copied().collect();
            list.append(other).unwrap();
            oracle.extend_from_slice(items);
        }
        Op::Prepend(items) => {
            let other: AList<u32> = items.iter().copied().collect();
            list.prepend(other).unwrap();
            oracle.splice(0..0, items.iter().copied());
        }
        Op::Set(..) | Op::RemoveAt(_) => {}
    }
}

// ============================================================================
//  Differential properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Any operation sequence leaves the list equal to the `Vec` oracle.
    #[test]
    fn matches_vec_oracle(config in config(), ops in operations(120)) {
        common::init_tracing();
        let mut list = AList::with_config(config).unwrap();
        let mut oracle = Vec::new();
        for op in &ops {
            apply(&mut list, &mut oracle, op);
            prop_assert_eq!(list.len(), oracle.len());
        }
        prop_assert_eq!(list.to_vec(), oracle.clone());
        list.check_invariants().unwrap();
        for (i, item) in oracle.iter().enumerate() {
            prop_assert_eq!(list.get(i), Some(item));
        }
    }

    /// Leaves and inner nodes never exceed their configured limits.
    #[test]
    fn nodes_respect_limits(config in config(), ops in operations(120)) {
        let mut list = AList::with_config(config).unwrap();
        let mut oracle = Vec::new();
        for op in &ops {
            apply(&mut list, &mut oracle, op);
        }
        let stats = list.stats();
        prop_assert!(stats.max_leaf_items <= config.max_leaf_size);
        prop_assert!(stats.max_inner_children <= config.max_inner_size);
        prop_assert_eq!(stats.items, oracle.len());
    }

    /// A clone is a snapshot: later writes to either side stay invisible to
    /// the other.
    #[test]
    fn clone_is_independent(
        config in config(),
        before in operations(60),
        after in operations(60),
    ) {
        let mut list = AList::with_config(config).unwrap();
        let mut oracle = Vec::new();
        for op in &before {
            apply(&mut list, &mut oracle, op);
        }
        let snapshot = list.clone();
        let frozen_oracle = oracle.clone();

        for op in &after {
            apply(&mut list, &mut oracle, op);
        }
        prop_assert_eq!(snapshot.to_vec(), frozen_oracle);
        prop_assert_eq!(list.to_vec(), oracle);
        snapshot.check_invariants().unwrap();
    }

    /// Appending and prepending whole trees equals concatenation.
    #[test]
    fn append_prepend_concatenate(
        left_cfg in config(),
        right_cfg in config(),
        left in prop::collection::vec(any::<u16>(), 0..300),
        right in prop::collection::vec(any::<u16>(), 0..300),
    ) {
        let build = |cfg, items: &[u16]| {
            let mut t = AList::with_config(cfg).unwrap();
            t.insert_range(0, items.iter().copied()).unwrap();
            t
        };
        let expected: Vec<u16> = left.iter().chain(&right).copied().collect();

        let mut appended = build(left_cfg, &left);
        appended.append(build(right_cfg, &right)).unwrap();
        prop_assert_eq!(appended.to_vec(), expected.clone());
        appended.check_invariants().unwrap();

        let mut prepended = build(right_cfg, &right);
        prepended.prepend(build(left_cfg, &left)).unwrap();
        prop_assert_eq!(prepended.to_vec(), expected);
        prepended.check_invariants().unwrap();
    }

    /// `copy_section` and `remove_section` agree with slicing.
    #[test]
    fn sections_match_slices(
        items in prop::collection::vec(any::<u32>(), 0..400),
        a: usize,
        b: usize,
    ) {
        let mut list = AList::with_config(common::small_config()).unwrap();
        list.insert_range(0, items.iter().copied()).unwrap();
        let start = a % (items.len() + 1);
        let count = b % (items.len() - start + 1);

        let copy = list.copy_section(start, count).unwrap();
        prop_assert_eq!(copy.to_vec(), items[start..start + count].to_vec());
        copy.check_invariants().unwrap();

        let removed = list.remove_section(start, count).unwrap();
        prop_assert_eq!(removed.to_vec(), items[start..start + count].to_vec());
        let mut rest = items.clone();
        rest.drain(start..start + count);
        prop_assert_eq!(list.to_vec(), rest);
        list.check_invariants().unwrap();
    }
}

// ============================================================================
//  Frozen lists
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every mutating call on a frozen list fails and changes nothing.
    #[test]
    fn frozen_rejects_writes(items in prop::collection::vec(any::<u32>(), 1..100), v: u32) {
        let mut list: AList<u32> = items.iter().copied().collect();
        list.freeze();

        prop_assert_eq!(list.insert(0, v), Err(TreeError::ReadOnly));
        prop_assert_eq!(list.push(v), Err(TreeError::ReadOnly));
        prop_assert_eq!(list.set(0, v), Err(TreeError::ReadOnly));
        prop_assert_eq!(list.remove_at(0), Err(TreeError::ReadOnly));
        prop_assert_eq!(list.remove_range(0, 1), Err(TreeError::ReadOnly));
        prop_assert_eq!(list.clear(), Err(TreeError::ReadOnly));
        prop_assert_eq!(list.to_vec(), items);

        // Clones of a frozen list are writable.
        let mut copy = list.clone();
        copy.push(v).unwrap();
        prop_assert_eq!(copy.len(), list.len() + 1);
    }
}

#[test]
fn deep_tree_from_many_pushes() {
    common::init_tracing();
    let mut list = AList::with_config(common::small_config()).unwrap();
    for i in 0..10_000u32 {
        list.push(i).unwrap();
    }
    assert!(list.height() >= 6);
    list.check_invariants().unwrap();
    for i in (0..10_000u32).rev().step_by(7) {
        list.remove_at(i as usize).unwrap();
    }
    list.check_invariants().unwrap();
    assert_eq!(list.len(), 10_000 - 1429);
}
