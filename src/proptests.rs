use super::*;

use crate::infinite::{slot_index, TrieNode, TrieSlot};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn validate_double_key<V: PartialEq + std::fmt::Debug>(t: &DoubleKeyTable<V>) {
    let mut leaf_count = 0usize;
    let mut outer_count = 0usize;
    for (key1, sub) in t.array.iter() {
        outer_count += 1;
        assert!(!sub.is_empty(), "outer slot {key1:?} holds an empty sub-table");
        assert!(
            sub.len() <= sub.capacity(),
            "sub-table {key1:?} over capacity"
        );
        for (key2, value) in sub.iter() {
            leaf_count += 1;
            assert_eq!(
                t.get(key1, key2),
                Ok(value),
                "entry {key1:?}/{key2:?} unreachable by probing"
            );
        }
    }

    assert_eq!(outer_count, t.array.occupied(), "outer occupancy drifted");
    assert_eq!(leaf_count, t.count, "leaf count must match DoubleKeyTable::len");

    let ladder_exhausted = t.size_index + 1 == t.sizes().as_slice().len();
    if !ladder_exhausted {
        assert!(
            t.count * 2 < t.capacity(),
            "load factor {}/{} must stay below 0.5 while the ladder has room",
            t.count,
            t.capacity()
        );
    }
}

fn validate_node<V>(node: &TrieNode<V>, is_root: bool) -> usize {
    let mut leaf_count = 0usize;
    for (index, slot) in node.slots.iter().enumerate() {
        match slot {
            TrieSlot::Empty => {}
            TrieSlot::Leaf(key, _) => {
                assert_eq!(
                    slot_index(key, node.level),
                    index,
                    "leaf {key:?} stored in the wrong slot"
                );
                leaf_count += 1;
            }
            TrieSlot::Node(child) => {
                assert_eq!(child.level, node.level + 1, "child level must be parent + 1");
                leaf_count += validate_node(child, false);
            }
        }
    }
    if !is_root {
        assert!(leaf_count >= 2, "non-root node with {leaf_count} leaves");
    }
    assert_eq!(leaf_count, node.count, "stored node count must match leaves");
    leaf_count
}

fn validate_trie<V>(t: &InfiniteHashTable<V>) {
    assert_eq!(t.root.level, 0);
    let leaves = validate_node(&t.root, true);
    assert_eq!(leaves, t.len());
    for (key, _) in t.iter() {
        let location = t.get_location(key).unwrap();
        for (level, &index) in location.iter().enumerate() {
            assert_eq!(index, slot_index(key, level), "{key:?} routed off its path");
        }
    }
}

#[derive(Clone, Debug)]
enum PairOp {
    Insert(String, String, u64),
    Remove(String, String),
    Get(String, String),
}

#[derive(Clone, Debug)]
enum Op {
    Insert(String, u64),
    Remove(String),
    Get(String),
}

fn pair_ops_strategy() -> impl Strategy<Value = Vec<PairOp>> {
    // Small alphabets keep the key space dense so slots collide and
    // clusters form.
    let key1 = "[a-d]{1,3}";
    let key2 = "[a-d]{0,3}";
    let op = prop_oneof![
        50 => (key1, key2, any::<u64>()).prop_map(|(k1, k2, v)| PairOp::Insert(k1, k2, v)),
        25 => (key1, key2).prop_map(|(k1, k2)| PairOp::Remove(k1, k2)),
        25 => (key1, key2).prop_map(|(k1, k2)| PairOp::Get(k1, k2)),
    ];
    prop::collection::vec(op, 0..=1000)
}

fn trie_ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    // Lowercase keys never collide at every level, so inserts cannot conflict.
    let key = "[a-e]{0,6}";
    let op = prop_oneof![
        50 => (key, any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        25 => key.prop_map(Op::Remove),
        25 => key.prop_map(Op::Get),
    ];
    prop::collection::vec(op, 0..=1000)
}

fn run_pair_ops(
    mut t: DoubleKeyTable<u64>,
    ops: Vec<PairOp>,
) -> Result<(), TestCaseError> {
    let mut m: BTreeMap<(String, String), u64> = BTreeMap::new();

    for op in ops {
        match op {
            PairOp::Insert(k1, k2, v) => match t.insert(&k1, &k2, v) {
                Ok(old_t) => {
                    let old_m = m.insert((k1, k2), v);
                    prop_assert_eq!(old_t, old_m);
                }
                Err(Error::TableFull { .. }) => {
                    prop_assert!(!m.contains_key(&(k1, k2)), "overwrite reported full");
                }
                Err(err) => prop_assert!(false, "unexpected error {err}"),
            },
            PairOp::Remove(k1, k2) => {
                let old_t = t.remove(&k1, &k2).ok();
                let old_m = m.remove(&(k1, k2));
                prop_assert_eq!(old_t, old_m);
            }
            PairOp::Get(k1, k2) => {
                let got_t = t.get(&k1, &k2).ok().copied();
                let got_m = m.get(&(k1.clone(), k2.clone())).copied();
                prop_assert_eq!(got_t, got_m);
                prop_assert_eq!(t.contains_key(&k1, &k2), got_m.is_some());
            }
        }

        prop_assert_eq!(t.len(), m.len());
    }

    validate_double_key(&t);
    let mut got: Vec<(String, String, u64)> = t
        .iter()
        .map(|(k1, k2, v)| (k1.to_owned(), k2.to_owned(), *v))
        .collect();
    got.sort();
    let expected: Vec<(String, String, u64)> =
        m.into_iter().map(|((k1, k2), v)| (k1, k2, v)).collect();
    prop_assert_eq!(got, expected);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_double_key_equivalence(ops in pair_ops_strategy()) {
        run_pair_ops(DoubleKeyTable::new(), ops)?;
    }

    #[test]
    fn prop_double_key_small_ladders(ops in pair_ops_strategy()) {
        let config = TableConfig {
            sizes: vec![3, 5, 7, 11],
            internal_sizes: Some(vec![2, 3, 5]),
        };
        run_pair_ops(DoubleKeyTable::with_config(config).unwrap(), ops)?;
    }

    #[test]
    fn prop_infinite_equivalence(ops in trie_ops_strategy()) {
        let mut t: InfiniteHashTable<u64> = InfiniteHashTable::new();
        let mut m: BTreeMap<String, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let old_t = t.insert(&key, value).unwrap();
                    let old_m = m.insert(key, value);
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Remove(key) => {
                    let old_t = t.remove(&key).ok();
                    let old_m = m.remove(&key);
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Get(key) => {
                    let got_t = t.get(&key).ok().copied();
                    let got_m = m.get(&key).copied();
                    prop_assert_eq!(got_t, got_m);
                    prop_assert_eq!(t.get_location(&key).is_ok(), got_m.is_some());
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_trie(&t);
        let expected: Vec<&str> = m.keys().map(String::as_str).collect();
        prop_assert_eq!(t.sort_keys(), expected);
    }
}

/// Calls `f` once per ordering of `items`, swapping in place (Heap's
/// algorithm) so no ordering is visited twice.
fn for_each_ordering<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    let mut order = items.to_vec();
    let mut swaps = vec![0usize; order.len()];
    f(order.clone());

    let mut depth = 1;
    while depth < order.len() {
        if swaps[depth] < depth {
            let other = if depth % 2 == 0 { 0 } else { swaps[depth] };
            order.swap(other, depth);
            f(order.clone());
            swaps[depth] += 1;
            depth = 1;
        } else {
            swaps[depth] = 0;
            depth += 1;
        }
    }
}

#[test]
fn orderings_are_complete_and_distinct() {
    let mut seen = std::collections::BTreeSet::new();
    for_each_ordering(&[1, 2, 3, 4], |order| {
        assert!(seen.insert(order));
    });
    assert_eq!(seen.len(), 24);
}

const SMALL_KEYS: [&str; 6] = ["a", "b", "ab", "abc", "abd", "ba"];

#[test]
fn exhaustive_insert_order_small_set() {
    for_each_ordering(&SMALL_KEYS, |perm| {
        let mut t: InfiniteHashTable<u64> = InfiniteHashTable::new();
        let mut m: BTreeMap<&str, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            assert_eq!(t.insert(k, v).unwrap(), m.insert(k, v));
        }

        validate_trie(&t);
        let got: Vec<(&str, u64)> = SMALL_KEYS
            .iter()
            .map(|k| (*k, *t.get(k).unwrap()))
            .collect();
        let expected: Vec<(&str, u64)> = SMALL_KEYS.iter().map(|k| (*k, m[k])).collect();
        assert_eq!(got, expected);
        assert_eq!(t.sort_keys(), m.keys().copied().collect::<Vec<_>>());
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    // Insert in a fixed order, then remove in all permutations.
    let mut base: InfiniteHashTable<u64> = InfiniteHashTable::new();
    for (i, k) in SMALL_KEYS.iter().enumerate() {
        base.insert(k, i as u64).unwrap();
    }

    for_each_ordering(&SMALL_KEYS, |perm| {
        let mut t = base.clone();
        let mut remaining = SMALL_KEYS.len();

        for k in perm {
            let expected = SMALL_KEYS.iter().position(|s| *s == k).unwrap() as u64;
            assert_eq!(t.remove(k), Ok(expected));
            remaining -= 1;
            assert_eq!(t.len(), remaining);
            validate_trie(&t);
        }
        assert!(t.is_empty());
        assert!(t.root.slots.iter().all(|slot| matches!(slot, TrieSlot::Empty)));
    });
}

#[test]
fn exhaustive_remove_order_double_key() {
    let pairs: [(&str, &str); 6] = [
        ("cat", "meow"),
        ("cat", "purr"),
        ("dog", "woof"),
        ("dog", "growl"),
        ("cow", "moo"),
        ("owl", "hoot"),
    ];
    let config = TableConfig {
        sizes: vec![5, 7, 11, 13, 17],
        internal_sizes: Some(vec![2, 3, 5]),
    };
    let mut base: DoubleKeyTable<usize> = DoubleKeyTable::with_config(config).unwrap();
    for (i, (k1, k2)) in pairs.iter().enumerate() {
        base.insert(k1, k2, i).unwrap();
    }
    validate_double_key(&base);

    for_each_ordering(&pairs, |perm| {
        let mut t = base.clone();
        for (k1, k2) in perm {
            let expected = pairs.iter().position(|p| *p == (k1, k2)).unwrap();
            assert_eq!(t.remove(k1, k2), Ok(expected));
            validate_double_key(&t);
        }
        assert!(t.is_empty());
        assert_eq!(t.array.occupied(), 0);
    });
}
