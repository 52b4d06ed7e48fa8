//! Trie-backed hash table that grows in depth instead of capacity.
//!
//! Every node has [`TABLE_SIZE`] slots. At depth `level` a key is routed by its
//! `level`-th character; a key with no character left at that depth goes to
//! the terminal slot. Two keys that collide in a slot are pushed one level
//! down into a fresh child node, so the table never reports itself full.
//!
//! Keys sharing a long prefix build a chain of nodes as deep as that prefix.
//! Every walk over the trie (insert, remove, drop) is a loop over heap nodes,
//! never a recursion, so depth is limited by memory alone.

use std::fmt;
use std::mem;
use std::str::Chars;

use tracing::trace;

use crate::error::{Error, Result};

/// Slots per trie node: 26 symbol slots followed by the terminal slot.
pub const TABLE_SIZE: usize = 27;
const TERMINAL_SLOT: usize = TABLE_SIZE - 1;

#[inline]
fn symbol_slot(c: char) -> usize {
    u32::from(c) as usize % TERMINAL_SLOT
}

/// Slot `key` occupies in a node at depth `level`.
pub fn slot_index(key: &str, level: usize) -> usize {
    key.chars().nth(level).map_or(TERMINAL_SLOT, symbol_slot)
}

/// Whether `a` and `b` take different slots at some depth `>= level`.
///
/// Keys of equal length whose remaining characters agree mod 26 share a slot
/// at every depth, down to the terminal slot.
fn separable(a: &str, b: &str, level: usize) -> bool {
    let mut a = Route::new(a, level);
    let mut b = Route::new(b, level);
    loop {
        match (a.0.next(), b.0.next()) {
            (None, None) => return false,
            (Some(x), Some(y)) if symbol_slot(x) == symbol_slot(y) => {}
            _ => return true,
        }
    }
}

/// Slots of one key at consecutive depths, so a walk from the root does not
/// rescan the key for every level.
struct Route<'a>(Chars<'a>);

impl<'a> Route<'a> {
    fn new(key: &'a str, level: usize) -> Self {
        let mut chars = key.chars();
        for _ in 0..level {
            chars.next();
        }
        Self(chars)
    }

    #[inline]
    fn next_slot(&mut self) -> usize {
        self.0.next().map_or(TERMINAL_SLOT, symbol_slot)
    }
}

// =============================================================================
// Trie node
// =============================================================================

pub(crate) enum TrieSlot<V> {
    Empty,
    Leaf(String, V),
    Node(Box<TrieNode<V>>),
}

impl<V> TrieSlot<V> {
    #[inline]
    fn take(&mut self) -> Self {
        mem::replace(self, TrieSlot::Empty)
    }
}

/// Invariant: every node except the root reaches at least two leaves.
pub(crate) struct TrieNode<V> {
    pub(crate) slots: [TrieSlot<V>; TABLE_SIZE],
    pub(crate) level: usize,
    /// Leaves reachable from this node, nested children included.
    pub(crate) count: usize,
}

impl<V> TrieNode<V> {
    fn new(level: usize) -> Self {
        Self {
            slots: std::array::from_fn(|_| TrieSlot::Empty),
            level,
            count: 0,
        }
    }

    /// Replaces the leaf at `index` with a chain of child nodes that ends where
    /// that leaf and `key` first take different slots. `route` is positioned at
    /// depth `self.level + 1` of `key`, and the caller has checked the two keys
    /// are separable.
    fn split(&mut self, index: usize, key: &str, mut route: Route<'_>, value: V) {
        let TrieSlot::Leaf(existing, existing_value) = self.slots[index].take() else {
            unreachable!("split on slot {index} without a leaf");
        };
        let parent_level = self.level;
        let mut existing_route = Route::new(&existing, parent_level + 1);
        let mut level = parent_level + 1;
        let mut slot = &mut self.slots[index];
        loop {
            let mut child = Box::new(TrieNode::new(level));
            child.count = 2;
            let existing_index = existing_route.next_slot();
            let key_index = route.next_slot();
            if existing_index != key_index {
                child.slots[existing_index] = TrieSlot::Leaf(existing, existing_value);
                child.slots[key_index] = TrieSlot::Leaf(key.to_owned(), value);
                *slot = TrieSlot::Node(child);
                trace!(
                    level = parent_level,
                    slot = index,
                    depth = level - parent_level,
                    "split leaf into child nodes"
                );
                return;
            }
            *slot = TrieSlot::Node(child);
            slot = match slot {
                TrieSlot::Node(child) => &mut child.slots[key_index],
                TrieSlot::Empty | TrieSlot::Leaf(..) => unreachable!("slot was just filled"),
            };
            level += 1;
        }
    }

    fn take_leaf(&mut self, index: usize, key: &str) -> V {
        match self.slots[index].take() {
            TrieSlot::Leaf(_, value) => value,
            TrieSlot::Empty | TrieSlot::Node(_) => unreachable!("{key:?} is stored at slot {index}"),
        }
    }

    /// Replaces the two-leaf child at `index` with whichever of its leaves is
    /// not `key`, returning the value stored under `key`.
    fn collapse(&mut self, index: usize, key: &str) -> V {
        let TrieSlot::Node(child) = self.slots[index].take() else {
            unreachable!("collapse on slot {index} without a child node");
        };
        let mut removed = None;
        for (existing, value) in child.into_leaves() {
            if existing == key {
                removed = Some(value);
            } else {
                self.slots[index] = TrieSlot::Leaf(existing, value);
            }
        }
        trace!(level = self.level, slot = index, "collapsed child node into leaf");
        match removed {
            Some(value) => value,
            None => unreachable!("collapsed node did not hold {key:?}"),
        }
    }

    fn into_leaves(self: Box<Self>) -> Vec<(String, V)> {
        let mut leaves = Vec::new();
        let mut stack = vec![self];
        while let Some(mut node) = stack.pop() {
            for slot in node.slots.iter_mut() {
                match slot.take() {
                    TrieSlot::Empty => {}
                    TrieSlot::Leaf(key, value) => leaves.push((key, value)),
                    TrieSlot::Node(child) => stack.push(child),
                }
            }
        }
        leaves
    }
}

/// Unlinks child nodes onto a heap stack; a recursive drop of a long chain
/// would overflow the thread stack.
impl<V> Drop for TrieNode<V> {
    fn drop(&mut self) {
        let mut stack = Vec::new();
        unlink_children(&mut self.slots, &mut stack);
        while let Some(mut node) = stack.pop() {
            unlink_children(&mut node.slots, &mut stack);
        }
    }
}

fn unlink_children<V>(slots: &mut [TrieSlot<V>], stack: &mut Vec<Box<TrieNode<V>>>) {
    for slot in slots {
        if let TrieSlot::Node(child) = slot.take() {
            stack.push(child);
        }
    }
}

// =============================================================================
// InfiniteHashTable
// =============================================================================

/// A string-keyed hash table backed by a trie of fixed-width nodes.
///
/// Collisions grow the trie one level at a time; removals collapse any node
/// left with a single leaf back into its parent slot.
///
/// ```rust
/// use probe_tables::InfiniteHashTable;
///
/// let mut table: InfiniteHashTable<u32> = InfiniteHashTable::new();
/// table.insert("abc", 1).unwrap();
/// table.insert("abd", 2).unwrap();
///
/// assert_eq!(table.get("abd"), Ok(&2));
/// assert_eq!(table.get_location("abc").unwrap().len(), 3);
/// assert_eq!(table.sort_keys(), vec!["abc", "abd"]);
/// ```
pub struct InfiniteHashTable<V> {
    pub(crate) root: TrieNode<V>,
}

impl<V> InfiniteHashTable<V> {
    pub fn new() -> Self {
        Self {
            root: TrieNode::new(0),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.root.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.count == 0
    }

    pub fn get(&self, key: &str) -> Result<&V> {
        let mut route = Route::new(key, 0);
        let mut node = &self.root;
        loop {
            match &node.slots[route.next_slot()] {
                TrieSlot::Node(child) => node = &**child,
                TrieSlot::Leaf(existing, value) if existing.as_str() == key => return Ok(value),
                TrieSlot::Empty | TrieSlot::Leaf(..) => return Err(Error::not_found(key)),
            }
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Result<&mut V> {
        let mut route = Route::new(key, 0);
        let mut node = &mut self.root;
        loop {
            match &mut node.slots[route.next_slot()] {
                TrieSlot::Node(child) => node = &mut **child,
                TrieSlot::Leaf(existing, value) if existing.as_str() == key => return Ok(value),
                TrieSlot::Empty | TrieSlot::Leaf(..) => return Err(Error::not_found(key)),
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_ok()
    }

    /// Inserts or overwrites `key`, returning the previous value.
    ///
    /// Fails with [`Error::KeyConflict`] only for two keys that no depth can
    /// tell apart (same length, every remaining character equal mod 26). The
    /// table is left untouched in that case.
    pub fn insert(&mut self, key: &str, value: V) -> Result<Option<V>> {
        if let Ok(current) = self.get_mut(key) {
            return Ok(Some(mem::replace(current, value)));
        }
        self.check_separable(key)?;
        self.insert_new(key, value);
        Ok(None)
    }

    /// Finds the leaf `key` would have to share a slot with, if any, and
    /// rejects the insert when no deeper level separates the two.
    fn check_separable(&self, key: &str) -> Result<()> {
        let mut route = Route::new(key, 0);
        let mut node = &self.root;
        loop {
            match &node.slots[route.next_slot()] {
                TrieSlot::Node(child) => node = &**child,
                TrieSlot::Leaf(existing, _) if !separable(existing, key, node.level + 1) => {
                    return Err(Error::KeyConflict {
                        existing: existing.clone(),
                        key: key.to_owned(),
                    });
                }
                TrieSlot::Empty | TrieSlot::Leaf(..) => return Ok(()),
            }
        }
    }

    /// Adds a key that is absent and separable from every stored key.
    fn insert_new(&mut self, key: &str, value: V) {
        let mut route = Route::new(key, 0);
        let mut node = &mut self.root;
        loop {
            node.count += 1;
            let index = route.next_slot();
            match node.slots[index] {
                TrieSlot::Node(_) => {}
                TrieSlot::Empty => {
                    node.slots[index] = TrieSlot::Leaf(key.to_owned(), value);
                    return;
                }
                TrieSlot::Leaf(..) => {
                    node.split(index, key, route, value);
                    return;
                }
            }
            node = match &mut node.slots[index] {
                TrieSlot::Node(child) => &mut **child,
                TrieSlot::Empty | TrieSlot::Leaf(..) => unreachable!("slot {index} holds a node"),
            };
        }
    }

    pub fn remove(&mut self, key: &str) -> Result<V> {
        self.get(key)?;
        let mut route = Route::new(key, 0);
        let mut node = &mut self.root;
        loop {
            node.count -= 1;
            let index = route.next_slot();
            match node.slots[index] {
                TrieSlot::Node(ref child) if child.count > 2 => {}
                TrieSlot::Node(_) => return Ok(node.collapse(index, key)),
                TrieSlot::Empty | TrieSlot::Leaf(..) => return Ok(node.take_leaf(index, key)),
            }
            node = match &mut node.slots[index] {
                TrieSlot::Node(child) => &mut **child,
                TrieSlot::Empty | TrieSlot::Leaf(..) => unreachable!("slot {index} holds a node"),
            };
        }
    }

    /// Slot indices from the root down to the leaf holding `key`.
    pub fn get_location(&self, key: &str) -> Result<Vec<usize>> {
        let mut location = Vec::new();
        let mut route = Route::new(key, 0);
        let mut node = &self.root;
        loop {
            let index = route.next_slot();
            location.push(index);
            match &node.slots[index] {
                TrieSlot::Node(child) => node = &**child,
                TrieSlot::Leaf(existing, _) if existing.as_str() == key => return Ok(location),
                TrieSlot::Empty | TrieSlot::Leaf(..) => return Err(Error::not_found(key)),
            }
        }
    }

    /// Every key in ascending lexicographic order.
    pub fn sort_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.iter().map(|(key, _)| key).collect();
        keys.sort_unstable();
        keys
    }

    /// Depth-first traversal in slot order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            stack: vec![self.root.slots.iter()],
        }
    }
}

impl<V> Default for InfiniteHashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Rebuilds the copy entry by entry. The shape of the trie depends only on the
/// stored keys, so the copy has the same layout without a recursive walk.
impl<V: Clone> Clone for InfiniteHashTable<V> {
    fn clone(&self) -> Self {
        let mut table = Self::new();
        for (key, value) in self.iter() {
            table.insert_new(key, value.clone());
        }
        table
    }
}

/// One `key: value` line per entry, in traversal order.
impl<V: fmt::Display> fmt::Display for InfiniteHashTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.iter() {
            writeln!(f, "{key}: {value}")?;
        }
        Ok(())
    }
}

impl<V: fmt::Debug> fmt::Debug for InfiniteHashTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, V> {
    stack: Vec<std::slice::Iter<'a, TrieSlot<V>>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(slots) = self.stack.last_mut() {
            match slots.next() {
                None => {
                    self.stack.pop();
                }
                Some(TrieSlot::Empty) => {}
                Some(TrieSlot::Leaf(key, value)) => return Some((key.as_str(), value)),
                Some(TrieSlot::Node(child)) => self.stack.push(child.slots.iter()),
            }
        }
        None
    }
}

impl<'a, V> IntoIterator for &'a InfiniteHashTable<V> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
