//! Two-level open-addressing table keyed by a pair of strings.

use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};
use crate::probe::{ProbeArray, SizeLadder, DEFAULT_TABLE_SIZES};
use crate::sub_table::SubTable;

/// Capacity ladders for a [`DoubleKeyTable`].
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Ladder for the outer table, indexed by the first key.
    pub sizes: Vec<usize>,
    /// Ladder every inner [`SubTable`] starts from, indexed by the second key.
    /// `None` reuses `sizes`.
    pub internal_sizes: Option<Vec<usize>>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            sizes: DEFAULT_TABLE_SIZES.to_vec(),
            internal_sizes: None,
        }
    }
}

/// A hash table keyed by `(key1, key2)`.
///
/// The outer table maps `key1` to a [`SubTable`] that maps `key2` to the
/// value. Sub-tables are created on the first insert under a new `key1` and
/// dropped when their last entry is removed, so no outer slot ever holds an
/// empty sub-table.
///
/// `len()` counts leaf entries across all sub-tables. After a new entry, if
/// `len() * 2 >= capacity()` the outer table grows to the next size on its
/// ladder and every entry is reinserted.
///
/// ```rust
/// use probe_tables::DoubleKeyTable;
///
/// let mut table: DoubleKeyTable<u32> = DoubleKeyTable::new();
/// table.insert("cat", "meow", 1).unwrap();
/// table.insert("dog", "woof", 2).unwrap();
///
/// assert_eq!(table.get("cat", "meow"), Ok(&1));
/// assert!(table.get("cat", "woof").is_err());
/// ```
#[derive(Clone)]
pub struct DoubleKeyTable<V> {
    pub(crate) array: ProbeArray<SubTable<V>>,
    sizes: SizeLadder,
    internal_sizes: SizeLadder,
    pub(crate) size_index: usize,
    pub(crate) count: usize,
}

impl<V> DoubleKeyTable<V> {
    pub fn new() -> Self {
        Self::from_ladders(SizeLadder::default(), SizeLadder::default())
    }

    /// Builds a table from explicit ladders, rejecting malformed ones.
    pub fn with_config(config: TableConfig) -> Result<Self> {
        let sizes = SizeLadder::new(config.sizes)?;
        let internal_sizes = match config.internal_sizes {
            Some(internal_sizes) => SizeLadder::new(internal_sizes)?,
            None => sizes.clone(),
        };
        Ok(Self::from_ladders(sizes, internal_sizes))
    }

    pub fn from_ladders(sizes: SizeLadder, internal_sizes: SizeLadder) -> Self {
        Self {
            array: ProbeArray::with_capacity(sizes.first()),
            sizes,
            internal_sizes,
            size_index: 0,
            count: 0,
        }
    }

    /// Number of `(key1, key2)` entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Current number of outer slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.array.capacity()
    }

    pub fn sizes(&self) -> &SizeLadder {
        &self.sizes
    }

    pub fn internal_sizes(&self) -> &SizeLadder {
        &self.internal_sizes
    }

    /// The inner table holding every entry under `key1`.
    pub fn sub_table(&self, key1: &str) -> Result<&SubTable<V>> {
        self.array.get(key1).ok_or_else(|| Error::not_found(key1))
    }

    /// Fails with `NotFound(key1)` when `key1` is absent and with
    /// `NotFound(key2)` when only `key2` is.
    pub fn get(&self, key1: &str, key2: &str) -> Result<&V> {
        self.sub_table(key1)?.get(key2)
    }

    pub fn get_mut(&mut self, key1: &str, key2: &str) -> Result<&mut V> {
        self.array
            .get_mut(key1)
            .ok_or_else(|| Error::not_found(key1))?
            .get_mut(key2)
    }

    pub fn contains_key(&self, key1: &str, key2: &str) -> bool {
        self.get(key1, key2).is_ok()
    }

    /// Inserts or overwrites `(key1, key2)`, returning the previous value.
    pub fn insert(&mut self, key1: &str, key2: &str, value: V) -> Result<Option<V>> {
        let previous = self.insert_entry(key1, key2, value)?;
        if previous.is_none() && self.count * 2 >= self.capacity() {
            self.grow();
        }
        Ok(previous)
    }

    /// Removes `(key1, key2)`, freeing the outer slot if its sub-table empties.
    pub fn remove(&mut self, key1: &str, key2: &str) -> Result<V> {
        let sub_table = self
            .array
            .get_mut(key1)
            .ok_or_else(|| Error::not_found(key1))?;
        let value = sub_table.remove(key2)?;
        let emptied = sub_table.is_empty();
        self.count -= 1;
        if emptied {
            self.array.remove(key1);
        }
        Ok(value)
    }

    /// `None`: every first-level key. `Some(key1)`: the second-level keys
    /// stored under `key1`. Both in slot order.
    pub fn keys(&self, key1: Option<&str>) -> Result<Vec<&str>> {
        match key1 {
            None => Ok(self.array.iter().map(|(key, _)| key).collect()),
            Some(key1) => Ok(self.sub_table(key1)?.keys().collect()),
        }
    }

    /// `None`: every value in the table. `Some(key1)`: the values stored under
    /// `key1`.
    pub fn values(&self, key1: Option<&str>) -> Result<Vec<&V>> {
        match key1 {
            None => Ok(self.array.iter().flat_map(|(_, sub)| sub.values()).collect()),
            Some(key1) => Ok(self.sub_table(key1)?.values().collect()),
        }
    }

    /// Every `(key1, key2, value)` entry in outer then inner slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &V)> + '_ {
        self.array.iter().flat_map(|(key1, sub)| {
            sub.iter().map(move |(key2, value)| (key1, key2, value))
        })
    }

    fn insert_entry(&mut self, key1: &str, key2: &str, value: V) -> Result<Option<V>> {
        let internal_sizes = &self.internal_sizes;
        let sub_table = self
            .array
            .get_or_insert_with(key1, || SubTable::with_ladder(internal_sizes.clone()))?;
        let previous = sub_table.insert(key2, value)?;
        if previous.is_none() {
            self.count += 1;
        }
        Ok(previous)
    }

    /// Moves to the next outer size and reinserts every entry into fresh
    /// sub-tables. A no-op once the ladder is exhausted.
    ///
    /// Infallible: the new outer array is larger than the old one, and each
    /// fresh sub-table walks the same ladder as the one it replaces.
    fn grow(&mut self) {
        let Some(capacity) = self.sizes.get(self.size_index + 1) else {
            debug!(
                capacity = self.capacity(),
                len = self.count,
                "double-key table size ladder exhausted"
            );
            return;
        };
        debug!(
            from = self.capacity(),
            to = capacity,
            len = self.count,
            "growing double-key table"
        );

        self.size_index += 1;
        let old = std::mem::replace(&mut self.array, ProbeArray::with_capacity(capacity));
        for (key1, sub_table) in old.into_entries() {
            let mut fresh = SubTable::with_ladder(self.internal_sizes.clone());
            for (key2, value) in sub_table.into_entries() {
                fresh.insert_displaced(key2, value);
            }
            self.array.insert_displaced(key1, fresh);
        }
    }
}

impl<V> Default for DoubleKeyTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// One `key2: value` line per entry, in slot order.
impl<V: fmt::Display> fmt::Display for DoubleKeyTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (_, key2, value) in self.iter() {
            writeln!(f, "{key2}: {value}")?;
        }
        Ok(())
    }
}

impl<V: fmt::Debug> fmt::Debug for DoubleKeyTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(key1, key2, value)| ((key1, key2), value)))
            .finish()
    }
}
