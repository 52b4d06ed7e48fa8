//! Single-level linear-probing table, the inner level of a [`DoubleKeyTable`].
//!
//! [`DoubleKeyTable`]: crate::DoubleKeyTable

use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};
use crate::probe::{ProbeArray, SizeLadder};

/// A string-keyed open-addressing table that grows through its own
/// [`SizeLadder`].
///
/// Growth is checked after every new entry: once `len() * 2 >= capacity()` the
/// table moves to the next size on the ladder and rehashes. At the top of the
/// ladder it stops growing and keeps filling until [`Error::TableFull`].
#[derive(Clone)]
pub struct SubTable<V> {
    pub(crate) array: ProbeArray<V>,
    ladder: SizeLadder,
    size_index: usize,
}

impl<V> SubTable<V> {
    pub fn new() -> Self {
        Self::with_ladder(SizeLadder::default())
    }

    pub fn with_ladder(ladder: SizeLadder) -> Self {
        Self {
            array: ProbeArray::with_capacity(ladder.first()),
            ladder,
            size_index: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.array.occupied()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.array.capacity()
    }

    pub fn get(&self, key: &str) -> Result<&V> {
        self.array.get(key).ok_or_else(|| Error::not_found(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Result<&mut V> {
        self.array.get_mut(key).ok_or_else(|| Error::not_found(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.array.get(key).is_some()
    }

    /// Inserts or overwrites `key`, returning the previous value.
    pub fn insert(&mut self, key: &str, value: V) -> Result<Option<V>> {
        let previous = self.array.insert(key, value)?;
        if previous.is_none() && self.len() * 2 >= self.capacity() {
            self.grow();
        }
        Ok(previous)
    }

    pub fn remove(&mut self, key: &str) -> Result<V> {
        self.array.remove(key).ok_or_else(|| Error::not_found(key))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.array.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.array.iter().map(|(_, value)| value)
    }

    /// Entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.array.iter()
    }

    /// Adds an entry known to be absent, growing as `insert` would. The caller
    /// never holds more entries than the top of the ladder can store.
    pub(crate) fn insert_displaced(&mut self, key: String, value: V) {
        self.array.insert_displaced(key, value);
        if self.len() * 2 >= self.capacity() {
            self.grow();
        }
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (String, V)> {
        self.array.into_entries()
    }

    fn grow(&mut self) {
        let Some(capacity) = self.ladder.get(self.size_index + 1) else {
            debug!(
                capacity = self.capacity(),
                len = self.len(),
                "sub-table size ladder exhausted"
            );
            return;
        };
        debug!(from = self.capacity(), to = capacity, "growing sub-table");

        self.size_index += 1;
        let old = std::mem::replace(&mut self.array, ProbeArray::with_capacity(capacity));
        for (key, value) in old.into_entries() {
            self.array.insert_displaced(key, value);
        }
    }
}

impl<V> Default for SubTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Display> fmt::Display for SubTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.iter() {
            writeln!(f, "{key}: {value}")?;
        }
        Ok(())
    }
}

impl<V: fmt::Debug> fmt::Debug for SubTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
