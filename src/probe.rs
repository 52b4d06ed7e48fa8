//! Linear probing over a fixed-capacity slot array.
//!
//! Shared by the outer and inner tables of [`DoubleKeyTable`](crate::DoubleKeyTable):
//! the polynomial string hash, the ladder of capacities a table grows through,
//! and `ProbeArray`, the flat array of `(key, value)` slots itself.

use std::mem;
use std::sync::Arc;

use crate::error::{Error, Result};

// =============================================================================
// Hashing
// =============================================================================

const HASH_SEED: u128 = 31415;
const HASH_BASE: u128 = 31;

/// Capacities used when no ladder is configured. All prime.
pub const DEFAULT_TABLE_SIZES: [usize; 19] = [
    5, 13, 29, 53, 97, 193, 389, 769, 1543, 3079, 6151, 12289, 24593, 49157, 98317, 196613,
    393241, 786433, 1572869,
];

/// Polynomial rolling hash of `key` into `0..capacity`.
///
/// Both the accumulator and the multiplier are reduced against `capacity`, so
/// a key's home slot has to be recomputed whenever the table is resized.
/// `capacity` must be at least 2.
pub fn hash_key(key: &str, capacity: usize) -> usize {
    debug_assert!(capacity >= 2);
    let capacity = capacity as u128;
    let mut value = 0u128;
    let mut a = HASH_SEED;
    for c in key.chars() {
        value = (u128::from(u32::from(c)) + a * value) % capacity;
        a = a * HASH_BASE % (capacity - 1);
    }
    value as usize
}

// =============================================================================
// Size ladder
// =============================================================================

/// Ascending list of capacities a table steps through as it grows.
///
/// Always non-empty, strictly ascending, and every size is at least 2.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SizeLadder(Arc<[usize]>);

impl SizeLadder {
    pub fn new(sizes: impl Into<Vec<usize>>) -> Result<Self> {
        let sizes = sizes.into();
        if sizes.is_empty() {
            return Err(Error::InvalidLadder("ladder has no sizes"));
        }
        if sizes.iter().any(|&size| size < 2) {
            return Err(Error::InvalidLadder("sizes must be at least 2"));
        }
        if sizes.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(Error::InvalidLadder("sizes must be strictly ascending"));
        }
        Ok(Self(sizes.into()))
    }

    #[inline]
    pub fn first(&self) -> usize {
        self.0[0]
    }

    /// Size at rung `index`, or `None` past the top of the ladder.
    #[inline]
    pub fn get(&self, index: usize) -> Option<usize> {
        self.0.get(index).copied()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl Default for SizeLadder {
    fn default() -> Self {
        Self(Arc::from(DEFAULT_TABLE_SIZES.as_slice()))
    }
}

// =============================================================================
// Probe array
// =============================================================================

/// Outcome of walking the probe sequence for one key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Probe {
    Found(usize),
    /// First empty slot on the key's probe sequence.
    Vacant(usize),
    /// A full cycle visited every slot without a match or a free slot.
    Exhausted,
}

/// Open-addressing slot array without tombstones.
#[derive(Clone, Debug)]
pub(crate) struct ProbeArray<T> {
    slots: Box<[Option<(String, T)>]>,
    occupied: usize,
}

impl<T> ProbeArray<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            occupied: 0,
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn occupied(&self) -> usize {
        self.occupied
    }

    pub(crate) fn locate(&self, key: &str) -> Probe {
        let capacity = self.capacity();
        let mut position = hash_key(key, capacity);
        for _ in 0..capacity {
            match &self.slots[position] {
                None => return Probe::Vacant(position),
                Some((existing, _)) if existing.as_str() == key => return Probe::Found(position),
                Some(_) => position = (position + 1) % capacity,
            }
        }
        Probe::Exhausted
    }

    pub(crate) fn get(&self, key: &str) -> Option<&T> {
        match self.locate(key) {
            Probe::Found(index) => self.slots[index].as_ref().map(|(_, value)| value),
            Probe::Vacant(_) | Probe::Exhausted => None,
        }
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        match self.locate(key) {
            Probe::Found(index) => self.slots[index].as_mut().map(|(_, value)| value),
            Probe::Vacant(_) | Probe::Exhausted => None,
        }
    }

    /// Inserts or overwrites `key`, returning the overwritten value.
    pub(crate) fn insert(&mut self, key: &str, value: T) -> Result<Option<T>> {
        match self.locate(key) {
            Probe::Found(index) => Ok(self.slots[index]
                .as_mut()
                .map(|(_, current)| mem::replace(current, value))),
            Probe::Vacant(index) => {
                self.place(index, key.to_owned(), value);
                Ok(None)
            }
            Probe::Exhausted => Err(Error::TableFull {
                capacity: self.capacity(),
            }),
        }
    }

    /// Value stored under `key`, inserting `make()` first if the key is new.
    pub(crate) fn get_or_insert_with(
        &mut self,
        key: &str,
        make: impl FnOnce() -> T,
    ) -> Result<&mut T> {
        let index = match self.locate(key) {
            Probe::Found(index) => index,
            Probe::Vacant(index) => {
                self.place(index, key.to_owned(), make());
                index
            }
            Probe::Exhausted => {
                return Err(Error::TableFull {
                    capacity: self.capacity(),
                })
            }
        };
        match &mut self.slots[index] {
            Some((_, value)) => Ok(value),
            None => unreachable!("slot {index} was just filled"),
        }
    }

    /// Removes `key` and repairs the probe cluster that followed it.
    pub(crate) fn remove(&mut self, key: &str) -> Option<T> {
        let Probe::Found(index) = self.locate(key) else {
            return None;
        };
        let (_, value) = self.slots[index].take()?;
        self.occupied -= 1;
        self.repair_cluster(index);
        Some(value)
    }

    /// Entries in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &T)> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref().map(|(key, value)| (key.as_str(), value)))
    }

    /// Consumes the array, yielding entries in slot order.
    pub(crate) fn into_entries(self) -> impl Iterator<Item = (String, T)> {
        self.slots.into_vec().into_iter().flatten()
    }

    /// Reinserts an entry that is known to be absent and to fit.
    ///
    /// Used when rehashing into a larger array and when repairing a cluster.
    pub(crate) fn insert_displaced(&mut self, key: String, value: T) {
        match self.locate(&key) {
            Probe::Vacant(index) => self.place(index, key, value),
            Probe::Found(_) | Probe::Exhausted => {
                unreachable!("displaced entry {key:?} has no free slot")
            }
        }
    }

    fn place(&mut self, index: usize, key: String, value: T) {
        debug_assert!(self.slots[index].is_none());
        self.slots[index] = Some((key, value));
        self.occupied += 1;
    }

    /// Without tombstones, an empty slot ends every probe walk, so the entries
    /// after `freed` in the same cluster may now be unreachable. Pull the whole
    /// cluster out and put each entry back through the normal probe path.
    fn repair_cluster(&mut self, freed: usize) {
        let capacity = self.capacity();
        let mut displaced = Vec::new();
        let mut position = (freed + 1) % capacity;
        while let Some(entry) = self.slots[position].take() {
            displaced.push(entry);
            position = (position + 1) % capacity;
        }
        self.occupied -= displaced.len();
        for (key, value) in displaced {
            self.insert_displaced(key, value);
        }
    }
}
