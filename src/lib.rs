//! # probe-tables
//!
//! Two string-keyed hash tables that manage their own slots instead of
//! wrapping `std::collections::HashMap`:
//!
//! - [`DoubleKeyTable`]: a two-level linear-probing table keyed by a pair of
//!   strings. Each first key owns a [`SubTable`] for its second keys; both
//!   levels grow through a ladder of prime capacities.
//! - [`InfiniteHashTable`]: a trie of fixed-width nodes routed one character
//!   per level. Collisions push keys one level deeper, so it never fills up.
//!
//! ## Example
//!
//! ```rust
//! use probe_tables::{DoubleKeyTable, InfiniteHashTable};
//!
//! let mut sounds: DoubleKeyTable<u32> = DoubleKeyTable::new();
//! sounds.insert("cat", "meow", 1).unwrap();
//! sounds.insert("cat", "purr", 2).unwrap();
//! assert_eq!(sounds.get("cat", "purr"), Ok(&2));
//! assert_eq!(sounds.len(), 2);
//!
//! let mut words: InfiniteHashTable<u32> = InfiniteHashTable::new();
//! words.insert("a", 1).unwrap();
//! words.insert("ab", 2).unwrap();
//! assert_eq!(words.get_location("ab"), Ok(vec![19, 20]));
//! assert_eq!(words.sort_keys(), vec!["a", "ab"]);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

pub mod double_key;
pub mod error;
pub mod infinite;
pub mod probe;
pub mod sub_table;

pub use double_key::{DoubleKeyTable, TableConfig};
pub use error::{Error, Result};
pub use infinite::InfiniteHashTable;
pub use probe::{hash_key, SizeLadder, DEFAULT_TABLE_SIZES};
pub use sub_table::SubTable;

#[cfg(test)]
mod proptests;
