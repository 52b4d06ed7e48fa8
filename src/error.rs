//! Error type shared by both tables.

use thiserror::Error as ThisError;

/// Errors returned by table operations.
///
/// A failed operation leaves the table exactly as it was.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum Error {
    /// The key (or one level of a composite key) is not present.
    #[error("key not found: {0:?}")]
    NotFound(String),

    /// A full probe cycle found no free slot and the size ladder is exhausted.
    #[error("table is full at capacity {capacity}")]
    TableFull { capacity: usize },

    /// Two distinct keys land in the same trie slot at every remaining level.
    #[error("keys {existing:?} and {key:?} cannot be separated by the trie")]
    KeyConflict { existing: String, key: String },

    #[error("invalid size ladder: {0}")]
    InvalidLadder(&'static str),
}

impl Error {
    pub(crate) fn not_found(key: &str) -> Self {
        Self::NotFound(key.to_owned())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
