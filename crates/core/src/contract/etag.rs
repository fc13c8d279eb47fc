//! Store-assigned document versions
//!
//! An etag changes on every write to a document. Etags of the same document
//! are strictly increasing; etags of different documents are unrelated and
//! must not be compared.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version token of a stored document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Etag(u64);

impl Etag {
    /// Etag of a document's first write
    pub const INITIAL: Etag = Etag(1);

    /// Create an etag from a raw counter value
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Etag(raw)
    }

    /// Raw counter value
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Etag of the write following this one
    #[inline]
    pub const fn next(&self) -> Self {
        Etag(self.0.saturating_add(1))
    }
}

impl fmt::Display for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}
