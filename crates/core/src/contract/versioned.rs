//! Generic versioned wrapper type
//!
//! ```text
//! fn read(&self, ...) -> Result<Option<Versioned<T>>>
//! fn upsert(&self, ...) -> Result<Etag>
//! ```
//!
//! - Reads return `Versioned<T>` (document + etag)
//! - Writes return the `Etag` they created

use super::Etag;
use serde::{Deserialize, Serialize};

/// A document with the etag of the write that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// The document
    pub value: T,

    /// Store-assigned version of this document
    pub etag: Etag,
}

impl<T> Versioned<T> {
    /// Wrap a document with its etag
    pub fn new(value: T, etag: Etag) -> Self {
        Versioned { value, etag }
    }

    /// Map the inner value to a new type, keeping the etag
    pub fn map<U, F>(self, f: F) -> Versioned<U>
    where
        F: FnOnce(T) -> U,
    {
        Versioned {
            value: f(self.value),
            etag: self.etag,
        }
    }

    /// Get a reference to the inner value
    #[inline]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consume and return the inner value
    #[inline]
    pub fn into_value(self) -> T {
        self.value
    }

    /// Get the etag
    #[inline]
    pub fn etag(&self) -> Etag {
        self.etag
    }
}
