//! Contract types for conditional writes
//!
//! Every document read from a store comes back as `Versioned<T>`, carrying
//! the `Etag` the store assigned to the write that produced it. Conditional
//! writes (`replace`) name the etag they expect; the store rejects them when
//! the stored etag differs.
//!
//! ## Module Structure
//!
//! - `etag`: store-assigned document version
//! - `versioned`: document plus etag wrapper

pub mod etag;
pub mod versioned;

// Re-exports
pub use etag::Etag;
pub use versioned::Versioned;
