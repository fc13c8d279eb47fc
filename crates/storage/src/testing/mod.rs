//! Testing utilities for store fault simulation
//!
//! - **Fault injection**: make the next N reads, writes or change-feed pulls
//!   of an in-memory container fail with a transient error
//!
//! # Example
//!
//! ```ignore
//! use countfeed_storage::testing::{FaultInjector, FaultPoint};
//!
//! let faults = Arc::new(FaultInjector::new());
//! let store = MemoryStore::with_faults("counters", 4, Arc::clone(&faults));
//! faults.fail_next(FaultPoint::Write, 2);
//! ```

mod faults;

pub use faults::{FaultInjector, FaultKind, FaultPoint};
