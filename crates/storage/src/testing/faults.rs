//! Fault injection for in-memory containers
//!
//! Each injection point holds a countdown of failures still to deliver.
//! Checks are lock-free so they can sit on every store operation.

use countfeed_core::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Store operation a fault can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// Point reads
    Read,
    /// Creates, upserts and conditional replaces
    Write,
    /// Change-feed pulls
    Feed,
}

/// Error delivered by an injected fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultKind {
    /// `Error::Timeout`
    #[default]
    Timeout,
    /// `Error::Throttled` with the given retry hint
    Throttled(Duration),
    /// `Error::Unavailable`
    Unavailable,
}

impl FaultKind {
    fn to_error(self, point: FaultPoint) -> Error {
        match self {
            FaultKind::Timeout => Error::Timeout(format!("injected {point:?} fault")),
            FaultKind::Throttled(retry_after) => Error::Throttled { retry_after },
            FaultKind::Unavailable => Error::Unavailable(format!("injected {point:?} fault")),
        }
    }
}

/// Countdown of injected failures per operation kind
#[derive(Debug, Default)]
pub struct FaultInjector {
    reads: AtomicUsize,
    writes: AtomicUsize,
    feed: AtomicUsize,
    kind: Mutex<FaultKind>,
    injected: AtomicUsize,
}

impl FaultInjector {
    /// Injector that lets every operation through
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` operations at `point`
    pub fn fail_next(&self, point: FaultPoint, count: usize) {
        self.counter(point).store(count, Ordering::SeqCst);
    }

    /// Fail the next `count` point reads
    pub fn fail_next_reads(&self, count: usize) {
        self.fail_next(FaultPoint::Read, count);
    }

    /// Fail the next `count` writes
    pub fn fail_next_writes(&self, count: usize) {
        self.fail_next(FaultPoint::Write, count);
    }

    /// Fail the next `count` change-feed pulls
    pub fn fail_next_feed_reads(&self, count: usize) {
        self.fail_next(FaultPoint::Feed, count);
    }

    /// Choose the error delivered by subsequent faults
    pub fn set_kind(&self, kind: FaultKind) {
        *self.kind.lock() = kind;
    }

    /// Drop every pending fault
    pub fn clear(&self) {
        for point in [FaultPoint::Read, FaultPoint::Write, FaultPoint::Feed] {
            self.counter(point).store(0, Ordering::SeqCst);
        }
    }

    /// Total number of faults delivered so far
    pub fn injected(&self) -> usize {
        self.injected.load(Ordering::SeqCst)
    }

    /// Consume one pending fault at `point`, if any
    pub fn check(&self, point: FaultPoint) -> Result<()> {
        let consumed = self
            .counter(point)
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if consumed {
            self.injected.fetch_add(1, Ordering::SeqCst);
            return Err(self.kind.lock().to_error(point));
        }
        Ok(())
    }

    /// `check(FaultPoint::Read)`
    pub fn check_read(&self) -> Result<()> {
        self.check(FaultPoint::Read)
    }

    /// `check(FaultPoint::Write)`
    pub fn check_write(&self) -> Result<()> {
        self.check(FaultPoint::Write)
    }

    /// `check(FaultPoint::Feed)`
    pub fn check_feed(&self) -> Result<()> {
        self.check(FaultPoint::Feed)
    }

    fn counter(&self, point: FaultPoint) -> &AtomicUsize {
        match point {
            FaultPoint::Read => &self.reads,
            FaultPoint::Write => &self.writes,
            FaultPoint::Feed => &self.feed,
        }
    }
}
