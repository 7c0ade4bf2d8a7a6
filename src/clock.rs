/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The peer's logical clock.
//!
//! One clock is created per peer at startup, at zero, and lives for the peer's lifetime.
//! Because every peer of a partition observes the same totally-ordered message sequence,
//! the clocks of a partition's peers advance in lockstep, which is what lets a "group
//! timestamp" be computed independently at each replica.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::basic::Timestamp;

/// A monotonic counter, safe to drive from concurrent handlers. The counter saturates at
/// the maximum representable value instead of wrapping.
#[derive(Debug, Default)]
pub struct LogicalClock(AtomicU64);

impl LogicalClock {
    pub fn new() -> LogicalClock {
        LogicalClock(AtomicU64::new(0))
    }

    /// Advance by one.
    pub fn tick(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |value| {
                Some(value.saturating_add(1))
            });
    }

    /// The current value.
    pub fn read(&self) -> Timestamp {
        Timestamp::new(self.0.load(Ordering::SeqCst))
    }

    /// Raise the clock to `timestamp` if it is ahead; the clock never moves backwards
    /// through a leap.
    pub fn leap(&self, timestamp: Timestamp) {
        self.0.fetch_max(timestamp.int(), Ordering::SeqCst);
    }

    /// Unconditionally assign `timestamp`.
    pub fn set(&self, timestamp: Timestamp) {
        self.0.store(timestamp.int(), Ordering::SeqCst);
    }
}
