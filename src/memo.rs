/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Per-message accumulator for the timestamps reported by destination partitions.
//!
//! During the timestamp exchange every destination partition of a message contributes its
//! group timestamp. The memo collects them under the message identifier until the count
//! reaches the message's partition quorum; the consumer only ever uses the maximum, so the
//! order of the collected values carries no meaning. Entries are purged when the message
//! is committed.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::types::basic::Timestamp;

#[derive(Debug, Default)]
pub struct Memo(Mutex<HashMap<String, Vec<Timestamp>>>);

impl Memo {
    pub fn new() -> Memo {
        Memo(Mutex::new(HashMap::new()))
    }

    /// Append `timestamp` to the list bound to `identifier`.
    pub fn insert(&self, identifier: &str, timestamp: Timestamp) {
        self.0
            .lock()
            .expect("Programming error: memo mutex poisoned")
            .entry(identifier.to_owned())
            .or_default()
            .push(timestamp);
    }

    /// A copy of the timestamps collected so far for `identifier`.
    pub fn read(&self, identifier: &str) -> Vec<Timestamp> {
        self.0
            .lock()
            .expect("Programming error: memo mutex poisoned")
            .get(identifier)
            .cloned()
            .unwrap_or_default()
    }

    /// Discard the entry bound to `identifier`. No-op if absent.
    pub fn remove(&self, identifier: &str) {
        self.0
            .lock()
            .expect("Programming error: memo mutex poisoned")
            .remove(identifier);
    }
}
