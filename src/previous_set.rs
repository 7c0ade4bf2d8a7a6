/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The set of recently stamped messages a fresh submission is checked against for
//! conflicts.
//!
//! The previous set gates clock advancement: a new message that conflicts with the set
//! forces a tick and empties the set, so that conflicting messages never share a
//! timestamp. The set is also emptied whenever the clock leaps, since everything tracked
//! so far is ordered below the leapt-to value anyway.
//!
//! Writers are serialized by the peer mutex in [protocol](crate::protocol); snapshots are
//! copies, safe to hand to the conflict predicate without holding anything.

use crate::types::message::Message;

#[derive(Debug, Default)]
pub struct PreviousSet(Vec<Message>);

impl PreviousSet {
    pub fn new() -> PreviousSet {
        PreviousSet(Vec::new())
    }

    pub fn append(&mut self, message: Message) {
        self.0.push(message);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// An owned copy of the current membership, consumed by the conflict predicate.
    pub fn snapshot(&self) -> Vec<Message> {
        self.0.clone()
    }
}
