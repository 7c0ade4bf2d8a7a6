/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The ordered collection of in-flight messages at one peer.
//!
//! The queue holds at most one element per message identifier. Re-enqueueing an identifier
//! replaces the stored element, which is how a message's state and timestamp advance while
//! it sits in the queue. Snapshots come out in ascending `(timestamp, identifier)` order;
//! the identifier tie-break is lexicographic and therefore identical on every replica, so
//! the deliverable prefix of the queue is the same everywhere.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::types::message::Message;

#[derive(Debug, Default)]
pub struct ReceiveQueue(Mutex<HashMap<String, Message>>);

impl ReceiveQueue {
    pub fn new() -> ReceiveQueue {
        ReceiveQueue(Mutex::new(HashMap::new()))
    }

    /// Insert `message`, replacing any element already stored under its identifier.
    pub fn enqueue(&self, message: Message) {
        self.0
            .lock()
            .expect("Programming error: receive queue mutex poisoned")
            .insert(message.identifier.clone(), message);
    }

    /// Remove the element stored under `identifier`. No-op if absent.
    pub fn dequeue(&self, identifier: &str) {
        self.0
            .lock()
            .expect("Programming error: receive queue mutex poisoned")
            .remove(identifier);
    }

    /// The current elements in ascending `(timestamp, identifier)` order.
    pub fn snapshot(&self) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .0
            .lock()
            .expect("Programming error: receive queue mutex poisoned")
            .values()
            .cloned()
            .collect();
        messages.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });
        messages
    }
}
