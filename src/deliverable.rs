/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Turns receive-queue snapshots into state machine commits: in order, exactly once.
//!
//! A snapshot is walked from the head. The head element is deliverable when it is
//! terminal; the walk stops at the first non-terminal element, because everything behind
//! it may still receive a final timestamp above the blocker's. Every committed identifier
//! is recorded in a bounded recently-delivered window before its notification is emitted,
//! so an identifier that reappears in a later snapshot (the peer dequeues it
//! asynchronously) is never committed twice.
//!
//! Commit notifications go out on a bounded channel and the walk blocks until there is
//! space: a notification must reach the peer, which reacts by dequeueing the identifier
//! and purging its memo entry.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Mutex;

use crate::logging::{secs_since_unix_epoch, COMMIT_ENTRY};
use crate::state_machine::StateMachine;
use crate::types::basic::MessageState;
use crate::types::message::Message;

/// Capacity of the commit notification channel. The peer's poll loop drains it on every
/// iteration, so the walk only ever blocks briefly.
const COMMITS_CAPACITY: usize = 64;

/// How many recently delivered identifiers are remembered for duplicate suppression.
const DELIVERED_WINDOW: usize = 1024;

/// Tells the peer that `identifier` was committed and can leave the receive queue.
pub(crate) struct CommitNotification {
    pub(crate) identifier: String,
}

pub(crate) struct Deliverable {
    inner: Mutex<Inner>,
    commits: SyncSender<CommitNotification>,
    active: AtomicBool,
}

struct Inner {
    state_machine: Box<dyn StateMachine>,
    delivered: DeliveredWindow,
}

impl Deliverable {
    pub(crate) fn new(
        state_machine: Box<dyn StateMachine>,
    ) -> (Deliverable, Receiver<CommitNotification>) {
        let (commits, notifications) = mpsc::sync_channel(COMMITS_CAPACITY);
        let deliverable = Deliverable {
            inner: Mutex::new(Inner {
                state_machine,
                delivered: DeliveredWindow::new(DELIVERED_WINDOW),
            }),
            commits,
            active: AtomicBool::new(true),
        };
        (deliverable, notifications)
    }

    /// Commit the deliverable prefix of `snapshot`.
    ///
    /// Holding the inner mutex for the whole walk serializes concurrent walks, so two
    /// snapshots taken close together cannot interleave their commits.
    pub(crate) fn deliver(&self, snapshot: Vec<Message>) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        let mut inner = self
            .inner
            .lock()
            .expect("Programming error: deliverable mutex poisoned");
        for message in snapshot {
            if inner.delivered.contains(&message.identifier) {
                // Committed on an earlier walk. Either the peer has not dequeued it yet,
                // or a late duplicate of the exchange re-enqueued it after the dequeue.
                // In the latter case its memo entry is gone and the copy would sit in
                // the queue forever, blocking everything behind it. Notify again so the
                // peer clears it out; dequeueing an absent identifier is a no-op.
                let notification = CommitNotification {
                    identifier: message.identifier,
                };
                if self.commits.send(notification).is_err() {
                    return;
                }
                continue;
            }
            if message.state != MessageState::S3 {
                break;
            }
            inner.delivered.record(&message.identifier);
            let entry = message.entry();
            log::info!(
                "{}, {}, {}, {}",
                COMMIT_ENTRY,
                secs_since_unix_epoch(),
                entry.identifier,
                entry.final_timestamp
            );
            if let Err(err) = inner.state_machine.commit(&entry) {
                // That one delivery failed; recovery is the state machine's contract.
                log::error!("failed committing entry {}: {}", entry.identifier, err);
            }
            let notification = CommitNotification {
                identifier: entry.identifier,
            };
            if self.commits.send(notification).is_err() {
                // The peer is gone; nothing left to notify.
                return;
            }
        }
    }

    /// Stop committing: snapshots handed to [deliver](Self::deliver) after this call are
    /// ignored. Idempotent.
    pub(crate) fn shutdown(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Insertion-ordered set of the most recently delivered identifiers, bounded by evicting
/// the oldest.
struct DeliveredWindow {
    capacity: usize,
    seen: HashSet<String>,
    order: VecDeque<String>,
}

impl DeliveredWindow {
    fn new(capacity: usize) -> DeliveredWindow {
        DeliveredWindow {
            capacity,
            seen: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    fn contains(&self, identifier: &str) -> bool {
        self.seen.contains(identifier)
    }

    /// Record `identifier`, evicting the oldest record once the window is full.
    fn record(&mut self, identifier: &str) {
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(identifier.to_owned());
        self.order.push_back(identifier.to_owned());
    }
}
