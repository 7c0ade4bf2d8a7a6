/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The per-peer protocol state machine.
//!
//! Every message a peer receives moves through the states of
//! [MessageState](crate::types::basic::MessageState) here. A partition-local submission is
//! stamped against the peer's clock and previous set; a single-destination message is
//! terminal right away, while a multi-destination message enters the timestamp exchange
//! with the other destination partitions and becomes terminal once the exchange quorum
//! agrees on its final timestamp. Terminal messages wait in the receive queue for the
//! deliverable walk.
//!
//! Two critical sections share the peer mutex (realized as the lock around the previous
//! set): the stamp sequence of the initial path, so concurrent submissions never share a
//! timestamp, and the memo observation of the exchange path, so the quorum decision and
//! the state update agree.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::clock::LogicalClock;
use crate::conflict::ConflictRelation;
use crate::logging::{secs_since_unix_epoch, DROP_MESSAGE, EXCHANGE_TIMESTAMPS};
use crate::memo::Memo;
use crate::previous_set::PreviousSet;
use crate::queue::ReceiveQueue;
use crate::transport::Transport;
use crate::types::basic::{MessageKind, MessageState, PartitionId, ProtocolVersion};
use crate::types::message::Message;

pub(crate) struct Protocol<T: Transport> {
    partition: PartitionId,
    version: ProtocolVersion,
    pub(crate) clock: LogicalClock,
    previous_set: Mutex<PreviousSet>,
    pub(crate) memo: Memo,
    pub(crate) queue: ReceiveQueue,
    conflict: Arc<dyn ConflictRelation>,
    transport: T,
}

impl<T: Transport> Protocol<T> {
    pub(crate) fn new(
        partition: PartitionId,
        version: ProtocolVersion,
        conflict: Arc<dyn ConflictRelation>,
        transport: T,
    ) -> Protocol<T> {
        Protocol {
            partition,
            version,
            clock: LogicalClock::new(),
            previous_set: Mutex::new(PreviousSet::new()),
            memo: Memo::new(),
            queue: ReceiveQueue::new(),
            conflict,
            transport,
        }
    }

    /// Run one received message through the state machine and land the result in the
    /// receive queue.
    ///
    /// Messages stamped with a protocol version other than the configured one are dropped
    /// with a warning, before touching any state.
    pub(crate) fn process(&self, mut message: Message) {
        if message.protocol_version != self.version {
            log::warn!(
                "{}, {}, {}, version {}",
                DROP_MESSAGE,
                secs_since_unix_epoch(),
                message.identifier,
                message.protocol_version
            );
            return;
        }

        match message.kind {
            MessageKind::Initial => {
                let went_external = self.process_initial(&mut message);
                self.queue.enqueue(message.clone());
                if went_external {
                    // Our own stamp is one leg of the exchange: run the freshly stamped
                    // copy through the external path so the quorum counts it.
                    let mut local = message;
                    local.kind = MessageKind::External;
                    self.exchange_timestamp(&mut local);
                    self.queue.enqueue(local);
                }
            }
            MessageKind::External => {
                self.exchange_timestamp(&mut message);
                self.queue.enqueue(message);
            }
        }
    }

    /// The initial path.
    ///
    /// A message observed for the first time (`S0`) is checked against the previous set:
    /// on conflict the clock ticks and the set empties, so the message is stamped above
    /// everything it conflicts with. The stamped message joins the previous set to gate
    /// future submissions.
    ///
    /// A single-destination message needs no agreement beyond its own partition's total
    /// order and turns terminal immediately. A multi-destination message moves to `S1`
    /// and its stamped copy is broadcast to the other destination partitions. A
    /// re-ingested `S2` copy already carries the agreed final timestamp: it turns
    /// terminal, catching the clock up when the final timestamp is ahead of it.
    ///
    /// Returns whether the message just entered the timestamp exchange.
    fn process_initial(&self, message: &mut Message) -> bool {
        let went_external = {
            let mut previous = self.lock_previous_set();
            if message.state == MessageState::S0 {
                if self.conflict.conflict(message, &previous.snapshot()) {
                    self.clock.tick();
                    previous.clear();
                }
                message.timestamp = self.clock.read();
                previous.append(message.clone());
            }

            if message.destination.len() > 1 {
                match message.state {
                    MessageState::S0 => {
                        message.state = MessageState::S1;
                        message.timestamp = self.clock.read();
                        true
                    }
                    MessageState::S2 => {
                        message.state = MessageState::S3;
                        if message.timestamp > self.clock.read() {
                            self.clock.leap(message.timestamp);
                            previous.clear();
                        }
                        false
                    }
                    _ => false,
                }
            } else {
                message.timestamp = self.clock.read();
                message.state = MessageState::S3;
                false
            }
        };

        if went_external {
            self.send_external(message.clone());
        }
        went_external
    }

    /// The exchange path.
    ///
    /// Each destination partition of a multi-destination message reports its group
    /// timestamp. Once the memo holds one timestamp per destination partition, the final
    /// timestamp is the maximum of them. A copy whose timestamp is below the agreed value
    /// takes it (`S2`); either way the timestamp can no longer change, so the promotion
    /// the initial path would perform on a re-ingested `S2` copy happens right here: the
    /// clock catches up to the final timestamp, conflict tracking from before the jump is
    /// dropped, and the message turns terminal.
    ///
    /// A copy that arrives before the quorum is complete stays as received.
    fn exchange_timestamp(&self, message: &mut Message) {
        let mut previous = self.lock_previous_set();

        self.memo.insert(&message.identifier, message.timestamp);
        let collected = self.memo.read(&message.identifier);
        if collected.len() < message.partitions {
            return;
        }

        let agreed = collected
            .into_iter()
            .max()
            .expect("Programming error: quorum reached over an empty memo entry");
        log::debug!(
            "{}, {}, {}, {}",
            EXCHANGE_TIMESTAMPS,
            secs_since_unix_epoch(),
            message.identifier,
            agreed
        );
        if message.timestamp < agreed {
            message.timestamp = agreed;
            message.state = MessageState::S2;
        }
        if message.timestamp > self.clock.read() {
            self.clock.leap(message.timestamp);
            previous.clear();
        }
        message.state = MessageState::S3;
    }

    /// Shape the outbound leg of the exchange and broadcast it: external kind, destination
    /// narrowed to the partitions other than our own. `partitions` stays at the origin
    /// count, since it is the exchange quorum size.
    ///
    /// A failed broadcast is logged and not retried: under a reliable transport a lost
    /// broadcast is a broken transport invariant, not a recoverable fault.
    fn send_external(&self, mut message: Message) {
        message.kind = MessageKind::External;
        message
            .destination
            .retain(|partition| *partition != self.partition);
        if let Err(err) = self.transport.broadcast(message) {
            log::error!("failed exchanging timestamps: {}", err);
        }
    }

    fn lock_previous_set(&self) -> MutexGuard<'_, PreviousSet> {
        self.previous_set
            .lock()
            .expect("Programming error: previous set mutex poisoned")
    }
}
