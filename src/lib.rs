/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! # Summary
//!
//! This crate implements a generic atomic multicast engine organized into partitions. A
//! partition is a replicated group of [peers](peer::Peer) behind a shared total-order
//! broadcast; a message addressed to one or more partitions is delivered at every correct
//! replica of every addressed partition in a single total order that respects the
//! application's [conflict relation](conflict::ConflictRelation).
//!
//! Each peer runs the same state machine over the messages its partition's transport hands
//! it: fresh submissions are stamped against a logical clock gated by a conflict-tracking
//! previous set, multi-destination messages agree on a final timestamp with the other
//! destination partitions through a timestamp exchange, and terminal messages drain from
//! an ordered receive queue into the replicated state machine.
//!
//! # Usage
//!
//! The engine is embedded, not hosted: the library user provides the collaborators and the
//! crate provides the ordering. Implement [Transport](transport::Transport) over a
//! reliable partition-local total-order broadcast, [Storage](storage::Storage) over a
//! key-value store, and, if the key-intersection default does not fit, a
//! [ConflictRelation](conflict::ConflictRelation); then start one [Peer](peer::Peer) per
//! replica from a [Config](config::Config), or a whole partition at once through
//! [Unity](unity::Unity).
//!
//! Submissions enter by broadcasting a [Message](types::message::Message) through any
//! peer's transport handle. Committed values come back out through
//! [fast reads](peer::Peer::fast_read), served straight from storage.

pub mod clock;

pub mod config;

pub mod conflict;

pub mod invoker;

pub mod logging;

pub mod memo;

pub mod peer;

pub mod previous_set;

pub mod queue;

pub mod state_machine;

pub mod storage;

pub mod transport;

pub mod types;

pub mod unity;

pub(crate) mod deliverable;

pub(crate) mod protocol;

// Re-exports
pub use crate::config::Config;
pub use crate::peer::Peer;
pub use crate::unity::Unity;
