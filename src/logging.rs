/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Log record naming and helpers.
//!
//! gmcast_rs logs through the [log](https://docs.rs/log/latest/log/) crate. To get the
//! messages printed onto a terminal or into a file, install any logging implementation.
//!
//! Records are CSVs with at least two values: the record name in PascalCase (the constants
//! below), the time of the record as seconds since the Unix epoch, then values specific to
//! the record kind, usually starting with the message identifier.

use std::time::{SystemTime, UNIX_EPOCH};

// Names of each record in PascalCase for printing:
pub const RECEIVE_MESSAGE: &str = "ReceiveMessage";
pub const DROP_MESSAGE: &str = "DropMessage";
pub const EXCHANGE_TIMESTAMPS: &str = "ExchangeTimestamps";
pub const COMMIT_ENTRY: &str = "CommitEntry";
pub const DEQUEUE_MESSAGE: &str = "DequeueMessage";
pub const CLOSE_PEER: &str = "ClosePeer";
pub const CLOSE_UNITY: &str = "CloseUnity";

/// Seconds between the Unix epoch and now.
pub(crate) fn secs_since_unix_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Programming error: system clock is set before the Unix epoch")
        .as_secs()
}
