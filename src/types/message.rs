/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The records that cross the wire and the records handed to the state machine.
//!
//! A [Message] is the unit the protocol orders. It is born at a client with one or more
//! destination partitions, travels through each destination partition's total-order
//! transport, and ends its life when the [Entry] distilled from it is committed at every
//! correct replica of every destination partition.
//!
//! ## Wire form
//!
//! Messages serialize as self-describing JSON with fixed field names (`identifier`,
//! `destination`, `partitions`, `timestamp`, `state`, `type`, `protocolVersion`,
//! `payload`), with the `state` and `type` enumerations riding as their integer
//! discriminants. Any transport that preserves these names and the ordering of
//! `destination` interoperates.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::basic::{MessageKind, MessageState, PartitionId, ProtocolVersion, Timestamp};

/// Application content carried by a message: the key it writes, the opaque value bytes,
/// and a free-form extensions object the state machine may interpret.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub key: String,
    pub data: Vec<u8>,
    #[serde(default)]
    pub extensions: Value,
}

impl Payload {
    pub fn new(key: impl Into<String>, data: impl Into<Vec<u8>>) -> Payload {
        Payload {
            key: key.into(),
            data: data.into(),
            extensions: Value::Null,
        }
    }
}

/// A message in flight through the protocol.
///
/// `partitions` caches the number of destination partitions at origin and never changes
/// afterwards, even when the destination list is narrowed for a cross-partition send: the
/// timestamp exchange uses it as its quorum size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub identifier: String,
    pub destination: Vec<PartitionId>,
    pub partitions: usize,
    pub timestamp: Timestamp,
    pub state: MessageState,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(rename = "protocolVersion")]
    pub protocol_version: ProtocolVersion,
    pub payload: Payload,
}

impl Message {
    /// A fresh submission addressed to `destination`, ready to be broadcast through the
    /// transport of every destination partition.
    pub fn initial(
        identifier: impl Into<String>,
        destination: Vec<PartitionId>,
        protocol_version: ProtocolVersion,
        payload: Payload,
    ) -> Message {
        let partitions = destination.len();
        Message {
            identifier: identifier.into(),
            destination,
            partitions,
            timestamp: Timestamp::new(0),
            state: MessageState::S0,
            kind: MessageKind::Initial,
            protocol_version,
            payload,
        }
    }

    /// The record committed to the state machine once this message turns terminal.
    pub fn entry(&self) -> Entry {
        Entry {
            identifier: self.identifier.clone(),
            key: self.payload.key.clone(),
            data: self.payload.data.clone(),
            extensions: self.payload.extensions.clone(),
            final_timestamp: self.timestamp,
        }
    }
}

/// What the state machine applies, and the shape of the value stored under a key: the most
/// recent committed entry for that key, serialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub identifier: String,
    pub key: String,
    pub data: Vec<u8>,
    #[serde(default)]
    pub extensions: Value,
    #[serde(rename = "finalTimestamp")]
    pub final_timestamp: Timestamp,
}

/// A read served straight from storage, off the protocol path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub key: String,
}

/// Outcome of a [fast read](crate::peer::Peer::fast_read). `failure` carries the storage
/// or decode error when `success` is false.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    pub identifier: String,
    pub data: Vec<u8>,
    #[serde(default)]
    pub extra: Value,
    pub failure: Option<String>,
}

impl Response {
    pub(crate) fn failed(failure: String) -> Response {
        Response {
            success: false,
            identifier: String::new(),
            data: Vec::new(),
            extra: Value::Null,
            failure: Some(failure),
        }
    }
}
