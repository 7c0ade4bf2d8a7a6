/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Newtypes and enumerations shared across the protocol.
//!
//! These follow the newtype pattern: the API for using them is defined here, and the rest
//! of the crate never reaches into the raw representation. On the wire, each of them
//! serializes as its inner value, so the encoded form stays the flat JSON the protocol
//! prescribes.

use std::fmt::{self, Display, Formatter};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifies one partition: a replicated group of peers reachable through a shared group
/// address on the transport.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionId(String);

impl PartitionId {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn str(&self) -> &str {
        &self.0
    }
}

impl Display for PartitionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Version of the peer protocol. Peers only process messages stamped with the version they
/// were configured with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVersion(u16);

impl ProtocolVersion {
    pub const fn new(int: u16) -> Self {
        Self(int)
    }

    pub const fn int(&self) -> u16 {
        self.0
    }
}

impl Display for ProtocolVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// A logical timestamp produced by a peer's [clock](crate::clock::LogicalClock). The final
/// timestamp of a message determines its position in the delivery order.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Protocol state of an in-flight message at one peer. The state only ever moves forward,
/// and `S3` is terminal: a message in `S3` carries its final timestamp and waits at the
/// head of the receive queue to be delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageState {
    /// First observation at the peer's own partition; not yet stamped.
    S0,
    /// Stamped with the group timestamp, awaiting timestamps from the other destination
    /// partitions.
    S1,
    /// Holds the agreed final timestamp from the exchange, pending promotion.
    S2,
    /// Terminal; deliverable once it reaches the head of the queue.
    S3,
}

impl MessageState {
    pub const fn int(&self) -> u8 {
        match self {
            MessageState::S0 => 0,
            MessageState::S1 => 1,
            MessageState::S2 => 2,
            MessageState::S3 => 3,
        }
    }
}

impl TryFrom<u8> for MessageState {
    type Error = UnknownDiscriminant;

    fn try_from(int: u8) -> Result<Self, Self::Error> {
        match int {
            0 => Ok(MessageState::S0),
            1 => Ok(MessageState::S1),
            2 => Ok(MessageState::S2),
            3 => Ok(MessageState::S3),
            _ => Err(UnknownDiscriminant {
                field: "state",
                value: int,
            }),
        }
    }
}

impl Display for MessageState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.int())
    }
}

impl Serialize for MessageState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.int())
    }
}

impl<'de> Deserialize<'de> for MessageState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        MessageState::try_from(u8::deserialize(deserializer)?).map_err(D::Error::custom)
    }
}

/// Whether a message is a partition-local submission or one leg of the cross-partition
/// timestamp exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// A fresh local submission, or a re-ingest of an updated message through the
    /// partition's own total order.
    Initial,
    /// Carries one partition's timestamp to the other destination partitions.
    External,
}

impl MessageKind {
    pub const fn int(&self) -> u8 {
        match self {
            MessageKind::Initial => 0,
            MessageKind::External => 1,
        }
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = UnknownDiscriminant;

    fn try_from(int: u8) -> Result<Self, Self::Error> {
        match int {
            0 => Ok(MessageKind::Initial),
            1 => Ok(MessageKind::External),
            _ => Err(UnknownDiscriminant {
                field: "type",
                value: int,
            }),
        }
    }
}

impl Serialize for MessageKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.int())
    }
}

impl<'de> Deserialize<'de> for MessageKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        MessageKind::try_from(u8::deserialize(deserializer)?).map_err(D::Error::custom)
    }
}

/// A wire discriminant that does not name any known state or kind.
#[derive(Debug)]
pub struct UnknownDiscriminant {
    pub field: &'static str,
    pub value: u8,
}

impl Display for UnknownDiscriminant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} discriminant {}", self.field, self.value)
    }
}
