/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! [Trait definition](Transport) for the reliable partition-local total-order broadcast,
//! plus the wire codec shared by transport providers.
//!
//! The protocol leans entirely on the transport for ordering within a partition: every
//! peer of a partition must observe the broadcasts addressed to that partition in one
//! agreed sequence. Reaching another partition means broadcasting to that partition's
//! group address through the same primitive. Providers plug in by implementing [Transport]
//! and handing an instance to each peer at construction.
//!
//! Ingress rules for providers: frames that fail to [decode] and empty frames are logged
//! and dropped without disturbing the peer; delivery failures on [broadcast](
//! Transport::broadcast) are reported to the caller but never retried here, since a lost
//! broadcast under a reliable transport is a broken transport invariant rather than a
//! recoverable fault.

use std::fmt::{self, Display, Formatter};

use crate::types::message::Message;

pub trait Transport: Clone + Send + Sync + 'static {
    /// Reliably deliver `message` to every peer of every partition named in
    /// `message.destination`, in a single agreed order per partition.
    fn broadcast(&self, message: Message) -> Result<(), TransportError>;

    /// The next received message, if one is available now.
    fn recv(&self) -> Option<Message>;

    /// Terminate send and receive.
    fn close(&self);
}

/// Serialize a message into its wire form.
pub fn encode(message: &Message) -> Result<Vec<u8>, TransportError> {
    serde_json::to_vec(message).map_err(|source| TransportError::Encode {
        identifier: message.identifier.clone(),
        source,
    })
}

/// Parse a received frame. Failures here cover both malformed payloads and unknown
/// `state`/`type` discriminants; callers drop the frame either way.
pub fn decode(frame: &[u8]) -> Result<Message, WireError> {
    serde_json::from_slice(frame).map_err(|source| WireError::Decode { source })
}

/// Why a broadcast could not be handed to the transport.
#[derive(Debug)]
pub enum TransportError {
    /// The message could not be serialized into its wire form.
    Encode {
        identifier: String,
        source: serde_json::Error,
    },
    /// The transport refused the message: closed, or the group address is unreachable.
    Unavailable { detail: String },
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Encode { identifier, source } => {
                write!(f, "failed encoding message {}: {}", identifier, source)
            }
            TransportError::Unavailable { detail } => {
                write!(f, "transport unavailable: {}", detail)
            }
        }
    }
}

/// Why a received frame was dropped at ingress.
#[derive(Debug)]
pub enum WireError {
    Decode { source: serde_json::Error },
}

impl Display for WireError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Decode { source } => write!(f, "failed decoding frame: {}", source),
        }
    }
}
