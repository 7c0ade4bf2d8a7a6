/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! [Trait definition](StateMachine) for the replicated state machine, and the
//! storage-backed implementation peers use by default.
//!
//! The deliverable walk hands committed entries to the state machine one at a time, in the
//! globally agreed order. Implementations must be deterministic: applying the same entry
//! sequence on every replica has to produce the same state.

use std::fmt::{self, Display, Formatter};
use std::io;

use crate::storage::{Storage, StorageError};
use crate::types::message::Entry;

pub trait StateMachine: Send + 'static {
    /// Apply a single committed entry atomically. A failure makes that one delivery fail;
    /// it is surfaced, never retried.
    fn commit(&mut self, entry: &Entry) -> Result<(), StateMachineError>;

    /// Rebuild application state from a serialized snapshot.
    fn restore(&mut self, snapshot: &mut dyn io::Read) -> Result<(), StateMachineError>;
}

#[derive(Debug)]
pub enum StateMachineError {
    /// The backing store rejected the write.
    Storage { source: StorageError },
    /// The entry (or a snapshot of entries) could not be serialized or parsed.
    Serialize { source: serde_json::Error },
}

impl Display for StateMachineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StateMachineError::Storage { source } => write!(f, "commit failed: {}", source),
            StateMachineError::Serialize { source } => {
                write!(f, "entry serialization failed: {}", source)
            }
        }
    }
}

/// The default state machine: the stored value under a key is the serialized most recent
/// entry committed for that key, which is exactly the shape fast reads expect.
pub struct StorageStateMachine<S: Storage> {
    storage: S,
}

impl<S: Storage> StorageStateMachine<S> {
    pub fn new(storage: S) -> StorageStateMachine<S> {
        StorageStateMachine { storage }
    }
}

impl<S: Storage> StateMachine for StorageStateMachine<S> {
    fn commit(&mut self, entry: &Entry) -> Result<(), StateMachineError> {
        let value =
            serde_json::to_vec(entry).map_err(|source| StateMachineError::Serialize { source })?;
        self.storage
            .set(entry.key.as_bytes(), &value)
            .map_err(|source| StateMachineError::Storage { source })
    }

    fn restore(&mut self, snapshot: &mut dyn io::Read) -> Result<(), StateMachineError> {
        let entries: Vec<Entry> = serde_json::from_reader(snapshot)
            .map_err(|source| StateMachineError::Serialize { source })?;
        for entry in &entries {
            self.commit(entry)?;
        }
        Ok(())
    }
}
