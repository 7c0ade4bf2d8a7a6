/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! [Trait definition](Storage) for the key-value store provided by the user.
//!
//! Peers only ever read from storage directly, to serve [fast reads](
//! crate::peer::Peer::fast_read); every write flows through the state machine when a
//! commit is applied. Implementations hand out clones that share the same underlying
//! store, the same way the replica's other collaborators do.

use std::fmt::{self, Display, Formatter};

pub trait Storage: Clone + Send + 'static {
    /// The value stored under `key`. A missing key is an error the caller surfaces.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StorageError>;

    /// Durably bind `value` to `key`.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;
}

#[derive(Debug)]
pub enum StorageError {
    /// No value is bound to the requested key.
    NotFound { key: Vec<u8> },
    /// The backing store failed.
    Backend { detail: String },
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound { key } => {
                write!(f, "no value bound to key {}", String::from_utf8_lossy(key))
            }
            StorageError::Backend { detail } => write!(f, "storage backend failed: {}", detail),
        }
    }
}
