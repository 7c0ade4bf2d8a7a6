//! A simple, volatile, in-memory implementation of [`Storage`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use gmcast_rs::storage::{Storage, StorageError};
use gmcast_rs::types::message::Entry;

/// An in-memory [`Storage`] that additionally records every written value in write order,
/// so tests can compare the commit order observed by different replicas.
#[derive(Clone)]
pub struct MemStorage {
    map: Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MemStorage {
    /// Create a new, empty `MemStorage`.
    pub fn new() -> MemStorage {
        MemStorage {
            map: Arc::new(Mutex::new(HashMap::new())),
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The committed entries, in the order they were written.
    pub fn commit_log(&self) -> Vec<Entry> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|value| {
                serde_json::from_slice(value).expect("the commit log holds serialized entries")
            })
            .collect()
    }
}

impl Storage for MemStorage {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StorageError> {
        self.map
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or(StorageError::NotFound { key: key.to_vec() })
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.map.lock().unwrap().insert(key.to_vec(), value.to_vec());
        self.writes.lock().unwrap().push(value.to_vec());
        Ok(())
    }
}
