/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Per-peer configuration: the peer's identity within the protocol and the collaborators
//! it is wired to at construction.
//!
//! A configuration can be written out as a struct literal, or assembled field by field
//! through [Config::builder]. The builder fills in the crate-provided defaults for the
//! collaborators that have one: the [key-intersection](crate::conflict::KeyIntersection)
//! conflict relation and a [pooled invoker](crate::invoker::PooledInvoker). Name,
//! partition and storage have no sensible default and must be provided.

use std::sync::Arc;
use std::time::Duration;

use crate::conflict::{ConflictRelation, KeyIntersection};
use crate::invoker::{Invoker, PooledInvoker};
use crate::storage::Storage;
use crate::types::basic::{PartitionId, ProtocolVersion};

/// The newest protocol version this crate speaks, and the version a built configuration
/// accepts unless told otherwise.
pub const LATEST_PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::new(1);

/// Workers in the default invoker's pool. The poll loop occupies one permanently; the
/// rest serve message processing and deliverable walks.
const DEFAULT_INVOKER_WORKERS: usize = 8;

/// How long a unity waits per shutdown wait unit when no timeout is configured.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

pub struct Config<S: Storage> {
    /// Display name of the peer, used in log records.
    pub name: String,
    /// The partition this peer replicates.
    pub partition: PartitionId,
    /// The protocol version this peer accepts; messages stamped with any other version
    /// are dropped.
    pub version: ProtocolVersion,
    /// The application's conflict relation.
    pub conflict: Arc<dyn ConflictRelation>,
    /// The store fast reads are served from and commits are applied to.
    pub storage: S,
    /// The scheduling primitive background work is dispatched onto.
    pub invoker: Arc<dyn Invoker>,
    /// The unity shutdown wait unit: [shutdown](crate::unity::Unity::shutdown) waits up to
    /// twice this long for the partition's peers to wind down.
    pub timeout: Duration,
}

impl<S: Storage> Config<S> {
    /// Assemble a configuration field by field.
    pub fn builder() -> ConfigBuilder<S> {
        ConfigBuilder {
            name: None,
            partition: None,
            version: LATEST_PROTOCOL_VERSION,
            conflict: None,
            storage: None,
            invoker: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub struct ConfigBuilder<S: Storage> {
    name: Option<String>,
    partition: Option<PartitionId>,
    version: ProtocolVersion,
    conflict: Option<Arc<dyn ConflictRelation>>,
    storage: Option<S>,
    invoker: Option<Arc<dyn Invoker>>,
    timeout: Duration,
}

impl<S: Storage> ConfigBuilder<S> {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn partition(mut self, partition: PartitionId) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn version(mut self, version: ProtocolVersion) -> Self {
        self.version = version;
        self
    }

    pub fn conflict(mut self, conflict: Arc<dyn ConflictRelation>) -> Self {
        self.conflict = Some(conflict);
        self
    }

    pub fn storage(mut self, storage: S) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn invoker(mut self, invoker: Arc<dyn Invoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The finished configuration.
    ///
    /// Panics when a field with no default was never provided; that is a wiring mistake
    /// at the embedding, not a runtime condition.
    pub fn build(self) -> Config<S> {
        Config {
            name: self
                .name
                .expect("Programming error: configuration built without a name"),
            partition: self
                .partition
                .expect("Programming error: configuration built without a partition"),
            version: self.version,
            conflict: self
                .conflict
                .unwrap_or_else(|| Arc::new(KeyIntersection)),
            storage: self
                .storage
                .expect("Programming error: configuration built without storage"),
            invoker: self
                .invoker
                .unwrap_or_else(|| Arc::new(PooledInvoker::new(DEFAULT_INVOKER_WORKERS))),
            timeout: self.timeout,
        }
    }
}
