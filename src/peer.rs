/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A single peer of a partition: wiring, lifecycle, and the read path.
//!
//! One peer is not fault tolerant; a partition of peers is. Constructing a peer wires the
//! transport, clock, receive queue and deliverable together and starts the poll loop on
//! the configured [invoker](crate::invoker::Invoker). The loop reacts to three things on
//! every iteration: a shutdown request, a message received from the transport, and a
//! commit notification from the deliverable. Received messages are dispatched to the
//! invoker so a slow commit never stalls transport drain; commit notifications are
//! handled on the poll task itself, dequeueing the identifier and purging its memo entry.
//!
//! The transport closes only after the poll task has observed the shutdown request and
//! exited.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::clock::LogicalClock;
use crate::config::Config;
use crate::deliverable::{CommitNotification, Deliverable};
use crate::invoker::Invoker;
use crate::logging::{
    secs_since_unix_epoch, CLOSE_PEER, DEQUEUE_MESSAGE, RECEIVE_MESSAGE,
};
use crate::protocol::Protocol;
use crate::state_machine::StorageStateMachine;
use crate::storage::Storage;
use crate::transport::Transport;
use crate::types::message::{Entry, Request, Response};

pub struct Peer<T: Transport, S: Storage> {
    name: String,
    protocol: Arc<Protocol<T>>,
    deliverable: Arc<Deliverable>,
    storage: S,
    transport: T,
    shutdown: Sender<()>,
    exited: Mutex<Option<Receiver<()>>>,
}

impl<T: Transport, S: Storage> Peer<T, S> {
    /// Construct the peer and start polling for messages.
    pub fn start(configuration: Config<S>, transport: T) -> Peer<T, S> {
        let state_machine = StorageStateMachine::new(configuration.storage.clone());
        let (deliverable, commits) = Deliverable::new(Box::new(state_machine));
        let deliverable = Arc::new(deliverable);
        let protocol = Arc::new(Protocol::new(
            configuration.partition,
            configuration.version,
            configuration.conflict,
            transport.clone(),
        ));

        let (shutdown, shutdown_signal) = mpsc::channel();
        let (exit, exited) = mpsc::channel();
        start_polling(
            configuration.name.clone(),
            Arc::clone(&protocol),
            Arc::clone(&deliverable),
            Arc::clone(&configuration.invoker),
            transport.clone(),
            commits,
            shutdown_signal,
            exit,
        );

        Peer {
            name: configuration.name,
            protocol,
            deliverable,
            storage: configuration.storage,
            transport,
            shutdown,
            exited: Mutex::new(Some(exited)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The transport handle used to submit messages to the protocol.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The peer's logical clock.
    pub fn clock(&self) -> &LogicalClock {
        &self.protocol.clock
    }

    /// Read the latest committed value for `request.key` straight from storage, bypassing
    /// the protocol.
    ///
    /// All peers converge on the same committed values, so the read can skip ordering.
    /// It is not linearizable with in-flight writes: a write submitted before this read
    /// may not be visible yet.
    pub fn fast_read(&self, request: Request) -> Response {
        let stored = match self.storage.get(request.key.as_bytes()) {
            Ok(stored) => stored,
            Err(err) => return Response::failed(err.to_string()),
        };
        match serde_json::from_slice::<Entry>(&stored) {
            Ok(entry) => Response {
                success: true,
                identifier: entry.identifier,
                data: entry.data,
                extra: entry.extensions,
                failure: None,
            },
            Err(err) => Response::failed(err.to_string()),
        }
    }

    /// Signal the poll task to exit. The task closes the transport on its way out.
    pub fn stop(&self) {
        let _ = self.shutdown.send(());
    }

    /// The channel the poll task reports its exit on. Taken once, by the unity watching
    /// this peer.
    pub(crate) fn exit_signal(&self) -> Option<Receiver<()>> {
        self.exited
            .lock()
            .expect("Programming error: peer exit signal mutex poisoned")
            .take()
    }

    pub(crate) fn deliverable(&self) -> &Arc<Deliverable> {
        &self.deliverable
    }
}

/// Dispatch the poll loop onto the invoker. The loop occupies its worker until a shutdown
/// request arrives or the shutdown channel's sender is dropped with the peer.
#[allow(clippy::too_many_arguments)]
fn start_polling<T: Transport>(
    name: String,
    protocol: Arc<Protocol<T>>,
    deliverable: Arc<Deliverable>,
    invoker: Arc<dyn Invoker>,
    transport: T,
    commits: Receiver<CommitNotification>,
    shutdown: Receiver<()>,
    exited: Sender<()>,
) {
    let dispatcher = Arc::clone(&invoker);
    invoker.invoke(Box::new(move || {
        loop {
            match shutdown.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            let mut idle = true;

            if let Some(message) = transport.recv() {
                idle = false;
                log::debug!(
                    "{}, {}, {}, {}",
                    RECEIVE_MESSAGE,
                    secs_since_unix_epoch(),
                    name,
                    message.identifier
                );
                let protocol = Arc::clone(&protocol);
                let deliverable = Arc::clone(&deliverable);
                let walker = Arc::clone(&dispatcher);
                dispatcher.invoke(Box::new(move || {
                    protocol.process(message);
                    let snapshot = protocol.queue.snapshot();
                    walker.invoke(Box::new(move || deliverable.deliver(snapshot)));
                }));
            }

            loop {
                match commits.try_recv() {
                    Ok(commit) => {
                        idle = false;
                        log::debug!(
                            "{}, {}, {}, {}",
                            DEQUEUE_MESSAGE,
                            secs_since_unix_epoch(),
                            name,
                            commit.identifier
                        );
                        protocol.queue.dequeue(&commit.identifier);
                        protocol.memo.remove(&commit.identifier);
                    }
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }

            if idle {
                thread::yield_now();
            }
        }

        log::debug!("{}, {}, {}", CLOSE_PEER, secs_since_unix_epoch(), name);
        transport.close();
        let _ = exited.send(());
    }));
}
