/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Aggregates the peers of one partition and owns their shutdown.
//!
//! A unity hands out peers round-robin for submissions and reads, and winds the whole
//! partition down on [shutdown](Unity::shutdown): every peer is asked to stop, and a
//! watcher counts the poll tasks as they exit. Once the count reaches the number of peers
//! the deliverables are shut, exactly once, and the destroy signal releases the caller.
//! The caller waits at most twice the configured timeout either way, so shutdown is
//! bounded even when a peer never answers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::logging::{secs_since_unix_epoch, CLOSE_UNITY};
use crate::peer::Peer;
use crate::storage::Storage;
use crate::transport::Transport;

pub struct Unity<T: Transport, S: Storage> {
    peers: Vec<Peer<T, S>>,
    next: AtomicUsize,
    timeout: Duration,
    destroy: Mutex<Receiver<()>>,
}

impl<T: Transport, S: Storage> Unity<T, S> {
    /// Start one peer per `(configuration, transport)` pair and watch their lifecycles.
    /// The unity adopts the first configuration's timeout as its shutdown wait unit.
    pub fn new(specs: Vec<(Config<S>, T)>) -> Unity<T, S> {
        assert!(!specs.is_empty(), "a unity needs at least one peer");
        let timeout = specs[0].0.timeout;

        let peers: Vec<Peer<T, S>> = specs
            .into_iter()
            .map(|(configuration, transport)| Peer::start(configuration, transport))
            .collect();

        let exits: Vec<Receiver<()>> = peers
            .iter()
            .map(|peer| {
                peer.exit_signal()
                    .expect("Programming error: peer exit signal already taken")
            })
            .collect();
        let deliverables: Vec<_> = peers
            .iter()
            .map(|peer| Arc::clone(peer.deliverable()))
            .collect();

        let (destroy_sender, destroy) = mpsc::channel();
        thread::spawn(move || {
            let mut closes = 0;
            for exit in &exits {
                // Every poll task reports here exactly once, on exit or by dropping its
                // end of the channel.
                let _ = exit.recv();
                closes += 1;
            }
            if closes == exits.len() {
                for deliverable in &deliverables {
                    deliverable.shutdown();
                }
            }
            let _ = destroy_sender.send(());
        });

        Unity {
            peers,
            next: AtomicUsize::new(0),
            timeout,
            destroy: Mutex::new(destroy),
        }
    }

    /// One of the unity's peers, round-robin. All peers converge on the same state, so any
    /// of them can field a submission or a read.
    pub fn resolve_peer(&self) -> &Peer<T, S> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.peers.len();
        &self.peers[index]
    }

    /// Ask every peer to stop and wait for the partition to wind down, at most twice the
    /// configured timeout. When the bound is hit the unity returns anyway, leaving
    /// whatever is still running to exit on its own.
    pub fn shutdown(&self) {
        for peer in &self.peers {
            peer.stop();
        }

        let destroy = self
            .destroy
            .lock()
            .expect("Programming error: unity destroy mutex poisoned");
        match destroy.recv_timeout(self.timeout * 2) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                log::debug!("{}, {}", CLOSE_UNITY, secs_since_unix_epoch());
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "{}, {}, timed out after {:?}",
                    CLOSE_UNITY,
                    secs_since_unix_epoch(),
                    self.timeout * 2
                );
            }
        }
    }
}
