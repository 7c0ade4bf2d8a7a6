/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! [Trait definition](Invoker) for the scheduling primitive that executes background work,
//! and a worker-pool implementation of it.
//!
//! Everything long-running in a peer runs as an invoked task: the poll loop, the
//! processing of each received message, and every deliverable walk. Dispatched tasks may
//! run concurrently; the protocol's own mutexes keep the critical sections consistent. An
//! implementation that runs tasks one at a time is still correct, with the caveat that
//! message processing then never runs concurrently with the poll loop, so a slow commit
//! stalls transport drain.

use std::sync::Mutex;

use threadpool::ThreadPool;

pub trait Invoker: Send + Sync + 'static {
    /// Dispatch a nullary task.
    fn invoke(&self, task: Box<dyn FnOnce() + Send + 'static>);
}

/// [Invoker] over a fixed-size worker pool.
///
/// A peer's poll loop occupies one worker for the peer's whole lifetime, so a pool hosting
/// `n` peers needs comfortably more than `n` workers to also make progress on message
/// processing and delivery.
pub struct PooledInvoker {
    pool: Mutex<ThreadPool>,
}

impl PooledInvoker {
    pub fn new(workers: usize) -> PooledInvoker {
        PooledInvoker {
            pool: Mutex::new(ThreadPool::new(workers)),
        }
    }
}

impl Invoker for PooledInvoker {
    fn invoke(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        self.pool
            .lock()
            .expect("Programming error: invoker mutex poisoned")
            .execute(task);
    }
}
