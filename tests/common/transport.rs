//! A "mock" (totally local) network for passing around wire frames.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};

use gmcast_rs::transport::{self, Transport, TransportError};
use gmcast_rs::types::basic::PartitionId;
use gmcast_rs::types::message::Message;

/// A transport stub that passes frames between peers using channels.
///
/// One router is shared by every stub of a network, and the router lock is what realizes
/// the partition-local total order: a broadcast delivers to all members of a partition
/// while holding the lock, so every member observes broadcasts in the same sequence.
#[derive(Clone)]
pub struct TransportStub {
    router: Arc<Router>,
    inbox: Arc<Mutex<Receiver<Vec<u8>>>>,
    open: Arc<AtomicBool>,
}

struct Router {
    members: Mutex<HashMap<PartitionId, Vec<Sender<Vec<u8>>>>>,
}

impl Transport for TransportStub {
    fn broadcast(&self, message: Message) -> Result<(), TransportError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable {
                detail: "transport closed".to_owned(),
            });
        }
        let frame = transport::encode(&message)?;
        let members = self.router.members.lock().unwrap();
        for partition in &message.destination {
            if let Some(inboxes) = members.get(partition) {
                for inbox in inboxes {
                    let _ = inbox.send(frame.clone());
                }
            }
        }
        Ok(())
    }

    fn recv(&self) -> Option<Message> {
        if !self.open.load(Ordering::SeqCst) {
            return None;
        }
        match self.inbox.lock().unwrap().try_recv() {
            Ok(frame) => match transport::decode(&frame) {
                Ok(message) => Some(message),
                Err(err) => {
                    log::error!("dropping frame at ingress: {}", err);
                    None
                }
            },
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

/// Create the stubs for a network of `partitions`, where each partition comes with its
/// peer count. Stubs come back grouped per partition, in the order provided.
pub fn mock_network(partitions: &[(PartitionId, usize)]) -> Vec<Vec<TransportStub>> {
    let router = Arc::new(Router {
        members: Mutex::new(HashMap::new()),
    });
    partitions
        .iter()
        .map(|(partition, count)| {
            (0..*count)
                .map(|_| {
                    let (sender, receiver) = mpsc::channel();
                    router
                        .members
                        .lock()
                        .unwrap()
                        .entry(partition.clone())
                        .or_default()
                        .push(sender);
                    TransportStub {
                        router: Arc::clone(&router),
                        inbox: Arc::new(Mutex::new(receiver)),
                        open: Arc::new(AtomicBool::new(true)),
                    }
                })
                .collect()
        })
        .collect()
}
