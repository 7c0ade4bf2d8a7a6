//! End-to-end runs of the engine over a mock network: peers and unities wired to
//! channel-backed transports and in-memory storage, driven through the public submission
//! path (broadcasting an initial message through a peer's transport handle) and observed
//! through fast reads and each replica's commit log.

mod common;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::LevelFilter;

use gmcast_rs::config::Config;
use gmcast_rs::conflict::KeyIntersection;
use gmcast_rs::transport::Transport;
use gmcast_rs::invoker::PooledInvoker;
use gmcast_rs::peer::Peer;
use gmcast_rs::types::basic::{MessageState, PartitionId, ProtocolVersion, Timestamp};
use gmcast_rs::types::message::{Message, Payload, Request};
use gmcast_rs::unity::Unity;

use crate::common::logging::setup_logger;
use crate::common::storage::MemStorage;
use crate::common::transport::mock_network;

const VERSION: ProtocolVersion = ProtocolVersion::new(1);

const TIMEOUT: Duration = Duration::from_millis(500);

fn partition(address: &str) -> PartitionId {
    PartitionId::new(address)
}

fn configuration(name: &str, address: &str, storage: MemStorage) -> Config<MemStorage> {
    Config::builder()
        .name(name)
        .partition(partition(address))
        .version(VERSION)
        .conflict(Arc::new(KeyIntersection))
        .storage(storage)
        .invoker(Arc::new(PooledInvoker::new(8)))
        .timeout(TIMEOUT)
        .build()
}

fn submission(identifier: &str, destination: Vec<PartitionId>, key: &str, data: &[u8]) -> Message {
    Message::initial(identifier, destination, VERSION, Payload::new(key, data.to_vec()))
}

/// Poll `probe` until it holds or `bound` elapses.
fn eventually(bound: Duration, probe: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + bound;
    while Instant::now() < deadline {
        if probe() {
            return true;
        }
        thread::sleep(Duration::from_millis(25));
    }
    false
}

#[test]
fn a_single_destination_submission_commits_and_serves_fast_reads() {
    setup_logger(LevelFilter::Debug);

    let mut network = mock_network(&[(partition("alpha"), 1)]);
    let storage = MemStorage::new();
    let peer = Peer::start(
        configuration("alpha-0", "alpha", storage.clone()),
        network[0].remove(0),
    );

    peer.transport()
        .broadcast(submission("a", vec![partition("alpha")], "k", b"v"))
        .unwrap();

    assert!(eventually(Duration::from_secs(10), || {
        peer.fast_read(Request { key: "k".to_owned() }).success
    }));

    let response = peer.fast_read(Request { key: "k".to_owned() });
    assert_eq!(response.identifier, "a");
    assert_eq!(response.data, b"v".to_vec());
    assert!(response.failure.is_none());

    let log = storage.commit_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].final_timestamp, Timestamp::new(0));

    peer.stop();
}

#[test]
fn conflicting_submissions_commit_in_order_with_advancing_timestamps() {
    setup_logger(LevelFilter::Debug);

    let mut network = mock_network(&[(partition("alpha"), 1)]);
    let storage = MemStorage::new();
    let peer = Peer::start(
        configuration("alpha-0", "alpha", storage.clone()),
        network[0].remove(0),
    );

    peer.transport()
        .broadcast(submission("a", vec![partition("alpha")], "k", b"v1"))
        .unwrap();
    assert!(eventually(Duration::from_secs(10), || {
        storage.commit_log().len() == 1
    }));

    peer.transport()
        .broadcast(submission("b", vec![partition("alpha")], "k", b"v2"))
        .unwrap();
    assert!(eventually(Duration::from_secs(10), || {
        storage.commit_log().len() == 2
    }));

    let log = storage.commit_log();
    assert_eq!(log[0].identifier, "a");
    assert_eq!(log[0].final_timestamp, Timestamp::new(0));
    assert_eq!(log[1].identifier, "b");
    assert_eq!(log[1].final_timestamp, Timestamp::new(1));

    let response = peer.fast_read(Request { key: "k".to_owned() });
    assert_eq!(response.identifier, "b");
    assert_eq!(response.data, b"v2".to_vec());

    peer.stop();
}

#[test]
fn every_replica_of_a_partition_commits_the_submission() {
    setup_logger(LevelFilter::Debug);

    let mut network = mock_network(&[(partition("alpha"), 2)]);
    let first = MemStorage::new();
    let second = MemStorage::new();
    let unity = Unity::new(vec![
        (
            configuration("alpha-0", "alpha", first.clone()),
            network[0].remove(0),
        ),
        (
            configuration("alpha-1", "alpha", second.clone()),
            network[0].remove(0),
        ),
    ]);

    assert_ne!(unity.resolve_peer().name(), unity.resolve_peer().name());

    unity
        .resolve_peer()
        .transport()
        .broadcast(submission("a", vec![partition("alpha")], "k", b"v"))
        .unwrap();

    assert!(eventually(Duration::from_secs(10), || {
        first.commit_log().len() == 1 && second.commit_log().len() == 1
    }));
    assert!(unity
        .resolve_peer()
        .fast_read(Request { key: "k".to_owned() })
        .success);

    unity.shutdown();
}

#[test]
fn the_exchange_adopts_the_largest_group_timestamp() {
    setup_logger(LevelFilter::Debug);

    let mut network = mock_network(&[(partition("alpha"), 1), (partition("beta"), 1)]);
    let alpha_storage = MemStorage::new();
    let beta_storage = MemStorage::new();
    let alpha = Peer::start(
        configuration("alpha-0", "alpha", alpha_storage.clone()),
        network[0].remove(0),
    );
    let beta = Peer::start(
        configuration("beta-0", "beta", beta_storage.clone()),
        network[1].remove(0),
    );
    alpha.clock().set(Timestamp::new(5));
    beta.clock().set(Timestamp::new(2));

    alpha
        .transport()
        .broadcast(submission(
            "x",
            vec![partition("alpha"), partition("beta")],
            "k",
            b"v",
        ))
        .unwrap();

    assert!(eventually(Duration::from_secs(10), || {
        alpha_storage.commit_log().len() == 1 && beta_storage.commit_log().len() == 1
    }));

    assert_eq!(alpha_storage.commit_log()[0].final_timestamp, Timestamp::new(5));
    assert_eq!(beta_storage.commit_log()[0].final_timestamp, Timestamp::new(5));
    // The lagging partition caught its clock up to the final timestamp.
    assert!(beta.clock().read() >= Timestamp::new(5));

    alpha.stop();
    beta.stop();
}

#[test]
fn a_reingested_copy_with_an_agreed_timestamp_turns_terminal() {
    setup_logger(LevelFilter::Debug);

    let mut network = mock_network(&[(partition("alpha"), 1)]);
    let storage = MemStorage::new();
    let peer = Peer::start(
        configuration("alpha-0", "alpha", storage.clone()),
        network[0].remove(0),
    );

    // A multi-destination copy that finished its exchange at another peer re-enters
    // through the partition's total order carrying the agreed final timestamp.
    let mut reingested = submission(
        "r",
        vec![partition("alpha"), partition("beta")],
        "k",
        b"v",
    );
    reingested.state = MessageState::S2;
    reingested.timestamp = Timestamp::new(7);
    peer.transport().broadcast(reingested).unwrap();

    assert!(eventually(Duration::from_secs(10), || {
        storage.commit_log().len() == 1
    }));

    let log = storage.commit_log();
    assert_eq!(log[0].identifier, "r");
    assert_eq!(log[0].final_timestamp, Timestamp::new(7));
    // The peer's clock caught up to the agreed timestamp on the way to terminal.
    assert!(peer.clock().read() >= Timestamp::new(7));

    peer.stop();
}

#[test]
fn concurrent_exchanges_deliver_in_the_same_order_everywhere() {
    setup_logger(LevelFilter::Debug);

    let mut network = mock_network(&[(partition("alpha"), 1), (partition("beta"), 1)]);
    let alpha_storage = MemStorage::new();
    let beta_storage = MemStorage::new();
    let alpha = Peer::start(
        configuration("alpha-0", "alpha", alpha_storage.clone()),
        network[0].remove(0),
    );
    let beta = Peer::start(
        configuration("beta-0", "beta", beta_storage.clone()),
        network[1].remove(0),
    );

    let everywhere = vec![partition("alpha"), partition("beta")];
    let from_alpha = {
        let transport = alpha.transport().clone();
        let destination = everywhere.clone();
        thread::spawn(move || {
            transport
                .broadcast(submission("x", destination, "kx", b"vx"))
                .unwrap()
        })
    };
    let from_beta = {
        let transport = beta.transport().clone();
        let destination = everywhere;
        thread::spawn(move || {
            transport
                .broadcast(submission("y", destination, "ky", b"vy"))
                .unwrap()
        })
    };
    from_alpha.join().unwrap();
    from_beta.join().unwrap();

    assert!(eventually(Duration::from_secs(10), || {
        alpha_storage.commit_log().len() == 2 && beta_storage.commit_log().len() == 2
    }));

    let alpha_log = alpha_storage.commit_log();
    let beta_log = beta_storage.commit_log();
    let order = |log: &[gmcast_rs::types::message::Entry]| -> Vec<(String, Timestamp)> {
        log.iter()
            .map(|entry| (entry.identifier.clone(), entry.final_timestamp))
            .collect()
    };
    assert_eq!(order(&alpha_log), order(&beta_log));

    alpha.stop();
    beta.stop();
}

#[test]
fn submissions_with_a_foreign_protocol_version_are_dropped() {
    setup_logger(LevelFilter::Debug);

    let mut network = mock_network(&[(partition("alpha"), 1)]);
    let storage = MemStorage::new();
    let peer = Peer::start(
        configuration("alpha-0", "alpha", storage.clone()),
        network[0].remove(0),
    );

    let foreign = Message::initial(
        "v",
        vec![partition("alpha")],
        ProtocolVersion::new(2),
        Payload::new("k", b"v".to_vec()),
    );
    peer.transport().broadcast(foreign).unwrap();

    thread::sleep(Duration::from_millis(300));
    assert!(!peer.fast_read(Request { key: "k".to_owned() }).success);
    assert!(storage.commit_log().is_empty());

    peer.stop();
}

#[test]
fn shutdown_returns_within_the_bound_with_an_exchange_in_flight() {
    setup_logger(LevelFilter::Debug);

    let mut network = mock_network(&[(partition("alpha"), 2)]);
    let first = MemStorage::new();
    let second = MemStorage::new();
    let unity = Unity::new(vec![
        (
            configuration("alpha-0", "alpha", first.clone()),
            network[0].remove(0),
        ),
        (
            configuration("alpha-1", "alpha", second.clone()),
            network[0].remove(0),
        ),
    ]);

    // The ghost partition has no peers, so the exchange quorum never completes and the
    // submission is stuck awaiting timestamps at every alpha replica.
    unity
        .resolve_peer()
        .transport()
        .broadcast(submission(
            "stuck",
            vec![partition("alpha"), partition("ghost")],
            "k",
            b"v",
        ))
        .unwrap();

    thread::sleep(Duration::from_millis(300));
    assert!(first.commit_log().is_empty());
    assert!(second.commit_log().is_empty());

    let started = Instant::now();
    unity.shutdown();
    assert!(started.elapsed() < TIMEOUT * 2 + Duration::from_millis(500));

    assert!(first.commit_log().is_empty());
    assert!(second.commit_log().is_empty());
}
