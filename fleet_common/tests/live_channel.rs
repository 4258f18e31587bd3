//! Live channel manager behaviour against a scripted transport, on a paused
//! clock so reconnect delays are exact.

mod common;

use std::time::Duration;

use common::{payload, raw, ScriptedConnector};
use fleet_common::ingestors::{ConnectionState, LiveChannel};
use fleet_common::{ChannelError, RobotRecord, StateStore};
use tokio::time::Instant;
use url::Url;

const DELAY: Duration = Duration::from_millis(5000);

fn channel_url() -> Url {
    Url::parse("ws://127.0.0.1:8000/ws").unwrap()
}

async fn wait_for_revision(store: &StateStore, revision: u64) {
    let mut rx = store.subscribe();
    rx.wait_for(|state| state.revision >= revision).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_each_message_fully_replaces_store() {
    let (connector, _attempts) = ScriptedConnector::new();
    let tx = connector.accept_next();
    let store = StateStore::new();
    let handle = LiveChannel::new(connector, channel_url(), store.clone(), DELAY).spawn();

    tx.send(payload(&[RobotRecord::new("R1", true, 50.0).with_usage(10.0, 256.0)])).unwrap();
    wait_for_revision(&store, 1).await;
    assert_eq!(store.current().snapshot[0].id, "R1");

    tx.send(payload(&[RobotRecord::new("R2", false, 5.0)])).unwrap();
    wait_for_revision(&store, 2).await;
    assert_eq!(*store.current().snapshot, vec![RobotRecord::new("R2", false, 5.0)]);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_malformed_payload_is_discarded_and_connection_kept() {
    let (connector, _attempts) = ScriptedConnector::new();
    let tx = connector.accept_next();
    let store = StateStore::new();
    let handle = LiveChannel::new(connector.clone(), channel_url(), store.clone(), DELAY).spawn();

    tx.send(payload(&[RobotRecord::new("R1", true, 50.0)])).unwrap();
    wait_for_revision(&store, 1).await;
    let before = store.current();

    tx.send(raw("{this is not json")).unwrap();
    tx.send(raw(r#"{"Robot ID": "R1"}"#)).unwrap();
    tx.send(payload(&[RobotRecord::new("R5", true, 70.0)])).unwrap();
    wait_for_revision(&store, 2).await;

    let after = store.current();
    assert_eq!(after.revision, before.revision + 1);
    assert_eq!(after.snapshot[0].id, "R5");
    assert_eq!(handle.state(), ConnectionState::Connected);
    assert_eq!(connector.attempts(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reconnects_after_fixed_delay_when_closed() {
    let (connector, mut attempts) = ScriptedConnector::new();
    let first = connector.accept_next();
    let second = connector.accept_next();
    let store = StateStore::new();
    let handle = LiveChannel::new(connector, channel_url(), store.clone(), DELAY).spawn();

    assert_eq!(attempts.recv().await, Some(1));
    let mut state = handle.watch_state();
    state.wait_for(|s| *s == ConnectionState::Connected).await.unwrap();

    let closed_at = Instant::now();
    drop(first);
    assert_eq!(attempts.recv().await, Some(2));
    assert_eq!(closed_at.elapsed(), DELAY);

    second.send(payload(&[RobotRecord::new("R9", true, 88.0)])).unwrap();
    wait_for_revision(&store, 1).await;
    assert_eq!(store.current().snapshot[0].id, "R9");

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_refused_connection_is_retried_with_same_delay() {
    let (connector, mut attempts) = ScriptedConnector::new();
    connector.refuse_next("connection refused");
    connector.refuse_next("connection refused");
    let tx = connector.accept_next();
    let store = StateStore::new();
    let handle = LiveChannel::new(connector, channel_url(), store.clone(), DELAY).spawn();

    assert_eq!(attempts.recv().await, Some(1));
    let started = Instant::now();
    assert_eq!(attempts.recv().await, Some(2));
    assert_eq!(started.elapsed(), DELAY);
    assert_eq!(attempts.recv().await, Some(3));
    // Fixed delay, no backoff.
    assert_eq!(started.elapsed(), DELAY * 2);

    tx.send(payload(&[RobotRecord::new("R1", true, 50.0)])).unwrap();
    wait_for_revision(&store, 1).await;

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_closes_and_old_connection_cannot_write() {
    let (connector, mut attempts) = ScriptedConnector::new();
    let first = connector.accept_next();
    let second = connector.accept_next();
    let store = StateStore::new();
    let handle = LiveChannel::new(connector, channel_url(), store.clone(), DELAY).spawn();

    first.send(payload(&[RobotRecord::new("R1", true, 50.0)])).unwrap();
    wait_for_revision(&store, 1).await;

    first.send(Err(ChannelError::Transport("connection reset".into()))).unwrap();
    // The old transport is gone; whatever it still tries to push goes nowhere.
    let _ = first.send(payload(&[RobotRecord::new("OLD", true, 1.0)]));

    assert_eq!(attempts.recv().await, Some(1));
    assert_eq!(attempts.recv().await, Some(2));
    second.send(payload(&[RobotRecord::new("R3", true, 70.0)])).unwrap();
    wait_for_revision(&store, 2).await;

    let _ = first.send(payload(&[RobotRecord::new("OLD", true, 1.0)]));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let state = store.current();
    assert_eq!(state.revision, 2);
    assert_eq!(state.snapshot[0].id, "R3");
    assert!(first.is_closed());

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_reconnect() {
    let (connector, mut attempts) = ScriptedConnector::new();
    let first = connector.accept_next();
    let store = StateStore::new();
    let handle = LiveChannel::new(connector.clone(), channel_url(), store.clone(), DELAY).spawn();

    let mut state = handle.watch_state();
    state.wait_for(|s| *s == ConnectionState::Connected).await.unwrap();
    drop(first);
    state.wait_for(|s| *s == ConnectionState::Disconnected).await.unwrap();

    handle.shutdown().await;
    assert_eq!(*state.borrow(), ConnectionState::Terminated);

    tokio::time::sleep(DELAY * 4).await;
    assert_eq!(connector.attempts(), 1);
    assert_eq!(attempts.recv().await, Some(1));
    assert!(attempts.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_active_transport() {
    let (connector, _attempts) = ScriptedConnector::new();
    let tx = connector.accept_next();
    let store = StateStore::new();
    let handle = LiveChannel::new(connector.clone(), channel_url(), store.clone(), DELAY).spawn();

    let mut state = handle.watch_state();
    state.wait_for(|s| *s == ConnectionState::Connected).await.unwrap();

    handle.shutdown().await;
    assert_eq!(connector.clean_closes(), 1);
    assert!(tx.is_closed());
    assert!(tx.send(payload(&[RobotRecord::new("LATE", true, 1.0)])).is_err());
    assert_eq!(store.revision(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_hung_handshake_times_out_and_reconnects() {
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
    // Nothing queued: the first dial never completes on its own.
    let (connector, mut attempts) = ScriptedConnector::new();
    let store = StateStore::new();
    let handle = LiveChannel::new(connector.clone(), channel_url(), store.clone(), DELAY)
        .with_connect_timeout(CONNECT_TIMEOUT)
        .spawn();

    assert_eq!(attempts.recv().await, Some(1));
    let started = Instant::now();
    let tx = connector.accept_next();

    let mut state = handle.watch_state();
    state.wait_for(|s| *s == ConnectionState::Disconnected).await.unwrap();
    assert_eq!(started.elapsed(), CONNECT_TIMEOUT);

    assert_eq!(attempts.recv().await, Some(2));
    assert_eq!(started.elapsed(), CONNECT_TIMEOUT + DELAY);

    tx.send(payload(&[RobotRecord::new("R1", true, 50.0)])).unwrap();
    wait_for_revision(&store, 1).await;
    assert_eq!(handle.state(), ConnectionState::Connected);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_connecting_stops_dial() {
    let (connector, mut attempts) = ScriptedConnector::new();
    let store = StateStore::new();
    let handle = LiveChannel::new(connector.clone(), channel_url(), store.clone(), DELAY).spawn();

    assert_eq!(attempts.recv().await, Some(1));
    assert_eq!(handle.state(), ConnectionState::Connecting);

    let mut state = handle.watch_state();
    handle.shutdown().await;
    assert_eq!(*state.borrow_and_update(), ConnectionState::Terminated);

    tokio::time::sleep(DELAY * 4).await;
    assert_eq!(connector.attempts(), 1);
    assert_eq!(connector.clean_closes(), 0);
}
