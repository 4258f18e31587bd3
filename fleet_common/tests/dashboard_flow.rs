//! Mount-to-unmount flow: initial fetch over HTTP, live updates over a
//! scripted channel, filtering on top.

mod common;

use std::time::Duration;

use common::{payload, serve_http_once, ScriptedConnector};
use fleet_common::core::StatusFilter;
use fleet_common::ingestors::ConnectionState;
use fleet_common::{Dashboard, Endpoints, FilterCriteria, MountError, RobotRecord, SyncConfig};
use tokio::time::timeout;

const R1_BODY: &str = r#"[{"Robot ID":"R1","Online/Offline":true,"Battery Percentage":50,"CPU Usage":10,"RAM Consumption":256,"Location Coordinates":[51.5,-0.09]}]"#;

fn r1() -> RobotRecord {
    RobotRecord::new("R1", true, 50.0).with_usage(10.0, 256.0).with_location(51.5, -0.09)
}

fn r2() -> RobotRecord {
    RobotRecord::new("R2", false, 5.0).with_usage(70.0, 1024.0)
}

#[tokio::test]
async fn test_dashboard_fetch_then_live_then_filter() {
    let (addr, server) = serve_http_once("200 OK", R1_BODY.to_string(), None).await;
    let config = SyncConfig::new(Endpoints::custom(&format!("http://{}", addr), "ws://127.0.0.1:1").unwrap());
    let dashboard = Dashboard::new(config);

    let (connector, _attempts) = ScriptedConnector::new();
    let tx = connector.accept_next();
    let mounted = dashboard.mount_with(connector).unwrap();

    // Initial fetch lands.
    let mut store_rx = dashboard.store().subscribe();
    timeout(Duration::from_secs(5), store_rx.wait_for(|s| s.revision >= 1))
        .await
        .expect("initial fetch never landed")
        .unwrap();
    server.await.unwrap();
    assert_eq!(dashboard.visible().robots, vec![r1()]);

    // A pushed snapshot replaces the whole fleet.
    let mut connection = mounted.watch_connection();
    connection.wait_for(|s| *s == ConnectionState::Connected).await.unwrap();
    tx.send(payload(&[r2()])).unwrap();
    timeout(Duration::from_secs(5), store_rx.wait_for(|s| s.revision >= 2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(*dashboard.store().current().snapshot, vec![r2()]);

    // Criteria changes recompute the open view.
    let mut view = dashboard.view();
    assert_eq!(view.current().robots, vec![r2()]);

    dashboard.set_criteria(FilterCriteria::parse("", "", "r2").unwrap());
    let set = view.changed().await.unwrap();
    assert_eq!(set.robots, vec![r2()]);
    assert_eq!(set.revision, 2);

    dashboard.set_criteria(FilterCriteria::parse("", "", "R3").unwrap());
    assert!(view.changed().await.unwrap().robots.is_empty());

    dashboard.set_criteria(FilterCriteria::parse("Online", "", "").unwrap());
    assert!(view.changed().await.unwrap().robots.is_empty());
    assert_eq!(dashboard.criteria().status, StatusFilter::Online);

    dashboard.set_criteria(FilterCriteria::parse("Offline", "Low", "").unwrap());
    assert_eq!(view.changed().await.unwrap().robots, vec![r2()]);

    mounted.unmount().await;
    assert!(tx.is_closed());
    assert_eq!(dashboard.store().revision(), 2);
}

#[tokio::test]
async fn test_dashboard_survives_failed_fetch() {
    let (addr, server) = serve_http_once("500 Internal Server Error", "down".to_string(), None).await;
    let config = SyncConfig::new(Endpoints::custom(&format!("http://{}", addr), "ws://127.0.0.1:1").unwrap());
    let dashboard = Dashboard::new(config);

    let (connector, _attempts) = ScriptedConnector::new();
    let tx = connector.accept_next();
    let mounted = dashboard.mount_with(connector).unwrap();

    server.await.unwrap();
    assert!(dashboard.visible().robots.is_empty());

    // The channel alone is enough to populate the store.
    tx.send(payload(&[r1()])).unwrap();
    let mut store_rx = dashboard.store().subscribe();
    timeout(Duration::from_secs(5), store_rx.wait_for(|s| s.revision >= 1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(dashboard.visible().robots, vec![r1()]);
    assert_eq!(mounted.connection_state(), ConnectionState::Connected);

    mounted.unmount().await;
}

#[tokio::test]
async fn test_second_mount_is_rejected_until_unmount() {
    let (addr, _server) = serve_http_once("200 OK", "[]".to_string(), None).await;
    let config = SyncConfig::new(Endpoints::custom(&format!("http://{}", addr), "ws://127.0.0.1:1").unwrap())
        .with_connect_timeout(Duration::from_secs(2));
    let dashboard = Dashboard::new(config);
    assert_eq!(dashboard.config().connect_timeout, Duration::from_secs(2));

    let (connector, mut attempts) = ScriptedConnector::new();
    let first_tx = connector.accept_next();
    let mounted = dashboard.mount_with(connector.clone()).unwrap();
    assert!(dashboard.is_mounted());
    assert_eq!(attempts.recv().await, Some(1));

    // A second channel manager would be a second writer to the store.
    assert!(matches!(dashboard.mount_with(connector.clone()), Err(MountError::AlreadyMounted)));
    assert_eq!(connector.attempts(), 1);

    mounted.unmount().await;
    assert!(!dashboard.is_mounted());
    assert!(first_tx.is_closed());

    // Unmounted dashboards can be mounted again.
    let second_tx = connector.accept_next();
    let remounted = dashboard.mount_with(connector.clone()).unwrap();
    assert_eq!(attempts.recv().await, Some(2));
    remounted.unmount().await;
    assert!(second_tx.is_closed());
}
