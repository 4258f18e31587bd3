//! # Dashboard Orchestration
//!
//! Wires the components together the way the dashboard page does on mount:
//! the store and filter criteria exist for the dashboard's whole life; the
//! initial fetch and the live channel run only between [`Dashboard::mount`]
//! and [`MountedDashboard::unmount`]. A dashboard is mounted at most once
//! at a time, so the store never has two channel managers writing to it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::configs::SyncConfig;
use crate::core::{FilterCriteria, StateStore, VisibleSet, VisibleView};
use crate::errors::MountError;
use crate::ingestors::{ChannelHandle, ConnectionState, Connector, LiveChannel, SnapshotFetcher, WsConnector};

pub struct Dashboard {
    config: SyncConfig,
    store: StateStore,
    criteria_tx: watch::Sender<FilterCriteria>,
    mounted: Arc<AtomicBool>,
}

impl Dashboard {
    pub fn new(config: SyncConfig) -> Self {
        let (criteria_tx, _) = watch::channel(FilterCriteria::default());
        Self {
            config,
            store: StateStore::new(),
            criteria_tx,
            mounted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.criteria_tx.borrow().clone()
    }

    /// Replaces the filter criteria; open views recompute.
    pub fn set_criteria(&self, criteria: FilterCriteria) {
        self.criteria_tx.send_replace(criteria);
    }

    /// The visible set right now.
    pub fn visible(&self) -> VisibleSet {
        self.view().current()
    }

    /// A reactive view over the store and the criteria.
    pub fn view(&self) -> VisibleView {
        VisibleView::new(&self.store, self.criteria_tx.subscribe())
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Starts the initial fetch and the WebSocket channel.
    pub fn mount(&self) -> Result<MountedDashboard, MountError> {
        self.mount_with(WsConnector)
    }

    /// Like [`mount`](Self::mount) with a custom channel transport.
    pub fn mount_with<C: Connector>(&self, connector: C) -> Result<MountedDashboard, MountError> {
        if self
            .mounted
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(MountError::AlreadyMounted);
        }

        let fetch = match SnapshotFetcher::new(&self.config) {
            Ok(fetcher) => {
                let store = self.store.clone();
                Some(tokio::spawn(async move {
                    fetcher.load_into(&store).await;
                }))
            }
            Err(e) => {
                log::error!("Error fetching robot data: {}", e);
                None
            }
        };

        let channel = LiveChannel::new(
            connector,
            self.config.endpoints.channel_url(),
            self.store.clone(),
            self.config.reconnect_delay,
        )
        .with_connect_timeout(self.config.connect_timeout)
        .spawn();

        Ok(MountedDashboard {
            fetch,
            channel,
            mounted: Arc::clone(&self.mounted),
        })
    }
}

/// The running side of a mounted dashboard.
pub struct MountedDashboard {
    fetch: Option<JoinHandle<()>>,
    channel: ChannelHandle,
    mounted: Arc<AtomicBool>,
}

impl MountedDashboard {
    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.channel.watch_state()
    }

    /// Stops everything started by `mount`. Nothing writes to the store
    /// after this returns, and the dashboard may be mounted again.
    pub async fn unmount(self) {
        if let Some(fetch) = self.fetch {
            fetch.abort();
            let _ = fetch.await;
        }
        self.channel.shutdown().await;
        self.mounted.store(false, Ordering::SeqCst);
    }
}
