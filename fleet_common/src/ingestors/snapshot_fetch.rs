//! # Snapshot Fetcher
//!
//! One-shot REST retrieval of the full fleet state at mount time.
//!
//! - **Single attempt**: the client is built with zero retries. If the request
//!   fails, the live channel will deliver a snapshot soon enough.
//! - **Failures are swallowed**: [`SnapshotFetcher::load_into`] logs any error
//!   and leaves the store untouched.
//! - **No stale overwrite**: the fetch can complete after the channel already
//!   pushed fresher data. The result is applied only if the store is still at
//!   the revision observed when the request was issued.

use crate::configs::SyncConfig;
use crate::core::StateStore;
use crate::errors::FetchError;
use crate::models::{parse_snapshot, FleetSnapshot};
use crate::retrieve::ApiClient;

pub struct SnapshotFetcher {
    client: ApiClient,
    path: &'static str,
}

impl SnapshotFetcher {
    /// Builds a fetcher for the configured REST endpoint.
    pub fn new(config: &SyncConfig) -> Result<Self, FetchError> {
        let client = ApiClient::new(config.endpoints.api_base().clone(), config.request_timeout, 0)
            .map_err(|e| FetchError::Client(format!("{:#}", e)))?;
        Ok(Self {
            client,
            path: config.endpoints.robots_path(),
        })
    }

    /// Requests and decodes the current fleet snapshot.
    pub async fn fetch(&self) -> Result<FleetSnapshot, FetchError> {
        let response = self
            .client
            .get(self.path)
            .await
            .map_err(|e| FetchError::Request(format!("{:#}", e)))?;

        if !response.success {
            return Err(FetchError::Status {
                status: response.status,
                body: response.body_text(),
            });
        }

        Ok(parse_snapshot(&response.body)?)
    }

    /// Fetches and writes the result into `store`. Returns whether the store
    /// was written. Errors are logged, never returned.
    pub async fn load_into(&self, store: &StateStore) -> bool {
        let observed = store.revision();
        log::info!("Fetching initial fleet snapshot from {}{}", self.client.base_url(), self.path);

        match self.fetch().await {
            Ok(snapshot) => {
                let count = snapshot.len();
                if store.replace_if_revision(observed, snapshot) {
                    log::info!("Initial snapshot applied ({} robots)", count);
                    true
                } else {
                    log::warn!("Initial snapshot arrived after a live update; discarded");
                    false
                }
            }
            Err(e) => {
                log::error!("Error fetching robot data: {}", e);
                false
            }
        }
    }
}
