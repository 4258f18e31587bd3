use std::time::Duration;

use crate::configs::endpoints::Endpoints;

/// Fixed pause between losing the channel and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);
/// Upper bound for the initial snapshot request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound for opening the live channel, handshake included.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything the synchronization layer needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub endpoints: Endpoints,
    /// Fixed delay, not a backoff: every reconnect waits exactly this long.
    pub reconnect_delay: Duration,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl SyncConfig {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Defaults for a dashboard served from `host`.
    pub fn for_host(host: &str) -> Self {
        Self::new(Endpoints::for_host(host))
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
