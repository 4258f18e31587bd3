//! # Configuration Modules
//!
//! Endpoint selection and the tunables of the synchronization layer.

/// Host-based selection of the REST and WebSocket bases.
pub mod endpoints;

/// Reconnect delay, request timeout and resolved endpoints.
pub mod sync_config;

pub use endpoints::{is_local_host, Endpoints};
pub use sync_config::{SyncConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECONNECT_DELAY, DEFAULT_REQUEST_TIMEOUT};
