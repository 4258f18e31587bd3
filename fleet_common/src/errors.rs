//! # Error Taxonomy
//!
//! Every failure in the synchronization layer is recovered locally. These
//! types exist so that the recovery sites can log something precise; none of
//! them is ever surfaced to the presentation layer as a crash.

use thiserror::Error;

#[derive(Debug, Error)]
/// # Fetch Error
///
/// Failure of the one-shot initial snapshot request.
pub enum FetchError {
    /// The HTTP client could not be constructed (bad base URL, TLS backend).
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    /// The request never produced a response (DNS, refused, timeout).
    #[error("Request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("Server responded with status {status}: {body}")]
    Status {
        /// The numeric HTTP status code.
        status: u16,
        /// The (possibly truncated) response body.
        body: String,
    },

    /// The body was not a valid fleet snapshot.
    #[error("Failed to decode snapshot: {0}")]
    Decode(#[from] SnapshotParseError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// # Channel Error
///
/// Transport-level failures of the live channel. Both variants end the
/// current connection attempt and schedule a reconnect.
pub enum ChannelError {
    /// The connection could not be opened.
    #[error("Failed to open channel to {url}: {reason}")]
    Connect {
        /// The endpoint that was dialled.
        url: String,
        /// Human-readable cause from the transport.
        reason: String,
    },

    /// An already-open connection reported an error.
    #[error("Channel transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
/// # Snapshot Parse Error
///
/// The payload was not a JSON array of robot records.
#[error("Malformed snapshot payload: {0}")]
pub struct SnapshotParseError(#[from] pub serde_json::Error);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// # Config Error
pub enum ConfigError {
    /// A base URL could not be parsed or has the wrong scheme.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected input.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A filter axis received a value it does not understand.
    #[error("Invalid {axis} filter value '{value}'")]
    InvalidFilter {
        /// Which filter axis ("status" or "battery").
        axis: &'static str,
        /// The rejected input.
        value: String,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// # Mount Error
pub enum MountError {
    /// The dashboard already runs a fetcher and a channel; a second mount
    /// would add a second writer to the store.
    #[error("Dashboard is already mounted")]
    AlreadyMounted,
}
