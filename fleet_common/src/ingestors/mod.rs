//! # Data Ingestors Module
//!
//! The two ways fleet state enters the dashboard, plus the pieces they are
//! built from.
//!
//! ## Contained Modules:
//! - **`snapshot_fetch`**: one-shot REST load of the full fleet at mount.
//! - **`live_channel`**: the resilient WebSocket manager that keeps the store
//!   current, reconnecting after a fixed delay whenever the channel drops.
//! - **`channel_machine`**: the I/O-free connection state machine with its
//!   epoch guard against stale callbacks.
//! - **`transport`**: the `Connector` seam and its `tokio-tungstenite`
//!   implementation.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Connection lifecycle and epoch guard.
pub mod channel_machine;
/// WebSocket channel manager with fixed-delay reconnection.
pub mod live_channel;
/// One-shot initial snapshot retrieval.
pub mod snapshot_fetch;
/// Transport abstraction and WebSocket connector.
pub mod transport;

// --- Public API Re-exports ---
pub use channel_machine::{ChannelEvent, ChannelMachine, ConnectionState, Epoch, Step};
pub use live_channel::{ChannelHandle, LiveChannel, CLOSE_GRACE};
pub use snapshot_fetch::SnapshotFetcher;
pub use transport::{ChannelConnection, Connector, Frame, FrameStream, WsConnector};
