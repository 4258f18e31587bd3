//! # Channel State Machine
//!
//! The connection lifecycle of the live channel, free of I/O so that every
//! transition (and every out-of-order delivery) can be exercised directly.
//!
//! ```text
//! Disconnected --begin_attempt--> Connecting --Opened--> Connected
//!      ^                              |                      |
//!      +------ Failed / Closed -------+----------------------+
//!                 (Step::Reconnect)
//! any state --terminate--> Terminated (absorbing)
//! ```
//!
//! Every connection attempt is tagged with a fresh [`Epoch`]. Transport events
//! carry the epoch of the attempt that produced them; events from any other
//! epoch are stale and never reach the store.

use std::fmt;

use crate::errors::{ChannelError, SnapshotParseError};
use crate::models::{parse_snapshot, FleetSnapshot};

/// Identifies one connection attempt. Strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Epoch(u64);

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Terminated,
}

/// Something the transport of one attempt reported.
#[derive(Debug)]
pub enum ChannelEvent {
    Opened,
    /// A text or binary frame, not yet decoded.
    Payload(Vec<u8>),
    Failed(ChannelError),
    Closed,
}

/// What the driver has to do after an event.
#[derive(Debug)]
pub enum Step {
    /// Event from a superseded attempt (or after teardown). Drop it.
    Stale,
    /// Current attempt, but meaningless in this state. Drop it.
    Ignore,
    /// Connection established.
    Opened,
    /// Replace the store with this snapshot.
    Apply(FleetSnapshot),
    /// Payload did not decode; connection stays up.
    Malformed(SnapshotParseError),
    /// Drop the transport and schedule a reconnect. `None` means a clean close.
    Reconnect(Option<ChannelError>),
}

#[derive(Debug)]
pub struct ChannelMachine {
    state: ConnectionState,
    epoch: Epoch,
}

impl Default for ChannelMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelMachine {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            epoch: Epoch::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Epoch of the most recent attempt.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Starts a new attempt if disconnected, returning its epoch.
    pub fn begin_attempt(&mut self) -> Option<Epoch> {
        if self.state != ConnectionState::Disconnected {
            return None;
        }
        self.epoch = Epoch(self.epoch.0 + 1);
        self.state = ConnectionState::Connecting;
        Some(self.epoch)
    }

    pub fn on_event(&mut self, epoch: Epoch, event: ChannelEvent) -> Step {
        if self.state == ConnectionState::Terminated || epoch != self.epoch {
            return Step::Stale;
        }

        match (self.state, event) {
            (ConnectionState::Connecting, ChannelEvent::Opened) => {
                self.state = ConnectionState::Connected;
                Step::Opened
            }
            (ConnectionState::Connected, ChannelEvent::Payload(bytes)) => match parse_snapshot(&bytes) {
                Ok(snapshot) => Step::Apply(snapshot),
                Err(e) => Step::Malformed(e),
            },
            (ConnectionState::Connecting | ConnectionState::Connected, ChannelEvent::Failed(e)) => {
                self.state = ConnectionState::Disconnected;
                Step::Reconnect(Some(e))
            }
            (ConnectionState::Connecting | ConnectionState::Connected, ChannelEvent::Closed) => {
                self.state = ConnectionState::Disconnected;
                Step::Reconnect(None)
            }
            // e.g. Closed trailing a Failed of the same attempt: one reconnect is enough.
            _ => Step::Ignore,
        }
    }

    /// Absorbing: no further attempts or events are accepted.
    pub fn terminate(&mut self) {
        self.state = ConnectionState::Terminated;
    }
}
