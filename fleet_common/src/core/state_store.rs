//! # Fleet State Store
//!
//! The single source of truth for the dashboard: the most recently applied
//! fleet snapshot and the moment it was applied.
//!
//! ## Design
//!
//! - **Full replace only**: the upstream server sends a full snapshot per
//!   message, so the only mutator is [`StateStore::replace`]. There is no patch
//!   or merge path.
//! - **Reactive readers**: the state lives in a `tokio::sync::watch` channel.
//!   Readers either take a cheap copy with [`StateStore::current`] or hold a
//!   receiver from [`StateStore::subscribe`] and await `changed()`.
//! - **Revisions**: every write bumps a monotonically increasing revision.
//!   [`StateStore::replace_if_revision`] lets a writer that started work
//!   earlier (the initial fetch) apply its result only if nobody wrote in the
//!   meantime.

use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::watch;

use crate::models::FleetSnapshot;

/// A consistent view of the store at one instant.
#[derive(Debug, Clone)]
pub struct StoreState {
    /// The current snapshot. Shared, never mutated in place.
    pub snapshot: Arc<FleetSnapshot>,
    /// When `snapshot` was applied; creation time until the first write.
    pub updated_at: DateTime<Local>,
    /// Number of writes applied so far.
    pub revision: u64,
}

/// Cloneable handle to the shared store. All clones see the same state.
#[derive(Debug, Clone)]
pub struct StateStore {
    tx: Arc<watch::Sender<StoreState>>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Creates an empty store stamped with the current time.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(StoreState {
            snapshot: Arc::new(Vec::new()),
            updated_at: Local::now(),
            revision: 0,
        });
        Self { tx: Arc::new(tx) }
    }

    /// Swaps in `snapshot` wholesale, stamps the time and notifies readers.
    /// Returns the new revision.
    pub fn replace(&self, snapshot: FleetSnapshot) -> u64 {
        let mut revision = 0;
        self.tx.send_modify(|state| {
            Self::apply(state, snapshot);
            revision = state.revision;
        });
        log::debug!("State store replaced (revision {}, {} robots)", revision, self.tx.borrow().snapshot.len());
        revision
    }

    /// Applies `snapshot` only if the store is still at `expected` revision.
    /// Returns whether the write happened.
    pub fn replace_if_revision(&self, expected: u64, snapshot: FleetSnapshot) -> bool {
        let applied = self.tx.send_if_modified(|state| {
            if state.revision != expected {
                return false;
            }
            Self::apply(state, snapshot);
            true
        });
        if !applied {
            log::debug!(
                "Skipped conditional replace: store moved past revision {} (now {})",
                expected,
                self.revision()
            );
        }
        applied
    }

    fn apply(state: &mut StoreState, snapshot: FleetSnapshot) {
        state.snapshot = Arc::new(snapshot);
        state.updated_at = Local::now();
        state.revision += 1;
    }

    /// Copy of the current state.
    pub fn current(&self) -> StoreState {
        self.tx.borrow().clone()
    }

    pub fn revision(&self) -> u64 {
        self.tx.borrow().revision
    }

    /// A receiver that is notified on every subsequent write.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.tx.subscribe()
    }
}
