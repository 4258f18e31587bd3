//! # Visible View
//!
//! Joins the store and the filter criteria into the one value the presentation
//! layer renders. Whenever either side changes, the visible set is recomputed
//! from scratch with [`visible`].

use chrono::{DateTime, Local};
use tokio::sync::watch;

use crate::core::filter::{visible, FilterCriteria};
use crate::core::state_store::{StateStore, StoreState};
use crate::models::FleetSnapshot;

/// What the presentation layer renders at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleSet {
    pub robots: FleetSnapshot,
    /// The store's "Last Updated" stamp.
    pub updated_at: DateTime<Local>,
    pub revision: u64,
}

/// Derived reader over the store and the criteria.
pub struct VisibleView {
    store_rx: watch::Receiver<StoreState>,
    criteria_rx: watch::Receiver<FilterCriteria>,
}

impl VisibleView {
    pub fn new(store: &StateStore, criteria_rx: watch::Receiver<FilterCriteria>) -> Self {
        Self { store_rx: store.subscribe(), criteria_rx }
    }

    /// Recomputes the visible set and marks both inputs as seen.
    pub fn current(&mut self) -> VisibleSet {
        let criteria = self.criteria_rx.borrow_and_update().clone();
        let state = self.store_rx.borrow_and_update();
        VisibleSet {
            robots: visible(&state.snapshot, &criteria),
            updated_at: state.updated_at,
            revision: state.revision,
        }
    }

    /// Waits until the store or the criteria change, then returns the new
    /// visible set. `None` once the dashboard that feeds this view is gone.
    pub async fn changed(&mut self) -> Option<VisibleSet> {
        tokio::select! {
            res = self.store_rx.changed() => res.ok()?,
            res = self.criteria_rx.changed() => res.ok()?,
        }
        Some(self.current())
    }
}
