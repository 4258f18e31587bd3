//! # Core State Module
//!
//! The framework-independent heart of the dashboard: where the fleet state
//! lives and how the visible part of it is derived.
//!
//! ## Core Components:
//!
//! - **`state_store`**: Holds the most recent full snapshot and its timestamp.
//!   One mutator (`replace`), any number of readers via a `watch` channel.
//!
//! - **`filter`**: Pure filter engine (`visible`) and the per-record display
//!   classifications consumed by the presentation layer.
//!
//! - **`view`**: Recomputes the visible set whenever the store or the filter
//!   criteria change.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// The single source of truth for fleet state.
pub mod state_store;
/// Filter predicates and display classification.
pub mod filter;
/// Reactive join of store and criteria.
pub mod view;

// --- Public API Re-exports ---
pub use state_store::{StateStore, StoreState};
pub use filter::{
    battery_indicator, map_markers, status_color, status_label, visible, BatteryFilter,
    BatteryIndicator, FilterCriteria, StatusColor, StatusFilter, LOW_BATTERY_THRESHOLD,
};
pub use view::{VisibleSet, VisibleView};
