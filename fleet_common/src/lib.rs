//! # fleet_common
//!
//! Client-side live-state synchronization for the robot fleet dashboard.
//!
//! Data flow: the snapshot fetcher loads the fleet once at mount, the live
//! channel overwrites the store with every pushed snapshot, and the filter
//! engine derives the visible subset whenever the store or the criteria
//! change. Rendering is left to the consumer.

pub mod configs;
pub mod core;
pub mod errors;
pub mod models;

#[cfg(feature = "retrieve")]
pub mod retrieve;

#[cfg(feature = "ingestors")]
pub mod ingestors;

#[cfg(feature = "ingestors")]
pub mod dashboard;

// Re-export everything a consumer typically touches.
pub use crate::configs::{Endpoints, SyncConfig};
pub use crate::core::{FilterCriteria, StateStore, VisibleSet, VisibleView};
pub use crate::errors::{ChannelError, ConfigError, FetchError, MountError, SnapshotParseError};
pub use crate::models::{FleetSnapshot, GeoPoint, RobotId, RobotRecord};

#[cfg(feature = "ingestors")]
pub use crate::dashboard::{Dashboard, MountedDashboard};
