//! # Data Models
//!
//! Robot records and fleet snapshots, normalized at the wire boundary.

/// Robot record, fleet snapshot and wire decoding.
pub mod robot;

pub use robot::{parse_snapshot, FleetSnapshot, GeoPoint, RobotId, RobotRecord};
