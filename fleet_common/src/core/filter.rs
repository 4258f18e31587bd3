//! # Filter Engine
//!
//! Pure functions that derive what the presentation layer shows from the
//! current snapshot: the visible subsequence for a set of filter criteria and
//! the per-record display classifications.
//!
//! Nothing here touches the store or does I/O; the dashboard recomputes the
//! visible set whenever either input changes.

use std::str::FromStr;

use crate::errors::ConfigError;
use crate::models::{FleetSnapshot, GeoPoint, RobotRecord};

/// Batteries strictly below this percentage count as low.
pub const LOW_BATTERY_THRESHOLD: f64 = 20.0;

/// Online/offline axis. `Any` is the "no constraint" choice (`""`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    Any,
    Online,
    Offline,
}

impl FromStr for StatusFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Self::Any),
            "Online" => Ok(Self::Online),
            "Offline" => Ok(Self::Offline),
            other => Err(ConfigError::InvalidFilter { axis: "status", value: other.to_string() }),
        }
    }
}

/// Battery axis. `Any` is the "no constraint" choice (`""`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatteryFilter {
    #[default]
    Any,
    Low,
}

impl FromStr for BatteryFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Self::Any),
            "Low" => Ok(Self::Low),
            other => Err(ConfigError::InvalidFilter { axis: "battery", value: other.to_string() }),
        }
    }
}

/// The active filter selections. The default constrains nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub status: StatusFilter,
    pub battery: BatteryFilter,
    /// Case-insensitive substring of the robot id; empty means no constraint.
    pub search_query: String,
}

impl FilterCriteria {
    /// Builds criteria from the string forms used by the dashboard's selects.
    pub fn parse(status: &str, battery: &str, search_query: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            status: status.parse()?,
            battery: battery.parse()?,
            search_query: search_query.to_string(),
        })
    }

    /// True when `record` passes every axis.
    pub fn matches(&self, record: &RobotRecord) -> bool {
        let status_ok = match self.status {
            StatusFilter::Any => true,
            StatusFilter::Online => record.online,
            StatusFilter::Offline => !record.online,
        };
        let battery_ok = match self.battery {
            BatteryFilter::Any => true,
            BatteryFilter::Low => is_low_battery(record),
        };
        let search_ok = self.search_query.is_empty()
            || record
                .id
                .as_str()
                .to_lowercase()
                .contains(&self.search_query.to_lowercase());

        status_ok && battery_ok && search_ok
    }
}

fn is_low_battery(record: &RobotRecord) -> bool {
    record.battery_percentage < LOW_BATTERY_THRESHOLD
}

/// The order-preserving subsequence of `snapshot` matching `criteria`.
pub fn visible(snapshot: &[RobotRecord], criteria: &FilterCriteria) -> FleetSnapshot {
    snapshot.iter().filter(|r| criteria.matches(r)).cloned().collect()
}

/// Row/badge colour class for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColor {
    /// Offline (red).
    Alert,
    /// Online but battery below threshold (yellow).
    Low,
    /// Everything fine (green).
    Normal,
}

/// Offline beats low battery; first match wins.
pub fn status_color(record: &RobotRecord) -> StatusColor {
    if !record.online {
        StatusColor::Alert
    } else if is_low_battery(record) {
        StatusColor::Low
    } else {
        StatusColor::Normal
    }
}

/// Battery icon class, independent of online status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryIndicator {
    Critical,
    Healthy,
}

pub fn battery_indicator(record: &RobotRecord) -> BatteryIndicator {
    if is_low_battery(record) {
        BatteryIndicator::Critical
    } else {
        BatteryIndicator::Healthy
    }
}

pub fn status_label(record: &RobotRecord) -> &'static str {
    if record.online { "Online" } else { "Offline" }
}

/// Records that can be placed on the map, with their position, in order.
pub fn map_markers(snapshot: &[RobotRecord]) -> Vec<(&RobotRecord, GeoPoint)> {
    snapshot
        .iter()
        .filter_map(|r| r.location.map(|loc| (r, loc)))
        .collect()
}
