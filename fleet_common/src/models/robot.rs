//! # Robot Telemetry Model
//!
//! The canonical in-memory shape of one robot and of a full fleet snapshot,
//! plus the boundary conversion from the server's wire format.
//!
//! The telemetry server names its fields with human-readable labels
//! (`"Robot ID"`, `"Battery Percentage"`, ...) and is not consistent about the
//! location field: REST snapshots and channel pushes may use either
//! `"Location"` or `"Location Coordinates"`. All of that is resolved here, once,
//! so nothing downstream ever branches on a wire field name.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::errors::SnapshotParseError;

/// A complete point-in-time listing of the fleet. Order is the server's order.
pub type FleetSnapshot = Vec<RobotRecord>;

/// Stable robot identifier. The server may send it as a string or a number;
/// both are kept in their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RobotId(String);

impl RobotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RobotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RobotId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl PartialEq<&str> for RobotId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Serialize for RobotId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RobotId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(Self(s)),
            Value::Number(n) => Ok(Self(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "robot id must be a string or a number, got {}",
                other
            ))),
        }
    }
}

/// A `(latitude, longitude)` pair. Serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Accepts only an array of exactly two finite numbers.
    fn from_wire(value: &Value) -> Option<Self> {
        match value.as_array()?.as_slice() {
            [lat, lon] => {
                let (lat, lon) = (lat.as_f64()?, lon.as_f64()?);
                (lat.is_finite() && lon.is_finite()).then_some(Self { lat, lon })
            }
            _ => None,
        }
    }
}

impl Serialize for GeoPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.lat, self.lon).serialize(serializer)
    }
}

/// One robot's state as the dashboard sees it.
///
/// Serializes back into the server's wire format, which is what the test
/// servers in this workspace push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireRobot")]
pub struct RobotRecord {
    #[serde(rename = "Robot ID")]
    pub id: RobotId,
    #[serde(rename = "Online/Offline")]
    pub online: bool,
    #[serde(rename = "Battery Percentage")]
    pub battery_percentage: f64,
    #[serde(rename = "CPU Usage", skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<f64>,
    #[serde(rename = "RAM Consumption", skip_serializing_if = "Option::is_none")]
    pub ram_consumption_mb: Option<f64>,
    #[serde(rename = "Location", skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

impl RobotRecord {
    pub fn new(id: impl Into<RobotId>, online: bool, battery_percentage: f64) -> Self {
        Self {
            id: id.into(),
            online,
            battery_percentage,
            cpu_usage: None,
            ram_consumption_mb: None,
            location: None,
        }
    }

    pub fn with_usage(mut self, cpu_usage: f64, ram_consumption_mb: f64) -> Self {
        self.cpu_usage = Some(cpu_usage);
        self.ram_consumption_mb = Some(ram_consumption_mb);
        self
    }

    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.location = Some(GeoPoint::new(lat, lon));
        self
    }
}

impl From<String> for RobotId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Raw record as it arrives from the server. Never leaves this module.
#[derive(Debug, Deserialize)]
struct WireRobot {
    #[serde(rename = "Robot ID")]
    id: RobotId,
    #[serde(rename = "Online/Offline")]
    online: bool,
    #[serde(rename = "Battery Percentage")]
    battery_percentage: f64,
    #[serde(rename = "CPU Usage", default)]
    cpu_usage: Option<f64>,
    #[serde(rename = "RAM Consumption", default)]
    ram_consumption: Option<f64>,
    #[serde(rename = "Location", default)]
    location: Option<Value>,
    #[serde(rename = "Location Coordinates", default)]
    location_coordinates: Option<Value>,
}

impl From<WireRobot> for RobotRecord {
    fn from(wire: WireRobot) -> Self {
        // "Location" wins when both are usable.
        let location = wire
            .location
            .as_ref()
            .and_then(GeoPoint::from_wire)
            .or_else(|| wire.location_coordinates.as_ref().and_then(GeoPoint::from_wire));

        Self {
            id: wire.id,
            online: wire.online,
            battery_percentage: wire.battery_percentage,
            cpu_usage: wire.cpu_usage,
            ram_consumption_mb: wire.ram_consumption,
            location,
        }
    }
}

/// Decodes a full snapshot from a REST body or a channel frame.
pub fn parse_snapshot(payload: &[u8]) -> Result<FleetSnapshot, SnapshotParseError> {
    Ok(serde_json::from_slice(payload)?)
}
