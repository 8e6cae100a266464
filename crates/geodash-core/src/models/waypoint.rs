//! Route stops.

use crate::error::{GeodashError, Result};
use crate::models::customer::CustomerPoint;
use crate::models::location::LngLat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable waypoint identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaypointId(String);

impl WaypointId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity derived from the position rounded to 1e-5 degrees (about a meter)
    pub fn from_position(position: LngLat) -> Self {
        Self(format!("{:.5},{:.5}", position.lng(), position.lat()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WaypointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An intermediate or final stop. The last waypoint of a route is its destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: WaypointId,
    pub position: LngLat,
    pub name: String,
    pub address: String,
}

impl Waypoint {
    pub fn new(position: LngLat, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: WaypointId::from_position(position),
            position,
            name: name.into(),
            address: address.into(),
        }
    }

    pub fn with_id(mut self, id: WaypointId) -> Self {
        self.id = id;
        self
    }

    /// Waypoint for a customer; fails when the customer is not locatable
    pub fn from_point(point: &CustomerPoint) -> Result<Self> {
        let position = point.position.ok_or_else(|| GeodashError::UnlocatablePoint {
            name: match point.name.trim() {
                "" => "Customer".to_string(),
                name => name.to_string(),
            },
        })?;
        Ok(Self::new(position, point.name.clone(), point.address.clone()))
    }
}
