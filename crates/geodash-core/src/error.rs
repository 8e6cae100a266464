//! Error types for geodash

use crate::models::LocateMethod;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeodashError {
    // Validation errors
    #[error("Invalid coordinates: lng={lng}, lat={lat}")]
    InvalidCoordinates { lng: f64, lat: f64 },

    #[error("Search keyword is blank")]
    BlankKeyword,

    #[error("Waypoint {id} is already in the route")]
    DuplicateWaypoint { id: String },

    #[error("Route already holds the maximum of {limit} waypoints")]
    WaypointLimit { limit: usize },

    #[error("{name} has no valid location")]
    UnlocatablePoint { name: String },

    // Location errors
    #[error("Location unavailable: {reason}")]
    LocationUnavailable { reason: String },

    // Routing errors
    #[error("Route planning failed: {reason}")]
    RoutePlanning { reason: String },

    #[error("No route found between the requested points")]
    NoRoute,

    // Navigation errors
    #[error("Failed to launch navigation app: {reason}")]
    Launch { reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // Service transport errors
    #[error("HTTP request failed: {reason}")]
    Http { reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification used to decide how a failure is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reported to the user immediately, never propagated further
    Validation,
    /// Both geolocation tiers failed
    LocationUnavailable,
    /// The routing service returned an error or no data
    RoutePlanningFailure,
    /// The navigation app could not be launched
    LaunchFailure,
    Config,
    Io,
}

impl GeodashError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GeodashError::InvalidCoordinates { .. }
            | GeodashError::BlankKeyword
            | GeodashError::DuplicateWaypoint { .. }
            | GeodashError::WaypointLimit { .. }
            | GeodashError::UnlocatablePoint { .. } => ErrorKind::Validation,
            GeodashError::LocationUnavailable { .. } => ErrorKind::LocationUnavailable,
            GeodashError::RoutePlanning { .. } | GeodashError::NoRoute => {
                ErrorKind::RoutePlanningFailure
            }
            GeodashError::Launch { .. } => ErrorKind::LaunchFailure,
            GeodashError::ConfigMissing { .. } | GeodashError::ConfigInvalid { .. } => {
                ErrorKind::Config
            }
            GeodashError::Http { .. } | GeodashError::Io(_) | GeodashError::Serialization(_) => {
                ErrorKind::Io
            }
        }
    }

    /// Whether this error should be shown to the user as a rejection message
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

impl From<serde_json::Error> for GeodashError {
    fn from(err: serde_json::Error) -> Self {
        GeodashError::Serialization(err.to_string())
    }
}

/// Failure of a whole geolocation resolution.
///
/// Cloneable so every caller sharing a coalesced lookup receives the same outcome.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct LocationError {
    /// Tier that produced the reported message
    pub method: LocateMethod,
    pub message: String,
}

impl From<LocationError> for GeodashError {
    fn from(err: LocationError) -> Self {
        GeodashError::LocationUnavailable { reason: err.message }
    }
}

pub type Result<T> = std::result::Result<T, GeodashError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_kinds() {
        assert!(GeodashError::BlankKeyword.is_validation());
        assert!(GeodashError::WaypointLimit { limit: 16 }.is_validation());
        assert!(GeodashError::UnlocatablePoint { name: "Depot".to_string() }.is_validation());
        assert!(!GeodashError::NoRoute.is_validation());
        assert_eq!(GeodashError::NoRoute.kind(), ErrorKind::RoutePlanningFailure);
    }

    #[test]
    fn test_location_error_conversion() {
        let err = LocationError {
            method: LocateMethod::Coarse,
            message: "ip lookup refused".to_string(),
        };
        let converted: GeodashError = err.into();
        assert_eq!(converted.kind(), ErrorKind::LocationUnavailable);
        assert_eq!(converted.to_string(), "Location unavailable: ip lookup refused");
    }
}
